//! Reporter trait for dependency injection
//!
//! Lets the engine report progress without being coupled to a terminal.

use hostapp_schema::{AppId, DependencyCheck};

/// Receives progress events from engine operations.
pub trait Reporter: Send + Sync {
    /// A new section or phase has started (e.g. "Installing", "Verifying").
    fn section(&self, title: &str);

    /// The bundle for `id` is being fetched from the catalog.
    fn fetching(&self, id: &AppId);

    /// The bundle for `id` is being unpacked and registered.
    fn installing(&self, id: &AppId);

    /// Dependencies of `id` are being checked (and installed if missing).
    fn verifying(&self, id: &AppId);

    /// A single dependency check of `id` has concluded.
    fn checked(&self, id: &AppId, check: &DependencyCheck);

    /// `id` is being removed.
    fn removing(&self, id: &AppId);

    /// An operation on `id` completed.
    fn done(&self, id: &AppId, detail: &str);

    /// An operation on `id` failed.
    fn failed(&self, id: &AppId, reason: &str);

    /// Neutral message.
    fn info(&self, msg: &str);
    /// Something finished well.
    fn success(&self, msg: &str);
    /// Something went wrong but the operation continues.
    fn warning(&self, msg: &str);
    /// Something failed.
    fn error(&self, msg: &str);

    /// Final summary of a batch of operations.
    fn summary(&self, count: usize, action: &str, elapsed_secs: f64);
}

impl<T: Reporter + ?Sized> Reporter for std::sync::Arc<T> {
    fn section(&self, title: &str) {
        (**self).section(title)
    }
    fn fetching(&self, id: &AppId) {
        (**self).fetching(id)
    }
    fn installing(&self, id: &AppId) {
        (**self).installing(id)
    }
    fn verifying(&self, id: &AppId) {
        (**self).verifying(id)
    }
    fn checked(&self, id: &AppId, check: &DependencyCheck) {
        (**self).checked(id, check)
    }
    fn removing(&self, id: &AppId) {
        (**self).removing(id)
    }
    fn done(&self, id: &AppId, detail: &str) {
        (**self).done(id, detail)
    }
    fn failed(&self, id: &AppId, reason: &str) {
        (**self).failed(id, reason)
    }
    fn info(&self, msg: &str) {
        (**self).info(msg)
    }
    fn success(&self, msg: &str) {
        (**self).success(msg)
    }
    fn warning(&self, msg: &str) {
        (**self).warning(msg)
    }
    fn error(&self, msg: &str) {
        (**self).error(msg)
    }
    fn summary(&self, count: usize, action: &str, elapsed_secs: f64) {
        (**self).summary(count, action, elapsed_secs)
    }
}

/// A no-op reporter for silent operations (e.g., scripting, testing).
#[derive(Clone, Copy, Debug)]
pub struct NullReporter;

impl Reporter for NullReporter {
    fn section(&self, _: &str) {}
    fn fetching(&self, _: &AppId) {}
    fn installing(&self, _: &AppId) {}
    fn verifying(&self, _: &AppId) {}
    fn checked(&self, _: &AppId, _: &DependencyCheck) {}
    fn removing(&self, _: &AppId) {}
    fn done(&self, _: &AppId, _: &str) {}
    fn failed(&self, _: &AppId, _: &str) {}
    fn info(&self, _: &str) {}
    fn success(&self, _: &str) {}
    fn warning(&self, _: &str) {}
    fn error(&self, _: &str) {}
    fn summary(&self, _: usize, _: &str, _: f64) {}
}
