//! Console reporter.
//!
//! Commands and the engine report through [`Output`]. Each event is rendered
//! as one complete line under a lock, so concurrent installs never interleave
//! partial lines.

use std::io::Write;
use std::sync::Mutex;

use crossterm::style::Stylize;
use hostapp_core::Reporter;
use hostapp_schema::{AppId, DependencyCheck, Outcome};

use super::theme::Theme;

/// Line-oriented terminal reporter.
#[derive(Debug, Default)]
pub struct Output {
    theme: Theme,
    lock: Mutex<()>,
}

impl Output {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn theme(&self) -> &Theme {
        &self.theme
    }

    /// Print one line to stdout without interleaving with other reporters.
    pub fn line(&self, text: &str) {
        let _guard = self.lock.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
        let mut stdout = std::io::stdout().lock();
        let _ = writeln!(stdout, "{text}");
    }

    fn status(&self, icon: &str, id: &AppId, detail: &str) {
        let width = self.theme.layout.id_width;
        self.line(&format!(
            "  {icon} {} {}",
            format!("{:<width$}", id.as_str()).with(self.theme.colors.app_id),
            detail.with(self.theme.colors.secondary)
        ));
    }

    fn active(&self, id: &AppId, detail: &str) {
        let icon = self.theme.icons.active.with(self.theme.colors.active);
        self.status(&icon.to_string(), id, detail);
    }
}

/// Render a single dependency check as `kind package  outcome`.
pub fn format_check(check: &DependencyCheck, theme: &Theme) -> String {
    let (icon, outcome) = match &check.verify {
        Outcome::Pass => (
            theme.icons.success.with(theme.colors.success),
            "pass".to_string().with(theme.colors.success),
        ),
        Outcome::Fail(reason) => (
            theme.icons.error.with(theme.colors.error),
            reason.to_string().with(theme.colors.error),
        ),
    };
    format!(
        "{icon} {:<8} {:<24} {outcome}",
        check.kind.to_string(),
        check.package
    )
}

impl Reporter for Output {
    fn section(&self, title: &str) {
        self.line("");
        self.line(&format!("  {}", title.bold()));
    }

    fn fetching(&self, id: &AppId) {
        self.active(id, "fetching");
    }

    fn installing(&self, id: &AppId) {
        self.active(id, "installing");
    }

    fn verifying(&self, id: &AppId) {
        self.active(id, "verifying dependencies");
    }

    fn checked(&self, _id: &AppId, check: &DependencyCheck) {
        self.line(&format!("      {}", format_check(check, &self.theme)));
    }

    fn removing(&self, id: &AppId) {
        self.active(id, "removing");
    }

    fn done(&self, id: &AppId, detail: &str) {
        self.status(
            &self.theme.icons.success.with(self.theme.colors.success).to_string(),
            id,
            detail,
        );
    }

    fn failed(&self, id: &AppId, reason: &str) {
        let width = self.theme.layout.id_width;
        self.line(&format!(
            "  {} {} {}",
            self.theme.icons.error.with(self.theme.colors.error),
            format!("{:<width$}", id.as_str()).with(self.theme.colors.app_id),
            reason.with(self.theme.colors.error)
        ));
    }

    fn info(&self, msg: &str) {
        self.line(&format!("  {} {msg}", self.theme.icons.info.dark_grey()));
    }

    fn success(&self, msg: &str) {
        self.line(&format!(
            "  {} {msg}",
            self.theme.icons.success.with(self.theme.colors.success)
        ));
    }

    fn warning(&self, msg: &str) {
        self.line(&format!(
            "  {} {}",
            self.theme.icons.warning.with(self.theme.colors.warning),
            msg.with(self.theme.colors.warning)
        ));
    }

    fn error(&self, msg: &str) {
        self.line(&format!(
            "  {} {}",
            self.theme.icons.error.with(self.theme.colors.error),
            msg.with(self.theme.colors.error)
        ));
    }

    fn summary(&self, count: usize, action: &str, elapsed_secs: f64) {
        let plural = if count == 1 { "" } else { "s" };
        self.line("");
        self.line(&format!(
            "  {count} app{plural} {action} {}",
            format!("in {elapsed_secs:.1}s").dark_grey()
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hostapp_schema::{DependencyKind, FailReason};

    #[test]
    fn test_format_check() {
        let theme = Theme::default();
        let check = DependencyCheck::new(
            DependencyKind::System,
            "mariadb",
            Outcome::Fail(FailReason::InternalRestart),
        );
        let line = format_check(&check, &theme);
        assert!(line.contains("system"));
        assert!(line.contains("mariadb"));
        assert!(line.contains("internal_restart"));
    }

    #[test]
    fn test_output_is_a_reporter() {
        let output = std::sync::Arc::new(Output::new());
        let reporter: std::sync::Arc<dyn Reporter> = output;
        reporter.info("test");
    }
}
