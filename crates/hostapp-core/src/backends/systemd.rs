//! systemctl adapter for [`ServiceManager`].

use std::time::Duration;

use async_trait::async_trait;

use super::ServiceManager;
use crate::error::Result;
use crate::io::command::run_checked;

/// `systemctl` driven as a subprocess.
#[derive(Debug, Clone)]
pub struct Systemd {
    program: String,
    timeout: Duration,
}

impl Systemd {
    /// Drive `program` (normally `systemctl`), killing calls that exceed `timeout`.
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }

    async fn systemctl(&self, verb: &str, name: &str) -> Result<()> {
        run_checked(&self.program, &[verb, name], self.timeout).await?;
        tracing::debug!("systemctl {verb} {name}");
        Ok(())
    }
}

#[async_trait]
impl ServiceManager for Systemd {
    async fn start(&self, name: &str) -> Result<()> {
        self.systemctl("start", name).await
    }

    async fn stop(&self, name: &str) -> Result<()> {
        self.systemctl("stop", name).await
    }

    async fn enable(&self, name: &str) -> Result<()> {
        self.systemctl("enable", name).await
    }

    async fn disable(&self, name: &str) -> Result<()> {
        self.systemctl("disable", name).await
    }
}
