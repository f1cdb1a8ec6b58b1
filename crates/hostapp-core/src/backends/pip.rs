//! pip adapter for [`RuntimePackages`], probing modules through `python -c`.

use std::time::Duration;

use async_trait::async_trait;

use super::RuntimePackages;
use crate::error::Result;
use crate::io::command::{run, run_checked};

/// Python runtime: `pip` for packages, the interpreter for import probes.
#[derive(Debug, Clone)]
pub struct Pip {
    pip: String,
    python: String,
    timeout: Duration,
}

impl Pip {
    /// Drive `pip` for package queries and installs and `python` for import probes.
    pub fn new(pip: impl Into<String>, python: impl Into<String>, timeout: Duration) -> Self {
        Self {
            pip: pip.into(),
            python: python.into(),
            timeout,
        }
    }
}

fn is_module_name(module: &str) -> bool {
    !module.is_empty()
        && module
            .split('.')
            .all(|part| !part.is_empty() && part.chars().all(|c| c.is_alphanumeric() || c == '_'))
}

#[async_trait]
impl RuntimePackages for Pip {
    async fn is_installed(&self, name: &str) -> Result<bool> {
        let output = run(&self.pip, &["show", "--quiet", name], self.timeout).await?;
        Ok(output.status.success())
    }

    async fn install(&self, names: &[String]) -> Result<()> {
        if names.is_empty() {
            return Ok(());
        }
        let mut args = vec!["install"];
        args.extend(names.iter().map(String::as_str));
        run_checked(&self.pip, &args, self.timeout).await?;
        tracing::info!("Installed runtime packages: {}", names.join(", "));
        Ok(())
    }

    async fn can_import(&self, module: &str) -> bool {
        if !is_module_name(module) {
            tracing::warn!("Refusing to probe invalid module name '{module}'");
            return false;
        }
        let code = format!("import {module}");
        match run(&self.python, &["-c", &code], self.timeout).await {
            Ok(output) => output.status.success(),
            Err(e) => {
                tracing::warn!("Import probe for {module} failed: {e}");
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_module_name_validation() {
        assert!(is_module_name("yaml"));
        assert!(is_module_name("ldap3.core"));
        assert!(!is_module_name(""));
        assert!(!is_module_name("os; import sys"));
        assert!(!is_module_name("a..b"));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_can_import_uses_interpreter_exit_status() {
        let ok = Pip::new("pip", "true", Duration::from_secs(5));
        let missing = Pip::new("pip", "false", Duration::from_secs(5));
        assert!(ok.can_import("yaml").await);
        assert!(!missing.can_import("yaml").await);
    }
}
