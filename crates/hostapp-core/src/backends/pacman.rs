//! pacman adapter for [`SystemPackages`].

use std::time::Duration;

use async_trait::async_trait;

use super::SystemPackages;
use crate::error::Result;
use crate::io::command::{run, run_checked};

/// `pacman` driven as a subprocess.
#[derive(Debug, Clone)]
pub struct Pacman {
    program: String,
    timeout: Duration,
}

impl Pacman {
    /// Drive `program` (normally `pacman`), killing calls that exceed `timeout`.
    pub fn new(program: impl Into<String>, timeout: Duration) -> Self {
        Self {
            program: program.into(),
            timeout,
        }
    }
}

fn install_args(names: &[String], refresh: bool) -> Vec<&str> {
    let mut args = vec![if refresh { "-Sy" } else { "-S" }, "--needed", "--noconfirm"];
    args.extend(names.iter().map(String::as_str));
    args
}

fn remove_args(names: &[String], purge: bool) -> Vec<&str> {
    // -n drops the .pacsave backups of modified config files
    let mut args = vec![if purge { "-Rn" } else { "-R" }, "--noconfirm"];
    args.extend(names.iter().map(String::as_str));
    args
}

#[async_trait]
impl SystemPackages for Pacman {
    async fn is_installed(&self, name: &str) -> Result<bool> {
        let output = run(&self.program, &["-Q", name], self.timeout).await?;
        Ok(output.status.success())
    }

    async fn install(&self, names: &[String], refresh: bool) -> Result<()> {
        if names.is_empty() {
            return Ok(());
        }
        run_checked(&self.program, &install_args(names, refresh), self.timeout).await?;
        tracing::info!("Installed system packages: {}", names.join(", "));
        Ok(())
    }

    async fn remove(&self, names: &[String], purge: bool) -> Result<()> {
        if names.is_empty() {
            return Ok(());
        }
        run_checked(&self.program, &remove_args(names, purge), self.timeout).await?;
        tracing::info!("Removed system packages: {}", names.join(", "));
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_install_args() {
        let names = vec!["php".to_string(), "php-fpm".to_string()];
        assert_eq!(
            install_args(&names, true),
            vec!["-Sy", "--needed", "--noconfirm", "php", "php-fpm"]
        );
        assert_eq!(install_args(&names, false)[0], "-S");
    }

    #[test]
    fn test_remove_args_honor_purge() {
        let names = vec!["mariadb".to_string()];
        assert_eq!(remove_args(&names, true), vec!["-Rn", "--noconfirm", "mariadb"]);
        assert_eq!(remove_args(&names, false), vec!["-R", "--noconfirm", "mariadb"]);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_is_installed_follows_exit_status() {
        // `true`/`false` stand in for a pacman that does or does not know the package
        let yes = Pacman::new("true", Duration::from_secs(5));
        let no = Pacman::new("false", Duration::from_secs(5));
        assert!(yes.is_installed("php").await.unwrap());
        assert!(!no.is_installed("php").await.unwrap());
        assert!(no.install(&["php".to_string()], false).await.is_err());
    }
}
