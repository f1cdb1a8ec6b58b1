//! Subprocess execution with a hard timeout.

use std::process::{Output, Stdio};
use std::time::Duration;

use tokio::process::Command;

use crate::error::{AppError, Result};

/// Runs `program args...` to completion, killing it if it exceeds `timeout`.
///
/// A non-zero exit status is not an error here; callers inspect
/// [`Output::status`]. Use [`run_checked`] when failure should propagate.
///
/// # Errors
///
/// Returns [`AppError::Command`] if the program cannot be spawned and
/// [`AppError::Timeout`] if it does not finish in time.
pub async fn run(program: &str, args: &[&str], timeout: Duration) -> Result<Output> {
    tracing::debug!("Running {} {}", program, args.join(" "));

    let child = Command::new(program)
        .args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| AppError::command(program, e))?;

    match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(output) => output.map_err(|e| AppError::command(program, e)),
        Err(_) => Err(AppError::Timeout {
            operation: format!("{program} {}", args.join(" ")),
            after: timeout,
        }),
    }
}

/// Like [`run`], but a non-zero exit status becomes [`AppError::Command`]
/// carrying the trimmed stderr (or stdout when stderr is empty).
///
/// # Errors
///
/// See [`run`].
pub async fn run_checked(program: &str, args: &[&str], timeout: Duration) -> Result<Output> {
    let output = run(program, args, timeout).await?;
    if output.status.success() {
        return Ok(output);
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    let message = if stderr.trim().is_empty() {
        String::from_utf8_lossy(&output.stdout).trim().to_string()
    } else {
        stderr.trim().to_string()
    };
    let message = if message.is_empty() {
        format!("exited with {}", output.status)
    } else {
        message
    };
    Err(AppError::command(program, message))
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_captures_output() {
        let out = run("sh", &["-c", "echo hello"], Duration::from_secs(5))
            .await
            .unwrap();
        assert!(out.status.success());
        assert_eq!(String::from_utf8_lossy(&out.stdout).trim(), "hello");
    }

    #[tokio::test]
    async fn test_run_checked_surfaces_stderr() {
        let err = run_checked("sh", &["-c", "echo boom >&2; exit 3"], Duration::from_secs(5))
            .await
            .unwrap_err();
        match err {
            AppError::Command { program, message } => {
                assert_eq!(program, "sh");
                assert_eq!(message, "boom");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_timeout_kills_process() {
        let err = run("sleep", &["5"], Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Timeout { .. }));
    }

    #[tokio::test]
    async fn test_missing_program() {
        let err = run("hostapp-no-such-binary", &[], Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Command { .. }));
    }
}
