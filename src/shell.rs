//! Process execution for command-line based providers.
//!
//! Providers that talk to the account store through an external program
//! (PowerShell on Windows) run it through these helpers so exit codes,
//! missing executables and output decoding are handled in one place.

use crate::{AccountError, Result};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

/// Captured result of a finished process.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Exit code, `None` when the process was killed by a signal
    pub code: Option<i32>,
    pub stdout: String,
    pub stderr: String,
}

/// Runs a program to completion, optionally feeding `stdin_data`, and
/// captures its output whatever the exit code.
///
/// # Errors
///
/// - [`AccountError::ProviderUnavailable`] if the program is not found
/// - [`AccountError::Io`] on spawn or pipe failures
/// - [`AccountError::CommandFailed`] if the output is not valid UTF-8
pub async fn capture(
    program: &str,
    args: &[&str],
    stdin_data: Option<&str>,
) -> Result<CommandOutput> {
    let mut cmd = Command::new(program);
    cmd.args(args);
    cmd.stdin(if stdin_data.is_some() {
        Stdio::piped()
    } else {
        Stdio::null()
    });
    cmd.stdout(Stdio::piped());
    cmd.stderr(Stdio::piped());
    cmd.kill_on_drop(true);

    let mut child = cmd.spawn().map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            AccountError::ProviderUnavailable(format!("{} command not found", program))
        } else {
            AccountError::Io(e)
        }
    })?;

    if let (Some(data), Some(mut stdin)) = (stdin_data, child.stdin.take()) {
        stdin.write_all(data.as_bytes()).await?;
        stdin.flush().await?;
        // dropping closes the pipe so the child sees EOF
    }

    let output = child.wait_with_output().await?;

    let stdout = String::from_utf8(output.stdout).map_err(|e| {
        AccountError::CommandFailed(format!("invalid UTF-8 in {} output: {}", program, e))
    })?;

    Ok(CommandOutput {
        code: output.status.code(),
        stdout,
        stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
    })
}

/// Checks if a command-line tool is available in PATH.
///
/// # Example
///
/// ```no_run
/// use localacct::shell::check_command_exists;
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() -> localacct::Result<()> {
///     if !check_command_exists("powershell.exe").await? {
///         println!("PowerShell is not installed");
///     }
///     Ok(())
/// }
/// ```
pub async fn check_command_exists(program: &str) -> Result<bool> {
    let locator = if cfg!(windows) { "where" } else { "which" };
    let status = Command::new(locator)
        .arg(program)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await?;

    Ok(status.success())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_capture_success() {
        let output = capture("echo", &["hello"], None).await.unwrap();
        assert_eq!(output.code, Some(0));
        assert_eq!(output.stdout.trim(), "hello");
    }

    #[tokio::test]
    async fn test_capture_not_found() {
        let result = capture("nonexistent-command-12345", &[], None).await;
        assert!(matches!(result, Err(AccountError::ProviderUnavailable(_))));
    }

    #[tokio::test]
    async fn test_capture_with_stdin() {
        let output = capture("cat", &[], Some("hello from stdin")).await.unwrap();
        assert_eq!(output.code, Some(0));
        assert_eq!(output.stdout, "hello from stdin");
    }

    #[tokio::test]
    async fn test_capture_keeps_exit_code() {
        let output = capture("sh", &["-c", "echo oops >&2; exit 3"], None)
            .await
            .unwrap();
        assert_eq!(output.code, Some(3));
        assert_eq!(output.stderr.trim(), "oops");
        assert!(output.stdout.is_empty());
    }

    #[tokio::test]
    async fn test_check_command_exists() {
        assert!(check_command_exists("echo").await.unwrap());
        assert!(!check_command_exists("nonexistent-command-12345")
            .await
            .unwrap());
    }
}
