//! Injectable process execution.
//!
//! The artifact download and the packaging tool are both external programs.
//! Routing them through [`CommandExecutor`] keeps the pipelines testable
//! without `gh` or `npm` on the host.

use crate::error::{ReleaseError, Result};
use std::path::Path;
use std::process::{Command, Output};

/// Abstraction for running external commands.
pub trait CommandExecutor {
    /// Runs `cmd` with `args`, optionally from `cwd`, and returns the
    /// captured output.
    ///
    /// # Errors
    ///
    /// Returns any I/O errors encountered while spawning or running the command.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use beacon_release::exec::{CommandExecutor, SystemCommandExecutor};
    ///
    /// let executor = SystemCommandExecutor;
    /// let output = executor.run("gh", &["--version"], None)?;
    /// assert!(output.status.success());
    /// # Ok::<(), beacon_release::error::ReleaseError>(())
    /// ```
    fn run(&self, cmd: &str, args: &[&str], cwd: Option<&Path>) -> Result<Output>;
}

/// Executes commands on the host system.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCommandExecutor;

impl CommandExecutor for SystemCommandExecutor {
    fn run(&self, cmd: &str, args: &[&str], cwd: Option<&Path>) -> Result<Output> {
        let mut command = Command::new(cmd);
        command.args(args);
        if let Some(dir) = cwd {
            command.current_dir(dir);
        }
        command.output().map_err(ReleaseError::from)
    }
}

/// Run a command and turn a non-zero exit into
/// [`ReleaseError::CommandFailed`].
///
/// # Errors
///
/// Returns spawn errors from the executor, or `CommandFailed` carrying the
/// command line, exit status, and trimmed stderr.
pub fn run_checked(
    executor: &dyn CommandExecutor,
    cmd: &str,
    args: &[&str],
    cwd: Option<&Path>,
) -> Result<Output> {
    log::debug!("running {}", command_line(cmd, args));
    let output = executor.run(cmd, args, cwd)?;
    if output.status.success() {
        return Ok(output);
    }
    Err(ReleaseError::CommandFailed {
        command: command_line(cmd, args),
        status: output.status.to_string(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_owned(),
    })
}

fn command_line(cmd: &str, args: &[&str]) -> String {
    std::iter::once(cmd)
        .chain(args.iter().copied())
        .collect::<Vec<_>>()
        .join(" ")
}
