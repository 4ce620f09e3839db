//! Progress and summary reporting for the release CLI.
//!
//! User-facing lines go to stderr; log records from the library go through
//! the `log` facade and are only shown at higher verbosity.

use std::fmt;
use std::io::Write;
use std::path::Path;

/// Aggregate outcome of one pipeline run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Units that completed.
    pub succeeded: usize,
    /// Units that failed.
    pub failed: usize,
    /// Units never attempted because of an earlier failure.
    pub skipped: usize,
}

impl RunSummary {
    /// Whether every requested unit completed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.failed == 0 && self.skipped == 0
    }

    /// Combine two summaries.
    #[must_use]
    pub fn merge(self, other: Self) -> Self {
        Self {
            succeeded: self.succeeded + other.succeeded,
            failed: self.failed + other.failed,
            skipped: self.skipped + other.skipped,
        }
    }
}

impl fmt::Display for RunSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} succeeded, {} failed, {} skipped",
            self.succeeded, self.failed, self.skipped
        )
    }
}

/// Write one line to `stderr`, ignoring write failures.
pub fn write_stderr_line(stderr: &mut dyn Write, message: impl fmt::Display) {
    if writeln!(stderr, "{message}").is_err() {
        // Best-effort reporting; ignore write failures.
    }
}

/// Progress reporter writing to stderr, silenced by `--quiet`.
pub struct Progress<'a> {
    stderr: &'a mut dyn Write,
    quiet: bool,
}

impl<'a> Progress<'a> {
    /// Create a reporter over `stderr`.
    pub fn new(stderr: &'a mut dyn Write, quiet: bool) -> Self {
        Self { stderr, quiet }
    }

    /// Report a progress line unless quiet.
    pub fn line(&mut self, message: impl fmt::Display) {
        if !self.quiet {
            write_stderr_line(self.stderr, message);
        }
    }

    /// Report a line regardless of quiet mode.
    pub fn always(&mut self, message: impl fmt::Display) {
        write_stderr_line(self.stderr, message);
    }
}

/// Message printed after the install pipeline succeeds.
#[must_use]
pub fn install_success_message(vendor_root: &Path) -> String {
    format!("Installed native dependencies into {}", vendor_root.display())
}

/// Message printed after one platform package was packed.
#[must_use]
pub fn staged_message(package_name: &str, tarball: &Path) -> String {
    format!("Staged {package_name} at {}", tarball.display())
}

/// Message printed after the package pipeline succeeds.
#[must_use]
pub fn package_success_message(count: usize, output_dir: &Path) -> String {
    let plural = if count == 1 { "tarball" } else { "tarballs" };
    format!("Done. Wrote {count} {plural} to {}", output_dir.display())
}
