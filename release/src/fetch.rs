//! Workflow artifact retrieval.
//!
//! CI uploads one artifact bundle per target. The `gh` CLI downloads every
//! bundle of a run into `<dest>/<target>/`, which is exactly the layout the
//! installer reads from.

use crate::error::{ReleaseError, Result};
use crate::exec::{CommandExecutor, run_checked};
use std::fmt;
use std::path::Path;

/// A validated GitHub Actions run identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowRun {
    id: String,
}

impl WorkflowRun {
    /// Parse a bare run id or a run URL such as
    /// `https://github.com/owner/repo/actions/runs/123/job/456`.
    ///
    /// # Errors
    ///
    /// Returns [`ReleaseError::Configuration`] when no numeric run id can be
    /// found.
    ///
    /// # Examples
    ///
    /// ```
    /// use beacon_release::fetch::WorkflowRun;
    ///
    /// let run = WorkflowRun::parse("https://github.com/o/r/actions/runs/987/")?;
    /// assert_eq!(run.id(), "987");
    /// # Ok::<(), beacon_release::error::ReleaseError>(())
    /// ```
    pub fn parse(reference: &str) -> Result<Self> {
        let trimmed = reference.trim().trim_end_matches('/');
        let candidate = match trimmed.split_once("/runs/") {
            Some((_, rest)) => rest.split('/').next().unwrap_or_default(),
            None => trimmed.rsplit('/').next().unwrap_or_default(),
        };

        if candidate.is_empty() || !candidate.bytes().all(|byte| byte.is_ascii_digit()) {
            return Err(ReleaseError::Configuration {
                reason: format!("could not find a workflow run id in \"{reference}\""),
            });
        }
        Ok(Self {
            id: candidate.to_owned(),
        })
    }

    /// The numeric run id.
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }
}

impl fmt::Display for WorkflowRun {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

/// Trait for retrieving a run's artifact bundles, enabling test mocking.
#[cfg_attr(test, mockall::automock)]
pub trait ArtifactFetcher {
    /// Download every artifact bundle of `run` into `destination_root`.
    ///
    /// # Errors
    ///
    /// Returns an error if the download fails. There is no retry.
    fn fetch(&self, run: &WorkflowRun, destination_root: &Path) -> Result<()>;
}

/// Fetcher backed by `gh run download`.
pub struct GhCliFetcher<'a> {
    executor: &'a dyn CommandExecutor,
    repo: String,
}

impl<'a> GhCliFetcher<'a> {
    /// Create a fetcher that downloads from the `owner/name` repository.
    #[must_use]
    pub fn new(executor: &'a dyn CommandExecutor, repo: impl Into<String>) -> Self {
        Self {
            executor,
            repo: repo.into(),
        }
    }
}

impl ArtifactFetcher for GhCliFetcher<'_> {
    fn fetch(&self, run: &WorkflowRun, destination_root: &Path) -> Result<()> {
        let dest = destination_root.to_string_lossy();
        log::info!("downloading artifacts of run {run} from {}", self.repo);
        run_checked(
            self.executor,
            "gh",
            &["run", "download", "--dir", &dest, "--repo", &self.repo, run.id()],
            None,
        )?;
        Ok(())
    }
}
