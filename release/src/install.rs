//! Concurrent installation of one component across the target matrix.
//!
//! Each target is an independent unit: locate its archive in the artifacts
//! tree, extract the binary into the vendor tree, and record a digest. A
//! scoped worker pool claims targets in matrix order and runs every one of
//! them, so a failing target never keeps the others off disk. The first
//! failure in claim order is surfaced by [`InstallReport::into_result`].

use crate::archive::{ArchiveDescriptor, ArchiveExtractor, ExecutableBit};
use crate::digest::compute_sha256;
use crate::error::{ReleaseError, Result};
use crate::matrix::component::BinaryComponent;
use crate::matrix::target::TargetTriple;
use std::fs;
use std::io;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::thread;

/// Result of installing one target.
#[derive(Debug)]
pub enum TargetOutcome {
    /// The binary was written to the vendor tree.
    Installed {
        /// Vendor-tree path of the binary.
        path: PathBuf,
        /// Lowercase hex SHA-256 of the installed binary.
        sha256: String,
    },
    /// Installation failed.
    Failed(ReleaseError),
    /// The target was never claimed because every worker died first.
    Skipped,
}

/// Per-target outcomes for one component, in matrix order.
#[derive(Debug)]
pub struct InstallReport {
    component: String,
    outcomes: Vec<(TargetTriple, TargetOutcome)>,
}

impl InstallReport {
    /// Component the report describes.
    #[must_use]
    pub fn component(&self) -> &str {
        &self.component
    }

    /// Outcomes in matrix order.
    #[must_use]
    pub fn outcomes(&self) -> &[(TargetTriple, TargetOutcome)] {
        &self.outcomes
    }

    /// Outcome for `target`, if it was part of the run.
    #[must_use]
    pub fn outcome(&self, target: TargetTriple) -> Option<&TargetOutcome> {
        self.outcomes
            .iter()
            .find(|(candidate, _)| *candidate == target)
            .map(|(_, outcome)| outcome)
    }

    /// Number of installed targets.
    #[must_use]
    pub fn installed(&self) -> usize {
        self.count(|outcome| matches!(outcome, TargetOutcome::Installed { .. }))
    }

    /// Number of failed targets.
    #[must_use]
    pub fn failed(&self) -> usize {
        self.count(|outcome| matches!(outcome, TargetOutcome::Failed(_)))
    }

    /// Number of skipped targets.
    #[must_use]
    pub fn skipped(&self) -> usize {
        self.count(|outcome| matches!(outcome, TargetOutcome::Skipped))
    }

    /// Whether every target was installed.
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.installed() == self.outcomes.len()
    }

    fn count(&self, predicate: impl Fn(&TargetOutcome) -> bool) -> usize {
        self.outcomes
            .iter()
            .filter(|(_, outcome)| predicate(outcome))
            .count()
    }

    /// Collapse the report into the installed paths, or the first failure
    /// in claim order.
    ///
    /// # Errors
    ///
    /// Returns the error of the earliest failed target.
    pub fn into_result(self) -> Result<Vec<PathBuf>> {
        let mut installed = Vec::with_capacity(self.outcomes.len());
        for (_, outcome) in self.outcomes {
            match outcome {
                TargetOutcome::Installed { path, .. } => installed.push(path),
                TargetOutcome::Failed(err) => return Err(err),
                TargetOutcome::Skipped => {}
            }
        }
        Ok(installed)
    }
}

/// Installs component binaries from an artifacts tree into a vendor tree.
pub struct ConcurrentInstaller<'a> {
    artifacts_root: PathBuf,
    vendor_root: PathBuf,
    extractor: &'a dyn ArchiveExtractor,
    jobs: Option<NonZeroUsize>,
}

impl<'a> ConcurrentInstaller<'a> {
    /// Create an installer reading `<artifacts_root>/<target>/<archive>`
    /// and writing `<vendor_root>/<target>/...`.
    #[must_use]
    pub fn new(
        artifacts_root: impl Into<PathBuf>,
        vendor_root: impl Into<PathBuf>,
        extractor: &'a dyn ArchiveExtractor,
    ) -> Self {
        Self {
            artifacts_root: artifacts_root.into(),
            vendor_root: vendor_root.into(),
            extractor,
            jobs: None,
        }
    }

    /// Cap the worker pool at `jobs` threads.
    #[must_use]
    pub fn with_jobs(mut self, jobs: Option<NonZeroUsize>) -> Self {
        self.jobs = jobs;
        self
    }

    /// Number of workers used for `target_count` targets.
    #[must_use]
    pub fn worker_count(&self, target_count: usize) -> usize {
        let available = thread::available_parallelism().map_or(1, NonZeroUsize::get);
        let capped = self.jobs.map_or(available, |jobs| available.min(jobs.get()));
        target_count.min(capped).max(1)
    }

    /// Install `component` for each of `targets`.
    ///
    /// Never fails as a whole; per-target errors are carried in the report.
    #[must_use]
    pub fn install(&self, component: &BinaryComponent, targets: &[TargetTriple]) -> InstallReport {
        let slots: Mutex<Vec<Option<TargetOutcome>>> =
            Mutex::new(targets.iter().map(|_| None).collect());
        let next = AtomicUsize::new(0);
        let workers = self.worker_count(targets.len());

        log::info!(
            "installing {} for {} target(s) with {workers} worker(s)",
            component.name(),
            targets.len()
        );

        let (slots_ref, next_ref) = (&slots, &next);
        thread::scope(|scope| {
            let handles: Vec<_> = (0..workers)
                .map(move |_| {
                    scope.spawn(move || {
                        let (slots, next) = (slots_ref, next_ref);
                        loop {
                            let idx = next.fetch_add(1, Ordering::SeqCst);
                            let Some(&target) = targets.get(idx) else {
                                break;
                            };

                            let outcome = match self.install_target(component, target) {
                                Ok((path, sha256)) => TargetOutcome::Installed { path, sha256 },
                                Err(err) => {
                                    log::warn!("{} for {target} failed: {err}", component.name());
                                    TargetOutcome::Failed(err)
                                }
                            };
                            let mut guard = slots.lock().unwrap_or_else(PoisonError::into_inner);
                            guard[idx] = Some(outcome);
                        }
                    })
                })
                .collect();

            for handle in handles {
                if handle.join().is_err() {
                    log::warn!("an installer worker for {} panicked", component.name());
                }
            }
        });

        let claimed = next.load(Ordering::SeqCst).min(targets.len());
        let slots = slots.into_inner().unwrap_or_else(PoisonError::into_inner);
        let outcomes = targets
            .iter()
            .zip(slots)
            .enumerate()
            .map(|(idx, (&target, slot))| {
                let outcome = match slot {
                    Some(outcome) => outcome,
                    // Claimed but never reported: the worker panicked.
                    None if idx < claimed => TargetOutcome::Failed(ReleaseError::WorkerPanicked {
                        target: target.to_string(),
                    }),
                    None => TargetOutcome::Skipped,
                };
                (target, outcome)
            })
            .collect();

        InstallReport {
            component: component.name().to_owned(),
            outcomes,
        }
    }

    fn install_target(
        &self,
        component: &BinaryComponent,
        target: TargetTriple,
    ) -> Result<(PathBuf, String)> {
        let archive = self
            .artifacts_root
            .join(target.as_str())
            .join(component.archive_name(target));
        if !archive.is_file() {
            return Err(ReleaseError::ArtifactNotFound {
                target: target.to_string(),
                path: archive,
            });
        }

        let dest = component.vendor_path(&self.vendor_root, target);
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent)?;
        }
        remove_existing(&dest)?;

        let descriptor = ArchiveDescriptor::new(
            archive,
            component.archive_format(),
            component.archive_member(target),
        );
        self.extractor
            .extract(&descriptor, &dest, ExecutableBit::for_target(target))?;

        let sha256 = compute_sha256(&dest)?;
        log::debug!("installed {} ({sha256})", dest.display());
        Ok((dest, sha256))
    }
}

fn remove_existing(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(err) if err.kind() != io::ErrorKind::NotFound => Err(err),
        _ => Ok(()),
    }
}

#[cfg(test)]
#[path = "install_tests.rs"]
mod tests;
