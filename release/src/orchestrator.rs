//! Install and package pipelines.
//!
//! The install pipeline downloads a workflow's artifacts (or reads a
//! pre-downloaded tree) and installs the selected components into
//! `<root>/vendor`. The package pipeline packs one npm tarball per platform
//! package from a vendor tree. Install stops after the first failing
//! component, packaging after the first failing package; both report a
//! [`RunSummary`].

use crate::archive::ArchiveExtractor;
use crate::config::ReleaseConfig;
use crate::error::{ReleaseError, Result};
use crate::exec::CommandExecutor;
use crate::fetch::{ArtifactFetcher, WorkflowRun};
use crate::install::ConcurrentInstaller;
use crate::manifest::BaseMetadata;
use crate::matrix::Registry;
use crate::output::{
    Progress, RunSummary, install_success_message, package_success_message, staged_message,
};
use crate::stage::PackageStager;
use std::fs;
use std::num::NonZeroUsize;
use std::path::PathBuf;

/// Directory name of the vendor tree under the install root.
pub const VENDOR_DIR_NAME: &str = "vendor";

/// Prefix of the temporary directory workflow artifacts are downloaded to.
pub const ARTIFACTS_PREFIX: &str = "beacon-native-artifacts-";

/// Where the install pipeline reads artifact bundles from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArtifactSource {
    /// Download the bundles of a workflow run.
    Workflow(WorkflowRun),
    /// Read bundles already laid out as `<dir>/<target>/<archive>`.
    Directory(PathBuf),
}

impl ArtifactSource {
    /// Build a source from the mutually exclusive CLI options.
    ///
    /// # Errors
    ///
    /// Returns [`ReleaseError::Configuration`] when neither option is given
    /// or the workflow reference has no run id.
    pub fn from_options(workflow_url: Option<&str>, artifacts_dir: Option<PathBuf>) -> Result<Self> {
        match (workflow_url, artifacts_dir) {
            (Some(reference), None) => Ok(Self::Workflow(WorkflowRun::parse(reference)?)),
            (None, Some(dir)) => Ok(Self::Directory(dir)),
            (Some(_), Some(_)) => Err(ReleaseError::Configuration {
                reason: "--workflow-url and --artifacts-dir are mutually exclusive".to_owned(),
            }),
            (None, None) => Err(ReleaseError::Configuration {
                reason: "missing --workflow-url (a GitHub Actions run URL that contains the \
                         build artifacts) or --artifacts-dir"
                    .to_owned(),
            }),
        }
    }
}

/// Inputs of one install run.
#[derive(Debug, Clone)]
pub struct InstallRequest {
    /// Package root; binaries land in `<root>/vendor`.
    pub root: PathBuf,
    /// Artifact bundle source.
    pub source: ArtifactSource,
    /// Requested component names; empty selects the default component.
    pub components: Vec<String>,
    /// Optional cap on installer worker threads.
    pub jobs: Option<NonZeroUsize>,
}

/// Collaborators of the install pipeline.
pub struct InstallDeps<'a> {
    /// Downloads workflow artifacts.
    pub fetcher: &'a dyn ArtifactFetcher,
    /// Extracts single binaries from archives.
    pub extractor: &'a dyn ArchiveExtractor,
}

/// Fetch artifacts and install every selected component into the vendor
/// tree.
///
/// # Errors
///
/// Returns [`ReleaseError::UnknownComponent`] before any I/O for unknown
/// names, [`ReleaseError::Configuration`] for a missing artifacts
/// directory, fetch failures, and the first failing target of the first
/// failing component.
pub fn run_install(
    registry: &Registry,
    request: &InstallRequest,
    deps: &InstallDeps<'_>,
    progress: &mut Progress<'_>,
) -> Result<RunSummary> {
    let components = registry.components().resolve(request.components.as_slice())?;
    if let ArtifactSource::Directory(dir) = &request.source {
        if !dir.is_dir() {
            return Err(ReleaseError::Configuration {
                reason: format!("artifacts directory {} does not exist", dir.display()),
            });
        }
    }

    let vendor_root = request.root.join(VENDOR_DIR_NAME);
    fs::create_dir_all(&vendor_root)?;

    let downloaded;
    let artifacts_root = match &request.source {
        ArtifactSource::Workflow(run) => {
            progress.line(format!("Downloading native artifacts from workflow {run}..."));
            downloaded = tempfile::Builder::new()
                .prefix(ARTIFACTS_PREFIX)
                .tempdir()?;
            deps.fetcher.fetch(run, downloaded.path())?;
            downloaded.path().to_path_buf()
        }
        ArtifactSource::Directory(dir) => dir.clone(),
    };

    let installer = ConcurrentInstaller::new(&artifacts_root, &vendor_root, deps.extractor)
        .with_jobs(request.jobs);
    let mut summary = RunSummary::default();

    for (position, component) in components.iter().enumerate() {
        let targets = component.targets(registry.matrix());
        let names: Vec<_> = targets.iter().map(|target| target.as_str()).collect();
        progress.line(format!(
            "Installing {} binaries for targets: {}",
            component.binary_basename(),
            names.join(", ")
        ));

        let report = installer.install(component, &targets);
        summary = summary.merge(RunSummary {
            succeeded: report.installed(),
            failed: report.failed(),
            skipped: report.skipped(),
        });

        match report.into_result() {
            Ok(paths) => {
                for path in paths {
                    progress.line(format!("  installed {}", path.display()));
                }
            }
            Err(err) => {
                summary.skipped += components[position + 1..]
                    .iter()
                    .map(|rest| rest.targets(registry.matrix()).len())
                    .sum::<usize>();
                progress.always(format!("Install incomplete: {summary}"));
                return Err(err);
            }
        }
    }

    progress.line(install_success_message(&vendor_root));
    Ok(summary)
}

/// Inputs of one package run.
#[derive(Debug, Clone)]
pub struct PackageRequest {
    /// Version written into every manifest.
    pub version: String,
    /// Vendor tree the binaries are read from.
    pub vendor_src: PathBuf,
    /// Directory the tarballs are moved into.
    pub output_dir: PathBuf,
    /// Keep staging directories for inspection.
    pub keep_staging_dirs: bool,
    /// Directory of the parent package's `package.json`.
    pub cli_root: PathBuf,
    /// Repository root holding `LICENSE`.
    pub repo_root: PathBuf,
}

/// Stage and pack every platform package, in order.
///
/// # Errors
///
/// Returns [`ReleaseError::Metadata`] for an unreadable parent
/// `package.json`, and the first staging failure.
pub fn run_package(
    registry: &Registry,
    config: &ReleaseConfig,
    request: &PackageRequest,
    executor: &dyn CommandExecutor,
    progress: &mut Progress<'_>,
) -> Result<RunSummary> {
    let metadata_path = request.cli_root.join("package.json");
    let base = if metadata_path.is_file() {
        BaseMetadata::load(&metadata_path, config)?
    } else {
        log::warn!(
            "{} not found; using default package metadata",
            metadata_path.display()
        );
        BaseMetadata::fallback(config)
    };

    let stager = PackageStager::new(
        executor,
        config,
        registry.package_component(),
        base,
        Some(request.repo_root.join("LICENSE")),
    );

    let packages = registry.packages();
    let mut summary = RunSummary::default();
    for (position, package) in packages.iter().enumerate() {
        let staged = stager.stage_and_pack(
            package,
            &request.version,
            &request.vendor_src,
            &request.output_dir,
            request.keep_staging_dirs,
        );
        match staged {
            Ok(staged) => {
                summary.succeeded += 1;
                progress.line(staged_message(package.package_name(), &staged.tarball));
                if let Some(dir) = staged.retained_staging {
                    progress.line(format!("  kept staging directory {}", dir.display()));
                }
            }
            Err(err) => {
                summary.failed += 1;
                summary.skipped += packages.len() - position - 1;
                progress.always(format!("Packaging incomplete: {summary}"));
                return Err(err);
            }
        }
    }

    progress.line(package_success_message(summary.succeeded, &request.output_dir));
    Ok(summary)
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
