//! CLI argument definitions for the Beacon Code release tooling.
//!
//! This module defines the command-line interface using clap. Relative paths
//! are resolved against the working directory here so the pipelines only
//! ever see absolute paths.

use crate::error::Result;
use crate::orchestrator::{ArtifactSource, InstallRequest, PackageRequest};
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Parser, Subcommand};
use std::num::NonZeroUsize;

/// Install prebuilt Beacon Code binaries and pack platform npm packages.
#[derive(Parser, Debug)]
#[command(name = "beacon-release")]
#[command(version, about)]
#[command(after_help = concat!(
    "EXAMPLES:\n",
    "  Install the CLI binary from a workflow run:\n",
    "    $ beacon-release install --workflow-url https://github.com/tytsxai/beacon-code/actions/runs/123\n\n",
    "  Install every component from a downloaded artifacts tree:\n",
    "    $ beacon-release install --artifacts-dir ./artifacts --component code --component code-responses-api-proxy\n\n",
    "  Pack the platform packages:\n",
    "    $ beacon-release package --release-version 0.6.12 --vendor-src beacon-cli/vendor",
))]
pub struct Cli {
    /// Subcommand to execute.
    #[command(subcommand)]
    pub command: Command,

    /// TOML configuration file overriding the built-in defaults.
    #[arg(long, value_name = "FILE", global = true)]
    pub config: Option<Utf8PathBuf>,

    /// Increase log verbosity (repeatable: -v, -vv).
    #[arg(
        short,
        long = "verbose",
        action = clap::ArgAction::Count,
        global = true,
        conflicts_with = "quiet"
    )]
    pub verbosity: u8,

    /// Suppress progress output (errors still shown).
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

/// Available subcommands.
#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Download workflow artifacts and install them into the vendor tree.
    Install(InstallArgs),

    /// Stage and pack the platform npm packages from a vendor tree.
    Package(PackageArgs),
}

/// Arguments for the install command.
#[derive(Parser, Debug, Clone, Default)]
pub struct InstallArgs {
    /// GitHub Actions run URL (or bare run id) that produced the artifacts.
    #[arg(long, value_name = "URL", conflicts_with = "artifacts_dir")]
    pub workflow_url: Option<String>,

    /// Use an already downloaded artifacts tree instead of a workflow run.
    #[arg(long, value_name = "DIR")]
    pub artifacts_dir: Option<Utf8PathBuf>,

    /// Limit installation to the named component (repeatable) [default: code].
    #[arg(long = "component", value_name = "NAME")]
    pub components: Vec<String>,

    /// Maximum number of parallel extraction workers.
    #[arg(short, long, value_name = "N")]
    pub jobs: Option<NonZeroUsize>,

    /// Package root containing `package.json`; binaries go to `<ROOT>/vendor`
    /// [default: current directory].
    #[arg(value_name = "ROOT")]
    pub root: Option<Utf8PathBuf>,
}

impl InstallArgs {
    /// Build the install request, resolving relative paths against `cwd`.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::ReleaseError::Configuration`] when no
    /// artifact source was given or the workflow reference is invalid.
    pub fn to_request(&self, cwd: &Utf8Path) -> Result<InstallRequest> {
        let source = ArtifactSource::from_options(
            self.workflow_url.as_deref(),
            self.artifacts_dir
                .as_deref()
                .map(|dir| absolute(cwd, dir).into_std_path_buf()),
        )?;
        let root = self
            .root
            .as_deref()
            .map_or_else(|| cwd.to_owned(), |root| absolute(cwd, root));
        Ok(InstallRequest {
            root: root.into_std_path_buf(),
            source,
            components: self.components.clone(),
            jobs: self.jobs,
        })
    }
}

/// Arguments for the package command.
#[derive(Parser, Debug, Clone)]
pub struct PackageArgs {
    /// Version to write to every package.json (e.g. 0.6.12).
    #[arg(long, value_name = "VERSION")]
    pub release_version: String,

    /// Vendor directory laid out as `<vendor>/<target>/code/code`.
    #[arg(long, value_name = "DIR")]
    pub vendor_src: Utf8PathBuf,

    /// Directory where npm tarballs are written [default: <REPO_ROOT>/dist/npm].
    #[arg(long, value_name = "DIR")]
    pub output_dir: Option<Utf8PathBuf>,

    /// Retain temporary staging directories instead of deleting them.
    #[arg(long)]
    pub keep_staging_dirs: bool,

    /// Directory of the parent package's package.json [default: current directory].
    #[arg(long, value_name = "DIR")]
    pub cli_root: Option<Utf8PathBuf>,

    /// Repository root holding LICENSE [default: parent of the CLI root].
    #[arg(long, value_name = "DIR")]
    pub repo_root: Option<Utf8PathBuf>,
}

impl PackageArgs {
    /// Build the package request, resolving relative paths against `cwd`.
    #[must_use]
    pub fn to_request(&self, cwd: &Utf8Path) -> PackageRequest {
        let cli_root = self
            .cli_root
            .as_deref()
            .map_or_else(|| cwd.to_owned(), |dir| absolute(cwd, dir));
        let repo_root = self.repo_root.as_deref().map_or_else(
            || cli_root.parent().unwrap_or(cli_root.as_path()).to_owned(),
            |dir| absolute(cwd, dir),
        );
        let output_dir = self.output_dir.as_deref().map_or_else(
            || repo_root.join("dist").join("npm"),
            |dir| absolute(cwd, dir),
        );
        PackageRequest {
            version: self.release_version.clone(),
            vendor_src: absolute(cwd, &self.vendor_src).into_std_path_buf(),
            output_dir: output_dir.into_std_path_buf(),
            keep_staging_dirs: self.keep_staging_dirs,
            cli_root: cli_root.into_std_path_buf(),
            repo_root: repo_root.into_std_path_buf(),
        }
    }
}

fn absolute(cwd: &Utf8Path, path: &Utf8Path) -> Utf8PathBuf {
    if path.is_absolute() {
        path.to_owned()
    } else {
        cwd.join(path)
    }
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
