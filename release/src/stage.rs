//! Platform package staging and packing.
//!
//! A platform package is assembled in a private staging directory: the
//! target's binary under `bin/`, a generated `package.json`, the repository
//! license, and a short README. The packaging tool runs inside that
//! directory and the tarball it leaves behind is moved to the output
//! directory. The staging directory is removed on every exit path unless
//! retention was requested.

use crate::config::ReleaseConfig;
use crate::error::{ReleaseError, Result};
use crate::exec::{CommandExecutor, run_checked};
use crate::manifest::{BaseMetadata, PackageManifest, readme_text};
use crate::matrix::component::BinaryComponent;
use crate::matrix::platform::PlatformPackage;
use std::fs::{self, File, FileTimes};
use std::io;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Prefix of every staging directory created under the system temp dir.
pub const STAGING_PREFIX: &str = "beacon-platform-npm-";

/// A packed platform package.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagedPackage {
    /// Tarball in the output directory.
    pub tarball: PathBuf,
    /// Staging directory left on disk, when retention was requested.
    pub retained_staging: Option<PathBuf>,
}

/// Staging directory owned for the duration of one package build.
#[derive(Debug)]
enum StagingDir {
    /// Removed when dropped.
    Ephemeral(TempDir),
    /// Left on disk for inspection.
    Retained(PathBuf),
}

impl StagingDir {
    fn create(retain: bool) -> io::Result<Self> {
        let dir = tempfile::Builder::new().prefix(STAGING_PREFIX).tempdir()?;
        Ok(if retain {
            Self::Retained(dir.keep())
        } else {
            Self::Ephemeral(dir)
        })
    }

    fn path(&self) -> &Path {
        match self {
            Self::Ephemeral(dir) => dir.path(),
            Self::Retained(path) => path,
        }
    }

    fn retained(&self) -> Option<PathBuf> {
        match self {
            Self::Ephemeral(_) => None,
            Self::Retained(path) => Some(path.clone()),
        }
    }
}

/// Stages and packs platform packages from a vendor tree.
pub struct PackageStager<'a> {
    executor: &'a dyn CommandExecutor,
    config: &'a ReleaseConfig,
    component: &'a BinaryComponent,
    base: BaseMetadata,
    license: Option<PathBuf>,
}

impl<'a> PackageStager<'a> {
    /// Create a stager packing `component`'s binary.
    ///
    /// `license` is copied into every package when it points at an
    /// existing file.
    #[must_use]
    pub fn new(
        executor: &'a dyn CommandExecutor,
        config: &'a ReleaseConfig,
        component: &'a BinaryComponent,
        base: BaseMetadata,
        license: Option<PathBuf>,
    ) -> Self {
        Self {
            executor,
            config,
            component,
            base,
            license,
        }
    }

    /// Stage `package` at `version` from `vendor_root` and move the packed
    /// tarball into `output_dir`.
    ///
    /// # Errors
    ///
    /// Returns [`ReleaseError::BinaryNotFound`] before any filesystem
    /// changes when the vendor binary is missing,
    /// [`ReleaseError::CommandFailed`] when the packaging tool fails,
    /// [`ReleaseError::PackOutputMissing`] when it writes no tarball, and
    /// I/O errors from staging or moving files.
    pub fn stage_and_pack(
        &self,
        package: &PlatformPackage,
        version: &str,
        vendor_root: &Path,
        output_dir: &Path,
        retain_staging: bool,
    ) -> Result<StagedPackage> {
        let target = package.target();
        let binary = self.component.vendor_path(vendor_root, target);
        if !binary.is_file() {
            return Err(ReleaseError::BinaryNotFound {
                target: target.to_string(),
                path: binary,
            });
        }

        let staging = StagingDir::create(retain_staging)?;
        let root = staging.path();
        log::debug!("staging {} in {}", package.package_name(), root.display());

        let binary_name = package.binary_name(self.component.binary_basename());
        let bin_dir = root.join("bin");
        fs::create_dir_all(&bin_dir)?;
        copy_preserving_times(&binary, &bin_dir.join(&binary_name))?;

        let manifest =
            PackageManifest::for_package(package, version, &binary_name, &self.base, self.config);
        fs::write(root.join("package.json"), manifest.to_json_pretty()?)?;

        if let Some(license) = self.license.as_deref().filter(|path| path.is_file()) {
            fs::copy(license, root.join("LICENSE"))?;
        }
        fs::write(
            root.join("README.md"),
            readme_text(
                package.package_name(),
                &self.config.command_name,
                &self.config.parent_package,
            ),
        )?;

        let packager = &self.config.packager;
        let args: Vec<&str> = packager.args.iter().map(String::as_str).collect();
        run_checked(self.executor, &packager.program, &args, Some(root))?;

        let packed = find_tarball(root)?;
        fs::create_dir_all(output_dir)?;
        let file_name = packed
            .file_name()
            .ok_or_else(|| ReleaseError::PackOutputMissing {
                dir: root.to_path_buf(),
            })?;
        let tarball = output_dir.join(file_name);
        move_file(&packed, &tarball)?;

        log::info!("staged {} at {}", package.package_name(), tarball.display());
        Ok(StagedPackage {
            tarball,
            retained_staging: staging.retained(),
        })
    }
}

/// Copy `src` to `dest`, keeping permission bits and access/modification
/// times.
fn copy_preserving_times(src: &Path, dest: &Path) -> io::Result<()> {
    let metadata = fs::metadata(src)?;
    let mut out = File::create(dest)?;
    io::copy(&mut File::open(src)?, &mut out)?;
    out.set_times(
        FileTimes::new()
            .set_accessed(metadata.accessed()?)
            .set_modified(metadata.modified()?),
    )?;
    drop(out);
    fs::set_permissions(dest, metadata.permissions())
}

/// First `*.tgz` in `dir`, by name.
fn find_tarball(dir: &Path) -> Result<PathBuf> {
    let mut tarballs = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.is_file() && path.extension().is_some_and(|ext| ext == "tgz") {
            tarballs.push(path);
        }
    }
    tarballs.sort();
    tarballs
        .into_iter()
        .next()
        .ok_or_else(|| ReleaseError::PackOutputMissing {
            dir: dir.to_path_buf(),
        })
}

/// Move `src` to `dest`, replacing `dest`. Falls back to copy and remove
/// when a rename is not possible, e.g. across filesystems.
fn move_file(src: &Path, dest: &Path) -> io::Result<()> {
    match fs::remove_file(dest) {
        Err(err) if err.kind() != io::ErrorKind::NotFound => return Err(err),
        _ => {}
    }
    if fs::rename(src, dest).is_ok() {
        return Ok(());
    }
    fs::copy(src, dest)?;
    fs::remove_file(src)
}

#[cfg(test)]
#[path = "stage_tests.rs"]
mod tests;
