//! Binary components published by the CI workflow.
//!
//! A component names the artifact prefix CI uses, the directory it occupies
//! under each vendor target, and the executable name inside that directory.

use super::target::{TargetMatrix, TargetTriple};
use crate::archive::ArchiveFormat;
use crate::error::{ReleaseError, Result};
use std::path::{Path, PathBuf};

/// A binary installed into the vendor tree for each target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BinaryComponent {
    name: &'static str,
    artifact_prefix: &'static str,
    dest_subdir: &'static str,
    binary_basename: &'static str,
    archive_format: ArchiveFormat,
    targets: Option<Vec<TargetTriple>>,
}

impl BinaryComponent {
    /// Create a component published as a compressed-stream artifact for
    /// every target.
    ///
    /// # Errors
    ///
    /// Returns [`ReleaseError::Configuration`] if `binary_basename` is empty.
    pub fn new(
        name: &'static str,
        artifact_prefix: &'static str,
        dest_subdir: &'static str,
        binary_basename: &'static str,
    ) -> Result<Self> {
        if binary_basename.is_empty() {
            return Err(ReleaseError::Configuration {
                reason: format!("component {name} has an empty binary name"),
            });
        }
        Ok(Self {
            name,
            artifact_prefix,
            dest_subdir,
            binary_basename,
            archive_format: ArchiveFormat::CompressedStream,
            targets: None,
        })
    }

    /// Use `format` for this component's artifacts.
    ///
    /// Tar and zip artifacts carry the binary at the archive root under its
    /// platform filename.
    #[must_use]
    pub fn with_archive_format(mut self, format: ArchiveFormat) -> Self {
        self.archive_format = format;
        self
    }

    /// Limit installation to `subset`.
    ///
    /// # Errors
    ///
    /// Returns [`ReleaseError::Configuration`] if any target is outside
    /// `matrix`.
    pub fn with_targets(mut self, subset: Vec<TargetTriple>, matrix: &TargetMatrix) -> Result<Self> {
        if let Some(stray) = subset.iter().find(|target| !matrix.contains(**target)) {
            return Err(ReleaseError::Configuration {
                reason: format!("component {} lists {stray} outside the target matrix", self.name),
            });
        }
        self.targets = Some(subset);
        Ok(self)
    }

    /// Registry key used on the command line.
    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Directory under `vendor/<target>/` holding the binary.
    #[must_use]
    pub fn dest_subdir(&self) -> &'static str {
        self.dest_subdir
    }

    /// Executable name before any platform suffix.
    #[must_use]
    pub fn binary_basename(&self) -> &'static str {
        self.binary_basename
    }

    /// Archive format CI publishes this component in.
    #[must_use]
    pub fn archive_format(&self) -> ArchiveFormat {
        self.archive_format
    }

    /// Targets this component installs for, in matrix order unless a
    /// subset was configured.
    #[must_use]
    pub fn targets(&self, matrix: &TargetMatrix) -> Vec<TargetTriple> {
        self.targets
            .clone()
            .unwrap_or_else(|| matrix.targets().to_vec())
    }

    /// Archive filename CI produces for `target`:
    /// `<prefix>-<target>[.exe].<ext>`.
    #[must_use]
    pub fn archive_name(&self, target: TargetTriple) -> String {
        format!(
            "{}-{target}{}.{}",
            self.artifact_prefix,
            target.executable_suffix(),
            self.archive_format.extension()
        )
    }

    /// Inner member path for tar and zip artifacts; `None` for
    /// compressed-stream artifacts.
    #[must_use]
    pub fn archive_member(&self, target: TargetTriple) -> Option<String> {
        match self.archive_format {
            ArchiveFormat::CompressedStream => None,
            ArchiveFormat::TarGz | ArchiveFormat::Zip => Some(self.binary_filename(target)),
        }
    }

    /// Binary filename inside the vendor tree: `<basename>[.exe]`.
    #[must_use]
    pub fn binary_filename(&self, target: TargetTriple) -> String {
        target.executable_name(self.binary_basename)
    }

    /// Vendor-tree path: `<vendor>/<target>/<dest_subdir>/<basename>[.exe]`.
    #[must_use]
    pub fn vendor_path(&self, vendor_root: &Path, target: TargetTriple) -> PathBuf {
        vendor_root
            .join(target.as_str())
            .join(self.dest_subdir)
            .join(self.binary_filename(target))
    }
}

/// The immutable set of components the install pipeline knows about.
#[derive(Debug, Clone)]
pub struct ComponentRegistry {
    components: Vec<BinaryComponent>,
}

/// Component installed when none is requested explicitly.
pub const DEFAULT_COMPONENT: &str = "code";

impl ComponentRegistry {
    /// Build a registry from explicit components.
    #[must_use]
    pub fn new(components: Vec<BinaryComponent>) -> Self {
        Self { components }
    }

    /// Build the registry of components CI publishes.
    ///
    /// # Errors
    ///
    /// Propagates [`BinaryComponent::new`] validation failures.
    pub fn standard() -> Result<Self> {
        Ok(Self::new(vec![
            BinaryComponent::new("code", "code", "code", "code")?,
            BinaryComponent::new(
                "code-responses-api-proxy",
                "code-responses-api-proxy",
                "code-responses-api-proxy",
                "code-responses-api-proxy",
            )?,
        ]))
    }

    /// Look up a component by name.
    ///
    /// # Errors
    ///
    /// Returns [`ReleaseError::UnknownComponent`] for unregistered names.
    pub fn get(&self, name: &str) -> Result<&BinaryComponent> {
        self.components
            .iter()
            .find(|component| component.name == name)
            .ok_or_else(|| ReleaseError::UnknownComponent {
                name: name.to_owned(),
                expected: self.names().join(", "),
            })
    }

    /// Resolve requested names, falling back to [`DEFAULT_COMPONENT`] when
    /// the list is empty. Duplicates are dropped, first occurrence wins.
    ///
    /// # Errors
    ///
    /// Returns [`ReleaseError::UnknownComponent`] for the first unknown name.
    pub fn resolve<S: AsRef<str>>(&self, names: &[S]) -> Result<Vec<&BinaryComponent>> {
        if names.is_empty() {
            return Ok(vec![self.get(DEFAULT_COMPONENT)?]);
        }
        let mut resolved: Vec<&BinaryComponent> = Vec::new();
        for name in names {
            let component = self.get(name.as_ref())?;
            if !resolved.iter().any(|seen| seen.name == component.name) {
                resolved.push(component);
            }
        }
        Ok(resolved)
    }

    /// Registered component names.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.components.iter().map(|component| component.name).collect()
    }
}
