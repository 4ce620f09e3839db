//! Single-platform npm packages built from the vendor tree.

use super::target::{PackageCpu, PackageOs, TargetTriple};
use crate::error::Result;

/// A platform package: one target's binary plus npm metadata.
///
/// The `os`/`cpu` constraints are read from the target's matrix entry
/// rather than stored, so they always match the triple.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformPackage {
    package_name: String,
    target: TargetTriple,
}

impl PlatformPackage {
    /// Create a package for `target`.
    #[must_use]
    pub fn new(package_name: impl Into<String>, target: TargetTriple) -> Self {
        Self {
            package_name: package_name.into(),
            target,
        }
    }

    /// npm package name.
    #[must_use]
    pub fn package_name(&self) -> &str {
        &self.package_name
    }

    /// Target whose binary the package carries.
    #[must_use]
    pub fn target(&self) -> TargetTriple {
        self.target
    }

    /// npm `os` constraint.
    #[must_use]
    pub fn os(&self) -> PackageOs {
        self.target.os()
    }

    /// npm `cpu` constraint.
    #[must_use]
    pub fn cpu(&self) -> PackageCpu {
        self.target.cpu()
    }

    /// Binary filename under the package's `bin/` directory:
    /// `<basename>-<target>[.exe]`.
    #[must_use]
    pub fn binary_name(&self, binary_basename: &str) -> String {
        self.target
            .executable_name(&format!("{binary_basename}-{}", self.target))
    }
}

/// Build the fixed list of platform packages published for each release.
///
/// # Errors
///
/// Returns [`crate::error::ReleaseError::UnsupportedTarget`] if a listed
/// triple is missing from the matrix.
pub fn standard_packages() -> Result<Vec<PlatformPackage>> {
    [
        ("beacon-code-darwin-arm64", "aarch64-apple-darwin"),
        ("beacon-code-darwin-x64", "x86_64-apple-darwin"),
        ("beacon-code-linux-x64", "x86_64-unknown-linux-musl"),
        ("beacon-code-linux-arm64", "aarch64-unknown-linux-musl"),
        ("beacon-code-win32-x64", "x86_64-pc-windows-msvc"),
    ]
    .into_iter()
    .map(|(name, triple)| Ok(PlatformPackage::new(name, TargetTriple::try_from(triple)?)))
    .collect()
}
