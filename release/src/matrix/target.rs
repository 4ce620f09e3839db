//! Target triple validation and platform naming.
//!
//! Only the six triples the CI workflow builds are accepted. Every triple is
//! paired with the npm `os`/`cpu` values its platform package declares, so
//! the two can never drift apart.

use crate::error::{ReleaseError, Result};
use std::fmt;

/// Operating system value used in npm `os` constraints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PackageOs {
    /// `linux`
    Linux,
    /// `darwin`
    Darwin,
    /// `win32`
    Win32,
}

impl PackageOs {
    /// Return the npm spelling of this operating system.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Linux => "linux",
            Self::Darwin => "darwin",
            Self::Win32 => "win32",
        }
    }
}

impl fmt::Display for PackageOs {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// CPU value used in npm `cpu` constraints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PackageCpu {
    /// `x64`
    X64,
    /// `arm64`
    Arm64,
}

impl PackageCpu {
    /// Return the npm spelling of this CPU.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::X64 => "x64",
            Self::Arm64 => "arm64",
        }
    }
}

impl fmt::Display for PackageCpu {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One row of the target matrix.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
struct TargetSpec {
    triple: &'static str,
    os: PackageOs,
    cpu: PackageCpu,
}

const SUPPORTED_TARGETS: &[TargetSpec] = &[
    TargetSpec {
        triple: "x86_64-unknown-linux-musl",
        os: PackageOs::Linux,
        cpu: PackageCpu::X64,
    },
    TargetSpec {
        triple: "aarch64-unknown-linux-musl",
        os: PackageOs::Linux,
        cpu: PackageCpu::Arm64,
    },
    TargetSpec {
        triple: "x86_64-apple-darwin",
        os: PackageOs::Darwin,
        cpu: PackageCpu::X64,
    },
    TargetSpec {
        triple: "aarch64-apple-darwin",
        os: PackageOs::Darwin,
        cpu: PackageCpu::Arm64,
    },
    TargetSpec {
        triple: "x86_64-pc-windows-msvc",
        os: PackageOs::Win32,
        cpu: PackageCpu::X64,
    },
    TargetSpec {
        triple: "aarch64-pc-windows-msvc",
        os: PackageOs::Win32,
        cpu: PackageCpu::Arm64,
    },
];

/// A validated target triple from the supported matrix.
///
/// Construction via [`TryFrom`] rejects any triple outside the matrix.
///
/// # Examples
///
/// ```
/// use beacon_release::matrix::target::TargetTriple;
///
/// let triple = TargetTriple::try_from("x86_64-pc-windows-msvc").expect("valid triple");
/// assert!(triple.is_windows());
/// assert_eq!(triple.executable_suffix(), ".exe");
/// assert_eq!(triple.os().as_str(), "win32");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TargetTriple(&'static TargetSpec);

impl TargetTriple {
    /// Return the triple as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        self.0.triple
    }

    /// Return the npm operating system paired with this triple.
    #[must_use]
    pub fn os(&self) -> PackageOs {
        self.0.os
    }

    /// Return the npm CPU paired with this triple.
    #[must_use]
    pub fn cpu(&self) -> PackageCpu {
        self.0.cpu
    }

    /// Whether this triple belongs to the windows family.
    #[must_use]
    pub fn is_windows(&self) -> bool {
        self.0.os == PackageOs::Win32
    }

    /// Return the executable suffix for binaries built for this triple.
    #[must_use]
    pub fn executable_suffix(&self) -> &'static str {
        if self.is_windows() { ".exe" } else { "" }
    }

    /// Append the executable suffix to `stem`.
    #[must_use]
    pub fn executable_name(&self, stem: &str) -> String {
        format!("{stem}{}", self.executable_suffix())
    }

    /// Return every supported triple in matrix order.
    pub fn all() -> impl Iterator<Item = Self> {
        SUPPORTED_TARGETS.iter().map(Self)
    }

    fn expected() -> String {
        SUPPORTED_TARGETS
            .iter()
            .map(|spec| spec.triple)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl TryFrom<&str> for TargetTriple {
    type Error = ReleaseError;

    fn try_from(value: &str) -> Result<Self> {
        SUPPORTED_TARGETS
            .iter()
            .find(|spec| spec.triple == value)
            .map(Self)
            .ok_or_else(|| ReleaseError::UnsupportedTarget {
                value: value.to_owned(),
                expected: Self::expected(),
            })
    }
}

impl AsRef<str> for TargetTriple {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for TargetTriple {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The immutable set of targets the pipelines operate on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TargetMatrix {
    targets: Vec<TargetTriple>,
}

impl TargetMatrix {
    /// Build the matrix of every supported triple.
    #[must_use]
    pub fn standard() -> Self {
        Self {
            targets: TargetTriple::all().collect(),
        }
    }

    /// Build a matrix restricted to `targets`.
    #[must_use]
    pub fn from_targets(targets: Vec<TargetTriple>) -> Self {
        Self { targets }
    }

    /// Return the targets in matrix order.
    #[must_use]
    pub fn targets(&self) -> &[TargetTriple] {
        &self.targets
    }

    /// Whether `target` is part of this matrix.
    #[must_use]
    pub fn contains(&self, target: TargetTriple) -> bool {
        self.targets.contains(&target)
    }
}
