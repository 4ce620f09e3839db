//! Error types for the release pipelines.
//!
//! Archive-level failures live in [`ExtractionError`]; everything that can
//! abort an install or package run is a [`ReleaseError`]. Each variant names
//! the input that failed so the message printed by the CLI is actionable on
//! its own.

use crate::archive::ExtractionError;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can abort an install or package run.
#[derive(Debug, Error)]
pub enum ReleaseError {
    /// Invalid or missing run configuration, detected before any I/O.
    #[error("configuration error: {reason}")]
    Configuration {
        /// Description of the invalid input.
        reason: String,
    },

    /// The target triple is not part of the fixed matrix.
    #[error("unsupported target triple \"{value}\"; expected one of: {expected}")]
    UnsupportedTarget {
        /// The rejected triple string.
        value: String,
        /// Comma-separated list of accepted triples.
        expected: String,
    },

    /// A requested component name is not in the registry.
    #[error("unknown component \"{name}\"; expected one of: {expected}")]
    UnknownComponent {
        /// The rejected component name.
        name: String,
        /// Comma-separated list of registered components.
        expected: String,
    },

    /// The expected archive for a target is missing from the artifacts tree.
    #[error("expected artifact not found for {target}: {path}")]
    ArtifactNotFound {
        /// Target triple whose archive is missing.
        target: String,
        /// Path where the archive was expected.
        path: PathBuf,
    },

    /// Extracting a single archive failed.
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    /// The vendor tree has no binary for a platform package.
    #[error("missing binary for {target}: {path}")]
    BinaryNotFound {
        /// Target triple of the package being staged.
        target: String,
        /// Vendor-tree path that was checked.
        path: PathBuf,
    },

    /// An external command exited unsuccessfully.
    #[error("`{command}` failed with {status}: {stderr}")]
    CommandFailed {
        /// The command line that was run.
        command: String,
        /// Exit status description.
        status: String,
        /// Trimmed standard error output.
        stderr: String,
    },

    /// The packaging tool succeeded but left no tarball behind.
    #[error("packaging tool produced no .tgz in {dir}")]
    PackOutputMissing {
        /// Staging directory that was searched.
        dir: PathBuf,
    },

    /// The parent package metadata could not be read.
    #[error("invalid package metadata at {path}: {reason}")]
    Metadata {
        /// Path to the metadata document.
        path: PathBuf,
        /// Description of the parse failure.
        reason: String,
    },

    /// The configuration file could not be parsed.
    #[error("invalid configuration file {path}: {reason}")]
    Config {
        /// Path to the configuration file.
        path: PathBuf,
        /// Description of the parse failure.
        reason: String,
    },

    /// Serializing the package manifest failed.
    #[error("manifest serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// An I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An installation worker panicked.
    #[error("installation worker panicked while handling {target}")]
    WorkerPanicked {
        /// Target the worker was processing.
        target: String,
    },

    /// Test stub received an unexpected or mismatched command invocation.
    #[cfg(any(test, feature = "test-support"))]
    #[error("stub mismatch: {message}")]
    StubMismatch {
        /// Description of what was expected versus what was received.
        message: String,
    },
}

/// Result type alias using [`ReleaseError`].
pub type Result<T> = std::result::Result<T, ReleaseError>;
