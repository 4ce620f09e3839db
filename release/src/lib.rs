//! Beacon Code release tooling.
//!
//! This crate installs the prebuilt native binaries produced by a CI run into
//! the local vendor tree and packs them into single-platform npm packages that
//! the parent `@tytsxai/beacon-code` package consumes as optional
//! dependencies. It backs the `beacon-release` CLI binary and can be driven
//! programmatically from tests.
//!
//! # Modules
//!
//! - [`archive`] - Single-file extraction from `.zst`, `.tar.gz`, and `.zip` archives
//! - [`cli`] - Command-line argument definitions
//! - [`config`] - Optional TOML configuration with built-in defaults
//! - [`digest`] - SHA-256 helpers for reporting installed binaries
//! - [`error`] - Semantic error types
//! - [`exec`] - Injectable process execution
//! - [`fetch`] - Workflow artifact retrieval through the `gh` CLI
//! - [`install`] - Concurrent per-target installation into the vendor tree
//! - [`manifest`] - Platform package manifest and base metadata
//! - [`matrix`] - Target matrix, component registry, and platform packages
//! - [`orchestrator`] - Install and package pipelines
//! - [`output`] - Progress reporting on stderr
//! - [`stage`] - Platform package staging and packing

pub mod archive;
pub mod cli;
pub mod config;
pub mod digest;
pub mod error;
pub mod exec;
pub mod fetch;
pub mod install;
pub mod manifest;
pub mod matrix;
pub mod orchestrator;
pub mod output;
pub mod stage;

#[cfg(any(test, feature = "test-support"))]
pub mod test_utils;
