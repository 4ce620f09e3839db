//! Shared test utilities for the release crate.
//!
//! Available to unit tests and, through the `test-support` feature, to the
//! behaviour tests under `tests/`.

use crate::error::{ReleaseError, Result};
use crate::exec::CommandExecutor;
use std::cell::RefCell;
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Output};
use std::sync::Mutex;

/// Creates an `ExitStatus` from an exit code (Unix implementation).
#[cfg(unix)]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::unix::process::ExitStatusExt;

    ExitStatus::from_raw(code << 8)
}

/// Creates an `ExitStatus` from an exit code (Windows implementation).
#[cfg(windows)]
pub fn exit_status(code: i32) -> ExitStatus {
    use std::os::windows::process::ExitStatusExt;

    ExitStatus::from_raw(code as u32)
}

/// Creates a successful command `Output` with empty stdout and stderr.
pub fn success_output() -> Output {
    Output {
        status: exit_status(0),
        stdout: Vec::new(),
        stderr: Vec::new(),
    }
}

/// Creates a failed command `Output` with the given stderr message.
pub fn failure_output(stderr: &str) -> Output {
    Output {
        status: exit_status(1),
        stdout: Vec::new(),
        stderr: stderr.as_bytes().to_vec(),
    }
}

/// Represents an expected command invocation for testing.
#[derive(Debug)]
pub struct ExpectedCall {
    /// The command to execute (e.g., "gh").
    pub cmd: &'static str,
    /// The arguments to pass to the command.
    pub args: Vec<&'static str>,
    /// The result to return when this command is invoked.
    pub result: Result<Output>,
}

/// A stub implementation of `CommandExecutor` for testing.
///
/// Returns predefined results in order and records the working directory
/// of every invocation. Unexpected or mismatched calls surface as
/// [`ReleaseError::StubMismatch`].
#[derive(Debug)]
pub struct StubExecutor {
    expected: RefCell<VecDeque<ExpectedCall>>,
    cwds: RefCell<Vec<Option<PathBuf>>>,
}

impl StubExecutor {
    /// Creates a new `StubExecutor` with the given expected calls.
    pub fn new(expected: Vec<ExpectedCall>) -> Self {
        Self {
            expected: RefCell::new(expected.into()),
            cwds: RefCell::new(Vec::new()),
        }
    }

    /// Working directories passed to each invocation so far.
    pub fn cwds(&self) -> Vec<Option<PathBuf>> {
        self.cwds.borrow().clone()
    }

    /// Asserts that all expected command invocations have been consumed.
    ///
    /// # Panics
    ///
    /// Panics if there are remaining expected calls that were not invoked.
    pub fn assert_finished(&self) {
        assert!(
            self.expected.borrow().is_empty(),
            "expected no further command invocations"
        );
    }
}

impl CommandExecutor for StubExecutor {
    fn run(&self, cmd: &str, args: &[&str], cwd: Option<&Path>) -> Result<Output> {
        self.cwds.borrow_mut().push(cwd.map(Path::to_path_buf));
        let call = self
            .expected
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| ReleaseError::StubMismatch {
                message: format!("unexpected command invocation: {cmd} {args:?}"),
            })?;

        if call.cmd != cmd || call.args.as_slice() != args {
            return Err(ReleaseError::StubMismatch {
                message: format!(
                    "expected {} {:?}, got {cmd} {args:?}",
                    call.cmd, call.args
                ),
            });
        }

        call.result
    }
}

/// What a [`RecordingPacker`] does when invoked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PackBehaviour {
    /// Write `<name>-<version>.tgz` into the working directory.
    Tarball,
    /// Exit successfully without writing anything.
    NoOutput,
    /// Exit with status 1 and the given stderr.
    Fail(String),
}

/// One invocation observed by a [`RecordingPacker`].
#[derive(Debug, Clone)]
pub struct PackInvocation {
    /// Program that was run.
    pub cmd: String,
    /// Arguments passed to the program.
    pub args: Vec<String>,
    /// Working directory of the invocation.
    pub cwd: PathBuf,
    /// Files present in the working directory, relative and sorted.
    pub files: Vec<String>,
    /// Contents of `package.json` at invocation time, if present.
    pub manifest: Option<String>,
}

/// A fake packaging tool that behaves like `npm pack` on a staging
/// directory: it reads `package.json` and writes a gzip tarball with the
/// directory's contents under `package/`.
#[derive(Debug)]
pub struct RecordingPacker {
    behaviour: PackBehaviour,
    invocations: Mutex<Vec<PackInvocation>>,
}

impl RecordingPacker {
    /// Creates a packer with the given behaviour.
    pub fn new(behaviour: PackBehaviour) -> Self {
        Self {
            behaviour,
            invocations: Mutex::new(Vec::new()),
        }
    }

    /// Creates a packer that writes tarballs.
    pub fn producing_tarballs() -> Self {
        Self::new(PackBehaviour::Tarball)
    }

    /// Invocations recorded so far.
    ///
    /// # Panics
    ///
    /// Panics if the recording mutex was poisoned.
    pub fn invocations(&self) -> Vec<PackInvocation> {
        self.invocations
            .lock()
            .expect("packer mutex poisoned")
            .clone()
    }

    fn record(&self, invocation: PackInvocation) {
        self.invocations
            .lock()
            .expect("packer mutex poisoned")
            .push(invocation);
    }
}

impl CommandExecutor for RecordingPacker {
    fn run(&self, cmd: &str, args: &[&str], cwd: Option<&Path>) -> Result<Output> {
        let cwd = cwd.ok_or_else(|| ReleaseError::StubMismatch {
            message: "packer invoked without a working directory".to_owned(),
        })?;
        let manifest = fs::read_to_string(cwd.join("package.json")).ok();
        self.record(PackInvocation {
            cmd: cmd.to_owned(),
            args: args.iter().map(|arg| (*arg).to_owned()).collect(),
            cwd: cwd.to_path_buf(),
            files: list_files(cwd)?,
            manifest: manifest.clone(),
        });

        match &self.behaviour {
            PackBehaviour::Fail(stderr) => Ok(failure_output(stderr)),
            PackBehaviour::NoOutput => Ok(success_output()),
            PackBehaviour::Tarball => {
                let manifest = manifest.ok_or_else(|| ReleaseError::StubMismatch {
                    message: format!("no package.json in {}", cwd.display()),
                })?;
                write_tarball(cwd, &manifest)?;
                let mut output = success_output();
                output.stdout = tarball_name(&manifest)?.into_bytes();
                Ok(output)
            }
        }
    }
}

fn tarball_name(manifest: &str) -> Result<String> {
    let value: serde_json::Value = serde_json::from_str(manifest)?;
    let field = |key: &str| {
        value
            .get(key)
            .and_then(serde_json::Value::as_str)
            .map(str::to_owned)
            .ok_or_else(|| ReleaseError::StubMismatch {
                message: format!("package.json has no string {key}"),
            })
    };
    Ok(format!("{}-{}.tgz", field("name")?, field("version")?))
}

fn write_tarball(dir: &Path, manifest: &str) -> Result<()> {
    let name = tarball_name(manifest)?;
    let encoder = flate2::write::GzEncoder::new(Vec::new(), flate2::Compression::default());
    let mut builder = tar::Builder::new(encoder);
    builder.append_dir_all("package", dir)?;
    let bytes = builder.into_inner()?.finish()?;
    fs::write(dir.join(name), bytes)?;
    Ok(())
}

/// List regular files under `root`, relative to it, sorted, using `/` as
/// the separator.
///
/// # Errors
///
/// Returns an I/O error if the tree cannot be read.
pub fn list_files(root: &Path) -> Result<Vec<String>> {
    let mut files = Vec::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.is_dir() {
                pending.push(path);
            } else if let Ok(relative) = path.strip_prefix(root) {
                let parts: Vec<_> = relative
                    .components()
                    .map(|part| part.as_os_str().to_string_lossy().into_owned())
                    .collect();
                files.push(parts.join("/"));
            }
        }
    }
    files.sort();
    Ok(files)
}

/// Write `payload` as a zstd stream at `path`, creating parent directories.
///
/// # Errors
///
/// Returns an I/O error if the archive cannot be written.
pub fn write_zst_archive(path: &Path, payload: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let compressed = zstd::encode_all(payload, 0)?;
    fs::write(path, compressed)?;
    Ok(())
}

/// Read one file out of a gzip tarball written by [`RecordingPacker`].
///
/// # Errors
///
/// Returns an I/O error if the tarball cannot be read, or `StubMismatch`
/// when the entry is absent.
pub fn read_tarball_entry(tarball: &Path, entry_path: &str) -> Result<Vec<u8>> {
    use std::io::Read as _;

    let decoder = flate2::read::GzDecoder::new(fs::File::open(tarball)?);
    let mut archive = tar::Archive::new(decoder);
    for entry in archive.entries()? {
        let mut entry = entry?;
        if entry.path()?.as_ref() == Path::new(entry_path) {
            let mut bytes = Vec::new();
            entry.read_to_end(&mut bytes)?;
            return Ok(bytes);
        }
    }
    Err(ReleaseError::StubMismatch {
        message: format!("{entry_path} not found in {}", tarball.display()),
    })
}
