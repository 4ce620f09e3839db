//! Single-file extraction from CI release archives.
//!
//! CI publishes each binary either as a bare zstd stream or inside a
//! `.tar.gz`/`.zip` bundle. Extraction always produces exactly one file:
//! bytes are written to a temporary file beside the destination and renamed
//! into place only once the copy succeeded, so a failed extraction never
//! leaves a partial destination behind. Tar entries are checked for path
//! traversal before they are considered.

use crate::matrix::target::TargetTriple;
use std::fmt;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};
use std::str::FromStr;

/// Archive container formats CI publishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveFormat {
    /// A single file compressed as a zstd stream (`.zst`).
    CompressedStream,
    /// A gzip-compressed tarball (`.tar.gz`) holding the binary as a member.
    TarGz,
    /// A zip archive holding the binary as a member.
    Zip,
}

impl ArchiveFormat {
    /// Filename extension CI uses for this format, without a leading dot.
    #[must_use]
    pub const fn extension(self) -> &'static str {
        match self {
            Self::CompressedStream => "zst",
            Self::TarGz => "tar.gz",
            Self::Zip => "zip",
        }
    }

    /// Whether archives in this format need an inner member path.
    #[must_use]
    pub const fn requires_member(self) -> bool {
        !matches!(self, Self::CompressedStream)
    }
}

impl FromStr for ArchiveFormat {
    type Err = ExtractionError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "zst" | "zstd" => Ok(Self::CompressedStream),
            "tar.gz" | "tgz" => Ok(Self::TarGz),
            "zip" => Ok(Self::Zip),
            other => Err(ExtractionError::UnsupportedArchiveFormat {
                format: other.to_owned(),
            }),
        }
    }
}

impl fmt::Display for ArchiveFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Location and shape of one archive to extract.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveDescriptor {
    path: PathBuf,
    format: ArchiveFormat,
    member: Option<String>,
}

impl ArchiveDescriptor {
    /// Describe an archive. Member requirements are checked at extraction.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>, format: ArchiveFormat, member: Option<String>) -> Self {
        Self {
            path: path.into(),
            format,
            member,
        }
    }

    /// Path to the archive on disk.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Container format.
    #[must_use]
    pub fn format(&self) -> ArchiveFormat {
        self.format
    }

    /// Inner member path, if any.
    #[must_use]
    pub fn member(&self) -> Option<&str> {
        self.member.as_deref()
    }
}

/// Permission treatment applied to the extracted file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutableBit {
    /// Mark the file executable (`0o755` on unix hosts).
    Set,
    /// Leave the file as plain data (`0o644` on unix hosts).
    Leave,
}

impl ExecutableBit {
    /// Windows-family binaries are left alone; everything else is made
    /// executable.
    #[must_use]
    pub fn for_target(target: TargetTriple) -> Self {
        if target.is_windows() {
            Self::Leave
        } else {
            Self::Set
        }
    }
}

/// Errors arising from archive extraction.
#[derive(Debug, thiserror::Error)]
pub enum ExtractionError {
    /// I/O error while reading the archive or writing the destination.
    #[error("extraction I/O error: {0}")]
    Io(#[from] io::Error),

    /// An archive path attempts to escape the archive root.
    #[error("path traversal detected: {path}")]
    PathTraversal {
        /// The offending path.
        path: String,
    },

    /// The requested member does not exist in the archive.
    #[error("entry '{member}' not found in archive {}", .archive.display())]
    ArchiveMemberNotFound {
        /// Archive that was searched.
        archive: PathBuf,
        /// Member that was requested.
        member: String,
    },

    /// A tar or zip archive was described without a member path.
    #[error("missing member path for {format} archive {}", .archive.display())]
    MissingMember {
        /// Archive that needs a member.
        archive: PathBuf,
        /// Format of the archive.
        format: ArchiveFormat,
    },

    /// A compressed-stream archive was described with a member path.
    #[error("compressed-stream archive {} has no members, got '{member}'", .archive.display())]
    UnexpectedMember {
        /// Archive that was described.
        archive: PathBuf,
        /// The member path that was supplied.
        member: String,
    },

    /// The archive format is not one CI publishes.
    #[error("unsupported archive format '{format}'")]
    UnsupportedArchiveFormat {
        /// The rejected format name.
        format: String,
    },

    /// The requested member is a directory, link, or other non-file entry.
    #[error("entry '{member}' is not a regular file")]
    NotARegularFile {
        /// Member that was requested.
        member: String,
    },

    /// The zip container could not be read.
    #[error("zip error: {0}")]
    Zip(#[from] zip::result::ZipError),
}

/// Trait for extracting one file from an archive, enabling test mocking.
///
/// Implementations must be shareable across the installer's worker threads.
#[cfg_attr(test, mockall::automock)]
pub trait ArchiveExtractor: Sync {
    /// Extract the file described by `descriptor` to `destination`,
    /// replacing any existing file there.
    ///
    /// # Errors
    ///
    /// Returns [`ExtractionError::MissingMember`] or
    /// [`ExtractionError::UnexpectedMember`] for malformed descriptors,
    /// [`ExtractionError::ArchiveMemberNotFound`] when the member is absent,
    /// [`ExtractionError::PathTraversal`] for escaping tar entries, and
    /// [`ExtractionError::Io`] on I/O failures.
    fn extract(
        &self,
        descriptor: &ArchiveDescriptor,
        destination: &Path,
        executable: ExecutableBit,
    ) -> Result<(), ExtractionError>;
}

/// Default extractor backed by the `zstd`, `tar`/`flate2`, and `zip` crates.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardExtractor;

impl ArchiveExtractor for StandardExtractor {
    fn extract(
        &self,
        descriptor: &ArchiveDescriptor,
        destination: &Path,
        executable: ExecutableBit,
    ) -> Result<(), ExtractionError> {
        let member = checked_member(descriptor)?;

        let parent = destination
            .parent()
            .filter(|dir| !dir.as_os_str().is_empty())
            .unwrap_or_else(|| Path::new("."));
        fs::create_dir_all(parent)?;

        let mut staged = tempfile::NamedTempFile::new_in(parent)?;
        let out = staged.as_file_mut();
        match (descriptor.format, member) {
            (ArchiveFormat::TarGz, Some(member)) => {
                copy_tar_member(&descriptor.path, member, out)?;
            }
            (ArchiveFormat::Zip, Some(member)) => {
                copy_zip_member(&descriptor.path, member, out)?;
            }
            _ => decompress_stream(&descriptor.path, out)?,
        }
        out.flush()?;

        staged
            .persist(destination)
            .map_err(|err| ExtractionError::Io(err.error))?;
        apply_mode(destination, executable)?;
        Ok(())
    }
}

/// Check the member requirement for the descriptor's format and return
/// the member to look up, if any.
fn checked_member(descriptor: &ArchiveDescriptor) -> Result<Option<&str>, ExtractionError> {
    match (descriptor.format.requires_member(), descriptor.member()) {
        (true, Some(member)) => {
            validate_entry_path(Path::new(member))?;
            Ok(Some(member))
        }
        (true, None) => Err(ExtractionError::MissingMember {
            archive: descriptor.path.clone(),
            format: descriptor.format,
        }),
        (false, Some(member)) => Err(ExtractionError::UnexpectedMember {
            archive: descriptor.path.clone(),
            member: member.to_owned(),
        }),
        (false, None) => Ok(None),
    }
}

fn decompress_stream(archive_path: &Path, out: &mut File) -> Result<(), ExtractionError> {
    let mut decoder = zstd::Decoder::new(File::open(archive_path)?)?;
    io::copy(&mut decoder, out)?;
    Ok(())
}

/// Copy the bytes of one regular-file tar member. Ownership, mode, and
/// timestamps recorded in the archive are ignored.
fn copy_tar_member(archive_path: &Path, member: &str, out: &mut File) -> Result<(), ExtractionError> {
    let wanted = normalise(Path::new(member));
    let decoder = flate2::read::GzDecoder::new(File::open(archive_path)?);
    let mut archive = tar::Archive::new(decoder);

    for entry_result in archive.entries()? {
        let mut entry = entry_result?;
        let entry_path = entry.path()?.into_owned();
        validate_entry_path(&entry_path)?;

        if normalise(&entry_path) != wanted {
            continue;
        }
        if !entry.header().entry_type().is_file() {
            return Err(ExtractionError::NotARegularFile {
                member: member.to_owned(),
            });
        }
        io::copy(&mut entry, out)?;
        return Ok(());
    }

    Err(ExtractionError::ArchiveMemberNotFound {
        archive: archive_path.to_path_buf(),
        member: member.to_owned(),
    })
}

fn copy_zip_member(archive_path: &Path, member: &str, out: &mut File) -> Result<(), ExtractionError> {
    let mut archive = zip::ZipArchive::new(File::open(archive_path)?)?;
    let mut entry = match archive.by_name(member) {
        Ok(entry) => entry,
        Err(zip::result::ZipError::FileNotFound) => {
            return Err(ExtractionError::ArchiveMemberNotFound {
                archive: archive_path.to_path_buf(),
                member: member.to_owned(),
            });
        }
        Err(other) => return Err(other.into()),
    };
    if entry.is_dir() {
        return Err(ExtractionError::NotARegularFile {
            member: member.to_owned(),
        });
    }
    io::copy(&mut entry, out)?;
    Ok(())
}

/// Validate that an archive path does not escape the archive root via
/// `..` components or absolute paths.
fn validate_entry_path(path: &Path) -> Result<(), ExtractionError> {
    let escapes = path.is_absolute()
        || path
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_)));
    if escapes {
        return Err(ExtractionError::PathTraversal {
            path: path.display().to_string(),
        });
    }
    Ok(())
}

/// Drop `.` components so `./code` and `code` name the same member.
fn normalise(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

#[cfg(unix)]
fn apply_mode(path: &Path, executable: ExecutableBit) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;

    let mode = match executable {
        ExecutableBit::Set => 0o755,
        ExecutableBit::Leave => 0o644,
    };
    fs::set_permissions(path, fs::Permissions::from_mode(mode))
}

#[cfg(not(unix))]
fn apply_mode(_path: &Path, _executable: ExecutableBit) -> io::Result<()> {
    Ok(())
}

#[cfg(test)]
#[path = "archive_tests.rs"]
mod tests;
