//! The virtual filesystem seam between the interpreter and the machine image

use async_trait::async_trait;
use std::path::Path;
use std::time::SystemTime;

use crate::error::Result;

/// Async virtual filesystem trait.
///
/// The interpreter only ever sees the emulated machine through this trait;
/// it never touches the host filesystem except for redirect staging copies.
/// Paths passed in are absolute and normalized.
#[async_trait]
pub trait FileSystem: Send + Sync {
    /// Whole contents of a regular file.
    async fn read_file(&self, path: &Path) -> Result<Vec<u8>>;

    /// Replace a file's contents, creating it when missing. Used by `>`.
    async fn write_file(&self, path: &Path, content: &[u8]) -> Result<()>;

    /// Append to a file, creating it when missing. Used by `>>` and by
    /// every write through a redirect sink.
    async fn append_file(&self, path: &Path, content: &[u8]) -> Result<()>;

    /// Create a directory; `recursive` also creates missing parents.
    async fn mkdir(&self, path: &Path, recursive: bool) -> Result<()>;

    /// Type, size and mode of an entry.
    async fn stat(&self, path: &Path) -> Result<Metadata>;

    /// Entries of a directory, sorted by name. Backs globbing and completion.
    async fn read_dir(&self, path: &Path) -> Result<Vec<DirEntry>>;

    async fn exists(&self, path: &Path) -> Result<bool>;
}

/// What `stat` reports about an entry.
#[derive(Debug, Clone)]
pub struct Metadata {
    pub file_type: FileType,
    /// Bytes for files; 4096 for directories like ext4 reports
    pub size: u64,
    /// Permission bits, e.g. `0o755` for the skeleton binaries
    pub mode: u32,
    pub modified: SystemTime,
}

impl Metadata {
    pub(crate) fn directory() -> Self {
        Self {
            file_type: FileType::Directory,
            size: 4096,
            mode: 0o755,
            modified: SystemTime::now(),
        }
    }

    pub(crate) fn file(size: u64) -> Self {
        Self {
            file_type: FileType::File,
            size,
            mode: 0o644,
            modified: SystemTime::now(),
        }
    }
}

/// Kind of entry. The image has no symlinks or devices.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FileType {
    File,
    Directory,
}

impl FileType {
    pub fn is_file(&self) -> bool {
        matches!(self, FileType::File)
    }

    pub fn is_dir(&self) -> bool {
        matches!(self, FileType::Directory)
    }
}

/// One entry returned by [`FileSystem::read_dir`].
#[derive(Debug, Clone)]
pub struct DirEntry {
    /// Final path component
    pub name: String,
    pub metadata: Metadata,
}
