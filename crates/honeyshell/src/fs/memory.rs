//! In-memory filesystem implementation

use async_trait::async_trait;
use std::collections::HashMap;
use std::io::{Error as IoError, ErrorKind};
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::SystemTime;

use super::path::normalize_path;
use super::traits::{DirEntry, FileSystem, Metadata};
use crate::error::Result;

/// Directories of the default machine image.
const SKELETON_DIRS: &[&str] = &[
    "/bin",
    "/boot",
    "/dev",
    "/etc",
    "/home",
    "/lib",
    "/proc",
    "/root",
    "/sbin",
    "/tmp",
    "/usr",
    "/usr/bin",
    "/usr/local",
    "/usr/local/bin",
    "/usr/sbin",
    "/var",
    "/var/log",
    "/var/tmp",
];

/// Placeholder binaries so `ls /bin` and PATH lookups look plausible.
const SKELETON_BINARIES: &[&str] = &[
    "/bin/bash",
    "/bin/cat",
    "/bin/echo",
    "/bin/false",
    "/bin/grep",
    "/bin/hostname",
    "/bin/pwd",
    "/bin/sh",
    "/bin/sleep",
    "/bin/true",
    "/bin/uname",
    "/usr/bin/env",
    "/usr/bin/whoami",
];

const PASSWD: &str = "root:x:0:0:root:/root:/bin/bash\n\
daemon:x:1:1:daemon:/usr/sbin:/usr/sbin/nologin\n\
bin:x:2:2:bin:/bin:/usr/sbin/nologin\n\
sys:x:3:3:sys:/dev:/usr/sbin/nologin\n\
www-data:x:33:33:www-data:/var/www:/usr/sbin/nologin\n\
nobody:x:65534:65534:nobody:/nonexistent:/usr/sbin/nologin\n";

/// In-memory filesystem.
///
/// Stores all files and directories in memory using a HashMap keyed by
/// normalized absolute path.
pub struct InMemoryFs {
    entries: RwLock<HashMap<PathBuf, FsEntry>>,
}

#[derive(Debug, Clone)]
enum FsEntry {
    File { content: Vec<u8>, metadata: Metadata },
    Directory { metadata: Metadata },
}

impl FsEntry {
    fn metadata(&self) -> &Metadata {
        match self {
            FsEntry::File { metadata, .. } | FsEntry::Directory { metadata } => metadata,
        }
    }

    fn file(content: Vec<u8>) -> Self {
        let metadata = Metadata::file(content.len() as u64);
        FsEntry::File { content, metadata }
    }
}

impl Default for InMemoryFs {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryFs {
    /// Create a filesystem holding a small Debian-like machine image.
    pub fn new() -> Self {
        let fs = Self::empty();
        {
            let mut entries = fs.write_entries();
            for dir in SKELETON_DIRS {
                entries.insert(PathBuf::from(dir), FsEntry::Directory {
                    metadata: Metadata::directory(),
                });
            }
            for bin in SKELETON_BINARIES {
                let mut entry = FsEntry::file(Vec::new());
                if let FsEntry::File { metadata, .. } = &mut entry {
                    metadata.mode = 0o755;
                }
                entries.insert(PathBuf::from(bin), entry);
            }
            entries.insert(PathBuf::from("/etc/passwd"), FsEntry::file(PASSWD.as_bytes().to_vec()));
            entries.insert(
                PathBuf::from("/etc/issue"),
                FsEntry::file(b"Debian GNU/Linux 7 \\n \\l\n".to_vec()),
            );
        }
        fs
    }

    /// Create a filesystem with only the root directory.
    pub fn empty() -> Self {
        let mut entries = HashMap::new();
        entries.insert(PathBuf::from("/"), FsEntry::Directory {
            metadata: Metadata::directory(),
        });
        Self {
            entries: RwLock::new(entries),
        }
    }

    /// Add a file (and any missing parent directories) while building the image.
    pub fn with_file(self, path: impl AsRef<Path>, content: impl Into<Vec<u8>>) -> Self {
        let path = normalize_path(path.as_ref());
        {
            let mut entries = self.write_entries();
            let mut current = PathBuf::from("/");
            if let Some(parent) = path.parent() {
                for component in parent.components().skip(1) {
                    current.push(component);
                    entries.entry(current.clone()).or_insert_with(|| FsEntry::Directory {
                        metadata: Metadata::directory(),
                    });
                }
            }
            entries.insert(path, FsEntry::file(content.into()));
        }
        self
    }

    fn read_entries(&self) -> RwLockReadGuard<'_, HashMap<PathBuf, FsEntry>> {
        self.entries.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write_entries(&self) -> RwLockWriteGuard<'_, HashMap<PathBuf, FsEntry>> {
        self.entries.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Parent must exist and be a directory.
    fn check_parent(entries: &HashMap<PathBuf, FsEntry>, path: &Path) -> Result<()> {
        let Some(parent) = path.parent() else {
            return Ok(());
        };
        match entries.get(parent) {
            Some(FsEntry::Directory { .. }) => Ok(()),
            Some(FsEntry::File { .. }) => {
                Err(IoError::new(ErrorKind::NotADirectory, "not a directory").into())
            }
            None => Err(IoError::new(ErrorKind::NotFound, "parent directory not found").into()),
        }
    }
}

#[async_trait]
impl FileSystem for InMemoryFs {
    async fn read_file(&self, path: &Path) -> Result<Vec<u8>> {
        let path = normalize_path(path);
        let entries = self.read_entries();

        match entries.get(&path) {
            Some(FsEntry::File { content, .. }) => Ok(content.clone()),
            Some(FsEntry::Directory { .. }) => {
                Err(IoError::new(ErrorKind::IsADirectory, "is a directory").into())
            }
            None => Err(IoError::new(ErrorKind::NotFound, "file not found").into()),
        }
    }

    async fn write_file(&self, path: &Path, content: &[u8]) -> Result<()> {
        let path = normalize_path(path);
        let mut entries = self.write_entries();

        Self::check_parent(&entries, &path)?;
        if let Some(FsEntry::Directory { .. }) = entries.get(&path) {
            return Err(IoError::new(ErrorKind::IsADirectory, "is a directory").into());
        }

        entries.insert(path, FsEntry::file(content.to_vec()));
        Ok(())
    }

    async fn append_file(&self, path: &Path, content: &[u8]) -> Result<()> {
        let path = normalize_path(path);
        let mut entries = self.write_entries();

        match entries.get_mut(&path) {
            Some(FsEntry::File {
                content: existing,
                metadata,
            }) => {
                existing.extend_from_slice(content);
                metadata.size = existing.len() as u64;
                metadata.modified = SystemTime::now();
                Ok(())
            }
            Some(FsEntry::Directory { .. }) => {
                Err(IoError::new(ErrorKind::IsADirectory, "is a directory").into())
            }
            None => {
                Self::check_parent(&entries, &path)?;
                entries.insert(path, FsEntry::file(content.to_vec()));
                Ok(())
            }
        }
    }

    async fn mkdir(&self, path: &Path, recursive: bool) -> Result<()> {
        let path = normalize_path(path);
        let mut entries = self.write_entries();

        if recursive {
            let mut current = PathBuf::from("/");
            for component in path.components().skip(1) {
                current.push(component);
                match entries.get(&current) {
                    Some(FsEntry::Directory { .. }) => {}
                    Some(FsEntry::File { .. }) => {
                        return Err(IoError::new(ErrorKind::NotADirectory, "not a directory").into());
                    }
                    None => {
                        entries.insert(current.clone(), FsEntry::Directory {
                            metadata: Metadata::directory(),
                        });
                    }
                }
            }
            return Ok(());
        }

        Self::check_parent(&entries, &path)?;
        if entries.contains_key(&path) {
            return Err(IoError::new(ErrorKind::AlreadyExists, "file exists").into());
        }
        entries.insert(path, FsEntry::Directory {
            metadata: Metadata::directory(),
        });
        Ok(())
    }

    async fn stat(&self, path: &Path) -> Result<Metadata> {
        let path = normalize_path(path);
        let entries = self.read_entries();

        match entries.get(&path) {
            Some(entry) => Ok(entry.metadata().clone()),
            None => Err(IoError::new(ErrorKind::NotFound, "not found").into()),
        }
    }

    async fn read_dir(&self, path: &Path) -> Result<Vec<DirEntry>> {
        let path = normalize_path(path);
        let entries = self.read_entries();

        match entries.get(&path) {
            Some(FsEntry::Directory { .. }) => {
                let mut result: Vec<DirEntry> = entries
                    .iter()
                    .filter(|(entry_path, _)| {
                        entry_path.parent() == Some(path.as_path()) && **entry_path != path
                    })
                    .map(|(entry_path, entry)| DirEntry {
                        name: entry_path
                            .file_name()
                            .map(|n| n.to_string_lossy().to_string())
                            .unwrap_or_default(),
                        metadata: entry.metadata().clone(),
                    })
                    .collect();
                result.sort_by(|a, b| a.name.cmp(&b.name));
                Ok(result)
            }
            Some(_) => Err(IoError::new(ErrorKind::NotADirectory, "not a directory").into()),
            None => Err(IoError::new(ErrorKind::NotFound, "not found").into()),
        }
    }

    async fn exists(&self, path: &Path) -> Result<bool> {
        let path = normalize_path(path);
        Ok(self.read_entries().contains_key(&path))
    }
}
