//! # ZipFs backend
//!
//! The filesystem backend: a ZIP container exposed through the [`Fs`] and
//! [`FsFuse`] trait families.
//!
//! ## Responsibility
//! - Own the single [`ArchiveHandle`] behind a `Mutex` (one writer at a time)
//! - Route queries to the resolver, namespace and attribute modules
//! - Route mutations through a [`MutationCoordinator`]
//! - Hand out stable inode numbers for virtual paths
//!
//! ## Usage
//!
//! ```rust
//! use zipfs::{FsDir, FsRead, FsWrite, ZipFs};
//! use std::path::Path;
//!
//! let dir = tempfile::tempdir()?;
//! let fs = ZipFs::open(dir.path().join("data.zip"))?;
//!
//! fs.create_dir(Path::new("/docs"))?;
//! fs.write(Path::new("/docs/readme.txt"), b"hi")?;
//! assert_eq!(fs.read(Path::new("/docs/readme.txt"))?, b"hi");
//!
//! let names: Vec<String> = fs
//!     .read_dir(Path::new("/docs"))?
//!     .map(|e| e.map(|e| e.name))
//!     .collect::<Result<_, _>>()?;
//! assert_eq!(names, ["readme.txt"]);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! [`Fs`]: crate::Fs
//! [`FsFuse`]: crate::FsFuse

use std::collections::HashMap;
use std::ffi::OsStr;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError, RwLock};
use std::time::SystemTime;

use crate::archive::{ArchiveHandle, Compression, EntryIndex};
use crate::attributes;
use crate::coordinator::MutationCoordinator;
use crate::namespace;
use crate::path_resolver::{self, EntryProbeResolver, PathResolver};
use crate::{
    DirEntry, FileType, FsDir, FsError, FsInode, FsRead, FsStats, FsWrite, Metadata, NodeKind,
    Permissions, StatFs, ROOT_INODE,
};

/// Block size reported by [`FsStats::statfs`].
const BLOCK_SIZE: u64 = 512;

/// Longest single path component reported by [`FsStats::statfs`].
const MAX_NAME_LEN: u64 = 255;

// ============================================================================
// Options
// ============================================================================

/// Behaviour switches for a [`ZipFs`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ZipFsOptions {
    /// Reject every mutation with [`FsError::ReadOnly`].
    pub read_only: bool,
    /// Compression for entries the filesystem writes.
    pub compression: Compression,
}

impl ZipFsOptions {
    /// Set the read-only flag.
    pub fn read_only(mut self, read_only: bool) -> Self {
        self.read_only = read_only;
        self
    }

    /// Set the compression for rewritten entries.
    pub fn compression(mut self, compression: Compression) -> Self {
        self.compression = compression;
        self
    }
}

// ============================================================================
// Inode table
// ============================================================================

#[derive(Debug, Default)]
struct InodeMaps {
    by_path: HashMap<PathBuf, u64>,
    by_inode: HashMap<u64, PathBuf>,
}

/// Lazily assigned inode numbers keyed by canonical virtual path.
#[derive(Debug)]
struct InodeTable {
    maps: RwLock<InodeMaps>,
    next: AtomicU64,
}

impl InodeTable {
    fn new() -> Self {
        let root = PathBuf::from("/");
        let mut maps = InodeMaps::default();
        maps.by_path.insert(root.clone(), ROOT_INODE);
        maps.by_inode.insert(ROOT_INODE, root);
        Self {
            maps: RwLock::new(maps),
            next: AtomicU64::new(ROOT_INODE + 1),
        }
    }

    fn get_or_assign(&self, path: &Path) -> u64 {
        if let Some(inode) = self.read().by_path.get(path) {
            return *inode;
        }
        let mut maps = self.write();
        // Another thread may have assigned it between the two locks.
        if let Some(inode) = maps.by_path.get(path) {
            return *inode;
        }
        let inode = self.next.fetch_add(1, Ordering::Relaxed);
        maps.by_path.insert(path.to_path_buf(), inode);
        maps.by_inode.insert(inode, path.to_path_buf());
        inode
    }

    fn path_of(&self, inode: u64) -> Option<PathBuf> {
        self.read().by_inode.get(&inode).cloned()
    }

    /// Retire `path` and every path beneath it.
    fn remove(&self, path: &Path) {
        let mut maps = self.write();
        Self::remove_locked(&mut maps, path);
    }

    /// Move the inodes of `from` and its descendants under `to`.
    fn rename(&self, from: &Path, to: &Path) {
        if from == to {
            return;
        }
        let mut maps = self.write();
        Self::remove_locked(&mut maps, to);

        let moved: Vec<(PathBuf, u64)> = maps
            .by_path
            .iter()
            .filter(|(p, _)| p.starts_with(from))
            .map(|(p, i)| (p.clone(), *i))
            .collect();
        for (old, inode) in moved {
            let new = match old.strip_prefix(from) {
                Ok(rest) if !rest.as_os_str().is_empty() => to.join(rest),
                _ => to.to_path_buf(),
            };
            maps.by_path.remove(&old);
            maps.by_path.insert(new.clone(), inode);
            maps.by_inode.insert(inode, new);
        }
    }

    fn remove_locked(maps: &mut InodeMaps, path: &Path) {
        let gone: Vec<(PathBuf, u64)> = maps
            .by_path
            .iter()
            .filter(|(p, _)| p.starts_with(path))
            .map(|(p, i)| (p.clone(), *i))
            .collect();
        for (p, inode) in gone {
            maps.by_path.remove(&p);
            maps.by_inode.remove(&inode);
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, InodeMaps> {
        self.maps.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, InodeMaps> {
        self.maps.write().unwrap_or_else(PoisonError::into_inner)
    }
}

// ============================================================================
// Backend
// ============================================================================

/// A ZIP container mounted as a filesystem.
///
/// Every mutation is committed before it returns, so a crash never loses an
/// acknowledged write. Calls from several threads are serialized on the
/// archive handle.
#[derive(Debug)]
pub struct ZipFs {
    archive_path: PathBuf,
    handle: Mutex<ArchiveHandle>,
    resolver: EntryProbeResolver,
    options: ZipFsOptions,
    inodes: InodeTable,
}

impl ZipFs {
    /// Open the container at `path` with default options.
    ///
    /// A missing file is treated as an empty archive and created by the
    /// first write.
    ///
    /// # Errors
    ///
    /// - [`FsError::Io`] / [`FsError::Codec`] if the container cannot be read
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, FsError> {
        Self::with_options(path, ZipFsOptions::default())
    }

    /// Open the container at `path` with `options`.
    ///
    /// # Errors
    ///
    /// - [`FsError::Io`] / [`FsError::Codec`] if the container cannot be read
    pub fn with_options(path: impl Into<PathBuf>, options: ZipFsOptions) -> Result<Self, FsError> {
        let archive_path = path.into();
        let handle = ArchiveHandle::open(archive_path.clone(), options.compression)?;
        Ok(Self {
            archive_path,
            handle: Mutex::new(handle),
            resolver: EntryProbeResolver,
            options,
            inodes: InodeTable::new(),
        })
    }

    /// Path of the container file.
    pub fn archive_path(&self) -> &Path {
        &self.archive_path
    }

    /// Release the container, writing any changes that were staged but not
    /// committed.
    ///
    /// # Errors
    ///
    /// - [`FsError::Codec`] / [`FsError::Io`] if pending changes cannot be written
    pub fn close(self) -> Result<(), FsError> {
        self.handle
            .into_inner()
            .map_err(|_| poisoned())?
            .close()
    }

    fn lock(&self) -> Result<MutexGuard<'_, ArchiveHandle>, FsError> {
        self.handle.lock().map_err(|_| poisoned())
    }

    fn classify(&self, path: &Path) -> Result<NodeKind, FsError> {
        let mut handle = self.lock()?;
        let container = handle.container()?;
        Ok(self.resolver.classify(path, &*container))
    }

    fn mutate<T>(
        &self,
        operation: &'static str,
        f: impl FnOnce(&mut MutationCoordinator<'_>) -> Result<T, FsError>,
    ) -> Result<T, FsError> {
        if self.options.read_only {
            return Err(FsError::ReadOnly { operation });
        }
        let mut handle = self.lock()?;
        let mut coordinator = MutationCoordinator::new(&mut handle, &self.resolver);
        f(&mut coordinator)
    }
}

fn poisoned() -> FsError {
    FsError::Backend("archive lock poisoned".into())
}

fn canonical(path: &Path) -> Result<PathBuf, FsError> {
    path_resolver::canonical(path).ok_or_else(|| FsError::NotFound {
        path: path.to_path_buf(),
    })
}

// ============================================================================
// Trait implementations
// ============================================================================

impl FsRead for ZipFs {
    fn read(&self, path: &Path) -> Result<Vec<u8>, FsError> {
        tracing::trace!(path = %path.display(), "read");
        let mut handle = self.lock()?;
        let container = handle.container()?;
        match self.resolver.classify(path, &*container) {
            NodeKind::File => match path_resolver::entry_name(path) {
                Some(name) => container.read(&name),
                None => Err(FsError::NotFound {
                    path: path.to_path_buf(),
                }),
            },
            NodeKind::Root | NodeKind::Directory => Err(FsError::NotAFile {
                path: path.to_path_buf(),
            }),
            NodeKind::Missing => Err(FsError::NotFound {
                path: path.to_path_buf(),
            }),
        }
    }

    fn read_range(&self, path: &Path, offset: u64, len: usize) -> Result<Vec<u8>, FsError> {
        let data = self.read(path)?;
        let start = usize::try_from(offset).unwrap_or(usize::MAX).min(data.len());
        let end = start.saturating_add(len).min(data.len());
        Ok(data[start..end].to_vec())
    }

    fn exists(&self, path: &Path) -> Result<bool, FsError> {
        Ok(self.classify(path)?.exists())
    }

    fn metadata(&self, path: &Path) -> Result<Metadata, FsError> {
        tracing::trace!(path = %path.display(), "metadata");
        let canonical = canonical(path)?;
        let mut meta = {
            let mut handle = self.lock()?;
            let container = handle.container()?;
            attributes::attributes_of(path, &*container, &self.resolver)?
        };
        meta.inode = self.inodes.get_or_assign(&canonical);
        if self.options.read_only {
            meta.permissions = Permissions::from_mode(meta.permissions.mode() & !0o222);
        }
        Ok(meta)
    }

    fn node_kind(&self, path: &Path) -> Result<NodeKind, FsError> {
        self.classify(path)
    }
}

impl FsWrite for ZipFs {
    fn write(&self, path: &Path, data: &[u8]) -> Result<(), FsError> {
        self.mutate("write", |c| c.replace(path, data))
    }

    fn write_at(&self, path: &Path, data: &[u8], offset: u64) -> Result<usize, FsError> {
        self.mutate("write", |c| c.write(path, data, offset))
    }

    fn truncate(&self, path: &Path, size: u64) -> Result<(), FsError> {
        self.mutate("truncate", |c| c.truncate(path, size))
    }

    fn create_file(&self, path: &Path) -> Result<(), FsError> {
        self.mutate("create", |c| c.create(path))
    }

    fn remove_file(&self, path: &Path) -> Result<(), FsError> {
        self.mutate("unlink", |c| c.unlink(path))?;
        self.inodes.remove(&canonical(path)?);
        Ok(())
    }

    fn rename(&self, from: &Path, to: &Path) -> Result<(), FsError> {
        self.mutate("rename", |c| c.rename(from, to))?;
        self.inodes.rename(&canonical(from)?, &canonical(to)?);
        Ok(())
    }

    fn set_modified(&self, path: &Path, modified: SystemTime) -> Result<(), FsError> {
        self.mutate("set modification time", |c| c.set_modified(path, modified))
    }
}

impl FsDir for ZipFs {
    fn visit_dir(
        &self,
        path: &Path,
        visit: &mut dyn FnMut(DirEntry) -> ControlFlow<()>,
    ) -> Result<(), FsError> {
        let dir = canonical(path)?;
        let parent = dir.parent().map_or_else(|| dir.clone(), Path::to_path_buf);

        let mut handle = self.lock()?;
        let container = handle.container()?;
        namespace::for_each_child(path, &*container, &self.resolver, |name, kind| {
            let child = match name {
                "." => dir.clone(),
                ".." => parent.clone(),
                _ => dir.join(name),
            };
            visit(DirEntry {
                name: name.to_string(),
                inode: self.inodes.get_or_assign(&child),
                path: child,
                file_type: kind.file_type().unwrap_or(FileType::File),
            })
        })
    }

    fn create_dir(&self, path: &Path) -> Result<(), FsError> {
        self.mutate("mkdir", |c| c.mkdir(path))
    }

    fn remove_dir(&self, path: &Path) -> Result<(), FsError> {
        self.mutate("rmdir", |c| c.rmdir(path))?;
        self.inodes.remove(&canonical(path)?);
        Ok(())
    }
}

impl FsInode for ZipFs {
    fn path_to_inode(&self, path: &Path) -> Result<u64, FsError> {
        let canonical = canonical(path)?;
        if !self.classify(&canonical)?.exists() {
            return Err(FsError::NotFound { path: canonical });
        }
        Ok(self.inodes.get_or_assign(&canonical))
    }

    fn inode_to_path(&self, inode: u64) -> Result<PathBuf, FsError> {
        self.inodes
            .path_of(inode)
            .ok_or(FsError::InodeNotFound { inode })
    }

    fn lookup(&self, parent_inode: u64, name: &OsStr) -> Result<u64, FsError> {
        let parent = self.inode_to_path(parent_inode)?;
        let child = parent.join(name);
        let (parent_kind, child_kind) = {
            let mut handle = self.lock()?;
            let container = handle.container()?;
            (
                self.resolver.classify(&parent, &*container),
                self.resolver.classify(&child, &*container),
            )
        };
        tracing::trace!(parent = %parent.display(), name = ?name, kind = ?child_kind, "lookup");

        match (parent_kind, child_kind) {
            (NodeKind::File, _) => Err(FsError::NotADirectory { path: parent }),
            (_, NodeKind::Missing) => Err(FsError::NotFound { path: child }),
            _ => Ok(self.inodes.get_or_assign(&canonical(&child)?)),
        }
    }

    fn metadata_by_inode(&self, inode: u64) -> Result<Metadata, FsError> {
        let path = self.inode_to_path(inode)?;
        self.metadata(&path)
    }
}

impl FsStats for ZipFs {
    fn statfs(&self) -> Result<StatFs, FsError> {
        let mut handle = self.lock()?;
        let container = handle.container()?;
        let (entries, used_bytes) = container
            .entries()
            .fold((0u64, 0u64), |(count, bytes), e| {
                let size = if e.is_dir() { 0 } else { e.size };
                (count + 1, bytes + size)
            });
        Ok(StatFs {
            used_bytes,
            entries,
            block_size: BLOCK_SIZE,
            max_name_len: MAX_NAME_LEN,
        })
    }
}
