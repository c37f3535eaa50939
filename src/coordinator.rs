//! # MutationCoordinator
//!
//! State-changing operations as read-modify-replace-commit transactions.
//!
//! The container only supports whole-entry replacement. A partial write is
//! therefore computed on a scratch buffer holding the entry's full contents,
//! submitted as a replacement, and made durable with
//! [`ArchiveHandle::commit`] before the call returns:
//!
//! ```text
//! classify ──▶ read entry into scratch ──▶ patch scratch ──▶ stage replace ──▶ commit
//! ```
//!
//! Every call rebuilds the whole container. That keeps reads after writes
//! consistent at the cost of write throughput.
//!
//! ## Directories
//!
//! - `rename` of a directory moves every entry beneath it.
//! - `rmdir` refuses directories that still contain entries.

use std::path::{Path, PathBuf};
use std::time::SystemTime;

use crate::archive::{ArchiveHandle, EntryIndex};
use crate::path_resolver::{self, PathResolver};
use crate::{FsError, NodeKind};

/// Runs mutations against a borrowed archive handle.
pub struct MutationCoordinator<'a> {
    handle: &'a mut ArchiveHandle,
    resolver: &'a dyn PathResolver,
}

impl<'a> MutationCoordinator<'a> {
    /// Borrow `handle` for a single mutation.
    pub fn new(handle: &'a mut ArchiveHandle, resolver: &'a dyn PathResolver) -> Self {
        Self { handle, resolver }
    }

    /// Write `buf` at `offset`, creating the file if needed.
    ///
    /// Bytes before `offset` are kept, a gap past the old end is zero-filled
    /// and the file grows when `offset + buf.len()` exceeds its length.
    /// Returns `buf.len()`; there are no short writes.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotAFile`] if the path is a directory, an implicit
    ///   directory or the root
    /// - [`FsError::FileTooLarge`] if `offset + buf.len()` does not fit in memory
    /// - [`FsError::Codec`] / [`FsError::Io`] if staging or commit fails
    pub fn write(&mut self, path: &Path, buf: &[u8], offset: u64) -> Result<usize, FsError> {
        let (name, kind) = self.file_target(path)?;
        let requested = offset.saturating_add(buf.len() as u64);
        let start = usize::try_from(offset).map_err(|_| too_large(path, requested))?;
        let end = start
            .checked_add(buf.len())
            .ok_or_else(|| too_large(path, requested))?;

        let container = self.handle.container()?;
        let mut scratch = match kind {
            NodeKind::File => container.read(&name)?,
            _ => Vec::new(),
        };
        if scratch.len() < end {
            resize_scratch(&mut scratch, end, path)?;
        }
        scratch[start..end].copy_from_slice(buf);

        tracing::debug!(path = %path.display(), offset, len = buf.len(), size = scratch.len(), "write");
        container.stage_replace(&name, scratch, SystemTime::now());
        self.handle.commit()?;
        Ok(buf.len())
    }

    /// Replace the whole contents of a file, creating it if needed.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotAFile`] if the path is a directory or the root
    /// - [`FsError::Codec`] / [`FsError::Io`] if staging or commit fails
    pub fn replace(&mut self, path: &Path, data: &[u8]) -> Result<(), FsError> {
        let (name, _) = self.file_target(path)?;
        tracing::debug!(path = %path.display(), size = data.len(), "replace");
        self.handle
            .container()?
            .stage_replace(&name, data.to_vec(), SystemTime::now());
        self.handle.commit()
    }

    /// Set the file length to exactly `size`, creating the file if needed.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotAFile`] if the path is a directory, an implicit
    ///   directory or the root
    /// - [`FsError::FileTooLarge`] if `size` does not fit in memory
    /// - [`FsError::Codec`] / [`FsError::Io`] if staging or commit fails
    pub fn truncate(&mut self, path: &Path, size: u64) -> Result<(), FsError> {
        let (name, kind) = self.file_target(path)?;
        let len = usize::try_from(size).map_err(|_| too_large(path, size))?;

        let container = self.handle.container()?;
        let mut scratch = match kind {
            NodeKind::File => container.read(&name)?,
            _ => Vec::new(),
        };
        resize_scratch(&mut scratch, len, path)?;

        tracing::debug!(path = %path.display(), size, "truncate");
        container.stage_replace(&name, scratch, SystemTime::now());
        self.handle.commit()
    }

    /// Create an empty regular file (a zero-length write at offset 0).
    ///
    /// # Errors
    ///
    /// See [`write`](Self::write).
    pub fn create(&mut self, path: &Path) -> Result<(), FsError> {
        self.write(path, &[], 0).map(|_| ())
    }

    /// Create an explicit directory entry.
    ///
    /// # Errors
    ///
    /// - [`FsError::AlreadyExists`] if a file or directory already lives at `path`
    /// - [`FsError::Codec`] / [`FsError::Io`] if staging or commit fails
    pub fn mkdir(&mut self, path: &Path) -> Result<(), FsError> {
        if self.classify(path)? != NodeKind::Missing {
            return Err(FsError::AlreadyExists {
                path: path.to_path_buf(),
                operation: "mkdir",
            });
        }
        let name = dir_name(path)?;
        tracing::debug!(path = %path.display(), "mkdir");
        self.handle
            .container()?
            .stage_replace(&name, Vec::new(), SystemTime::now());
        self.handle.commit()
    }

    /// Move the node at `from` to `to`.
    ///
    /// A file destination is replaced. A directory destination is replaced
    /// only when it is empty. Renaming a directory moves all of its
    /// descendants.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if `from` does not exist
    /// - [`FsError::NotAFile`] if a file would replace a directory
    /// - [`FsError::NotADirectory`] if a directory would replace a file
    /// - [`FsError::DirectoryNotEmpty`] if the destination directory has entries
    /// - [`FsError::InvalidData`] for the root, or a directory moved into itself
    /// - [`FsError::Codec`] / [`FsError::Io`] if staging or commit fails
    pub fn rename(&mut self, from: &Path, to: &Path) -> Result<(), FsError> {
        let from_kind = self.classify(from)?;
        let to_kind = self.classify(to)?;

        if path_resolver::normalize(from) == path_resolver::normalize(to) {
            return match from_kind {
                NodeKind::Missing => Err(FsError::NotFound {
                    path: from.to_path_buf(),
                }),
                _ => Ok(()),
            };
        }

        match from_kind {
            NodeKind::Missing => Err(FsError::NotFound {
                path: from.to_path_buf(),
            }),
            NodeKind::Root => Err(FsError::InvalidData {
                path: from.to_path_buf(),
                details: "cannot rename the root".into(),
            }),
            NodeKind::File => self.rename_file(from, to, to_kind),
            NodeKind::Directory => self.rename_dir(from, to, to_kind),
        }
    }

    /// Delete a file entry.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if no file exists at `path`
    /// - [`FsError::NotAFile`] if the path is a directory or the root
    /// - [`FsError::Codec`] / [`FsError::Io`] if staging or commit fails
    pub fn unlink(&mut self, path: &Path) -> Result<(), FsError> {
        match self.classify(path)? {
            NodeKind::File => {}
            NodeKind::Missing => {
                return Err(FsError::NotFound {
                    path: path.to_path_buf(),
                });
            }
            NodeKind::Directory | NodeKind::Root => {
                return Err(FsError::NotAFile {
                    path: path.to_path_buf(),
                });
            }
        }
        let name = file_name(path)?;
        tracing::debug!(path = %path.display(), "unlink");
        self.handle.container()?.stage_delete(&name)?;
        self.handle.commit()
    }

    /// Delete an empty directory entry.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if no directory entry exists at `path`
    /// - [`FsError::NotADirectory`] if the path is a file
    /// - [`FsError::DirectoryNotEmpty`] if entries live beneath it
    /// - [`FsError::InvalidData`] for the root
    /// - [`FsError::Codec`] / [`FsError::Io`] if staging or commit fails
    pub fn rmdir(&mut self, path: &Path) -> Result<(), FsError> {
        match self.classify(path)? {
            NodeKind::Directory => {}
            NodeKind::Missing => {
                return Err(FsError::NotFound {
                    path: path.to_path_buf(),
                });
            }
            NodeKind::File => {
                return Err(FsError::NotADirectory {
                    path: path.to_path_buf(),
                });
            }
            NodeKind::Root => {
                return Err(FsError::InvalidData {
                    path: path.to_path_buf(),
                    details: "cannot remove the root".into(),
                });
            }
        }

        let name = dir_name(path)?;
        let container = self.handle.container()?;
        if container.has_entries_under(&name) {
            return Err(FsError::DirectoryNotEmpty {
                path: path.to_path_buf(),
            });
        }
        tracing::debug!(path = %path.display(), "rmdir");
        container.stage_delete(&name)?;
        self.handle.commit()
    }

    /// Update the stored modification time of a file or directory.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if nothing exists at `path`
    /// - [`FsError::NotSupported`] for the root, which has no entry
    /// - [`FsError::Codec`] / [`FsError::Io`] if staging or commit fails
    pub fn set_modified(&mut self, path: &Path, modified: SystemTime) -> Result<(), FsError> {
        let name = match self.classify(path)? {
            NodeKind::File => file_name(path)?,
            NodeKind::Directory => dir_name(path)?,
            NodeKind::Root => {
                return Err(FsError::NotSupported {
                    operation: "set modification time of the root",
                });
            }
            NodeKind::Missing => {
                return Err(FsError::NotFound {
                    path: path.to_path_buf(),
                });
            }
        };
        tracing::debug!(path = %path.display(), "set modified");
        self.handle
            .container()?
            .stage_set_modified(&name, modified)?;
        self.handle.commit()
    }

    fn rename_file(&mut self, from: &Path, to: &Path, to_kind: NodeKind) -> Result<(), FsError> {
        let from_name = file_name(from)?;
        let to_name = match to_kind {
            NodeKind::Root | NodeKind::Directory => {
                return Err(FsError::NotAFile {
                    path: to.to_path_buf(),
                });
            }
            NodeKind::File | NodeKind::Missing => file_name(to)?,
        };

        tracing::debug!(from = %from.display(), to = %to.display(), "rename file");
        let container = self.handle.container()?;
        if to_kind == NodeKind::Missing && container.has_entries_under(&format!("{to_name}/")) {
            return Err(FsError::NotAFile {
                path: to.to_path_buf(),
            });
        }
        if to_kind == NodeKind::File {
            container.stage_delete(&to_name)?;
        }
        container.stage_rename(&from_name, &to_name)?;
        self.handle.commit()
    }

    fn rename_dir(&mut self, from: &Path, to: &Path, to_kind: NodeKind) -> Result<(), FsError> {
        let from_prefix = dir_name(from)?;
        let to_prefix = match to_kind {
            NodeKind::Root => {
                return Err(FsError::InvalidData {
                    path: to.to_path_buf(),
                    details: "cannot replace the root".into(),
                });
            }
            NodeKind::File => {
                return Err(FsError::NotADirectory {
                    path: to.to_path_buf(),
                });
            }
            NodeKind::Directory | NodeKind::Missing => dir_name(to)?,
        };
        if to_prefix.starts_with(&from_prefix) {
            return Err(FsError::InvalidData {
                path: to.to_path_buf(),
                details: format!("cannot move {} into itself", from.display()),
            });
        }

        let container = self.handle.container()?;
        // Also covers a missing destination that is an implicit prefix.
        if container.has_entries_under(&to_prefix) {
            return Err(FsError::DirectoryNotEmpty {
                path: to.to_path_buf(),
            });
        }
        if to_kind == NodeKind::Directory {
            container.stage_delete(&to_prefix)?;
        }

        let moved: Vec<String> = container
            .entries()
            .filter(|e| e.name.starts_with(&from_prefix))
            .map(|e| e.name.clone())
            .collect();
        tracing::debug!(
            from = %from.display(),
            to = %to.display(),
            entries = moved.len(),
            "rename directory"
        );
        for old in &moved {
            let new = format!("{to_prefix}{}", &old[from_prefix.len()..]);
            container.stage_rename(old, &new)?;
        }
        self.handle.commit()
    }

    fn classify(&mut self, path: &Path) -> Result<NodeKind, FsError> {
        let container = self.handle.container()?;
        Ok(self.resolver.classify(path, &*container))
    }

    /// Entry name and current kind for a file-content mutation.
    ///
    /// A missing path that prefixes other entries is an implicit directory;
    /// a file entry there would hide its descendants.
    fn file_target(&mut self, path: &Path) -> Result<(String, NodeKind), FsError> {
        let kind = self.classify(path)?;
        if kind.is_dir() {
            return Err(FsError::NotAFile {
                path: path.to_path_buf(),
            });
        }
        let name = file_name(path)?;
        if kind == NodeKind::Missing
            && self.handle.container()?.has_entries_under(&format!("{name}/"))
        {
            return Err(FsError::NotAFile {
                path: path.to_path_buf(),
            });
        }
        Ok((name, kind))
    }
}

fn file_name(path: &Path) -> Result<String, FsError> {
    path_resolver::entry_name(path).ok_or_else(|| invalid_name(path))
}

fn dir_name(path: &Path) -> Result<String, FsError> {
    path_resolver::dir_entry_name(path).ok_or_else(|| invalid_name(path))
}

fn invalid_name(path: &Path) -> FsError {
    FsError::InvalidData {
        path: PathBuf::from(path),
        details: "path has no entry name".into(),
    }
}

fn too_large(path: &Path, size: u64) -> FsError {
    FsError::FileTooLarge {
        path: path.to_path_buf(),
        size,
    }
}

/// Resize `scratch` to `len`, zero-filling growth. Fails instead of aborting
/// when the allocation cannot be satisfied.
fn resize_scratch(scratch: &mut Vec<u8>, len: usize, path: &Path) -> Result<(), FsError> {
    if let Some(extra) = len.checked_sub(scratch.len()) {
        scratch
            .try_reserve_exact(extra)
            .map_err(|_| too_large(path, len as u64))?;
    }
    scratch.resize(len, 0);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::Compression;
    use crate::path_resolver::EntryProbeResolver;
    use std::time::Duration;

    struct Fixture {
        _dir: tempfile::TempDir,
        handle: ArchiveHandle,
    }

    impl Fixture {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let handle = ArchiveHandle::open(dir.path().join("t.zip"), Compression::Deflated).unwrap();
            Self { _dir: dir, handle }
        }

        fn coordinator(&mut self) -> MutationCoordinator<'_> {
            MutationCoordinator::new(&mut self.handle, &EntryProbeResolver)
        }

        fn read(&mut self, name: &str) -> Vec<u8> {
            self.handle.container().unwrap().read(name).unwrap()
        }

        fn kind(&mut self, path: &str) -> NodeKind {
            self.coordinator().classify(Path::new(path)).unwrap()
        }
    }

    #[test]
    fn offset_write_patches_in_place() {
        let mut fx = Fixture::new();
        fx.coordinator().write(Path::new("/p"), b"aaaa", 0).unwrap();
        let n = fx.coordinator().write(Path::new("/p"), b"bb", 1).unwrap();
        assert_eq!(n, 2);
        assert_eq!(fx.read("p"), b"abba");
    }

    #[test]
    fn write_past_end_zero_fills_gap() {
        let mut fx = Fixture::new();
        fx.coordinator().write(Path::new("/p"), b"ab", 0).unwrap();
        fx.coordinator().write(Path::new("/p"), b"z", 4).unwrap();
        assert_eq!(fx.read("p"), b"ab\0\0z");
    }

    #[test]
    fn write_creates_new_file_with_leading_zeros() {
        let mut fx = Fixture::new();
        fx.coordinator().write(Path::new("/new"), b"x", 2).unwrap();
        assert_eq!(fx.read("new"), b"\0\0x");
    }

    #[test]
    fn every_mutation_commits() {
        let mut fx = Fixture::new();
        fx.coordinator().create(Path::new("/a")).unwrap();
        fx.coordinator().write(Path::new("/a"), b"1", 0).unwrap();
        fx.coordinator().mkdir(Path::new("/d")).unwrap();
        assert_eq!(fx.handle.commits(), 3);
        assert!(!fx.handle.container().unwrap().is_dirty());
    }

    #[test]
    fn write_to_directory_is_rejected() {
        let mut fx = Fixture::new();
        fx.coordinator().mkdir(Path::new("/d")).unwrap();
        let err = fx.coordinator().write(Path::new("/d"), b"x", 0).unwrap_err();
        assert!(matches!(err, FsError::NotAFile { .. }));
        let err = fx.coordinator().write(Path::new("/"), b"x", 0).unwrap_err();
        assert!(matches!(err, FsError::NotAFile { .. }));
    }

    #[test]
    fn truncate_shrinks_grows_and_is_idempotent() {
        let mut fx = Fixture::new();
        fx.coordinator().write(Path::new("/t"), b"abcdef", 0).unwrap();
        fx.coordinator().truncate(Path::new("/t"), 3).unwrap();
        assert_eq!(fx.read("t"), b"abc");
        fx.coordinator().truncate(Path::new("/t"), 5).unwrap();
        let once = fx.read("t");
        fx.coordinator().truncate(Path::new("/t"), 5).unwrap();
        assert_eq!(fx.read("t"), once);
        assert_eq!(once, b"abc\0\0");
    }

    #[test]
    fn truncate_creates_missing_file() {
        let mut fx = Fixture::new();
        fx.coordinator().truncate(Path::new("/fresh"), 4).unwrap();
        assert_eq!(fx.read("fresh"), [0u8; 4]);
    }

    #[test]
    fn oversized_truncate_fails_without_touching_the_file() {
        let mut fx = Fixture::new();
        fx.coordinator().write(Path::new("/f"), b"x", 0).unwrap();
        let err = fx.coordinator().truncate(Path::new("/f"), 1 << 62).unwrap_err();
        assert!(matches!(err, FsError::FileTooLarge { size, .. } if size == 1 << 62));
        assert_eq!(err.errno(), libc::EFBIG);
        assert_eq!(fx.read("f"), b"x");
    }

    #[test]
    fn write_at_huge_offset_fails() {
        let mut fx = Fixture::new();
        let err = fx.coordinator().write(Path::new("/f"), b"x", 1 << 62).unwrap_err();
        assert!(matches!(err, FsError::FileTooLarge { .. }));
        let err = fx.coordinator().write(Path::new("/f"), b"x", u64::MAX).unwrap_err();
        assert!(matches!(err, FsError::FileTooLarge { .. }));
        assert_eq!(fx.kind("/f"), NodeKind::Missing);
    }

    #[test]
    fn file_mutations_do_not_shadow_implicit_directory() {
        let mut fx = Fixture::new();
        fx.coordinator().write(Path::new("/a/b.txt"), b"hi", 0).unwrap();
        assert_eq!(fx.kind("/a"), NodeKind::Missing);

        let err = fx.coordinator().write(Path::new("/a"), b"x", 0).unwrap_err();
        assert!(matches!(err, FsError::NotAFile { .. }));
        let err = fx.coordinator().create(Path::new("/a")).unwrap_err();
        assert!(matches!(err, FsError::NotAFile { .. }));
        let err = fx.coordinator().truncate(Path::new("/a"), 0).unwrap_err();
        assert!(matches!(err, FsError::NotAFile { .. }));

        let names: Vec<String> = fx
            .handle
            .container()
            .unwrap()
            .entries()
            .map(|e| e.name.clone())
            .collect();
        assert_eq!(names, ["a/b.txt"]);
    }

    #[test]
    fn rename_file_onto_implicit_directory_is_rejected() {
        let mut fx = Fixture::new();
        fx.coordinator().write(Path::new("/a/b.txt"), b"hi", 0).unwrap();
        fx.coordinator().write(Path::new("/f"), b"f", 0).unwrap();

        let err = fx
            .coordinator()
            .rename(Path::new("/f"), Path::new("/a"))
            .unwrap_err();
        assert!(matches!(err, FsError::NotAFile { .. }));
        assert_eq!(fx.read("f"), b"f");
        assert_eq!(fx.read("a/b.txt"), b"hi");
    }

    #[test]
    fn mkdir_creates_explicit_entry() {
        let mut fx = Fixture::new();
        fx.coordinator().mkdir(Path::new("/docs")).unwrap();
        assert_eq!(fx.kind("/docs"), NodeKind::Directory);
        assert!(fx.handle.container().unwrap().contains("docs/"));

        let err = fx.coordinator().mkdir(Path::new("/docs")).unwrap_err();
        assert!(matches!(err, FsError::AlreadyExists { .. }));
    }

    #[test]
    fn unlink_removes_file() {
        let mut fx = Fixture::new();
        fx.coordinator().create(Path::new("/gone")).unwrap();
        fx.coordinator().unlink(Path::new("/gone")).unwrap();
        assert_eq!(fx.kind("/gone"), NodeKind::Missing);

        let err = fx.coordinator().unlink(Path::new("/gone")).unwrap_err();
        assert!(matches!(err, FsError::NotFound { .. }));
    }

    #[test]
    fn unlink_of_directory_is_rejected() {
        let mut fx = Fixture::new();
        fx.coordinator().mkdir(Path::new("/d")).unwrap();
        let err = fx.coordinator().unlink(Path::new("/d")).unwrap_err();
        assert!(matches!(err, FsError::NotAFile { .. }));
    }

    #[test]
    fn rmdir_requires_empty_directory() {
        let mut fx = Fixture::new();
        fx.coordinator().mkdir(Path::new("/d")).unwrap();
        fx.coordinator().create(Path::new("/d/f")).unwrap();

        let err = fx.coordinator().rmdir(Path::new("/d")).unwrap_err();
        assert!(matches!(err, FsError::DirectoryNotEmpty { .. }));

        fx.coordinator().unlink(Path::new("/d/f")).unwrap();
        fx.coordinator().rmdir(Path::new("/d")).unwrap();
        assert_eq!(fx.kind("/d"), NodeKind::Missing);
    }

    #[test]
    fn rmdir_of_file_is_not_a_directory() {
        let mut fx = Fixture::new();
        fx.coordinator().create(Path::new("/f")).unwrap();
        let err = fx.coordinator().rmdir(Path::new("/f")).unwrap_err();
        assert!(matches!(err, FsError::NotADirectory { .. }));
    }

    #[test]
    fn rename_file_preserves_content() {
        let mut fx = Fixture::new();
        fx.coordinator().write(Path::new("/a"), b"content", 0).unwrap();
        fx.coordinator().rename(Path::new("/a"), Path::new("/b")).unwrap();
        assert_eq!(fx.kind("/a"), NodeKind::Missing);
        assert_eq!(fx.kind("/b"), NodeKind::File);
        assert_eq!(fx.read("b"), b"content");
    }

    #[test]
    fn rename_file_replaces_existing_file() {
        let mut fx = Fixture::new();
        fx.coordinator().write(Path::new("/a"), b"new", 0).unwrap();
        fx.coordinator().write(Path::new("/b"), b"old", 0).unwrap();
        fx.coordinator().rename(Path::new("/a"), Path::new("/b")).unwrap();
        assert_eq!(fx.read("b"), b"new");
        assert_eq!(fx.kind("/a"), NodeKind::Missing);
    }

    #[test]
    fn rename_file_onto_directory_is_rejected() {
        let mut fx = Fixture::new();
        fx.coordinator().create(Path::new("/f")).unwrap();
        fx.coordinator().mkdir(Path::new("/d")).unwrap();
        let err = fx.coordinator().rename(Path::new("/f"), Path::new("/d")).unwrap_err();
        assert!(matches!(err, FsError::NotAFile { .. }));
    }

    #[test]
    fn rename_directory_moves_descendants() {
        let mut fx = Fixture::new();
        fx.coordinator().mkdir(Path::new("/src")).unwrap();
        fx.coordinator().mkdir(Path::new("/src/sub")).unwrap();
        fx.coordinator().write(Path::new("/src/sub/f.txt"), b"deep", 0).unwrap();
        fx.coordinator().write(Path::new("/src/top.txt"), b"top", 0).unwrap();

        fx.coordinator().rename(Path::new("/src"), Path::new("/dst")).unwrap();

        assert_eq!(fx.kind("/src"), NodeKind::Missing);
        assert_eq!(fx.kind("/src/top.txt"), NodeKind::Missing);
        assert_eq!(fx.kind("/dst"), NodeKind::Directory);
        assert_eq!(fx.kind("/dst/sub"), NodeKind::Directory);
        assert_eq!(fx.read("dst/sub/f.txt"), b"deep");
        assert_eq!(fx.read("dst/top.txt"), b"top");
    }

    #[test]
    fn rename_directory_does_not_touch_sibling_with_shared_prefix() {
        let mut fx = Fixture::new();
        fx.coordinator().mkdir(Path::new("/a")).unwrap();
        fx.coordinator().mkdir(Path::new("/ab")).unwrap();
        fx.coordinator().rename(Path::new("/a"), Path::new("/c")).unwrap();
        assert_eq!(fx.kind("/ab"), NodeKind::Directory);
        assert_eq!(fx.kind("/c"), NodeKind::Directory);
    }

    #[test]
    fn rename_directory_into_itself_is_rejected() {
        let mut fx = Fixture::new();
        fx.coordinator().mkdir(Path::new("/a")).unwrap();
        let err = fx
            .coordinator()
            .rename(Path::new("/a"), Path::new("/a/b"))
            .unwrap_err();
        assert!(matches!(err, FsError::InvalidData { .. }));
    }

    #[test]
    fn rename_directory_onto_non_empty_directory_is_rejected() {
        let mut fx = Fixture::new();
        fx.coordinator().mkdir(Path::new("/a")).unwrap();
        fx.coordinator().mkdir(Path::new("/b")).unwrap();
        fx.coordinator().create(Path::new("/b/f")).unwrap();
        let err = fx.coordinator().rename(Path::new("/a"), Path::new("/b")).unwrap_err();
        assert!(matches!(err, FsError::DirectoryNotEmpty { .. }));
    }

    #[test]
    fn rename_directory_onto_empty_directory_replaces_it() {
        let mut fx = Fixture::new();
        fx.coordinator().mkdir(Path::new("/a")).unwrap();
        fx.coordinator().create(Path::new("/a/f")).unwrap();
        fx.coordinator().mkdir(Path::new("/b")).unwrap();
        fx.coordinator().rename(Path::new("/a"), Path::new("/b")).unwrap();
        assert_eq!(fx.kind("/b/f"), NodeKind::File);
        assert_eq!(fx.kind("/a"), NodeKind::Missing);
    }

    #[test]
    fn rename_missing_is_not_found() {
        let mut fx = Fixture::new();
        let err = fx.coordinator().rename(Path::new("/x"), Path::new("/y")).unwrap_err();
        assert!(matches!(err, FsError::NotFound { .. }));
    }

    #[test]
    fn set_modified_updates_file_and_directory() {
        let mut fx = Fixture::new();
        let when = SystemTime::UNIX_EPOCH + Duration::from_secs(1_600_000_000);
        fx.coordinator().create(Path::new("/f")).unwrap();
        fx.coordinator().mkdir(Path::new("/d")).unwrap();
        fx.coordinator().set_modified(Path::new("/f"), when).unwrap();
        fx.coordinator().set_modified(Path::new("/d"), when).unwrap();

        let container = fx.handle.container().unwrap();
        assert_eq!(container.locate("f").unwrap().modified, when);
        assert_eq!(container.locate("d/").unwrap().modified, when);
    }

    #[test]
    fn set_modified_of_missing_or_root_fails() {
        let mut fx = Fixture::new();
        let now = SystemTime::now();
        assert!(matches!(
            fx.coordinator().set_modified(Path::new("/nope"), now),
            Err(FsError::NotFound { .. })
        ));
        assert!(matches!(
            fx.coordinator().set_modified(Path::new("/"), now),
            Err(FsError::NotSupported { .. })
        ));
    }
}
