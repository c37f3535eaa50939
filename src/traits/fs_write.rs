//! Write operations for the archive filesystem.

use std::path::Path;
use std::time::SystemTime;

use crate::FsError;

/// Write operations for a path-addressed filesystem.
///
/// Every method is a complete transaction: when it returns `Ok`, the change
/// is durable in the container.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync`. Methods use `&self`; backends
/// use interior mutability (`Mutex`) to serialize writers.
///
/// # Object Safety
///
/// This trait is object-safe and can be used as `dyn FsWrite`.
pub trait FsWrite: Send + Sync {
    /// Replace the contents of a file (creates if not exists).
    ///
    /// # Errors
    ///
    /// - [`FsError::NotAFile`] if the path is a directory
    /// - [`FsError::ReadOnly`] if the backend is read-only
    fn write(&self, path: &Path, data: &[u8]) -> Result<(), FsError>;

    /// Write `data` at `offset`, zero-filling any gap past the current end.
    ///
    /// Returns the number of bytes written, always `data.len()`.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotAFile`] if the path is a directory
    /// - [`FsError::ReadOnly`] if the backend is read-only
    fn write_at(&self, path: &Path, data: &[u8], offset: u64) -> Result<usize, FsError>;

    /// Truncate or extend a file to exactly `size` bytes.
    ///
    /// If the file is larger than `size`, the extra data is discarded.
    /// If the file is smaller, it is extended with zero bytes.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotAFile`] if the path is a directory
    fn truncate(&self, path: &Path, size: u64) -> Result<(), FsError>;

    /// Create an empty file, or leave an existing one untouched in content.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotAFile`] if the path is a directory
    fn create_file(&self, path: &Path) -> Result<(), FsError>;

    /// Create a node from a Unix `mode` (type bits plus permissions).
    ///
    /// Only regular files can be stored; every other node type is rejected.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotSupported`] for devices, FIFOs, sockets and symlinks
    fn mknod(&self, path: &Path, mode: u32) -> Result<(), FsError> {
        const S_IFMT: u32 = 0o170_000;
        const S_IFREG: u32 = 0o100_000;
        match mode & S_IFMT {
            0 | S_IFREG => self.create_file(path),
            _ => Err(FsError::NotSupported {
                operation: "mknod of a non-regular file",
            }),
        }
    }

    /// Remove a file.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the file does not exist
    /// - [`FsError::NotAFile`] if the path is a directory (use [`FsDir::remove_dir`](super::FsDir::remove_dir))
    fn remove_file(&self, path: &Path) -> Result<(), FsError>;

    /// Rename/move a file or directory.
    ///
    /// Renaming a directory moves all of its contents.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the source path does not exist
    /// - [`FsError::DirectoryNotEmpty`] if a destination directory has contents
    fn rename(&self, from: &Path, to: &Path) -> Result<(), FsError>;

    /// Set the modification time of a file or directory.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the path does not exist
    /// - [`FsError::NotSupported`] for the root
    fn set_modified(&self, path: &Path, modified: SystemTime) -> Result<(), FsError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;
    use std::sync::Mutex;

    #[derive(Default)]
    struct Recorder {
        created: Mutex<Vec<PathBuf>>,
    }

    impl FsWrite for Recorder {
        fn write(&self, _: &Path, _: &[u8]) -> Result<(), FsError> {
            Ok(())
        }
        fn write_at(&self, _: &Path, data: &[u8], _: u64) -> Result<usize, FsError> {
            Ok(data.len())
        }
        fn truncate(&self, _: &Path, _: u64) -> Result<(), FsError> {
            Ok(())
        }
        fn create_file(&self, path: &Path) -> Result<(), FsError> {
            self.created.lock().unwrap().push(path.to_path_buf());
            Ok(())
        }
        fn remove_file(&self, _: &Path) -> Result<(), FsError> {
            Ok(())
        }
        fn rename(&self, _: &Path, _: &Path) -> Result<(), FsError> {
            Ok(())
        }
        fn set_modified(&self, _: &Path, _: SystemTime) -> Result<(), FsError> {
            Ok(())
        }
    }

    #[test]
    fn fs_write_is_object_safe() {
        fn _check(_: &dyn FsWrite) {}
    }

    #[test]
    fn mknod_regular_file_creates() {
        let fs = Recorder::default();
        fs.mknod(Path::new("/a"), 0o100_644).unwrap();
        fs.mknod(Path::new("/b"), 0o644).unwrap();
        assert_eq!(fs.created.lock().unwrap().len(), 2);
    }

    #[test]
    fn mknod_special_file_is_not_supported() {
        let fs = Recorder::default();
        // FIFO
        let err = fs.mknod(Path::new("/p"), 0o010_644).unwrap_err();
        assert!(matches!(err, FsError::NotSupported { .. }));
        // character device
        assert!(fs.mknod(Path::new("/c"), 0o020_644).is_err());
        assert!(fs.created.lock().unwrap().is_empty());
    }
}
