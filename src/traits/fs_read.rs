//! Read operations for the archive filesystem.

use std::path::Path;

use crate::{FsError, Metadata, NodeKind};

/// Read operations for a path-addressed filesystem.
///
/// All methods use `&self`. Backends serialize access to the container
/// internally.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync`. Methods use `&self` to allow
/// the backend to be shared between request threads.
///
/// # Object Safety
///
/// This trait is object-safe and can be used as `dyn FsRead`.
pub trait FsRead: Send + Sync {
    /// Read entire file contents as bytes.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the path does not exist
    /// - [`FsError::NotAFile`] if the path is a directory
    /// - [`FsError::Codec`] if the entry cannot be decompressed
    fn read(&self, path: &Path) -> Result<Vec<u8>, FsError>;

    /// Read up to `len` bytes starting at `offset`.
    ///
    /// Reads past the end of the file return a short (possibly empty) buffer.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the path does not exist
    /// - [`FsError::NotAFile`] if the path is a directory
    fn read_range(&self, path: &Path, offset: u64, len: usize) -> Result<Vec<u8>, FsError>;

    /// Check if a path exists.
    ///
    /// Returns `Ok(false)` for missing paths; only unexpected failures
    /// (e.g. a poisoned lock) are errors.
    fn exists(&self, path: &Path) -> Result<bool, FsError>;

    /// Get metadata for a path.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the path does not exist
    fn metadata(&self, path: &Path) -> Result<Metadata, FsError>;

    /// Classify a path as root, directory, file or missing.
    fn node_kind(&self, path: &Path) -> Result<NodeKind, FsError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fs_read_is_object_safe() {
        fn _check(_: &dyn FsRead) {}
    }

    #[test]
    fn fs_read_requires_send_sync() {
        fn _assert_send_sync<T: Send + Sync>() {}
        // This would fail to compile if FsRead didn't require Send + Sync
        fn _check<T: FsRead>() {
            _assert_send_sync::<T>();
        }
    }
}
