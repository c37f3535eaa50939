//! Error types for the archive-backed filesystem.

use std::path::PathBuf;

/// Filesystem error type with contextual variants.
///
/// All error variants include relevant context (path, operation) where applicable.
/// Every variant maps onto a single POSIX error number through [`FsError::errno`],
/// which is what the FUSE protocol layer hands back to the kernel.
///
/// # Examples
///
/// ```rust
/// use zipfs::FsError;
/// use std::path::PathBuf;
///
/// let err = FsError::NotFound { path: PathBuf::from("/missing") };
/// assert!(err.to_string().contains("/missing"));
/// assert_eq!(err.errno(), libc::ENOENT);
/// ```
#[non_exhaustive]
#[derive(Debug, thiserror::Error)]
pub enum FsError {
    // Path/File Errors
    /// Path does not exist.
    #[error("not found: {path}")]
    NotFound {
        /// The path that was not found.
        path: PathBuf,
    },

    /// Path already exists when it shouldn't.
    #[error("{operation}: already exists: {path}")]
    AlreadyExists {
        /// The path that already exists.
        path: PathBuf,
        /// The operation that failed.
        operation: &'static str,
    },

    /// Expected a file but found a directory.
    #[error("not a file: {path}")]
    NotAFile {
        /// The path that is not a file.
        path: PathBuf,
    },

    /// Expected a directory but found a file.
    #[error("not a directory: {path}")]
    NotADirectory {
        /// The path that is not a directory.
        path: PathBuf,
    },

    /// Directory is not empty when it should be.
    #[error("directory not empty: {path}")]
    DirectoryNotEmpty {
        /// The path to the non-empty directory.
        path: PathBuf,
    },

    /// Inode does not exist.
    #[error("inode not found: {inode}")]
    InodeNotFound {
        /// The inode number that was not found.
        inode: u64,
    },

    // Backend/Operation Errors
    /// Filesystem is read-only.
    #[error("read-only filesystem: {operation}")]
    ReadOnly {
        /// The operation that was attempted.
        operation: &'static str,
    },

    /// Operation is not supported.
    #[error("operation not supported: {operation}")]
    NotSupported {
        /// The unsupported operation.
        operation: &'static str,
    },

    /// The request cannot be applied to the given path.
    #[error("invalid data: {path} ({details})")]
    InvalidData {
        /// The path involved.
        path: PathBuf,
        /// Details about the problem.
        details: String,
    },

    /// The file cannot grow to the requested size.
    #[error("file too large: {path} ({size} bytes)")]
    FileTooLarge {
        /// The file being resized.
        path: PathBuf,
        /// The requested size in bytes.
        size: u64,
    },

    /// The archive codec rejected a read, a staged change or a commit.
    #[error("{operation} failed for {path}: {source}")]
    Codec {
        /// The operation that failed.
        operation: &'static str,
        /// The container or entry involved.
        path: PathBuf,
        /// The underlying codec error.
        #[source]
        source: zip::result::ZipError,
    },

    /// Generic backend error.
    #[error("backend error: {0}")]
    Backend(String),

    /// I/O error with context.
    #[error("{operation} failed for {path}: {source}")]
    Io {
        /// The operation that failed.
        operation: &'static str,
        /// The path involved in the operation.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl FsError {
    /// POSIX error number reported to the host protocol layer.
    pub fn errno(&self) -> i32 {
        match self {
            FsError::NotFound { .. } | FsError::InodeNotFound { .. } => libc::ENOENT,
            FsError::AlreadyExists { .. } => libc::EEXIST,
            FsError::NotAFile { .. } => libc::EISDIR,
            FsError::NotADirectory { .. } => libc::ENOTDIR,
            FsError::DirectoryNotEmpty { .. } => libc::ENOTEMPTY,
            FsError::ReadOnly { .. } => libc::EROFS,
            FsError::NotSupported { .. } => libc::ENOSYS,
            FsError::InvalidData { .. } => libc::EINVAL,
            FsError::FileTooLarge { .. } => libc::EFBIG,
            FsError::Codec { .. } | FsError::Backend(_) | FsError::Io { .. } => libc::EIO,
        }
    }

    /// Returns `true` for failures of the codec or the container file, as
    /// opposed to lookups and requests that do not fit the target.
    pub fn is_codec_failure(&self) -> bool {
        matches!(
            self,
            FsError::Codec { .. } | FsError::Backend(_) | FsError::Io { .. }
        )
    }

    pub(crate) fn codec(
        operation: &'static str,
        path: impl Into<PathBuf>,
        source: zip::result::ZipError,
    ) -> Self {
        FsError::Codec {
            operation,
            path: path.into(),
            source,
        }
    }

    pub(crate) fn io(operation: &'static str, path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        FsError::Io {
            operation,
            path: path.into(),
            source,
        }
    }
}

impl From<std::io::Error> for FsError {
    fn from(error: std::io::Error) -> Self {
        // Convert common io::ErrorKind to more specific FsError variants when possible
        match error.kind() {
            std::io::ErrorKind::NotFound => FsError::NotFound {
                path: PathBuf::new(),
            },
            std::io::ErrorKind::AlreadyExists => FsError::AlreadyExists {
                path: PathBuf::new(),
                operation: "io",
            },
            _ => FsError::Io {
                operation: "io",
                path: PathBuf::new(),
                source: error,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fs_error_not_found_display() {
        let err = FsError::NotFound {
            path: PathBuf::from("/missing"),
        };
        assert_eq!(err.to_string(), "not found: /missing");
    }

    #[test]
    fn fs_error_already_exists_display() {
        let err = FsError::AlreadyExists {
            path: PathBuf::from("/docs"),
            operation: "mkdir",
        };
        assert_eq!(err.to_string(), "mkdir: already exists: /docs");
    }

    #[test]
    fn fs_error_codec_display_names_operation() {
        let err = FsError::codec(
            "commit",
            "/tmp/a.zip",
            zip::result::ZipError::InvalidArchive("bad header"),
        );
        let msg = err.to_string();
        assert!(msg.starts_with("commit failed for /tmp/a.zip"));
        assert!(err.is_codec_failure());
    }

    #[test]
    fn errno_mapping_covers_lookup_and_invalid_operations() {
        let p = || PathBuf::from("/x");
        assert_eq!(FsError::NotFound { path: p() }.errno(), libc::ENOENT);
        assert_eq!(FsError::InodeNotFound { inode: 9 }.errno(), libc::ENOENT);
        assert_eq!(FsError::NotAFile { path: p() }.errno(), libc::EISDIR);
        assert_eq!(FsError::NotADirectory { path: p() }.errno(), libc::ENOTDIR);
        assert_eq!(
            FsError::DirectoryNotEmpty { path: p() }.errno(),
            libc::ENOTEMPTY
        );
        assert_eq!(
            FsError::ReadOnly { operation: "write" }.errno(),
            libc::EROFS
        );
        assert_eq!(
            FsError::NotSupported { operation: "mknod" }.errno(),
            libc::ENOSYS
        );
        assert_eq!(
            FsError::FileTooLarge { path: p(), size: 1 << 62 }.errno(),
            libc::EFBIG
        );
    }

    #[test]
    fn errno_mapping_codec_failures_are_eio() {
        let io = FsError::io(
            "commit",
            "/a.zip",
            std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
        );
        assert_eq!(io.errno(), libc::EIO);
        assert_eq!(FsError::Backend("poisoned".into()).errno(), libc::EIO);
        assert!(!FsError::NotFound { path: PathBuf::new() }.is_codec_failure());
    }

    #[test]
    fn fs_error_from_io_not_found() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "test");
        let fs_err = FsError::from(io_err);
        assert!(matches!(fs_err, FsError::NotFound { .. }));
    }

    #[test]
    fn fs_error_from_io_already_exists() {
        let io_err = std::io::Error::new(std::io::ErrorKind::AlreadyExists, "test");
        let fs_err = FsError::from(io_err);
        assert!(matches!(fs_err, FsError::AlreadyExists { .. }));
    }

    #[test]
    fn fs_error_from_io_other() {
        let io_err = std::io::Error::new(std::io::ErrorKind::Other, "test");
        let fs_err = FsError::from(io_err);
        assert!(matches!(fs_err, FsError::Io { .. }));
    }
}
