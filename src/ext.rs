//! # Extension Traits
//!
//! Convenience methods layered on the core traits.
//!
//! | Method | Description |
//! |--------|-------------|
//! | [`is_file`](FsExt::is_file) | Check if path is a regular file |
//! | [`is_dir`](FsExt::is_dir) | Check if path is a directory |
//! | [`file_size`](FsExt::file_size) | Decompressed size of a file |
//! | [`read_to_string`](FsExt::read_to_string) | Read a file as UTF-8 |
//! | [`create_dir_all`](FsExt::create_dir_all) | Create a directory and its missing parents |
//!
//! With the `serde` feature, `FsExtJson` adds `read_json` / `write_json`.

use std::path::{Path, PathBuf};

use crate::{Fs, FsError, NodeKind};

/// Extension methods for any [`Fs`] backend.
///
/// # Example
///
/// ```rust
/// use zipfs::{FsExt, FsWrite, ZipFs};
/// use std::path::Path;
///
/// let dir = tempfile::tempdir()?;
/// let fs = ZipFs::open(dir.path().join("a.zip"))?;
/// fs.create_dir_all(Path::new("/logs/2024"))?;
/// fs.write(Path::new("/logs/2024/app.log"), b"started")?;
///
/// assert!(fs.is_dir(Path::new("/logs"))?);
/// assert_eq!(fs.read_to_string(Path::new("/logs/2024/app.log"))?, "started");
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub trait FsExt: Fs {
    /// Check if the path points to a regular file.
    ///
    /// Returns `Ok(false)` if the path doesn't exist (not an error).
    fn is_file(&self, path: &Path) -> Result<bool, FsError> {
        Ok(self.node_kind(path)? == NodeKind::File)
    }

    /// Check if the path points to a directory (the root included).
    ///
    /// Returns `Ok(false)` if the path doesn't exist (not an error).
    fn is_dir(&self, path: &Path) -> Result<bool, FsError> {
        Ok(self.node_kind(path)?.is_dir())
    }

    /// Get the size of a file in bytes.
    ///
    /// # Errors
    ///
    /// Returns `FsError::NotFound` if the path doesn't exist.
    fn file_size(&self, path: &Path) -> Result<u64, FsError> {
        Ok(self.metadata(path)?.size)
    }

    /// Read file contents as a UTF-8 string.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the path does not exist
    /// - [`FsError::InvalidData`] if the file contains invalid UTF-8
    fn read_to_string(&self, path: &Path) -> Result<String, FsError> {
        let data = self.read(path)?;
        String::from_utf8(data).map_err(|e| FsError::InvalidData {
            path: path.to_path_buf(),
            details: e.to_string(),
        })
    }

    /// Create a directory and every missing parent.
    ///
    /// Idempotent: existing directories are left alone.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotADirectory`] if a component exists as a file
    fn create_dir_all(&self, path: &Path) -> Result<(), FsError> {
        let mut current = PathBuf::from("/");
        for component in path.components() {
            let std::path::Component::Normal(part) = component else {
                continue;
            };
            current.push(part);
            match self.node_kind(&current)? {
                NodeKind::Root | NodeKind::Directory => {}
                NodeKind::File => return Err(FsError::NotADirectory { path: current }),
                NodeKind::Missing => self.create_dir(&current)?,
            }
        }
        Ok(())
    }
}

// Blanket implementation - any Fs backend gets FsExt for free
impl<B: Fs + ?Sized> FsExt for B {}

// =============================================================================
// JSON Support (Feature-Gated)
// =============================================================================

#[cfg(feature = "serde")]
mod json {
    use super::*;
    use serde::{de::DeserializeOwned, Serialize};

    /// JSON serialization extension methods.
    ///
    /// Available when the `serde` feature is enabled.
    pub trait FsExtJson: Fs {
        /// Read a file and deserialize it as JSON.
        ///
        /// # Errors
        ///
        /// - [`FsError::NotFound`] if the file doesn't exist
        /// - [`FsError::InvalidData`] if JSON parsing fails
        fn read_json<T: DeserializeOwned>(&self, path: &Path) -> Result<T, FsError> {
            let bytes = self.read(path)?;
            serde_json::from_slice(&bytes).map_err(|e| FsError::InvalidData {
                path: path.to_path_buf(),
                details: e.to_string(),
            })
        }

        /// Serialize a value as JSON and write it to a file.
        ///
        /// # Errors
        ///
        /// - [`FsError::InvalidData`] if serialization fails
        /// - [`FsError::NotAFile`] if the path is a directory
        fn write_json<T: Serialize>(&self, path: &Path, value: &T) -> Result<(), FsError> {
            let bytes = serde_json::to_vec(value).map_err(|e| FsError::InvalidData {
                path: path.to_path_buf(),
                details: e.to_string(),
            })?;
            self.write(path, &bytes)
        }
    }

    // Blanket implementation
    impl<B: Fs> FsExtJson for B {}
}

#[cfg(feature = "serde")]
pub use json::FsExtJson;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FsDir, FsWrite, ZipFs};

    fn fresh() -> (tempfile::TempDir, ZipFs) {
        let dir = tempfile::tempdir().unwrap();
        let fs = ZipFs::open(dir.path().join("ext.zip")).unwrap();
        (dir, fs)
    }

    #[test]
    fn is_file_and_is_dir_report_missing_as_false() {
        let (_dir, fs) = fresh();
        fs.write(Path::new("/f"), b"").unwrap();
        fs.create_dir(Path::new("/d")).unwrap();

        assert!(fs.is_file(Path::new("/f")).unwrap());
        assert!(!fs.is_dir(Path::new("/f")).unwrap());
        assert!(fs.is_dir(Path::new("/d")).unwrap());
        assert!(fs.is_dir(Path::new("/")).unwrap());
        assert!(!fs.is_file(Path::new("/none")).unwrap());
        assert!(!fs.is_dir(Path::new("/none")).unwrap());
    }

    #[test]
    fn create_dir_all_is_idempotent() {
        let (_dir, fs) = fresh();
        fs.create_dir_all(Path::new("/a/b/c")).unwrap();
        fs.create_dir_all(Path::new("/a/b/c")).unwrap();
        assert!(fs.is_dir(Path::new("/a")).unwrap());
        assert!(fs.is_dir(Path::new("/a/b/c")).unwrap());
    }

    #[test]
    fn create_dir_all_stops_at_file() {
        let (_dir, fs) = fresh();
        fs.write(Path::new("/a"), b"").unwrap();
        let err = fs.create_dir_all(Path::new("/a/b")).unwrap_err();
        assert!(matches!(err, FsError::NotADirectory { .. }));
    }

    #[test]
    fn read_to_string_rejects_invalid_utf8() {
        let (_dir, fs) = fresh();
        fs.write(Path::new("/bin"), &[0xff, 0xfe]).unwrap();
        let err = fs.read_to_string(Path::new("/bin")).unwrap_err();
        assert!(matches!(err, FsError::InvalidData { .. }));
    }

    #[test]
    fn file_size_reports_decompressed_length() {
        let (_dir, fs) = fresh();
        fs.write(Path::new("/s"), &[7u8; 100]).unwrap();
        assert_eq!(fs.file_size(Path::new("/s")).unwrap(), 100);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn json_round_trip_through_archive() {
        let (_dir, fs) = fresh();
        let stats = crate::StatFs {
            used_bytes: 3,
            entries: 1,
            block_size: 512,
            max_name_len: 255,
        };
        fs.write_json(Path::new("/stats.json"), &stats).unwrap();
        let back: crate::StatFs = fs.read_json(Path::new("/stats.json")).unwrap();
        assert_eq!(back, stats);
    }
}
