//! Directory operations for the archive filesystem.

use std::ops::ControlFlow;
use std::path::Path;

use crate::{DirEntry, FsError};

/// Directory operations for a path-addressed filesystem.
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync`. Methods use `&self` to allow
/// concurrent access.
///
/// # Object Safety
///
/// This trait is object-safe and can be used as `dyn FsDir`.
pub trait FsDir: Send + Sync {
    /// Visit the children of a directory without collecting them.
    ///
    /// The synthetic `.` and `..` entries come first. The visitor returns
    /// [`ControlFlow::Break`] to stop early, e.g. when a reply buffer is full.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the path does not exist
    /// - [`FsError::NotADirectory`] if the path is not a directory
    fn visit_dir(
        &self,
        path: &Path,
        visit: &mut dyn FnMut(DirEntry) -> ControlFlow<()>,
    ) -> Result<(), FsError>;

    /// List directory contents, excluding `.` and `..`.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the path does not exist
    /// - [`FsError::NotADirectory`] if the path is not a directory
    fn read_dir(&self, path: &Path) -> Result<ReadDirIter, FsError> {
        let mut entries = Vec::new();
        self.visit_dir(path, &mut |entry| {
            if entry.name != "." && entry.name != ".." {
                entries.push(Ok(entry));
            }
            ControlFlow::Continue(())
        })?;
        Ok(ReadDirIter::from_vec(entries))
    }

    /// Create a directory.
    ///
    /// # Errors
    ///
    /// - [`FsError::AlreadyExists`] if the path already exists
    fn create_dir(&self, path: &Path) -> Result<(), FsError>;

    /// Remove an empty directory.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the path does not exist
    /// - [`FsError::NotADirectory`] if the path is not a directory
    /// - [`FsError::DirectoryNotEmpty`] if the directory is not empty
    fn remove_dir(&self, path: &Path) -> Result<(), FsError>;
}

/// Iterator over directory entries.
///
/// Wraps a boxed iterator for flexibility across different backends.
///
/// - Outer `Result` (from [`FsDir::read_dir`]) = "can I open this directory?"
/// - Inner `Result` (per item) = "can I read this entry?"
///
/// # Example
///
/// ```rust
/// use zipfs::{Fs, FsError};
/// use std::path::Path;
///
/// fn list_files<B: Fs>(backend: &B) -> Result<Vec<String>, FsError> {
///     let mut names = Vec::new();
///     for entry in backend.read_dir(Path::new("/"))? {
///         let entry = entry?;
///         names.push(entry.name);
///     }
///     Ok(names)
/// }
/// ```
pub struct ReadDirIter(Box<dyn Iterator<Item = Result<DirEntry, FsError>> + Send + 'static>);

impl ReadDirIter {
    /// Create from a pre-collected vector.
    pub fn from_vec(entries: Vec<Result<DirEntry, FsError>>) -> Self {
        Self(Box::new(entries.into_iter()))
    }

    /// Collect all entries, short-circuiting on first error.
    pub fn collect_all(self) -> Result<Vec<DirEntry>, FsError> {
        self.collect()
    }
}

impl Iterator for ReadDirIter {
    type Item = Result<DirEntry, FsError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.0.next()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FileType;
    use std::path::PathBuf;

    fn entry(name: &str, file_type: FileType, inode: u64) -> DirEntry {
        DirEntry {
            name: name.into(),
            path: PathBuf::from(format!("/{name}")),
            file_type,
            inode,
        }
    }

    // Mock directory: fixed listing of "/"
    struct FixedDir;

    impl FsDir for FixedDir {
        fn visit_dir(
            &self,
            path: &Path,
            visit: &mut dyn FnMut(DirEntry) -> ControlFlow<()>,
        ) -> Result<(), FsError> {
            if path != Path::new("/") {
                return Err(FsError::NotFound {
                    path: path.to_path_buf(),
                });
            }
            for e in [
                entry(".", FileType::Directory, 1),
                entry("..", FileType::Directory, 1),
                entry("a", FileType::File, 2),
                entry("b", FileType::Directory, 3),
            ] {
                if visit(e).is_break() {
                    break;
                }
            }
            Ok(())
        }

        fn create_dir(&self, _: &Path) -> Result<(), FsError> {
            Ok(())
        }

        fn remove_dir(&self, _: &Path) -> Result<(), FsError> {
            Ok(())
        }
    }

    #[test]
    fn read_dir_skips_synthetic_entries() {
        let names: Vec<String> = FixedDir
            .read_dir(Path::new("/"))
            .unwrap()
            .map(|e| e.unwrap().name)
            .collect();
        assert_eq!(names, ["a", "b"]);
    }

    #[test]
    fn read_dir_propagates_open_error() {
        assert!(FixedDir.read_dir(Path::new("/nope")).is_err());
    }

    #[test]
    fn visit_dir_stops_on_break() {
        let mut seen = 0;
        FixedDir
            .visit_dir(Path::new("/"), &mut |_| {
                seen += 1;
                if seen == 3 {
                    ControlFlow::Break(())
                } else {
                    ControlFlow::Continue(())
                }
            })
            .unwrap();
        assert_eq!(seen, 3);
    }

    #[test]
    fn read_dir_iter_collect_all_error() {
        let entries: Vec<Result<DirEntry, FsError>> = vec![
            Ok(entry("a", FileType::File, 2)),
            Err(FsError::Backend("lock poisoned".into())),
        ];
        let result = ReadDirIter::from_vec(entries).collect_all();
        assert!(result.is_err());
    }

    #[test]
    fn read_dir_iter_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<ReadDirIter>();
    }

    #[test]
    fn fs_dir_is_object_safe() {
        fn _check(_: &dyn FsDir) {}
    }
}
