//! # AttributeSynthesizer
//!
//! Filesystem attributes derived from raw entry metadata.
//!
//! | Node | Size | Mode | Links | Modified |
//! |------|------|------|-------|----------|
//! | root | 1 | 0o755 | 2 | container file time |
//! | directory (`name/`) | 0 | 0o755 | 2 | entry time |
//! | file (`name`) | decompressed length | 0o666 | 1 | entry time |

use std::path::Path;
use std::time::SystemTime;

use crate::archive::{EntryIndex, EntryStat};
use crate::path_resolver::{self, PathResolver};
use crate::types::{DIR_NLINK, ROOT_INODE, ROOT_SIZE};
use crate::{FileType, FsError, Metadata, NodeKind, Permissions};

/// Fixed attributes of the synthetic root.
pub fn root_metadata(modified: SystemTime) -> Metadata {
    Metadata {
        file_type: FileType::Directory,
        size: ROOT_SIZE,
        permissions: Permissions::default_dir(),
        modified,
        inode: ROOT_INODE,
        nlink: DIR_NLINK,
    }
}

/// Attributes of the node at `path`.
///
/// # Errors
///
/// - [`FsError::NotFound`] if the path classifies as missing
pub fn attributes_of(
    path: &Path,
    index: &dyn EntryIndex,
    resolver: &dyn PathResolver,
) -> Result<Metadata, FsError> {
    let not_found = || FsError::NotFound {
        path: path.to_path_buf(),
    };

    match resolver.classify(path, index) {
        NodeKind::Root => Ok(root_metadata(index.modified())),
        NodeKind::Directory => {
            let name = path_resolver::dir_entry_name(path).ok_or_else(not_found)?;
            let entry = index.locate(&name).ok_or_else(not_found)?;
            Ok(from_entry(entry, FileType::Directory))
        }
        NodeKind::File => {
            let name = path_resolver::entry_name(path).ok_or_else(not_found)?;
            let entry = index.locate(&name).ok_or_else(not_found)?;
            Ok(from_entry(entry, FileType::File))
        }
        NodeKind::Missing => Err(not_found()),
    }
}

fn from_entry(entry: &EntryStat, file_type: FileType) -> Metadata {
    match file_type {
        FileType::Directory => Metadata {
            file_type,
            size: 0,
            permissions: Permissions::default_dir(),
            modified: entry.modified,
            inode: 0,
            nlink: DIR_NLINK,
        },
        FileType::File => Metadata {
            file_type,
            size: entry.size,
            permissions: Permissions::default_file(),
            modified: entry.modified,
            inode: 0,
            nlink: 1,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path_resolver::EntryProbeResolver;
    use std::time::Duration;

    fn at(secs: u64) -> SystemTime {
        SystemTime::UNIX_EPOCH + Duration::from_secs(secs)
    }

    fn docs() -> Vec<EntryStat> {
        vec![
            EntryStat {
                name: "docs/".into(),
                size: 0,
                modified: at(100),
            },
            EntryStat {
                name: "docs/readme.txt".into(),
                size: 2,
                modified: at(200),
            },
        ]
    }

    #[test]
    fn root_has_fixed_attributes() {
        let meta = attributes_of(Path::new("/"), &docs(), &EntryProbeResolver).unwrap();
        assert!(meta.is_dir());
        assert_eq!(meta.size, 1);
        assert_eq!(meta.nlink, 2);
        assert_eq!(meta.permissions.mode(), 0o755);
        assert_eq!(meta.inode, ROOT_INODE);
    }

    #[test]
    fn file_reports_size_and_time() {
        let meta = attributes_of(Path::new("/docs/readme.txt"), &docs(), &EntryProbeResolver)
            .unwrap();
        assert!(meta.is_file());
        assert_eq!(meta.size, 2);
        assert_eq!(meta.modified, at(200));
        assert_eq!(meta.nlink, 1);
        assert_eq!(meta.permissions.mode(), 0o666);
    }

    #[test]
    fn directory_forwards_time_with_zero_size() {
        let meta = attributes_of(Path::new("/docs"), &docs(), &EntryProbeResolver).unwrap();
        assert!(meta.is_dir());
        assert_eq!(meta.size, 0);
        assert_eq!(meta.modified, at(100));
        assert_eq!(meta.nlink, 2);
    }

    #[test]
    fn missing_is_not_found() {
        let err = attributes_of(Path::new("/nope"), &docs(), &EntryProbeResolver).unwrap_err();
        assert!(matches!(err, FsError::NotFound { .. }));
    }

    #[test]
    fn implicit_directory_has_no_attributes() {
        let index = vec![EntryStat {
            name: "a/b.txt".into(),
            size: 1,
            modified: at(0),
        }];
        assert!(attributes_of(Path::new("/a"), &index, &EntryProbeResolver).is_err());
    }
}
