//! Core types for the archive-backed filesystem.

use std::path::PathBuf;
use std::time::SystemTime;

/// The root directory always has inode 1 (FUSE convention).
pub const ROOT_INODE: u64 = 1;

/// Link count reported for every directory, including the root.
pub const DIR_NLINK: u64 = 2;

/// Size reported for the synthetic root directory.
///
/// Directory sizes carry no meaning here; the root keeps a stable non-zero
/// placeholder while explicit directory entries report 0.
pub const ROOT_SIZE: u64 = 1;

/// Type of a filesystem entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FileType {
    /// Regular file.
    File,
    /// Directory.
    Directory,
}

/// Classification of a virtual path against the flat entry namespace.
///
/// For every path other than `/` exactly one kind applies at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum NodeKind {
    /// The synthetic root; never backed by an entry.
    Root,
    /// An explicit directory entry (`name/`) exists.
    Directory,
    /// A file entry (`name`) exists.
    File,
    /// Neither form exists.
    Missing,
}

impl NodeKind {
    /// Returns `true` for [`NodeKind::Root`] and [`NodeKind::Directory`].
    #[inline]
    pub fn is_dir(self) -> bool {
        matches!(self, NodeKind::Root | NodeKind::Directory)
    }

    /// Returns `true` unless the kind is [`NodeKind::Missing`].
    #[inline]
    pub fn exists(self) -> bool {
        self != NodeKind::Missing
    }

    /// The file type for an existing node, `None` for [`NodeKind::Missing`].
    pub fn file_type(self) -> Option<FileType> {
        match self {
            NodeKind::Root | NodeKind::Directory => Some(FileType::Directory),
            NodeKind::File => Some(FileType::File),
            NodeKind::Missing => None,
        }
    }
}

/// Metadata for a filesystem entry.
///
/// Only size, mode and modification time survive in the container; the other
/// fields are synthesized.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Metadata {
    /// Type of the entry (file or directory).
    pub file_type: FileType,
    /// Size in bytes (decompressed length for files).
    pub size: u64,
    /// Permissions.
    pub permissions: Permissions,
    /// Last modification time.
    #[cfg_attr(feature = "serde", serde(with = "system_time_serde"))]
    pub modified: SystemTime,
    /// Inode number (0 until the inode table has seen the path).
    pub inode: u64,
    /// Number of hard links.
    pub nlink: u64,
}

impl Metadata {
    /// Returns `true` if this is a regular file.
    #[inline]
    pub fn is_file(&self) -> bool {
        self.file_type == FileType::File
    }

    /// Returns `true` if this is a directory.
    #[inline]
    pub fn is_dir(&self) -> bool {
        self.file_type == FileType::Directory
    }
}

impl Default for Metadata {
    fn default() -> Self {
        Self {
            file_type: FileType::File,
            size: 0,
            permissions: Permissions::default_file(),
            modified: SystemTime::UNIX_EPOCH,
            inode: 0,
            nlink: 1,
        }
    }
}

/// A directory entry returned from `read_dir`.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DirEntry {
    /// Name of the entry (filename only, not full path).
    pub name: String,
    /// Full virtual path to the entry.
    pub path: PathBuf,
    /// Type of the entry.
    pub file_type: FileType,
    /// Inode number assigned to the entry's path.
    pub inode: u64,
}

/// Unix-style permissions stored as a mode bitmask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Permissions(u32);

impl Permissions {
    /// Create permissions from a Unix mode (e.g., 0o755).
    #[inline]
    pub const fn from_mode(mode: u32) -> Self {
        Self(mode & 0o7777)
    }

    /// Get the raw mode value.
    #[inline]
    pub const fn mode(&self) -> u32 {
        self.0
    }

    /// Returns `true` if these permissions deny writing.
    #[inline]
    pub const fn readonly(&self) -> bool {
        (self.0 & 0o222) == 0
    }

    /// Permissions reported for archive files (0o666 = rw-rw-rw-).
    #[inline]
    pub const fn default_file() -> Self {
        Self(0o666)
    }

    /// Permissions reported for directories (0o755 = rwxr-xr-x).
    #[inline]
    pub const fn default_dir() -> Self {
        Self(0o755)
    }
}

impl Default for Permissions {
    fn default() -> Self {
        Self::default_file()
    }
}

/// Filesystem statistics (like `statvfs`).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StatFs {
    /// Total decompressed bytes of all file entries.
    pub used_bytes: u64,
    /// Number of entries in the container (files and explicit directories).
    pub entries: u64,
    /// Block size in bytes.
    pub block_size: u64,
    /// Maximum filename length.
    pub max_name_len: u64,
}

/// Serde support for SystemTime (when serde feature is enabled).
#[cfg(feature = "serde")]
mod system_time_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    pub fn serialize<S>(time: &SystemTime, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let duration = time.duration_since(UNIX_EPOCH).unwrap_or(Duration::ZERO);
        (duration.as_secs(), duration.subsec_nanos()).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<SystemTime, D::Error>
    where
        D: Deserializer<'de>,
    {
        let (secs, nanos): (u64, u32) = Deserialize::deserialize(deserializer)?;
        Ok(UNIX_EPOCH + Duration::new(secs, nanos))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_kind_file_type() {
        assert_eq!(NodeKind::Root.file_type(), Some(FileType::Directory));
        assert_eq!(NodeKind::Directory.file_type(), Some(FileType::Directory));
        assert_eq!(NodeKind::File.file_type(), Some(FileType::File));
        assert_eq!(NodeKind::Missing.file_type(), None);
    }

    #[test]
    fn node_kind_predicates() {
        assert!(NodeKind::Root.is_dir());
        assert!(NodeKind::Directory.is_dir());
        assert!(!NodeKind::File.is_dir());
        assert!(NodeKind::File.exists());
        assert!(!NodeKind::Missing.exists());
    }

    #[test]
    fn metadata_is_file() {
        let m = Metadata {
            file_type: FileType::File,
            ..Default::default()
        };
        assert!(m.is_file());
        assert!(!m.is_dir());
    }

    #[test]
    fn metadata_is_dir() {
        let m = Metadata {
            file_type: FileType::Directory,
            ..Default::default()
        };
        assert!(!m.is_file());
        assert!(m.is_dir());
    }

    #[test]
    fn permissions_from_mode_masks_extra_bits() {
        let p = Permissions::from_mode(0o100755);
        assert_eq!(p.mode(), 0o755);
    }

    #[test]
    fn permissions_defaults() {
        assert_eq!(Permissions::default_file().mode(), 0o666);
        assert_eq!(Permissions::default_dir().mode(), 0o755);
    }

    #[test]
    fn root_inode_is_one() {
        assert_eq!(ROOT_INODE, 1);
    }

    #[test]
    fn types_are_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<FileType>();
        assert_send_sync::<NodeKind>();
        assert_send_sync::<Metadata>();
        assert_send_sync::<DirEntry>();
        assert_send_sync::<Permissions>();
        assert_send_sync::<StatFs>();
    }

    #[cfg(feature = "serde")]
    #[test]
    fn metadata_serde_keeps_modified_time() {
        let m = Metadata {
            modified: SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(86_400),
            size: 2,
            ..Default::default()
        };
        let json = serde_json::to_string(&m).unwrap();
        let back: Metadata = serde_json::from_str(&json).unwrap();
        assert_eq!(back, m);
    }
}
