//! Inode-based filesystem operations for FUSE mounting.
//!
//! The host protocol addresses nodes by inode while the container only knows
//! entry names. [`FsInode`] is the bridge: a backend hands out an inode the
//! first time it sees a path and translates it back on every later request.
//!
//! # Example
//!
//! ```rust
//! use zipfs::{FsInode, FsError, Metadata};
//! use std::ffi::OsStr;
//!
//! fn child_metadata<B: FsInode>(
//!     backend: &B,
//!     parent: u64,
//!     name: &OsStr,
//! ) -> Result<Metadata, FsError> {
//!     let child = backend.lookup(parent, name)?;
//!     backend.metadata_by_inode(child)
//! }
//! ```

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use crate::{FsError, Metadata};

/// Inode-based filesystem operations for FUSE mounting.
///
/// # Root Inode
///
/// Path `/` always maps to [`crate::ROOT_INODE`].
///
/// # Stability
///
/// An inode stays attached to its node for as long as the node exists: a
/// rename moves the inode (and those of all descendants) to the new path, a
/// delete retires it. Inodes are never reused.
pub trait FsInode: Send + Sync {
    /// Convert a path to its inode number, assigning one if needed.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if the path does not exist
    fn path_to_inode(&self, path: &Path) -> Result<u64, FsError>;

    /// Convert an inode number back to its current path.
    ///
    /// # Errors
    ///
    /// - [`FsError::InodeNotFound`] if the inode was never assigned or retired
    fn inode_to_path(&self, inode: u64) -> Result<PathBuf, FsError>;

    /// Look up a child by name within a parent directory.
    ///
    /// # Errors
    ///
    /// - [`FsError::InodeNotFound`] if the parent inode is unknown
    /// - [`FsError::NotADirectory`] if the parent is a file
    /// - [`FsError::NotFound`] if the child does not exist
    fn lookup(&self, parent_inode: u64, name: &OsStr) -> Result<u64, FsError>;

    /// Get metadata for an inode; the returned `inode` field is filled in.
    ///
    /// # Errors
    ///
    /// - [`FsError::InodeNotFound`] if the inode is unknown
    /// - [`FsError::NotFound`] if the node has disappeared
    fn metadata_by_inode(&self, inode: u64) -> Result<Metadata, FsError>;
}
