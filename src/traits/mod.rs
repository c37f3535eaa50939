//! # Filesystem Traits
//!
//! The trait hierarchy through which the archive is exposed as a filesystem.
//!
//! ## Trait Layers
//!
//! ```text
//! Layer 1 (Core):  FsRead + FsWrite + FsDir = Fs
//!                                            ↓
//! Layer 2 (FUSE):  Fs + FsInode + FsStats   = FsFuse
//! ```
//!
//! ## Quick Reference
//!
//! | Layer | Composite Trait | Component Traits | Use Case |
//! |-------|-----------------|------------------|----------|
//! | 1 | [`Fs`] | [`FsRead`], [`FsWrite`], [`FsDir`] | Path-based access to the archive |
//! | 2 | [`FsFuse`] | + [`FsInode`], [`FsStats`] | Mounting through the host protocol |
//!
//! ## Blanket Implementations
//!
//! Both composite traits have blanket implementations. Implement the
//! component traits, and you get the composite trait automatically.
//!
//! ## Thread Safety
//!
//! All traits require `Send + Sync`. Methods take `&self`; the backend
//! serializes access to the container internally.
//!
//! ## Object Safety
//!
//! All traits are object-safe and can be used as trait objects:
//!
//! ```rust
//! use zipfs::Fs;
//!
//! fn process(fs: &dyn Fs) {
//!     let _ = fs.read(std::path::Path::new("/file.txt"));
//! }
//! ```

mod fs_dir;
mod fs_inode;
mod fs_read;
mod fs_stats;
mod fs_write;

// Layer 1 - Core traits
pub use fs_dir::{FsDir, ReadDirIter};
pub use fs_read::FsRead;
pub use fs_write::FsWrite;

// Layer 2 - FUSE traits
pub use fs_inode::FsInode;
pub use fs_stats::FsStats;

/// Path-based filesystem over an archive.
///
/// Combines reading ([`FsRead`]), writing ([`FsWrite`]), and directory
/// operations ([`FsDir`]).
///
/// # Blanket Implementation
///
/// Automatically implemented for any type that implements all three
/// component traits.
///
/// # Example
///
/// ```rust
/// use zipfs::{Fs, FsError};
/// use std::path::Path;
///
/// fn backup_file<B: Fs>(fs: &B, src: &Path, dst: &Path) -> Result<(), FsError> {
///     let data = fs.read(src)?;
///     fs.write(dst, &data)
/// }
/// ```
pub trait Fs: FsRead + FsWrite + FsDir {}

// Blanket implementation - any type implementing all three gets Fs for free
impl<T: FsRead + FsWrite + FsDir> Fs for T {}

/// FUSE-mountable filesystem.
///
/// Extends [`Fs`] with inode translation ([`FsInode`]) and capacity
/// reporting ([`FsStats`]).
///
/// # Blanket Implementation
///
/// Automatically implemented for any type implementing `Fs + FsInode + FsStats`.
///
/// # Example
///
/// ```rust
/// use zipfs::{FsFuse, FsError, ROOT_INODE};
/// use std::ffi::OsStr;
///
/// fn fuse_lookup<B: FsFuse>(fs: &B, name: &str) -> Result<u64, FsError> {
///     let child = fs.lookup(ROOT_INODE, OsStr::new(name))?;
///     let meta = fs.metadata_by_inode(child)?;
///     assert_eq!(meta.inode, child);
///     Ok(child)
/// }
/// ```
pub trait FsFuse: Fs + FsInode + FsStats {}

// Blanket implementation
impl<T: Fs + FsInode + FsStats> FsFuse for T {}
