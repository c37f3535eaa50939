//! # zipfs
//!
//! A ZIP archive mounted as a read-write filesystem.
//!
//! The archive stores a flat list of named entries; this crate presents them
//! as a directory tree and turns POSIX-style requests into whole-entry
//! rewrites of the container.
//!
//! ---
//!
//! ## Quick Start
//!
//! ```rust
//! use zipfs::{FsDir, FsRead, FsWrite, ZipFs};
//! use std::path::Path;
//!
//! let dir = tempfile::tempdir()?;
//! let fs = ZipFs::open(dir.path().join("notes.zip"))?;
//!
//! fs.create_dir(Path::new("/docs"))?;
//! fs.write_at(Path::new("/docs/readme.txt"), b"aaaa", 0)?;
//! fs.write_at(Path::new("/docs/readme.txt"), b"bb", 1)?;
//! assert_eq!(fs.read(Path::new("/docs/readme.txt"))?, b"abba");
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ---
//!
//! ## Components
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`archive`] | Container access: [`EntryIndex`], [`ZipContainer`], [`ArchiveHandle`] |
//! | [`PathResolver`] | Classifies a virtual path as root, directory, file or missing |
//! | [`namespace`] | Directory listings derived from entry names |
//! | [`attributes`] | Attributes synthesized from raw entry metadata |
//! | [`MutationCoordinator`] | Read-modify-replace-commit transactions |
//! | [`ZipFs`] | The backend implementing the trait hierarchy |
//!
//! ---
//!
//! ## Trait Hierarchy
//!
//! ```text
//! Layer 1 (Core):  FsRead + FsWrite + FsDir = Fs
//!                                            ↓
//! Layer 2 (FUSE):  Fs + FsInode + FsStats   = FsFuse
//! ```
//!
//! ---
//!
//! ## Error Handling
//!
//! All operations return `Result<T, FsError>`. Errors include context and map
//! onto a POSIX error number:
//!
//! ```rust
//! use zipfs::FsError;
//! use std::path::PathBuf;
//!
//! let err = FsError::NotFound { path: PathBuf::from("/missing.txt") };
//! assert_eq!(err.to_string(), "not found: /missing.txt");
//! assert_eq!(err.errno(), libc::ENOENT);
//! ```
//!
//! ---
//!
//! ## Thread Safety
//!
//! All traits require `Send + Sync` and take `&self`. [`ZipFs`] serializes
//! every request on its archive handle, so it can be shared through `Arc`.
//!
//! ---
//!
//! ## Feature Flags
//!
//! | Feature | Description |
//! |---------|-------------|
//! | `fuse` | The `fuse` module, the `zipfs` mount binary |
//! | `serde` | Serialization for [`Metadata`], [`DirEntry`], [`StatFs`], etc. |

// Private modules
mod backend;
mod coordinator;
mod error;
mod ext;
mod path_resolver;
mod traits;
mod types;

// Public modules
pub mod archive;
pub mod attributes;
pub mod namespace;

#[cfg(feature = "fuse")]
pub mod fuse;

// Public re-exports - error types
pub use error::FsError;

// Public re-exports - core types
pub use types::{
    DirEntry, FileType, Metadata, NodeKind, Permissions, StatFs, DIR_NLINK, ROOT_INODE, ROOT_SIZE,
};

// Public re-exports - archive access
pub use archive::{ArchiveHandle, Compression, EntryIndex, EntryStat, ZipContainer};

// Public re-exports - path resolution
pub use path_resolver::{
    canonical, dir_entry_name, entry_name, normalize, virtual_path, EntryProbeResolver,
    PathResolver,
};

// Public re-exports - mutations
pub use coordinator::MutationCoordinator;

// Public re-exports - Layer 1 core traits
pub use traits::{Fs, FsDir, FsRead, FsWrite, ReadDirIter};

// Public re-exports - Layer 2 FUSE traits
pub use traits::{FsFuse, FsInode, FsStats};

// Public re-exports - backend
pub use backend::{ZipFs, ZipFsOptions};

// Public re-exports - infrastructure
pub use ext::FsExt;

// Conditional re-exports
#[cfg(feature = "serde")]
pub use ext::FsExtJson;
