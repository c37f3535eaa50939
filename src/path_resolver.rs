//! # PathResolver
//!
//! Classifies a virtual path against the flat entry namespace.
//!
//! ## Responsibility
//! - Normalize incoming absolute paths
//! - Map a virtual path to its file (`a/b`) and directory (`a/b/`) entry names
//! - Decide whether a path is the root, a directory, a file or missing
//!
//! ## Dependencies
//! - [`EntryIndex`] for entry lookups
//!
//! ## Usage
//!
//! ```rust
//! use zipfs::{EntryIndex, EntryProbeResolver, EntryStat, NodeKind, PathResolver};
//! use std::path::Path;
//! use std::time::SystemTime;
//!
//! let index = vec![EntryStat {
//!     name: "docs/".into(),
//!     size: 0,
//!     modified: SystemTime::UNIX_EPOCH,
//! }];
//! let kind = EntryProbeResolver.classify(Path::new("/docs"), &index);
//! assert_eq!(kind, NodeKind::Directory);
//! ```

use std::path::{Component, Path, PathBuf};

use crate::archive::EntryIndex;
use crate::NodeKind;

// ============================================================================
// Trait Definition
// ============================================================================

/// Strategy trait for path classification.
///
/// Implementations never fail: a path that cannot be mapped onto an entry
/// name classifies as [`NodeKind::Missing`].
///
/// # Thread Safety
///
/// All implementations must be `Send + Sync` to support concurrent access.
///
/// # Object Safety
///
/// Uses `&dyn EntryIndex` to remain object-safe.
pub trait PathResolver: Send + Sync {
    /// Classify `path` against `index`.
    fn classify(&self, path: &Path, index: &dyn EntryIndex) -> NodeKind;
}

/// Resolver that requires an explicit entry for every node.
///
/// Probes `name/` first and `name` second, so a path is never both a
/// directory and a file. A path spelled with a trailing separator only ever
/// resolves to a directory.
#[derive(Debug, Clone, Copy, Default)]
pub struct EntryProbeResolver;

impl PathResolver for EntryProbeResolver {
    fn classify(&self, path: &Path, index: &dyn EntryIndex) -> NodeKind {
        let Some(name) = normalize(path) else {
            return NodeKind::Missing;
        };
        if name.is_empty() {
            return NodeKind::Root;
        }
        if index.contains(&format!("{name}/")) {
            NodeKind::Directory
        } else if has_trailing_separator(path) {
            // `file/` names a directory that does not exist.
            NodeKind::Missing
        } else if index.contains(&name) {
            NodeKind::File
        } else {
            NodeKind::Missing
        }
    }
}

// ============================================================================
// Name mapping
// ============================================================================

/// Normalize a virtual path to a separator-joined name without leading or
/// trailing separator. The root normalizes to `""`.
///
/// `.` components and repeated separators are dropped; `..` pops a
/// component. Returns `None` for paths that are not valid UTF-8.
pub fn normalize(path: &Path) -> Option<String> {
    let mut parts: Vec<&str> = Vec::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_str()?),
            Component::ParentDir => {
                parts.pop();
            }
            Component::RootDir | Component::CurDir | Component::Prefix(_) => {}
        }
    }
    Some(parts.join("/"))
}

fn has_trailing_separator(path: &Path) -> bool {
    path.as_os_str().as_encoded_bytes().last() == Some(&b'/')
}

/// Normalized virtual path (always starting with `/`).
pub fn canonical(path: &Path) -> Option<PathBuf> {
    normalize(path).map(|name| virtual_path(&name))
}

/// File-form entry name for `path` (`/a/b` → `a/b`). `None` for the root.
pub fn entry_name(path: &Path) -> Option<String> {
    normalize(path).filter(|name| !name.is_empty())
}

/// Directory-form entry name for `path` (`/a/b` → `a/b/`). `None` for the root.
pub fn dir_entry_name(path: &Path) -> Option<String> {
    entry_name(path).map(|name| name + "/")
}

/// Virtual path for an entry name (`a/b/` → `/a/b`).
pub fn virtual_path(entry_name: &str) -> PathBuf {
    PathBuf::from(format!("/{}", entry_name.trim_end_matches('/')))
}

// ============================================================================
// Tests
// ============================================================================
