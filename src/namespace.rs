//! # NamespaceView
//!
//! Directory listings computed from the flat entry namespace.
//!
//! Nothing is cached: every listing scans all entries and keeps those whose
//! immediate parent is the listed directory. The immediate parent of an entry
//! is its name with the final component removed, where the trailing separator
//! of a directory entry is not a component boundary:
//!
//! ```text
//! docs/readme.txt   parent "docs"   child "readme.txt" (file)
//! docs/img/         parent "docs"   child "img"        (directory)
//! docs/             parent ""       child "docs"       (directory)
//! ```

use std::ops::ControlFlow;
use std::path::Path;

use crate::archive::EntryIndex;
use crate::path_resolver::{self, PathResolver};
use crate::{FsError, NodeKind};

/// Split an entry name into `(parent, child, kind)`.
///
/// Returns `None` for names with an empty final component.
pub fn split_entry(name: &str) -> Option<(&str, &str, NodeKind)> {
    let (trimmed, kind) = match name.strip_suffix('/') {
        Some(dir) => (dir, NodeKind::Directory),
        None => (name, NodeKind::File),
    };
    let (parent, child) = trimmed.rsplit_once('/').unwrap_or(("", trimmed));
    if child.is_empty() {
        None
    } else {
        Some((parent, child, kind))
    }
}

/// Visit the children of `dir`, starting with `.` and `..`.
///
/// The visitor returns [`ControlFlow::Break`] to stop the scan early.
/// A file entry that shares its name with a directory entry is reported once,
/// as the directory.
///
/// Explicit directories, the root and implicit prefixes (a path that only
/// exists as the parent of some entry) can be listed.
///
/// # Errors
///
/// - [`FsError::NotADirectory`] if `dir` is a file
/// - [`FsError::NotFound`] if nothing lives at or beneath `dir`
pub fn for_each_child<F>(
    dir: &Path,
    index: &dyn EntryIndex,
    resolver: &dyn PathResolver,
    mut visit: F,
) -> Result<(), FsError>
where
    F: FnMut(&str, NodeKind) -> ControlFlow<()>,
{
    let parent = listable_name(dir, index, resolver)?;
    tracing::trace!(dir = %dir.display(), "listing directory");

    for synthetic in [".", ".."] {
        if visit(synthetic, NodeKind::Directory).is_break() {
            return Ok(());
        }
    }

    for entry in index.entries() {
        let Some((entry_parent, child, kind)) = split_entry(&entry.name) else {
            continue;
        };
        if entry_parent != parent {
            continue;
        }
        if kind == NodeKind::File && index.contains(&format!("{}/", entry.name)) {
            continue;
        }
        if visit(child, kind).is_break() {
            break;
        }
    }
    Ok(())
}

/// Collect the children of `dir`, starting with `.` and `..`.
///
/// # Errors
///
/// See [`for_each_child`].
pub fn children(
    dir: &Path,
    index: &dyn EntryIndex,
    resolver: &dyn PathResolver,
) -> Result<Vec<(String, NodeKind)>, FsError> {
    let mut out = Vec::new();
    for_each_child(dir, index, resolver, |name, kind| {
        out.push((name.to_string(), kind));
        ControlFlow::Continue(())
    })?;
    Ok(out)
}

fn listable_name(
    dir: &Path,
    index: &dyn EntryIndex,
    resolver: &dyn PathResolver,
) -> Result<String, FsError> {
    match resolver.classify(dir, index) {
        NodeKind::Root => Ok(String::new()),
        NodeKind::Directory => path_resolver::entry_name(dir).ok_or_else(|| FsError::NotFound {
            path: dir.to_path_buf(),
        }),
        NodeKind::File => Err(FsError::NotADirectory {
            path: dir.to_path_buf(),
        }),
        NodeKind::Missing => path_resolver::entry_name(dir)
            .filter(|name| index.has_entries_under(&format!("{name}/")))
            .ok_or_else(|| FsError::NotFound {
                path: dir.to_path_buf(),
            }),
    }
}
