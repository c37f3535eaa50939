//! # Archive Access
//!
//! The container side of the filesystem: a flat list of named entries stored
//! in a ZIP file, plus the handle that owns it.
//!
//! ## Responsibility
//! - Expose read-only entry queries through [`EntryIndex`]
//! - Stage whole-entry replacements, deletes, renames and time updates
//!   ([`ZipContainer`])
//! - Make staged changes durable through a single chokepoint,
//!   [`ArchiveHandle::commit`]
//!
//! ## Entry Names
//!
//! Entry names are slash-delimited with no leading separator. A trailing
//! separator marks a directory entry:
//!
//! ```text
//! docs/             directory entry
//! docs/readme.txt   file entry
//! ```

mod container;
mod handle;

use std::time::SystemTime;

pub use container::{Compression, ZipContainer};
pub use handle::ArchiveHandle;

/// Raw metadata of one container entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntryStat {
    /// Native entry name (`a/b` or `a/b/`).
    pub name: String,
    /// Decompressed size in bytes.
    pub size: u64,
    /// Recorded modification time.
    pub modified: SystemTime,
}

impl EntryStat {
    /// Returns `true` if the name carries a trailing separator.
    #[inline]
    pub fn is_dir(&self) -> bool {
        self.name.ends_with('/')
    }
}

/// Read-only view of the flat entry namespace.
///
/// Path classification, listing and attribute synthesis only need these
/// queries, so they take `&dyn EntryIndex` rather than a concrete container.
pub trait EntryIndex {
    /// Iterate over every entry in the container.
    fn entries(&self) -> Box<dyn Iterator<Item = &EntryStat> + '_>;

    /// Locate an entry by its exact name.
    fn locate(&self, name: &str) -> Option<&EntryStat> {
        self.entries().find(|e| e.name == name)
    }

    /// Returns `true` if an entry with exactly this name exists.
    fn contains(&self, name: &str) -> bool {
        self.locate(name).is_some()
    }

    /// Returns `true` if any entry name starts with `prefix` (other than the
    /// prefix entry itself).
    fn has_entries_under(&self, prefix: &str) -> bool {
        self.entries()
            .any(|e| e.name.len() > prefix.len() && e.name.starts_with(prefix))
    }

    /// Modification time of the container itself.
    fn modified(&self) -> SystemTime {
        SystemTime::UNIX_EPOCH
    }
}

impl EntryIndex for Vec<EntryStat> {
    fn entries(&self) -> Box<dyn Iterator<Item = &EntryStat> + '_> {
        Box::new(self.iter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stat(name: &str) -> EntryStat {
        EntryStat {
            name: name.into(),
            size: 0,
            modified: SystemTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn entry_stat_is_dir_follows_trailing_separator() {
        assert!(stat("docs/").is_dir());
        assert!(!stat("docs/readme.txt").is_dir());
    }

    #[test]
    fn vec_index_locate_is_exact() {
        let index = vec![stat("docs/"), stat("docs/readme.txt")];
        assert!(index.contains("docs/"));
        assert!(!index.contains("docs"));
        assert!(index.locate("docs/readme.txt").is_some());
    }

    #[test]
    fn has_entries_under_ignores_prefix_entry() {
        let index = vec![stat("empty/"), stat("full/"), stat("full/a")];
        assert!(!index.has_entries_under("empty/"));
        assert!(index.has_entries_under("full/"));
    }

    #[test]
    fn entry_index_is_object_safe() {
        fn _check(_: &dyn EntryIndex) {}
    }
}
