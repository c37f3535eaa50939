//! ZIP container with staged, whole-entry mutations.
//!
//! The `zip` crate reads a finished archive and writes a new one; it cannot
//! patch an archive in place. [`ZipContainer`] therefore keeps a plan of the
//! entries the next image should contain. Untouched entries point back at
//! their record in the open archive and are raw-copied on finalize, so their
//! compressed bytes are never inflated. Replaced entries carry their full
//! contents in memory.

use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use chrono::{Datelike, NaiveDate, Timelike, Utc};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipArchive, ZipWriter};

use super::{EntryIndex, EntryStat};
use crate::FsError;

/// Compression applied to entries written by the filesystem.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Compression {
    /// Store bytes as-is.
    Stored,
    /// Deflate (the ZIP default).
    #[default]
    Deflated,
}

impl From<Compression> for CompressionMethod {
    fn from(c: Compression) -> Self {
        match c {
            Compression::Stored => CompressionMethod::Stored,
            Compression::Deflated => CompressionMethod::Deflated,
        }
    }
}

/// Where the bytes of a planned entry come from.
#[derive(Debug)]
enum Source {
    /// Record `index` of the open archive.
    Stored(usize),
    /// Full replacement contents.
    Buffer(Vec<u8>),
}

#[derive(Debug)]
struct Planned {
    stat: EntryStat,
    source: Source,
    /// Modification time was changed and must be rewritten.
    retimed: bool,
}

/// An open ZIP container plus the changes staged against it.
///
/// Queries through [`EntryIndex`] observe staged changes immediately. Nothing
/// reaches the file until [`finalize`](Self::finalize).
#[derive(Debug)]
pub struct ZipContainer {
    path: PathBuf,
    archive: Option<ZipArchive<File>>,
    plan: Vec<Planned>,
    compression: Compression,
    modified: SystemTime,
    dirty: bool,
}

impl ZipContainer {
    /// Open the container at `path`.
    ///
    /// A missing file is an empty container; it is created by the first
    /// finalize that has something to write.
    ///
    /// # Errors
    ///
    /// - [`FsError::Io`] if the file exists but cannot be opened
    /// - [`FsError::Codec`] if the file is not a readable ZIP archive
    pub fn open(path: &Path, compression: Compression) -> Result<Self, FsError> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %path.display(), "container does not exist yet, starting empty");
                return Ok(Self {
                    path: path.to_path_buf(),
                    archive: None,
                    plan: Vec::new(),
                    compression,
                    modified: SystemTime::now(),
                    dirty: false,
                });
            }
            Err(e) => return Err(FsError::io("open", path, e)),
        };

        let modified = file
            .metadata()
            .and_then(|m| m.modified())
            .unwrap_or(UNIX_EPOCH);
        let mut archive = ZipArchive::new(file).map_err(|e| FsError::codec("open", path, e))?;

        let mut plan = Vec::with_capacity(archive.len());
        for index in 0..archive.len() {
            let entry = archive
                .by_index_raw(index)
                .map_err(|e| FsError::codec("enumerate", path, e))?;
            plan.push(Planned {
                stat: EntryStat {
                    name: entry.name().to_string(),
                    size: entry.size(),
                    modified: from_zip_time(entry.last_modified()),
                },
                source: Source::Stored(index),
                retimed: false,
            });
        }
        tracing::debug!(path = %path.display(), entries = plan.len(), "container opened");

        Ok(Self {
            path: path.to_path_buf(),
            archive: Some(archive),
            plan,
            compression,
            modified,
            dirty: false,
        })
    }

    /// Path of the container file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns `true` if changes are staged but not yet finalized.
    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Read the full decompressed contents of an entry.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if no entry has this name
    /// - [`FsError::Codec`] if decompression fails
    pub fn read(&mut self, name: &str) -> Result<Vec<u8>, FsError> {
        let pos = self.position(name).ok_or_else(|| FsError::NotFound {
            path: PathBuf::from(name),
        })?;
        match &self.plan[pos].source {
            Source::Buffer(data) => Ok(data.clone()),
            Source::Stored(index) => {
                let index = *index;
                self.read_stored(index, name)
            }
        }
    }

    /// Stage a create-or-overwrite of `name` with `data`.
    pub fn stage_replace(&mut self, name: &str, data: Vec<u8>, modified: SystemTime) {
        let stat = EntryStat {
            name: name.to_string(),
            size: data.len() as u64,
            modified,
        };
        let planned = Planned {
            stat,
            source: Source::Buffer(data),
            retimed: true,
        };
        match self.position(name) {
            Some(pos) => self.plan[pos] = planned,
            None => self.plan.push(planned),
        }
        self.dirty = true;
    }

    /// Stage removal of `name`.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if no entry has this name
    pub fn stage_delete(&mut self, name: &str) -> Result<(), FsError> {
        let pos = self.position(name).ok_or_else(|| FsError::NotFound {
            path: PathBuf::from(name),
        })?;
        self.plan.remove(pos);
        self.dirty = true;
        Ok(())
    }

    /// Stage renaming entry `from` to `to`.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if `from` does not exist
    /// - [`FsError::AlreadyExists`] if `to` is already taken
    pub fn stage_rename(&mut self, from: &str, to: &str) -> Result<(), FsError> {
        if self.position(to).is_some() {
            return Err(FsError::AlreadyExists {
                path: PathBuf::from(to),
                operation: "rename",
            });
        }
        let pos = self.position(from).ok_or_else(|| FsError::NotFound {
            path: PathBuf::from(from),
        })?;
        self.plan[pos].stat.name = to.to_string();
        self.dirty = true;
        Ok(())
    }

    /// Stage a new modification time for `name`.
    ///
    /// # Errors
    ///
    /// - [`FsError::NotFound`] if no entry has this name
    pub fn stage_set_modified(&mut self, name: &str, modified: SystemTime) -> Result<(), FsError> {
        let pos = self.position(name).ok_or_else(|| FsError::NotFound {
            path: PathBuf::from(name),
        })?;
        let planned = &mut self.plan[pos];
        planned.stat.modified = modified;
        planned.retimed = true;
        self.dirty = true;
        Ok(())
    }

    /// Write the planned image to disk and close the container.
    ///
    /// The image is built in a temporary file next to the container and then
    /// renamed over it, so a failure leaves the previous container intact.
    ///
    /// # Errors
    ///
    /// - [`FsError::Codec`] / [`FsError::Io`] if any entry cannot be copied or
    ///   written, or the rename fails
    pub fn finalize(mut self) -> Result<(), FsError> {
        if !self.dirty {
            return Ok(());
        }

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let tmp = tempfile::NamedTempFile::new_in(&dir)
            .map_err(|e| FsError::io("commit", &self.path, e))?;
        let mut writer = ZipWriter::new(tmp);

        let plan = std::mem::take(&mut self.plan);
        let count = plan.len();
        for planned in plan {
            self.write_entry(&mut writer, planned)?;
        }

        let tmp = writer
            .finish()
            .map_err(|e| FsError::codec("commit", &self.path, e))?;
        // Release the old image before it is replaced.
        self.archive = None;
        tmp.persist(&self.path)
            .map_err(|e| FsError::io("commit", &self.path, e.error))?;

        tracing::debug!(path = %self.path.display(), entries = count, "container finalized");
        Ok(())
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.plan.iter().position(|p| p.stat.name == name)
    }

    fn read_stored(&mut self, index: usize, name: &str) -> Result<Vec<u8>, FsError> {
        let archive = self.archive.as_mut().ok_or_else(|| {
            FsError::Backend(format!("entry {name} refers to a closed archive"))
        })?;
        let mut entry = archive
            .by_index(index)
            .map_err(|e| FsError::codec("read", name, e))?;
        let mut data = Vec::with_capacity(usize::try_from(entry.size()).unwrap_or(0));
        entry
            .read_to_end(&mut data)
            .map_err(|e| FsError::io("read", name, e))?;
        Ok(data)
    }

    fn write_entry(
        &mut self,
        writer: &mut ZipWriter<tempfile::NamedTempFile>,
        planned: Planned,
    ) -> Result<(), FsError> {
        let Planned {
            stat,
            source,
            retimed,
        } = planned;

        match source {
            Source::Stored(index) if !retimed => {
                let archive = self.archive.as_mut().ok_or_else(|| {
                    FsError::Backend(format!("entry {} refers to a closed archive", stat.name))
                })?;
                let entry = archive
                    .by_index_raw(index)
                    .map_err(|e| FsError::codec("commit", &stat.name, e))?;
                writer
                    .raw_copy_file_rename(entry, stat.name.as_str())
                    .map_err(|e| FsError::codec("commit", &stat.name, e))
            }
            Source::Stored(index) => {
                let data = self.read_stored(index, &stat.name)?;
                self.write_bytes(writer, &stat, &data)
            }
            Source::Buffer(data) => self.write_bytes(writer, &stat, &data),
        }
    }

    fn write_bytes(
        &self,
        writer: &mut ZipWriter<tempfile::NamedTempFile>,
        stat: &EntryStat,
        data: &[u8],
    ) -> Result<(), FsError> {
        let options = FileOptions::default()
            .compression_method(self.compression.into())
            .last_modified_time(to_zip_time(stat.modified))
            .large_file(data.len() as u64 >= u64::from(u32::MAX));

        if stat.is_dir() {
            return writer
                .add_directory(stat.name.as_str(), options)
                .map_err(|e| FsError::codec("commit", &stat.name, e));
        }

        writer
            .start_file(stat.name.as_str(), options)
            .map_err(|e| FsError::codec("commit", &stat.name, e))?;
        writer
            .write_all(data)
            .map_err(|e| FsError::io("commit", &stat.name, e))
    }
}

impl EntryIndex for ZipContainer {
    fn entries(&self) -> Box<dyn Iterator<Item = &EntryStat> + '_> {
        Box::new(self.plan.iter().map(|p| &p.stat))
    }

    fn modified(&self) -> SystemTime {
        self.modified
    }
}

/// Convert a DOS timestamp to `SystemTime`, reading it as UTC.
fn from_zip_time(t: zip::DateTime) -> SystemTime {
    NaiveDate::from_ymd_opt(i32::from(t.year()), u32::from(t.month()), u32::from(t.day()))
        .and_then(|d| d.and_hms_opt(u32::from(t.hour()), u32::from(t.minute()), u32::from(t.second())))
        .and_then(|dt| u64::try_from(dt.and_utc().timestamp()).ok())
        .map(|secs| UNIX_EPOCH + Duration::from_secs(secs))
        .unwrap_or(UNIX_EPOCH)
}

/// Convert `SystemTime` to a DOS timestamp in UTC, clamped to 1980..=2107.
///
/// DOS time has a two-second resolution; odd seconds round down.
fn to_zip_time(time: SystemTime) -> zip::DateTime {
    let dt: chrono::DateTime<Utc> = time.into();
    match dt.year() {
        year if year < 1980 => zip::DateTime::default(),
        year if year > 2107 => {
            zip::DateTime::from_date_and_time(2107, 12, 31, 23, 59, 58).unwrap_or_default()
        }
        year => zip::DateTime::from_date_and_time(
            year as u16,
            dt.month() as u8,
            dt.day() as u8,
            dt.hour() as u8,
            dt.minute() as u8,
            dt.second() as u8,
        )
        .unwrap_or_default(),
    }
}
