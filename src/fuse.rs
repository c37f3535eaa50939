//! # FUSE adapter
//!
//! Serves any [`FsFuse`] backend to the kernel through `fuser`.
//!
//! ## Responsibility
//! - Translate inode-addressed kernel requests into path-based trait calls
//! - Convert [`Metadata`] into `fuser::FileAttr`
//! - Report failures as POSIX error numbers via [`FsError::errno`]
//!
//! Every write-class request is committed by the backend before the reply
//! is sent, so `flush`, `fsync` and `release` have nothing left to do.
//!
//! `opendir` takes a snapshot of the listing and `readdir` pages through it,
//! so entries removed between two pages do not shift the offsets of the rest.
//!
//! ## Usage
//!
//! ```no_run
//! use zipfs::fuse::{mount, MountOptions};
//! use zipfs::ZipFs;
//!
//! let fs = ZipFs::open("/tmp/data.zip")?;
//! mount(fs, "/mnt/zip", &MountOptions::default())?;
//! # Ok::<(), zipfs::FsError>(())
//! ```

use std::collections::HashMap;
use std::ffi::OsStr;
use std::ops::ControlFlow;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use fuser::{
    FileAttr, Filesystem, KernelConfig, MountOption, ReplyAttr, ReplyCreate, ReplyData,
    ReplyDirectory, ReplyEmpty, ReplyEntry, ReplyOpen, ReplyStatfs, ReplyWrite, Request,
    TimeOrNow,
};

use crate::{DirEntry, FileType, FsError, FsFuse, Metadata};

/// Block size used for the `blocks` attribute.
const ATTR_BLOCK_SIZE: u64 = 512;

/// `renameat2(2)` flag refusing to replace an existing destination.
const RENAME_NOREPLACE: u32 = 1;

// ============================================================================
// Mount options
// ============================================================================

/// Options for [`mount`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountOptions {
    /// Filesystem name shown in mount output.
    pub fsname: String,
    /// Mount read-only.
    pub read_only: bool,
    /// Allow other users to access the mount.
    pub allow_other: bool,
    /// Unmount automatically when the process exits.
    pub auto_unmount: bool,
    /// How long the kernel may cache attributes and entries.
    pub ttl: Duration,
}

impl Default for MountOptions {
    fn default() -> Self {
        Self {
            fsname: "zipfs".to_string(),
            read_only: false,
            allow_other: false,
            auto_unmount: true,
            ttl: Duration::from_secs(1),
        }
    }
}

impl MountOptions {
    /// The `fuser` mount options these settings translate to.
    pub fn mount_options(&self) -> Vec<MountOption> {
        let mut options = vec![
            MountOption::FSName(self.fsname.clone()),
            MountOption::Subtype("zipfs".to_string()),
            MountOption::DefaultPermissions,
        ];
        if self.read_only {
            options.push(MountOption::RO);
        } else {
            options.push(MountOption::RW);
        }
        if self.allow_other {
            options.push(MountOption::AllowOther);
        }
        if self.auto_unmount {
            options.push(MountOption::AutoUnmount);
        }
        options
    }
}

/// Mount `fs` at `mountpoint`, blocking until it is unmounted.
///
/// # Errors
///
/// - [`FsError::Io`] if the mount fails or the session ends with an error
pub fn mount<B>(fs: B, mountpoint: impl AsRef<Path>, options: &MountOptions) -> Result<(), FsError>
where
    B: FsFuse + 'static,
{
    let mountpoint = mountpoint.as_ref();
    tracing::info!(
        mountpoint = %mountpoint.display(),
        fsname = %options.fsname,
        read_only = options.read_only,
        "mounting"
    );
    fuser::mount2(ZipFuse::new(fs, options), mountpoint, &options.mount_options())
        .map_err(|e| FsError::io("mount", mountpoint, e))
}

// ============================================================================
// Adapter
// ============================================================================

/// `fuser::Filesystem` implementation over an [`FsFuse`] backend.
pub struct ZipFuse<B: FsFuse> {
    fs: B,
    ttl: Duration,
    read_only: bool,
    // Listing snapshots keyed by directory handle.
    open_dirs: HashMap<u64, Vec<DirEntry>>,
    next_fh: u64,
}

impl<B: FsFuse> ZipFuse<B> {
    /// Wrap `fs` using the cache TTL and read-only flag of `options`.
    pub fn new(fs: B, options: &MountOptions) -> Self {
        Self {
            fs,
            ttl: options.ttl,
            read_only: options.read_only,
            open_dirs: HashMap::new(),
            next_fh: 1,
        }
    }

    fn child_path(&self, parent: u64, name: &OsStr) -> Result<PathBuf, FsError> {
        Ok(self.fs.inode_to_path(parent)?.join(name))
    }

    fn listing(&self, ino: u64) -> Result<Vec<DirEntry>, FsError> {
        let path = self.fs.inode_to_path(ino)?;
        let mut entries = Vec::new();
        self.fs.visit_dir(&path, &mut |entry| {
            entries.push(entry);
            ControlFlow::Continue(())
        })?;
        Ok(entries)
    }

    fn attr_of_path(&self, req: &Request<'_>, path: &Path) -> Result<FileAttr, FsError> {
        let meta = self.fs.metadata(path)?;
        Ok(file_attr(&meta, req.uid(), req.gid()))
    }

    fn attr_of_inode(&self, req: &Request<'_>, ino: u64) -> Result<FileAttr, FsError> {
        let meta = self.fs.metadata_by_inode(ino)?;
        Ok(file_attr(&meta, req.uid(), req.gid()))
    }

    fn set_attr(
        &self,
        req: &Request<'_>,
        ino: u64,
        size: Option<u64>,
        mtime: Option<TimeOrNow>,
    ) -> Result<FileAttr, FsError> {
        let path = self.fs.inode_to_path(ino)?;
        if let Some(size) = size {
            self.fs.truncate(&path, size)?;
        }
        if let Some(mtime) = mtime {
            let when = match mtime {
                TimeOrNow::SpecificTime(t) => t,
                TimeOrNow::Now => SystemTime::now(),
            };
            self.fs.set_modified(&path, when)?;
        }
        self.attr_of_inode(req, ino)
    }
}

/// Kernel attributes for `meta`, owned by `uid`/`gid`.
pub fn file_attr(meta: &Metadata, uid: u32, gid: u32) -> FileAttr {
    FileAttr {
        ino: meta.inode,
        size: meta.size,
        blocks: meta.size.div_ceil(ATTR_BLOCK_SIZE),
        atime: meta.modified,
        mtime: meta.modified,
        ctime: meta.modified,
        crtime: meta.modified,
        kind: kind_of(meta.file_type),
        perm: u16::try_from(meta.permissions.mode()).unwrap_or(0o777),
        nlink: u32::try_from(meta.nlink).unwrap_or(u32::MAX),
        uid,
        gid,
        rdev: 0,
        blksize: ATTR_BLOCK_SIZE as u32,
        flags: 0,
    }
}

/// Entries of `listing` that follow the kernel's resume `offset`, paired with
/// their own offsets. `.` has offset 1, `..` offset 2.
fn dir_page(listing: &[DirEntry], offset: i64) -> impl Iterator<Item = (i64, &DirEntry)> {
    let skip = usize::try_from(offset).unwrap_or(0);
    (1..).zip(listing).skip(skip)
}

/// Whether a rename with `flags` must leave an existing destination alone.
///
/// Only `RENAME_NOREPLACE` is honored; `RENAME_EXCHANGE` and `RENAME_WHITEOUT`
/// are rejected with `EINVAL`.
fn rename_no_replace(flags: u32) -> Result<bool, i32> {
    match flags {
        0 => Ok(false),
        RENAME_NOREPLACE => Ok(true),
        _ => Err(libc::EINVAL),
    }
}

fn kind_of(file_type: FileType) -> fuser::FileType {
    match file_type {
        FileType::File => fuser::FileType::RegularFile,
        FileType::Directory => fuser::FileType::Directory,
    }
}

fn reply_error(op: &'static str, err: &FsError) -> i32 {
    if err.is_codec_failure() {
        tracing::error!(op, error = %err, "request failed");
    } else {
        tracing::debug!(op, error = %err, "request rejected");
    }
    err.errno()
}

impl<B: FsFuse> Filesystem for ZipFuse<B> {
    fn init(&mut self, _req: &Request<'_>, _config: &mut KernelConfig) -> Result<(), libc::c_int> {
        match self.fs.statfs() {
            Ok(stats) => {
                tracing::info!(entries = stats.entries, bytes = stats.used_bytes, "filesystem initialized");
                Ok(())
            }
            Err(e) => Err(reply_error("init", &e)),
        }
    }

    fn destroy(&mut self) {
        tracing::info!("filesystem unmounted");
    }

    fn lookup(&mut self, req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEntry) {
        let result = self
            .fs
            .lookup(parent, name)
            .and_then(|ino| self.attr_of_inode(req, ino));
        match result {
            Ok(attr) => reply.entry(&self.ttl, &attr, 0),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn getattr(&mut self, req: &Request<'_>, ino: u64, reply: ReplyAttr) {
        match self.attr_of_inode(req, ino) {
            Ok(attr) => reply.attr(&self.ttl, &attr),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn setattr(
        &mut self,
        req: &Request<'_>,
        ino: u64,
        _mode: Option<u32>,
        _uid: Option<u32>,
        _gid: Option<u32>,
        size: Option<u64>,
        _atime: Option<TimeOrNow>,
        mtime: Option<TimeOrNow>,
        _ctime: Option<SystemTime>,
        _fh: Option<u64>,
        _crtime: Option<SystemTime>,
        _chgtime: Option<SystemTime>,
        _bkuptime: Option<SystemTime>,
        _flags: Option<u32>,
        reply: ReplyAttr,
    ) {
        match self.set_attr(req, ino, size, mtime) {
            Ok(attr) => reply.attr(&self.ttl, &attr),
            Err(e) => reply.error(reply_error("setattr", &e)),
        }
    }

    fn open(&mut self, _req: &Request<'_>, ino: u64, flags: i32, reply: ReplyOpen) {
        let write_flags = libc::O_WRONLY | libc::O_RDWR | libc::O_APPEND | libc::O_TRUNC;
        let wants_write = flags & write_flags != 0;
        match self.fs.metadata_by_inode(ino) {
            Ok(meta) if meta.is_dir() => reply.error(libc::EISDIR),
            Ok(meta) if wants_write && (self.read_only || meta.permissions.readonly()) => {
                reply.error(libc::EROFS)
            }
            // Stateless: every request resolves its inode again.
            Ok(_) => reply.opened(0, 0),
            Err(e) => reply.error(e.errno()),
        }
    }

    fn read(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        size: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyData,
    ) {
        let Ok(offset) = u64::try_from(offset) else {
            reply.error(libc::EINVAL);
            return;
        };
        let result = self
            .fs
            .inode_to_path(ino)
            .and_then(|path| self.fs.read_range(&path, offset, size as usize));
        match result {
            Ok(data) => reply.data(&data),
            Err(e) => reply.error(reply_error("read", &e)),
        }
    }

    fn write(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        _fh: u64,
        offset: i64,
        data: &[u8],
        _write_flags: u32,
        _flags: i32,
        _lock_owner: Option<u64>,
        reply: ReplyWrite,
    ) {
        let Ok(offset) = u64::try_from(offset) else {
            reply.error(libc::EINVAL);
            return;
        };
        let result = self
            .fs
            .inode_to_path(ino)
            .and_then(|path| self.fs.write_at(&path, data, offset));
        match result {
            Ok(written) => reply.written(u32::try_from(written).unwrap_or(u32::MAX)),
            Err(e) => reply.error(reply_error("write", &e)),
        }
    }

    fn create(
        &mut self,
        req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        mode: u32,
        _umask: u32,
        _flags: i32,
        reply: ReplyCreate,
    ) {
        let result = self.child_path(parent, name).and_then(|path| {
            self.fs.mknod(&path, mode)?;
            self.attr_of_path(req, &path)
        });
        match result {
            Ok(attr) => reply.created(&self.ttl, &attr, 0, 0, 0),
            Err(e) => reply.error(reply_error("create", &e)),
        }
    }

    fn mknod(
        &mut self,
        req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        mode: u32,
        _umask: u32,
        _rdev: u32,
        reply: ReplyEntry,
    ) {
        let result = self.child_path(parent, name).and_then(|path| {
            self.fs.mknod(&path, mode)?;
            self.attr_of_path(req, &path)
        });
        match result {
            Ok(attr) => reply.entry(&self.ttl, &attr, 0),
            Err(e) => reply.error(reply_error("mknod", &e)),
        }
    }

    fn mkdir(
        &mut self,
        req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        _mode: u32,
        _umask: u32,
        reply: ReplyEntry,
    ) {
        let result = self.child_path(parent, name).and_then(|path| {
            self.fs.create_dir(&path)?;
            self.attr_of_path(req, &path)
        });
        match result {
            Ok(attr) => reply.entry(&self.ttl, &attr, 0),
            Err(e) => reply.error(reply_error("mkdir", &e)),
        }
    }

    fn unlink(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        let result = self
            .child_path(parent, name)
            .and_then(|path| self.fs.remove_file(&path));
        match result {
            Ok(()) => reply.ok(),
            Err(e) => reply.error(reply_error("unlink", &e)),
        }
    }

    fn rmdir(&mut self, _req: &Request<'_>, parent: u64, name: &OsStr, reply: ReplyEmpty) {
        let result = self
            .child_path(parent, name)
            .and_then(|path| self.fs.remove_dir(&path));
        match result {
            Ok(()) => reply.ok(),
            Err(e) => reply.error(reply_error("rmdir", &e)),
        }
    }

    fn rename(
        &mut self,
        _req: &Request<'_>,
        parent: u64,
        name: &OsStr,
        newparent: u64,
        newname: &OsStr,
        flags: u32,
        reply: ReplyEmpty,
    ) {
        let no_replace = match rename_no_replace(flags) {
            Ok(no_replace) => no_replace,
            Err(errno) => {
                tracing::debug!(flags, "unsupported rename flags");
                reply.error(errno);
                return;
            }
        };
        let result = self.child_path(parent, name).and_then(|from| {
            let to = self.child_path(newparent, newname)?;
            if no_replace && self.fs.exists(&to)? {
                return Err(FsError::AlreadyExists {
                    path: to,
                    operation: "rename",
                });
            }
            self.fs.rename(&from, &to)
        });
        match result {
            Ok(()) => reply.ok(),
            Err(e) => reply.error(reply_error("rename", &e)),
        }
    }

    fn opendir(&mut self, _req: &Request<'_>, ino: u64, _flags: i32, reply: ReplyOpen) {
        match self.listing(ino) {
            Ok(entries) => {
                let fh = self.next_fh;
                self.next_fh += 1;
                self.open_dirs.insert(fh, entries);
                reply.opened(fh, 0);
            }
            Err(e) => reply.error(reply_error("opendir", &e)),
        }
    }

    fn readdir(
        &mut self,
        _req: &Request<'_>,
        ino: u64,
        fh: u64,
        offset: i64,
        mut reply: ReplyDirectory,
    ) {
        let fresh;
        let entries = match self.open_dirs.get(&fh) {
            Some(entries) => entries.as_slice(),
            None => match self.listing(ino) {
                Ok(entries) => {
                    fresh = entries;
                    fresh.as_slice()
                }
                Err(e) => {
                    reply.error(reply_error("readdir", &e));
                    return;
                }
            },
        };
        for (next, entry) in dir_page(entries, offset) {
            // `add` returns true once the reply buffer is full.
            if reply.add(entry.inode, next, kind_of(entry.file_type), &entry.name) {
                break;
            }
        }
        reply.ok();
    }

    fn releasedir(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        fh: u64,
        _flags: i32,
        reply: ReplyEmpty,
    ) {
        self.open_dirs.remove(&fh);
        reply.ok();
    }

    fn release(
        &mut self,
        _req: &Request<'_>,
        _ino: u64,
        _fh: u64,
        _flags: i32,
        _lock_owner: Option<u64>,
        _flush: bool,
        reply: ReplyEmpty,
    ) {
        reply.ok();
    }

    fn flush(&mut self, _req: &Request<'_>, _ino: u64, _fh: u64, _lock_owner: u64, reply: ReplyEmpty) {
        reply.ok();
    }

    fn fsync(&mut self, _req: &Request<'_>, _ino: u64, _fh: u64, _datasync: bool, reply: ReplyEmpty) {
        reply.ok();
    }

    fn statfs(&mut self, _req: &Request<'_>, _ino: u64, reply: ReplyStatfs) {
        match self.fs.statfs() {
            Ok(stats) => {
                let bsize = u32::try_from(stats.block_size).unwrap_or(512);
                let namelen = u32::try_from(stats.max_name_len).unwrap_or(255);
                reply.statfs(
                    stats.used_bytes.div_ceil(stats.block_size.max(1)), // blocks
                    0,                                                  // bfree
                    0,                                                  // bavail
                    stats.entries,                                      // files
                    0,                                                  // ffree
                    bsize,
                    namelen,
                    bsize, // frsize
                );
            }
            Err(e) => reply.error(reply_error("statfs", &e)),
        }
    }
}
