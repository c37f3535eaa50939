//! The archive handle and its commit protocol.

use std::path::{Path, PathBuf};

use super::{Compression, ZipContainer};
use crate::FsError;

/// Exclusive owner of the open container.
///
/// Every mutation is staged on the container and then made durable with
/// [`commit`](Self::commit), which finalizes the container and reopens it from
/// disk. The reopened container is only installed after it has been read back
/// successfully; until then the handle stays closed and the next access
/// retries the reopen.
#[derive(Debug)]
pub struct ArchiveHandle {
    path: PathBuf,
    compression: Compression,
    container: Option<ZipContainer>,
    commits: u64,
}

impl ArchiveHandle {
    /// Open the container at `path`.
    ///
    /// # Errors
    ///
    /// - [`FsError::Io`] / [`FsError::Codec`] if the container cannot be read
    pub fn open(path: impl Into<PathBuf>, compression: Compression) -> Result<Self, FsError> {
        let path = path.into();
        let container = ZipContainer::open(&path, compression)?;
        tracing::info!(path = %path.display(), "archive opened");
        Ok(Self {
            path,
            compression,
            container: Some(container),
            commits: 0,
        })
    }

    /// Path of the container file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of successful commits since open.
    pub fn commits(&self) -> u64 {
        self.commits
    }

    /// Returns `true` while a validated container is installed.
    pub fn is_open(&self) -> bool {
        self.container.is_some()
    }

    /// The open container, reopening it first if the last commit left the
    /// handle closed.
    ///
    /// # Errors
    ///
    /// - [`FsError::Io`] / [`FsError::Codec`] if the reopen fails
    pub fn container(&mut self) -> Result<&mut ZipContainer, FsError> {
        if self.container.is_none() {
            tracing::warn!(path = %self.path.display(), "archive handle closed, reopening");
            self.container = Some(ZipContainer::open(&self.path, self.compression)?);
        }
        self.container
            .as_mut()
            .ok_or_else(|| FsError::Backend("archive handle unavailable".into()))
    }

    /// Make every staged change durable.
    ///
    /// Closes the container (which rebuilds and flushes the whole image), then
    /// reopens a fresh container on the same path. Staged changes are not
    /// retried or rolled back when the finalize fails; the handle is left
    /// closed and the next access reads the container as it is on disk.
    ///
    /// # Errors
    ///
    /// - [`FsError::Codec`] / [`FsError::Io`] if the finalize or reopen fails
    pub fn commit(&mut self) -> Result<(), FsError> {
        let Some(container) = self.container.take() else {
            return Err(FsError::Backend(format!(
                "commit on closed archive {}",
                self.path.display()
            )));
        };

        if let Err(err) = container.finalize() {
            tracing::error!(path = %self.path.display(), error = %err, "archive commit failed");
            return Err(err);
        }

        match ZipContainer::open(&self.path, self.compression) {
            Ok(reopened) => {
                self.container = Some(reopened);
                self.commits += 1;
                tracing::debug!(path = %self.path.display(), commits = self.commits, "archive committed");
                Ok(())
            }
            Err(err) => {
                tracing::error!(path = %self.path.display(), error = %err, "archive reopen failed");
                Err(err)
            }
        }
    }

    /// Finalize any pending changes and release the container.
    ///
    /// # Errors
    ///
    /// - [`FsError::Codec`] / [`FsError::Io`] if pending changes cannot be written
    pub fn close(mut self) -> Result<(), FsError> {
        match self.container.take() {
            Some(container) => {
                tracing::info!(path = %self.path.display(), "archive closed");
                container.finalize()
            }
            None => Ok(()),
        }
    }
}
