//! Remote share transport: a dumb whole-file read/write target.

use std::fs;
use std::path::{Path, PathBuf};

use super::SyncResult;

/// Catalog file name used on every replica's share.
pub const REMOTE_CATALOG_NAME: &str = "books.xml";

/// Whole-file access to the remote catalog copy.
///
/// Synchronization needs nothing beyond existence, read-whole-file, and
/// write-whole-file, so the network protocol stays entirely behind this
/// seam; tests implement it in memory.
pub trait RemoteShare: Send {
    /// Returns true when the remote catalog file exists.
    fn exists(&mut self) -> SyncResult<bool>;
    /// Reads the whole remote catalog file.
    fn fetch(&mut self) -> SyncResult<Vec<u8>>;
    /// Replaces the whole remote catalog file.
    fn store(&mut self, bytes: &[u8]) -> SyncResult<()>;
}

/// Remote catalog reached through a locally mounted share.
///
/// Host/share addressing is the mount's concern; this type only appends
/// [`REMOTE_CATALOG_NAME`] to the configured mount directory.
pub struct MountedShare {
    file: PathBuf,
}

impl MountedShare {
    /// Addresses the catalog file under the mounted share at `mount`.
    pub fn new(mount: impl Into<PathBuf>) -> Self {
        Self {
            file: mount.into().join(REMOTE_CATALOG_NAME),
        }
    }

    /// Full path of the remote catalog file.
    pub fn file(&self) -> &Path {
        &self.file
    }
}

impl RemoteShare for MountedShare {
    fn exists(&mut self) -> SyncResult<bool> {
        Ok(self.file.try_exists()?)
    }

    fn fetch(&mut self) -> SyncResult<Vec<u8>> {
        Ok(fs::read(&self.file)?)
    }

    fn store(&mut self, bytes: &[u8]) -> SyncResult<()> {
        fs::write(&self.file, bytes)?;
        Ok(())
    }
}
