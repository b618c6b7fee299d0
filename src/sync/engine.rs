//! Last-writer-wins synchronization against the remote catalog copy.

use log::{debug, info};

use crate::{
    core::store::{Bookcase, MergeSummary},
    persist::xml::{decode_catalog, encode_catalog},
};

use super::transport::RemoteShare;
use super::{CancelToken, SyncError, SyncResult};

/// What one successful synchronization attempt did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The remote file was absent and has been created from the local
    /// catalog.
    Bootstrapped,
    /// Remote records were merged into the local catalog and the merged
    /// set written back.
    Merged(MergeSummary),
    /// Synchronization is not configured; nothing was attempted.
    Skipped,
}

/// Runs one synchronization attempt against `remote`.
///
/// Bootstraps an absent remote from the local catalog, otherwise merges the
/// remote record set into `bookcase` (higher revision wins, local wins
/// ties) and writes the merged set back. The local catalog is only mutated
/// after the remote copy decoded cleanly, so a failed attempt leaves it
/// exactly as it was. The caller persists the local catalog afterwards in
/// either case.
pub fn synchronize(
    bookcase: &mut Bookcase,
    remote: &mut dyn RemoteShare,
    cancel: &CancelToken,
) -> SyncResult<SyncOutcome> {
    ensure_live(cancel)?;

    if !remote.exists()? {
        let bytes = encode_catalog(&bookcase.snapshot())?;
        remote.store(&bytes)?;
        info!("remote catalog absent, bootstrapped {} records", bookcase.len());
        return Ok(SyncOutcome::Bootstrapped);
    }

    let bytes = remote.fetch()?;
    ensure_live(cancel)?;

    let remote_books = decode_catalog(&bytes)?;
    let summary = bookcase.merge(remote_books);
    debug!(
        "merge: {} adopted, {} overwritten, {} retained",
        summary.adopted, summary.overwritten, summary.retained
    );

    ensure_live(cancel)?;
    let merged = encode_catalog(&bookcase.snapshot())?;
    remote.store(&merged)?;

    Ok(SyncOutcome::Merged(summary))
}

fn ensure_live(cancel: &CancelToken) -> SyncResult<()> {
    if cancel.is_cancelled() {
        Err(SyncError::Cancelled)
    } else {
        Ok(())
    }
}
