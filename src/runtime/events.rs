//! Runtime event stream payloads.

use crate::types::BookUid;

/// Events emitted from the single-writer runtime loop.
///
/// The sync triplet maps one-to-one onto the user-visible
/// started/finished/error notifications.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogEvent {
    /// A new book was added.
    Added {
        /// Added book uid.
        uid: BookUid,
    },
    /// An existing book was edited.
    Updated {
        /// Updated book uid.
        uid: BookUid,
    },
    /// A book was tombstoned.
    Removed {
        /// Removed book uid.
        uid: BookUid,
    },
    /// The local catalog file was rewritten.
    Saved,
    /// A synchronization attempt began.
    SyncStarted,
    /// A synchronization attempt completed.
    SyncFinished {
        /// Remote records adopted locally.
        adopted: usize,
        /// Local records overwritten by the remote.
        overwritten: usize,
    },
    /// A synchronization attempt failed; the local catalog is unchanged
    /// from before the attempt.
    SyncFailed,
}
