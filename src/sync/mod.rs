/// Merge orchestration and sync outcomes.
pub mod engine;
/// Whole-file remote transport seam.
pub mod transport;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::persist::StorageError;

/// Errors aborting one synchronization attempt.
///
/// Nothing has been written remotely when a fetch or decode fails, and the
/// local catalog is only touched once the remote copy decoded cleanly.
#[derive(Debug)]
pub enum SyncError {
    /// Transport failure talking to the share; worth retrying.
    Remote(std::io::Error),
    /// The local or remote catalog document could not be encoded/decoded.
    Catalog(StorageError),
    /// The attempt was cancelled via its [`CancelToken`].
    Cancelled,
}

impl SyncError {
    /// Returns true for failures a retry can plausibly fix.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Remote(_))
    }
}

impl From<std::io::Error> for SyncError {
    fn from(value: std::io::Error) -> Self {
        Self::Remote(value)
    }
}

impl From<StorageError> for SyncError {
    fn from(value: StorageError) -> Self {
        Self::Catalog(value)
    }
}

/// Result alias for synchronization operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Cooperative cancellation flag for an in-flight sync attempt.
///
/// Cloned handles share the flag; the attempt checks it between steps and
/// bails with [`SyncError::Cancelled`] once set.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    /// Creates a live token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation of the attempt holding this token.
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    /// Returns true once [`CancelToken::cancel`] has been called.
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }

    /// Re-arms the token for a fresh attempt.
    pub fn reset(&self) {
        self.0.store(false, Ordering::Relaxed);
    }
}
