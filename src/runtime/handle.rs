use std::sync::Arc;

use log::{error, warn};
use tokio::{
    sync::{Mutex, broadcast, mpsc, oneshot},
    time::Duration,
};

use crate::{
    book::{BookDraft, BookPatch, BookRecord},
    core::store::{Bookcase, StoreError},
    persist::{CatalogStore, StorageError},
    sync::{CancelToken, SyncError, engine, engine::SyncOutcome, transport::RemoteShare},
    types::{BookUid, SortKey},
    view,
};

use super::events::CatalogEvent;

/// Errors surfaced through [`BookcaseHandle`] calls.
#[derive(Debug)]
pub enum RuntimeError {
    /// In-memory catalog mutation failed.
    Store(StoreError),
    /// Local catalog persistence failed.
    Storage(StorageError),
    /// Remote synchronization failed.
    Sync(SyncError),
    /// The runtime task is gone.
    ChannelClosed,
}

impl From<StoreError> for RuntimeError {
    fn from(value: StoreError) -> Self {
        Self::Store(value)
    }
}

impl From<StorageError> for RuntimeError {
    fn from(value: StorageError) -> Self {
        Self::Storage(value)
    }
}

impl From<SyncError> for RuntimeError {
    fn from(value: SyncError) -> Self {
        Self::Sync(value)
    }
}

/// Tuning knobs for the runtime loop.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Persist the catalog right after every mutation.
    pub autosave: bool,
    /// Total attempts per sync request; transient failures retry up to
    /// this count.
    pub sync_attempts: u32,
    /// Base backoff between sync retries, multiplied by the attempt
    /// number.
    pub sync_backoff_ms: u64,
    /// Sort order applied by [`BookcaseHandle::search`] until changed.
    pub sort_method: SortKey,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            autosave: true,
            sync_attempts: 3,
            sync_backoff_ms: 500,
            sort_method: SortKey::default(),
        }
    }
}

/// Cloneable async handle to a single-writer catalog runtime.
pub struct BookcaseHandle {
    cmd_tx: mpsc::Sender<Command>,
    events_tx: broadcast::Sender<CatalogEvent>,
    cancel: CancelToken,
}

impl Clone for BookcaseHandle {
    fn clone(&self) -> Self {
        Self {
            cmd_tx: self.cmd_tx.clone(),
            events_tx: self.events_tx.clone(),
            cancel: self.cancel.clone(),
        }
    }
}

enum Command {
    Add {
        draft: BookDraft,
        resp: oneshot::Sender<Result<BookUid, RuntimeError>>,
    },
    Update {
        uid: BookUid,
        patch: BookPatch,
        resp: oneshot::Sender<Result<(), RuntimeError>>,
    },
    Remove {
        uid: BookUid,
        resp: oneshot::Sender<Result<(), RuntimeError>>,
    },
    Get {
        uid: BookUid,
        resp: oneshot::Sender<Option<BookRecord>>,
    },
    Books {
        resp: oneshot::Sender<Vec<BookRecord>>,
    },
    Search {
        query: String,
        resp: oneshot::Sender<Vec<BookRecord>>,
    },
    ByAuthor {
        author: String,
        resp: oneshot::Sender<Vec<BookRecord>>,
    },
    SetSortMethod {
        key: SortKey,
        resp: oneshot::Sender<()>,
    },
    Sync {
        resp: oneshot::Sender<Result<SyncOutcome, RuntimeError>>,
    },
    PurgeTombstones {
        resp: oneshot::Sender<Result<usize, RuntimeError>>,
    },
    Save {
        resp: oneshot::Sender<Result<(), RuntimeError>>,
    },
    Shutdown {
        resp: oneshot::Sender<Result<(), RuntimeError>>,
    },
}

type SharedStore = Arc<Mutex<Box<dyn CatalogStore>>>;
type SharedRemote = Arc<Mutex<Box<dyn RemoteShare>>>;

/// Spawns the runtime task owning `store` and returns its handle.
///
/// Every read and write goes through the returned handle's command queue,
/// so writes are serialized and a sync request runs to completion before
/// any later command observes the catalog. Pass `None` for `remote` when
/// synchronization is not configured; [`BookcaseHandle::sync`] then
/// reports [`SyncOutcome::Skipped`].
pub fn spawn_bookcase(
    store: Bookcase,
    storage: Option<Box<dyn CatalogStore>>,
    remote: Option<Box<dyn RemoteShare>>,
    config: RuntimeConfig,
) -> BookcaseHandle {
    let (cmd_tx, mut cmd_rx) = mpsc::channel::<Command>(256);
    let (events_tx, _) = broadcast::channel::<CatalogEvent>(1024);
    let cancel = CancelToken::new();

    let storage = storage.map(|s| Arc::new(Mutex::new(s)));
    let remote = remote.map(|r| Arc::new(Mutex::new(r)));

    let events_tx_loop = events_tx.clone();
    let cancel_loop = cancel.clone();

    tokio::spawn(async move {
        let mut store = store;
        let mut sort_method = config.sort_method;

        while let Some(cmd) = cmd_rx.recv().await {
            let done = handle_command(
                cmd,
                &mut store,
                &mut sort_method,
                &events_tx_loop,
                storage.as_ref(),
                remote.as_ref(),
                &cancel_loop,
                &config,
            )
            .await;

            if done {
                break;
            }
        }
    });

    BookcaseHandle {
        cmd_tx,
        events_tx,
        cancel,
    }
}

impl BookcaseHandle {
    /// Subscribes to the runtime event stream.
    pub fn subscribe(&self) -> broadcast::Receiver<CatalogEvent> {
        self.events_tx.subscribe()
    }

    /// Adds a book and returns its uid.
    pub async fn add(&self, draft: BookDraft) -> Result<BookUid, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Add { draft, resp: tx })
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)?
    }

    /// Edits a book in place.
    pub async fn update(&self, uid: BookUid, patch: BookPatch) -> Result<(), RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Update { uid, patch, resp: tx })
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)?
    }

    /// Tombstones a book.
    pub async fn remove(&self, uid: BookUid) -> Result<(), RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Remove { uid, resp: tx })
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)?
    }

    /// Fetches one record by uid, tombstones included.
    pub async fn get(&self, uid: BookUid) -> Result<Option<BookRecord>, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Get { uid, resp: tx })
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)
    }

    /// Snapshot of the whole catalog in insertion order, tombstones
    /// included.
    pub async fn books(&self) -> Result<Vec<BookRecord>, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Books { resp: tx })
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)
    }

    /// Sorted, filtered snapshot for presentation.
    ///
    /// Applies the current sort method, drops tombstones, and keeps books
    /// whose author or title contains `query` case-insensitively; an empty
    /// query keeps every live book.
    pub async fn search(&self, query: impl Into<String>) -> Result<Vec<BookRecord>, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Search {
                query: query.into(),
                resp: tx,
            })
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)
    }

    /// Records whose author text equals `author` exactly, tombstones
    /// included.
    pub async fn by_author(&self, author: impl Into<String>) -> Result<Vec<BookRecord>, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::ByAuthor {
                author: author.into(),
                resp: tx,
            })
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)
    }

    /// Switches the sort order used by [`BookcaseHandle::search`].
    pub async fn set_sort_method(&self, key: SortKey) -> Result<(), RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::SetSortMethod { key, resp: tx })
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)
    }

    /// Runs one full synchronization, then persists the catalog locally.
    ///
    /// Requests queue behind any sync already in flight; attempts never
    /// interleave. The local save happens after the attempt whether it
    /// succeeded or not, so local edits survive an unreachable remote.
    pub async fn sync(&self) -> Result<SyncOutcome, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Sync { resp: tx })
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)?
    }

    /// Cancels the sync attempt currently in flight, if any.
    ///
    /// Takes effect at the attempt's next cancellation checkpoint; the
    /// attempt then fails with [`SyncError::Cancelled`].
    pub fn cancel_sync(&self) {
        self.cancel.cancel();
    }

    /// Physically drops propagated tombstones from the catalog.
    pub async fn purge_tombstones(&self) -> Result<usize, RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::PurgeTombstones { resp: tx })
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)?
    }

    /// Persists the catalog now, regardless of the autosave setting.
    pub async fn save(&self) -> Result<(), RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Save { resp: tx })
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)?
    }

    /// Saves the catalog a final time and stops the runtime task.
    pub async fn shutdown(&self) -> Result<(), RuntimeError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(Command::Shutdown { resp: tx })
            .await
            .map_err(|_| RuntimeError::ChannelClosed)?;
        rx.await.map_err(|_| RuntimeError::ChannelClosed)?
    }
}

#[allow(clippy::too_many_arguments)]
async fn handle_command(
    cmd: Command,
    store: &mut Bookcase,
    sort_method: &mut SortKey,
    events_tx: &broadcast::Sender<CatalogEvent>,
    storage: Option<&SharedStore>,
    remote: Option<&SharedRemote>,
    cancel: &CancelToken,
    config: &RuntimeConfig,
) -> bool {
    match cmd {
        Command::Add { draft, resp } => {
            let uid = store.insert(draft);
            let _ = events_tx.send(CatalogEvent::Added { uid });
            autosave(store, storage, events_tx, config).await;
            let _ = resp.send(Ok(uid));
        }
        Command::Update { uid, patch, resp } => {
            let res = store.update(uid, &patch).map_err(RuntimeError::from);
            let res = match res {
                Ok(_) => {
                    let _ = events_tx.send(CatalogEvent::Updated { uid });
                    autosave(store, storage, events_tx, config).await;
                    Ok(())
                }
                Err(err) => Err(err),
            };
            let _ = resp.send(res);
        }
        Command::Remove { uid, resp } => {
            let res = store.remove(uid).map_err(RuntimeError::from);
            let res = match res {
                Ok(_) => {
                    let _ = events_tx.send(CatalogEvent::Removed { uid });
                    autosave(store, storage, events_tx, config).await;
                    Ok(())
                }
                Err(err) => Err(err),
            };
            let _ = resp.send(res);
        }
        Command::Get { uid, resp } => {
            let _ = resp.send(store.get_cloned(uid));
        }
        Command::Books { resp } => {
            let _ = resp.send(store.snapshot());
        }
        Command::Search { query, resp } => {
            let _ = resp.send(view::search(store.snapshot(), *sort_method, &query));
        }
        Command::ByAuthor { author, resp } => {
            let _ = resp.send(store.by_author_cloned(&author));
        }
        Command::SetSortMethod { key, resp } => {
            *sort_method = key;
            let _ = resp.send(());
        }
        Command::Sync { resp } => {
            let out = if let Some(remote) = remote {
                let _ = events_tx.send(CatalogEvent::SyncStarted);
                cancel.reset();
                let res = run_sync(store, remote, cancel, config).await;
                match &res {
                    Ok(outcome) => {
                        let (adopted, overwritten) = match outcome {
                            SyncOutcome::Merged(summary) => {
                                (summary.adopted, summary.overwritten)
                            }
                            _ => (0, 0),
                        };
                        let _ = events_tx.send(CatalogEvent::SyncFinished {
                            adopted,
                            overwritten,
                        });
                    }
                    Err(err) => {
                        error!("synchronization failed: {err:?}");
                        let _ = events_tx.send(CatalogEvent::SyncFailed);
                    }
                }
                // Local save proceeds after the attempt either way, so
                // local edits persist even when the remote is unreachable.
                autosave(store, storage, events_tx, config).await;
                res.map_err(RuntimeError::from)
            } else {
                Ok(SyncOutcome::Skipped)
            };
            let _ = resp.send(out);
        }
        Command::PurgeTombstones { resp } => {
            let purged = store.purge_tombstones();
            if purged > 0 {
                autosave(store, storage, events_tx, config).await;
            }
            let _ = resp.send(Ok(purged));
        }
        Command::Save { resp } => {
            let out = match storage {
                Some(storage) => {
                    let res = save_catalog(store, storage).await;
                    if res.is_ok() {
                        let _ = events_tx.send(CatalogEvent::Saved);
                    }
                    res.map_err(RuntimeError::from)
                }
                None => Ok(()),
            };
            let _ = resp.send(out);
        }
        Command::Shutdown { resp } => {
            let out = match storage {
                Some(storage) => save_catalog(store, storage)
                    .await
                    .map_err(RuntimeError::from),
                None => Ok(()),
            };
            let _ = resp.send(out);
            return true;
        }
    }

    false
}

/// Persists after a mutation when autosave is on; failures degrade to a
/// log entry so the in-memory catalog keeps working.
async fn autosave(
    store: &Bookcase,
    storage: Option<&SharedStore>,
    events_tx: &broadcast::Sender<CatalogEvent>,
    config: &RuntimeConfig,
) {
    if !config.autosave {
        return;
    }
    let Some(storage) = storage else {
        return;
    };
    match save_catalog(store, storage).await {
        Ok(()) => {
            let _ = events_tx.send(CatalogEvent::Saved);
        }
        Err(err) => {
            error!("failed to save catalog: {err:?}");
        }
    }
}

async fn save_catalog(store: &Bookcase, storage: &SharedStore) -> Result<(), StorageError> {
    let books = store.snapshot();
    let storage = Arc::clone(storage);
    tokio::task::spawn_blocking(move || {
        let mut storage = storage.blocking_lock();
        storage.save(&books)
    })
    .await
    .map_err(|err| StorageError::Io(std::io::Error::other(format!("join error: {err}"))))?
}

/// Runs one sync request, retrying transient transport failures with
/// linear backoff. Decode failures and cancellation are terminal.
async fn run_sync(
    store: &mut Bookcase,
    remote: &SharedRemote,
    cancel: &CancelToken,
    config: &RuntimeConfig,
) -> Result<SyncOutcome, SyncError> {
    let attempts = config.sync_attempts.max(1);
    let mut attempt = 0;

    loop {
        attempt += 1;

        let mut bookcase = std::mem::take(store);
        let remote_ref = Arc::clone(remote);
        let token = cancel.clone();

        let joined = tokio::task::spawn_blocking(move || {
            let mut remote = remote_ref.blocking_lock();
            let res = engine::synchronize(&mut bookcase, remote.as_mut(), &token);
            (bookcase, res)
        })
        .await;

        let (bookcase, res) = match joined {
            Ok(pair) => pair,
            Err(err) => {
                return Err(SyncError::Remote(std::io::Error::other(format!(
                    "join error: {err}"
                ))));
            }
        };
        *store = bookcase;

        match res {
            Ok(outcome) => return Ok(outcome),
            Err(err) if err.is_transient() && attempt < attempts => {
                warn!("sync attempt {attempt} failed: {err:?}, retrying");
                tokio::time::sleep(Duration::from_millis(
                    config.sync_backoff_ms * u64::from(attempt),
                ))
                .await;
                if cancel.is_cancelled() {
                    return Err(SyncError::Cancelled);
                }
            }
            Err(err) => return Err(err),
        }
    }
}
