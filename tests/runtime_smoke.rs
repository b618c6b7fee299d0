use std::sync::{
    Arc, Mutex,
    atomic::{AtomicU32, Ordering},
};
use std::time::Duration;

use tempfile::TempDir;

use bookcase::{
    book::{BookDraft, BookPatch, BookState},
    core::store::Bookcase,
    persist::xml::{XmlCatalogFile, decode_catalog, encode_catalog},
    runtime::{
        events::CatalogEvent,
        handle::{RuntimeConfig, RuntimeError, spawn_bookcase},
    },
    sync::{SyncError, SyncResult, engine::SyncOutcome, transport::RemoteShare},
    types::SortKey,
};

fn draft(title: &str, author: &str, year: &str) -> BookDraft {
    BookDraft {
        title: title.to_string(),
        author: author.to_string(),
        publisher: "Ace".to_string(),
        year: year.to_string(),
        cover: String::new(),
    }
}

#[derive(Clone, Default)]
struct MemoryShare {
    data: Arc<Mutex<Option<Vec<u8>>>>,
}

impl MemoryShare {
    fn contents(&self) -> Option<Vec<u8>> {
        self.data.lock().expect("lock").clone()
    }
}

impl RemoteShare for MemoryShare {
    fn exists(&mut self) -> SyncResult<bool> {
        Ok(self.data.lock().expect("lock").is_some())
    }

    fn fetch(&mut self) -> SyncResult<Vec<u8>> {
        self.data.lock().expect("lock").clone().ok_or_else(|| {
            SyncError::Remote(std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "remote catalog absent",
            ))
        })
    }

    fn store(&mut self, bytes: &[u8]) -> SyncResult<()> {
        *self.data.lock().expect("lock") = Some(bytes.to_vec());
        Ok(())
    }
}

/// Share that fails every call, counting the attempts it absorbed.
struct OfflineShare {
    calls: Arc<AtomicU32>,
}

impl RemoteShare for OfflineShare {
    fn exists(&mut self) -> SyncResult<bool> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Err(SyncError::Remote(std::io::Error::other("share offline")))
    }

    fn fetch(&mut self) -> SyncResult<Vec<u8>> {
        Err(SyncError::Remote(std::io::Error::other("share offline")))
    }

    fn store(&mut self, _bytes: &[u8]) -> SyncResult<()> {
        Err(SyncError::Remote(std::io::Error::other("share offline")))
    }
}

/// Share that fails the first `failures` existence checks, then recovers.
struct FlakyShare {
    inner: MemoryShare,
    failures: Arc<AtomicU32>,
}

impl RemoteShare for FlakyShare {
    fn exists(&mut self) -> SyncResult<bool> {
        if self.failures.load(Ordering::SeqCst) > 0 {
            self.failures.fetch_sub(1, Ordering::SeqCst);
            return Err(SyncError::Remote(std::io::Error::other("flaky share")));
        }
        self.inner.exists()
    }

    fn fetch(&mut self) -> SyncResult<Vec<u8>> {
        self.inner.fetch()
    }

    fn store(&mut self, bytes: &[u8]) -> SyncResult<()> {
        self.inner.store(bytes)
    }
}

async fn next_events(
    sub: &mut tokio::sync::broadcast::Receiver<CatalogEvent>,
    want: usize,
) -> Vec<CatalogEvent> {
    let mut seen = Vec::new();
    while seen.len() < want {
        let evt = tokio::time::timeout(Duration::from_secs(1), sub.recv())
            .await
            .expect("event timeout")
            .expect("recv");
        seen.push(evt);
    }
    seen
}

#[tokio::test]
async fn add_update_search_and_events_ordered() {
    let handle = spawn_bookcase(Bookcase::new(), None, None, RuntimeConfig::default());
    let mut sub = handle.subscribe();

    let uid = handle.add(draft("Solaris", "Stanislaw Lem", "1961")).await.expect("add");
    handle
        .update(
            uid,
            BookPatch {
                year: Some("1970".to_string()),
                ..BookPatch::default()
            },
        )
        .await
        .expect("update");

    let rec = handle.get(uid).await.expect("get").expect("record");
    assert_eq!(rec.year, "1970");
    assert_eq!(rec.revision, 1);

    let events = next_events(&mut sub, 2).await;
    assert_eq!(events[0], CatalogEvent::Added { uid });
    assert_eq!(events[1], CatalogEvent::Updated { uid });

    handle.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn remove_hides_from_search_but_keeps_the_record() {
    let handle = spawn_bookcase(Bookcase::new(), None, None, RuntimeConfig::default());

    let uid = handle.add(draft("Doomed", "A", "2000")).await.expect("add");
    handle.remove(uid).await.expect("remove");

    assert!(handle.search("").await.expect("search").is_empty());
    let rec = handle.get(uid).await.expect("get").expect("tombstone");
    assert_eq!(rec.state, BookState::Deleted);

    handle.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn by_author_matches_exactly_unlike_search() {
    let handle = spawn_bookcase(Bookcase::new(), None, None, RuntimeConfig::default());

    handle.add(draft("Solaris", "Stanislaw Lem", "1961")).await.expect("add");
    handle.add(draft("The Cyberiad", "Stanislaw Lem", "1965")).await.expect("add");
    handle.add(draft("Blindsight", "Peter Watts", "2006")).await.expect("add");

    assert_eq!(handle.by_author("Stanislaw Lem").await.expect("query").len(), 2);
    // Exact-match lookup, unlike the case-insensitive substring search.
    assert!(handle.by_author("stanislaw lem").await.expect("query").is_empty());
    assert_eq!(handle.search("stanislaw lem").await.expect("search").len(), 2);

    handle.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn set_sort_method_changes_search_order() {
    let handle = spawn_bookcase(Bookcase::new(), None, None, RuntimeConfig::default());

    handle.add(draft("Zebra", "Adams", "1990")).await.expect("add");
    handle.add(draft("Aurora", "Zelazny", "1970")).await.expect("add");

    let by_title: Vec<_> = handle
        .search("")
        .await
        .expect("search")
        .into_iter()
        .map(|b| b.title)
        .collect();
    assert_eq!(by_title, vec!["Aurora", "Zebra"]);

    handle.set_sort_method(SortKey::Author).await.expect("set sort");
    let by_author: Vec<_> = handle
        .search("")
        .await
        .expect("search")
        .into_iter()
        .map(|b| b.title)
        .collect();
    assert_eq!(by_author, vec!["Zebra", "Aurora"]);

    handle.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn mutations_autosave_the_catalog_file() {
    let tmp = TempDir::new().expect("tmp");
    let path = tmp.path().join("books.xml");
    let storage = XmlCatalogFile::new(&path);

    let handle = spawn_bookcase(
        Bookcase::new(),
        Some(Box::new(storage)),
        None,
        RuntimeConfig::default(),
    );
    let mut sub = handle.subscribe();

    let uid = handle.add(draft("Solaris", "Stanislaw Lem", "1961")).await.expect("add");

    let events = next_events(&mut sub, 2).await;
    assert_eq!(events[0], CatalogEvent::Added { uid });
    assert_eq!(events[1], CatalogEvent::Saved);

    let on_disk = decode_catalog(&std::fs::read(&path).expect("read")).expect("decode");
    assert_eq!(on_disk.len(), 1);
    assert_eq!(on_disk[0].uid, uid);

    handle.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn sync_pulls_remote_books_and_saves_locally() {
    let tmp = TempDir::new().expect("tmp");
    let path = tmp.path().join("books.xml");

    let mut seed = Bookcase::new();
    seed.insert(draft("Roadside Picnic", "Arkady Strugatsky", "1972"));
    let share = MemoryShare::default();
    share
        .data
        .lock()
        .expect("lock")
        .replace(encode_catalog(&seed.snapshot()).expect("encode"));

    let handle = spawn_bookcase(
        Bookcase::new(),
        Some(Box::new(XmlCatalogFile::new(&path))),
        Some(Box::new(share.clone())),
        RuntimeConfig::default(),
    );
    let mut sub = handle.subscribe();

    let outcome = handle.sync().await.expect("sync");
    match outcome {
        SyncOutcome::Merged(summary) => assert_eq!(summary.adopted, 1),
        other => panic!("expected merge, got {other:?}"),
    }

    let events = next_events(&mut sub, 3).await;
    assert_eq!(events[0], CatalogEvent::SyncStarted);
    assert_eq!(
        events[1],
        CatalogEvent::SyncFinished {
            adopted: 1,
            overwritten: 0
        }
    );
    assert_eq!(events[2], CatalogEvent::Saved);

    let titles: Vec<_> = handle
        .search("")
        .await
        .expect("search")
        .into_iter()
        .map(|b| b.title)
        .collect();
    assert_eq!(titles, vec!["Roadside Picnic"]);

    let on_disk = decode_catalog(&std::fs::read(&path).expect("read")).expect("decode");
    assert_eq!(on_disk.len(), 1);

    handle.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn sync_without_remote_is_skipped() {
    let handle = spawn_bookcase(Bookcase::new(), None, None, RuntimeConfig::default());

    let outcome = handle.sync().await.expect("sync");
    assert_eq!(outcome, SyncOutcome::Skipped);

    handle.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn offline_remote_retries_then_fails_and_keeps_local_state() {
    let tmp = TempDir::new().expect("tmp");
    let path = tmp.path().join("books.xml");
    let calls = Arc::new(AtomicU32::new(0));

    let config = RuntimeConfig {
        sync_attempts: 2,
        sync_backoff_ms: 10,
        ..RuntimeConfig::default()
    };
    let handle = spawn_bookcase(
        Bookcase::new(),
        Some(Box::new(XmlCatalogFile::new(&path))),
        Some(Box::new(OfflineShare {
            calls: Arc::clone(&calls),
        })),
        config,
    );

    let uid = handle.add(draft("Kept", "Local", "2020")).await.expect("add");
    let mut sub = handle.subscribe();

    let err = handle.sync().await.unwrap_err();
    assert!(matches!(err, RuntimeError::Sync(SyncError::Remote(_))));
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    let events = next_events(&mut sub, 3).await;
    assert_eq!(events[0], CatalogEvent::SyncStarted);
    assert_eq!(events[1], CatalogEvent::SyncFailed);
    // Local save still runs after the failed attempt.
    assert_eq!(events[2], CatalogEvent::Saved);

    let rec = handle.get(uid).await.expect("get").expect("record");
    assert_eq!(rec.title, "Kept");
    assert!(path.exists());

    handle.shutdown().await.expect("shutdown");
}

#[tokio::test]
async fn transient_failures_recover_within_the_retry_limit() {
    let share = MemoryShare::default();
    let failures = Arc::new(AtomicU32::new(1));

    let config = RuntimeConfig {
        sync_attempts: 3,
        sync_backoff_ms: 10,
        ..RuntimeConfig::default()
    };
    let handle = spawn_bookcase(
        Bookcase::new(),
        None,
        Some(Box::new(FlakyShare {
            inner: share.clone(),
            failures: Arc::clone(&failures),
        })),
        config,
    );

    handle.add(draft("Solaris", "Stanislaw Lem", "1961")).await.expect("add");
    let outcome = handle.sync().await.expect("sync");

    assert_eq!(outcome, SyncOutcome::Bootstrapped);
    assert_eq!(failures.load(Ordering::SeqCst), 0);
    assert!(share.contents().is_some());

    handle.shutdown().await.expect("shutdown");
}
