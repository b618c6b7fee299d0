use bookcase::{
    book::{BookDraft, BookPatch, BookState},
    core::store::{Bookcase, StoreError},
};

fn draft(title: &str, author: &str, year: &str) -> BookDraft {
    BookDraft {
        title: title.to_string(),
        author: author.to_string(),
        publisher: "Orbit".to_string(),
        year: year.to_string(),
        cover: String::new(),
    }
}

#[test]
fn insert_starts_active_at_revision_zero() {
    let mut store = Bookcase::new();
    let uid = store.insert(draft("Solaris", "Stanislaw Lem", "1961"));

    let rec = store.get(uid).expect("record");
    assert_eq!(rec.title, "Solaris");
    assert_eq!(rec.revision, 0);
    assert_eq!(rec.state, BookState::Active);
    assert_eq!(store.len(), 1);
    assert_eq!(store.active_len(), 1);
}

#[test]
fn update_applies_patch_and_bumps_revision() {
    let mut store = Bookcase::new();
    let uid = store.insert(draft("Solaris", "Stanislaw Lem", "1961"));

    let revision = store
        .update(
            uid,
            &BookPatch {
                year: Some("1970".to_string()),
                ..BookPatch::default()
            },
        )
        .expect("update");

    assert_eq!(revision, 1);
    let rec = store.get(uid).expect("record");
    assert_eq!(rec.year, "1970");
    assert_eq!(rec.title, "Solaris");
}

#[test]
fn update_missing_book_errors() {
    let mut store = Bookcase::new();
    let uid = bookcase::types::BookUid::new_v4();
    let err = store.update(uid, &BookPatch::default()).unwrap_err();
    assert_eq!(err, StoreError::MissingBook(uid));
}

#[test]
fn author_index_follows_renames() {
    let mut store = Bookcase::new();
    let uid = store.insert(draft("Roadside Picnic", "Arkady Strugatsky", "1972"));
    store.insert(draft("Hard to Be a God", "Arkady Strugatsky", "1964"));

    store
        .update(
            uid,
            &BookPatch {
                author: Some("Boris Strugatsky".to_string()),
                ..BookPatch::default()
            },
        )
        .expect("update");

    assert_eq!(store.by_author("Arkady Strugatsky").len(), 1);
    let renamed = store.by_author("Boris Strugatsky");
    assert_eq!(renamed.len(), 1);
    assert_eq!(renamed[0].uid, uid);
}

#[test]
fn remove_tombstones_but_keeps_the_record() {
    let mut store = Bookcase::new();
    let uid = store.insert(draft("Solaris", "Stanislaw Lem", "1961"));

    let revision = store.remove(uid).expect("remove");

    assert_eq!(revision, 1);
    let rec = store.get(uid).expect("tombstone still present");
    assert_eq!(rec.state, BookState::Deleted);
    assert_eq!(store.len(), 1);
    assert_eq!(store.active_len(), 0);
}

#[test]
fn snapshot_preserves_insertion_order() {
    let mut store = Bookcase::new();
    let a = store.insert(draft("Zone", "A", "2001"));
    let b = store.insert(draft("Arc", "B", "1999"));
    let c = store.insert(draft("Mist", "C", "2010"));

    let uids: Vec<_> = store.snapshot().into_iter().map(|r| r.uid).collect();
    assert_eq!(uids, vec![a, b, c]);
    let borrowed: Vec<_> = store.books().into_iter().map(|r| r.uid).collect();
    assert_eq!(borrowed, uids);
    assert_eq!(store.ordered_uids(), &uids[..]);
}

#[test]
fn purge_drops_only_tombstones_and_keeps_order() {
    let mut store = Bookcase::new();
    let a = store.insert(draft("One", "A", "1"));
    let b = store.insert(draft("Two", "B", "2"));
    let c = store.insert(draft("Three", "C", "3"));
    store.remove(b).expect("remove");

    let purged = store.purge_tombstones();

    assert_eq!(purged, 1);
    let uids: Vec<_> = store.snapshot().into_iter().map(|r| r.uid).collect();
    assert_eq!(uids, vec![a, c]);
    assert!(store.get(b).is_none());
    assert!(store.by_author("B").is_empty());
}

#[test]
fn from_records_keeps_the_later_duplicate() {
    let mut store = Bookcase::new();
    let uid = store.insert(draft("First", "A", "1"));
    let mut records = store.snapshot();
    let mut newer = records[0].clone();
    newer.title = "Second".to_string();
    newer.revision = 3;
    records.push(newer);

    let rebuilt = Bookcase::from_records(records);

    assert_eq!(rebuilt.len(), 1);
    let rec = rebuilt.get(uid).expect("record");
    assert_eq!(rec.title, "Second");
    assert_eq!(rec.revision, 3);
}
