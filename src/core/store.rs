use hashbrown::HashMap;

use crate::{
    book::{BookDraft, BookPatch, BookRecord, BookState},
    core::indices::VecIndex,
    types::{BookUid, Revision},
};

/// Errors produced by in-memory catalog mutations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// No record carries the given uid.
    MissingBook(BookUid),
}

/// Counters describing what one merge pass did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeSummary {
    /// Remote records unknown locally and adopted as-is.
    pub adopted: usize,
    /// Local records overwritten by a higher remote revision.
    pub overwritten: usize,
    /// Local records kept because their revision won or tied.
    pub retained: usize,
}

impl MergeSummary {
    /// Returns true when the merge changed the local catalog.
    pub fn changed(&self) -> bool {
        self.adopted > 0 || self.overwritten > 0
    }
}

/// Authoritative in-memory book catalog.
///
/// Keeps records in insertion order; ordering carries no meaning and
/// presentation-time sorting belongs to [`crate::view::CatalogView`].
/// Removal tombstones a record instead of dropping it, so deletions can
/// propagate through [`Bookcase::merge`].
#[derive(Debug, Default)]
pub struct Bookcase {
    records: HashMap<BookUid, BookRecord>,
    order: Vec<BookUid>,
    pos: HashMap<BookUid, usize>,
    by_author: VecIndex<String>,
}

impl Bookcase {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a catalog from previously persisted records.
    ///
    /// Records are adopted verbatim in the given order; a duplicated uid
    /// keeps the later record.
    pub fn from_records(records: Vec<BookRecord>) -> Self {
        let mut store = Self::new();
        for rec in records {
            store.adopt(rec);
        }
        store
    }

    /// Exports all records, tombstones included, in insertion order.
    pub fn snapshot(&self) -> Vec<BookRecord> {
        self.order
            .iter()
            .filter_map(|uid| self.records.get(uid).cloned())
            .collect()
    }

    /// Inserts a new book at revision 0 and returns its fresh uid.
    pub fn insert(&mut self, draft: BookDraft) -> BookUid {
        let rec = BookRecord {
            uid: uuid::Uuid::new_v4(),
            title: draft.title,
            author: draft.author,
            publisher: draft.publisher,
            year: draft.year,
            cover: draft.cover,
            revision: 0,
            state: BookState::Active,
        };
        let uid = rec.uid;
        self.adopt(rec);
        uid
    }

    /// Applies an edit and bumps the revision.
    pub fn update(&mut self, uid: BookUid, patch: &BookPatch) -> Result<Revision, StoreError> {
        let rec = self.records.get_mut(&uid).ok_or(StoreError::MissingBook(uid))?;
        let old_author = rec.author.clone();

        patch.apply_to(rec);
        rec.revision += 1;
        let revision = rec.revision;
        let new_author = rec.author.clone();

        if new_author != old_author {
            Self::remove_from_vec_index(self.by_author.entry(old_author).or_default(), uid);
            self.by_author.entry(new_author).or_default().push(uid);
        }

        Ok(revision)
    }

    /// Tombstones a book and bumps the revision.
    ///
    /// The record stays in the catalog so the removal survives a merge
    /// against a replica that still carries the live version.
    pub fn remove(&mut self, uid: BookUid) -> Result<Revision, StoreError> {
        let rec = self.records.get_mut(&uid).ok_or(StoreError::MissingBook(uid))?;
        rec.state = BookState::Deleted;
        rec.revision += 1;
        Ok(rec.revision)
    }

    /// Inserts or replaces a record verbatim, keeping its uid, revision,
    /// and state.
    pub fn adopt(&mut self, rec: BookRecord) {
        let uid = rec.uid;
        match self.records.get_mut(&uid) {
            Some(existing) => {
                if existing.author != rec.author {
                    Self::remove_from_vec_index(
                        self.by_author.entry(existing.author.clone()).or_default(),
                        uid,
                    );
                    self.by_author.entry(rec.author.clone()).or_default().push(uid);
                }
                *existing = rec;
            }
            None => {
                self.by_author.entry(rec.author.clone()).or_default().push(uid);
                self.pos.insert(uid, self.order.len());
                self.order.push(uid);
                self.records.insert(uid, rec);
            }
        }
    }

    /// Merges a remote record set into the local catalog.
    ///
    /// Identity is by uid. An unknown uid is adopted, tombstones included.
    /// A known uid is overwritten only when the remote revision is strictly
    /// higher; on equal revisions the local record wins, so the merge is
    /// deterministic and idempotent. Local-only records are untouched and
    /// reach the remote through the caller's write-back.
    pub fn merge(&mut self, remote: Vec<BookRecord>) -> MergeSummary {
        let mut summary = MergeSummary::default();

        for rec in remote {
            match self.records.get(&rec.uid) {
                None => {
                    self.adopt(rec);
                    summary.adopted += 1;
                }
                Some(local) if rec.revision > local.revision => {
                    self.adopt(rec);
                    summary.overwritten += 1;
                }
                Some(_) => {
                    summary.retained += 1;
                }
            }
        }

        summary
    }

    /// Physically drops tombstoned records and returns how many went.
    ///
    /// Never runs automatically: purging a tombstone that has not reached
    /// every replica lets a stale copy resurrect the book on the next merge.
    pub fn purge_tombstones(&mut self) -> usize {
        let doomed: Vec<BookUid> = self
            .order
            .iter()
            .copied()
            .filter(|uid| {
                self.records
                    .get(uid)
                    .is_some_and(|r| r.state.is_deleted())
            })
            .collect();

        for uid in &doomed {
            if let Some(rec) = self.records.remove(uid) {
                Self::remove_from_vec_index(self.by_author.entry(rec.author).or_default(), *uid);
            }
        }

        if !doomed.is_empty() {
            self.order.retain(|uid| self.records.contains_key(uid));
            self.pos.clear();
            for (idx, uid) in self.order.iter().copied().enumerate() {
                self.pos.insert(uid, idx);
            }
        }

        doomed.len()
    }

    /// Borrows a record by uid.
    pub fn get(&self, uid: BookUid) -> Option<&BookRecord> {
        self.records.get(&uid)
    }

    /// Clones a record by uid.
    pub fn get_cloned(&self, uid: BookUid) -> Option<BookRecord> {
        self.get(uid).cloned()
    }

    /// Borrows all records in insertion order, tombstones included.
    pub fn books(&self) -> Vec<&BookRecord> {
        self.order
            .iter()
            .filter_map(|uid| self.records.get(uid))
            .collect()
    }

    /// Uids in insertion order.
    pub fn ordered_uids(&self) -> &[BookUid] {
        &self.order
    }

    /// Borrows the records whose author text equals `author` exactly.
    pub fn by_author(&self, author: &str) -> Vec<&BookRecord> {
        self.by_author
            .get(author)
            .into_iter()
            .flat_map(|uids| uids.iter())
            .filter_map(|uid| self.records.get(uid))
            .collect()
    }

    /// Clones the records whose author text equals `author` exactly.
    pub fn by_author_cloned(&self, author: &str) -> Vec<BookRecord> {
        self.by_author(author).into_iter().cloned().collect()
    }

    /// Total record count, tombstones included.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Returns true when the catalog holds no records at all.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Count of live (non-tombstoned) records.
    pub fn active_len(&self) -> usize {
        self.records.values().filter(|r| !r.state.is_deleted()).count()
    }

    fn remove_from_vec_index(v: &mut Vec<BookUid>, uid: BookUid) {
        if let Some(pos) = v.iter().position(|x| *x == uid) {
            v.remove(pos);
        }
    }
}
