//! Book domain record, draft, lifecycle state, patch, and comparators.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::types::{BookUid, Revision, SortKey};

/// Record lifecycle marker.
///
/// A removed book stays in the catalog as a `Deleted` tombstone so the
/// removal can propagate through synchronization instead of being
/// resurrected by a stale replica.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BookState {
    /// Live record, visible to filtered views.
    #[default]
    Active,
    /// Tombstone, hidden from every filtered view.
    Deleted,
}

impl BookState {
    /// Returns true for tombstoned records.
    pub fn is_deleted(self) -> bool {
        matches!(self, Self::Deleted)
    }
}

/// Fully materialized, authoritative catalog entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookRecord {
    /// Stable identity across replicas.
    pub uid: BookUid,
    /// Title text.
    pub title: String,
    /// Author text.
    pub author: String,
    /// Publisher text.
    pub publisher: String,
    /// Publication year as entered; not necessarily numeric.
    pub year: String,
    /// Cover image URI; empty means no image.
    pub cover: String,
    /// Revision counter bumped on every edit or removal.
    pub revision: Revision,
    /// Lifecycle state.
    pub state: BookState,
}

/// Insert payload used to create a new [`BookRecord`].
///
/// No field is validated; empty strings are legal everywhere, and an empty
/// `cover` is the ordinary "no image" case.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BookDraft {
    /// Title text.
    pub title: String,
    /// Author text.
    pub author: String,
    /// Publisher text.
    pub publisher: String,
    /// Publication year text.
    pub year: String,
    /// Cover image URI; empty means no image.
    pub cover: String,
}

/// Sparse edit where each `Some` field overwrites the record value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookPatch {
    /// Optional replacement for the title.
    pub title: Option<String>,
    /// Optional replacement for the author.
    pub author: Option<String>,
    /// Optional replacement for the publisher.
    pub publisher: Option<String>,
    /// Optional replacement for the year text.
    pub year: Option<String>,
    /// Optional replacement for the cover URI.
    pub cover: Option<String>,
}

impl BookPatch {
    /// Returns true when no fields are set.
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Applies this patch in place to `rec`.
    pub fn apply_to(&self, rec: &mut BookRecord) {
        if let Some(v) = &self.title {
            rec.title = v.clone();
        }
        if let Some(v) = &self.author {
            rec.author = v.clone();
        }
        if let Some(v) = &self.publisher {
            rec.publisher = v.clone();
        }
        if let Some(v) = &self.year {
            rec.year = v.clone();
        }
        if let Some(v) = &self.cover {
            rec.cover = v.clone();
        }
    }
}

impl BookRecord {
    /// Total order by title text.
    pub fn by_title(a: &Self, b: &Self) -> Ordering {
        a.title.cmp(&b.title)
    }

    /// Total order by author text.
    pub fn by_author(a: &Self, b: &Self) -> Ordering {
        a.author.cmp(&b.author)
    }

    /// Total order by year text.
    pub fn by_year(a: &Self, b: &Self) -> Ordering {
        a.year.cmp(&b.year)
    }
}

impl SortKey {
    /// Compares two records under this key.
    ///
    /// Ties are left to the caller's stable sort, so equal keys keep their
    /// existing relative order.
    pub fn compare(self, a: &BookRecord, b: &BookRecord) -> Ordering {
        match self {
            SortKey::Title => BookRecord::by_title(a, b),
            SortKey::Author => BookRecord::by_author(a, b),
            SortKey::Year => BookRecord::by_year(a, b),
        }
    }
}
