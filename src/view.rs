//! Presentation-facing filter/sort adapter over a catalog snapshot.
//!
//! The view never touches the live store: the runtime publishes an
//! immutable snapshot into it, and every recompute is explicit. Sorting is
//! applied to the whole backing snapshot first, so the filtered list always
//! preserves sort order.

use crate::{book::BookRecord, types::SortKey};

/// Derived, read-only list over a published catalog snapshot.
#[derive(Debug, Default)]
pub struct CatalogView {
    books: Vec<BookRecord>,
    sort_key: SortKey,
    query: String,
    visible: Vec<usize>,
}

impl CatalogView {
    /// Creates an empty view sorted by the default key.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the backing snapshot and recomputes the visible list.
    pub fn set_books(&mut self, books: Vec<BookRecord>) {
        self.books = books;
        self.resort();
        self.refilter();
    }

    /// Switches the sort key and recomputes the visible list.
    pub fn set_sort(&mut self, key: SortKey) {
        self.sort_key = key;
        self.resort();
        self.refilter();
    }

    /// Replaces the filter query and recomputes the visible list.
    pub fn set_query(&mut self, query: impl Into<String>) {
        self.query = query.into();
        self.refilter();
    }

    /// Current sort key.
    pub fn sort_key(&self) -> SortKey {
        self.sort_key
    }

    /// Current filter query.
    pub fn query(&self) -> &str {
        &self.query
    }

    /// Borrows the visible records in sort order.
    pub fn visible(&self) -> Vec<&BookRecord> {
        self.visible
            .iter()
            .filter_map(|idx| self.books.get(*idx))
            .collect()
    }

    /// Clones the visible records in sort order.
    pub fn visible_cloned(&self) -> Vec<BookRecord> {
        self.visible().into_iter().cloned().collect()
    }

    /// Number of visible records.
    pub fn visible_len(&self) -> usize {
        self.visible.len()
    }

    /// Whole backing snapshot, tombstones included.
    pub fn all(&self) -> &[BookRecord] {
        &self.books
    }

    fn resort(&mut self) {
        let key = self.sort_key;
        // Stable sort keeps the relative order of equal keys.
        self.books.sort_by(|a, b| key.compare(a, b));
    }

    fn refilter(&mut self) {
        let needle = self.query.to_lowercase();
        self.visible = self
            .books
            .iter()
            .enumerate()
            .filter(|(_, book)| Self::matches(book, &needle))
            .map(|(idx, _)| idx)
            .collect();
    }

    /// Visibility test for one record against a lowercased query.
    ///
    /// A single or-test appends a record at most once even when both the
    /// author and the title match.
    fn matches(book: &BookRecord, needle: &str) -> bool {
        if book.state.is_deleted() {
            return false;
        }
        if needle.is_empty() {
            return true;
        }
        book.author.to_lowercase().contains(needle) || book.title.to_lowercase().contains(needle)
    }
}

/// Sorts a snapshot and returns the records visible under `query`.
///
/// One-shot form of [`CatalogView`] for callers that do not keep view state
/// between reads.
pub fn search(mut books: Vec<BookRecord>, key: SortKey, query: &str) -> Vec<BookRecord> {
    books.sort_by(|a, b| key.compare(a, b));
    let needle = query.to_lowercase();
    books
        .into_iter()
        .filter(|book| {
            !book.state.is_deleted()
                && (needle.is_empty()
                    || book.author.to_lowercase().contains(&needle)
                    || book.title.to_lowercase().contains(&needle))
        })
        .collect()
}
