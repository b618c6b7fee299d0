/// XML catalog codec and file-backed store.
pub mod xml;

use crate::book::BookRecord;

/// Errors surfaced by catalog storage.
///
/// `NotFound` is the first-run case and is informational; the other two are
/// logged at the boundary and never crash the caller.
#[derive(Debug)]
pub enum StorageError {
    /// The catalog file does not exist yet.
    NotFound,
    /// The document exists but cannot be decoded.
    Format(String),
    /// Any other read or write failure.
    Io(std::io::Error),
}

impl From<std::io::Error> for StorageError {
    fn from(value: std::io::Error) -> Self {
        if value.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound
        } else {
            Self::Io(value)
        }
    }
}

impl From<quick_xml::Error> for StorageError {
    fn from(value: quick_xml::Error) -> Self {
        Self::Format(value.to_string())
    }
}

/// Result alias for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Whole-catalog storage target.
///
/// `save` replaces the persisted document, so the stored state always
/// exactly mirrors the in-memory catalog at the moment of the call.
pub trait CatalogStore: Send {
    /// Loads every persisted record, tombstones included.
    fn load(&mut self) -> StorageResult<Vec<BookRecord>>;
    /// Replaces the persisted document with `books`.
    fn save(&mut self, books: &[BookRecord]) -> StorageResult<()>;
}
