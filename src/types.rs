//! Shared identifiers and catalog-wide enums.

use serde::{Deserialize, Serialize};

/// Stable book identity, shared by every replica of the catalog.
pub type BookUid = uuid::Uuid;
/// Monotonic per-record revision counter.
pub type Revision = u64;

/// Sort order applied to the catalog before filtering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SortKey {
    /// Lexicographic by title.
    #[default]
    Title,
    /// Lexicographic by author.
    Author,
    /// Lexicographic by year text.
    Year,
}
