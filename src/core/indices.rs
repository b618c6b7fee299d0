use hashbrown::HashMap;

use crate::types::BookUid;

/// Multi-value index from an exact key to the uids carrying it.
pub type VecIndex<K> = HashMap<K, Vec<BookUid>>;
