use serde::{Deserialize, Serialize};

/// Snapshot of what the book cache currently holds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    pub cached_count: usize,
    /// Cached ids, sorted.
    pub ids: Vec<String>,
}

impl CacheStats {
    pub fn from_ids(ids: impl IntoIterator<Item = String>) -> Self {
        let mut ids: Vec<String> = ids.into_iter().collect();
        ids.sort();
        Self {
            cached_count: ids.len(),
            ids,
        }
    }
}
