//! Storage data structures.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One cached translation, keyed by `(word, output_lang)`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CacheEntry {
    pub word: String,
    /// Source language, configured or detected by the provider
    pub input_lang: Option<String>,
    pub output_lang: String,
    pub translation: String,
    /// Provider metadata, kept uninterpreted
    pub metadata: Value,
}

/// Statistics about the cache contents.
#[derive(Clone, Debug, Default)]
pub struct CacheStats {
    /// Rows in the `words` table, duplicates included
    pub total_rows: u64,
    /// Distinct `(word, output_lang)` keys
    pub distinct_keys: u64,
    /// Row count per output language, most rows first
    pub by_output_lang: Vec<(String, u64)>,
}

impl CacheStats {
    /// Rows that repeat an existing key.
    pub fn duplicate_rows(&self) -> u64 {
        self.total_rows.saturating_sub(self.distinct_keys)
    }
}
