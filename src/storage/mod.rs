//! Persistent translation cache.
//!
//! SQLite table `words (word, input_lang, output_lang, translate, extra_data)`
//! looked up by `(word, output_lang)`; `extra_data` holds the provider
//! metadata as JSON text.

pub mod cache_store;
pub mod types;

pub use cache_store::CacheStore;
pub use types::{CacheEntry, CacheStats};
