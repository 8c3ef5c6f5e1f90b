//! # Table Translator
//!
//! Translates the unique foreign words of a table through a rotating pool of
//! egress identities (direct connection or proxies), under a per-identity
//! rate limit, with a persistent SQLite cache so no word is requested twice.
//!
//! # Architecture
//! - **egress**: identity pool with READY/BUSY/ERROR states, guard interval
//!   and error cooldown
//! - **storage**: `(word, output_lang)` cache in SQLite
//! - **client**: remote translation contract and its HTTP implementation
//! - **dispatch**: bounded worker pool tying the three together
//! - **table**: word extraction and column annotation around the engine

pub mod client;
pub mod config;
pub mod dispatch;
pub mod egress;
pub mod storage;
pub mod table;
pub mod types;

pub use client::{ClientError, TranslationClient, TranslationRequest, TranslationResponse};
pub use config::TranslatorConfig;
pub use dispatch::{DispatchConfig, DispatchEngine, DispatchError, ShutdownSignal};
pub use egress::{EgressPool, EgressStatus, PoolConfig};
pub use storage::{CacheEntry, CacheStore};
pub use types::{EgressIdentity, EgressTarget, Outcome, TranslationResult};
