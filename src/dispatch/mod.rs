//! Concurrent, rate-limited word dispatch.
//!
//! - **engine**: bounded worker pool driving cache lookups and remote calls
//! - **stats**: counters shared by the workers

pub mod engine;
pub mod stats;

pub use engine::{DispatchConfig, DispatchEngine, DispatchError, ShutdownSignal};
pub use stats::{DispatchStats, DispatchStatsSnapshot};
