//! Translator configuration.
//!
//! Defaults match the command line flags. A few settings can be overridden
//! from the environment before CLI flags are applied.

use std::path::PathBuf;
use std::time::Duration;

use crate::egress::{guard_interval, PoolConfig};

/// Environment override for the cache database path
pub const ENV_CACHE_PATH: &str = "TRANSLATOR_CACHE_PATH";
/// Environment override for the proxy list file
pub const ENV_PROXY_LIST: &str = "TRANSLATOR_PROXY_LIST";
/// Environment override for the translation endpoint
pub const ENV_ENDPOINT: &str = "TRANSLATOR_ENDPOINT";

#[derive(Debug, Clone)]
pub struct TranslatorConfig {
    /// Target language of every translate call
    pub output_language: String,

    /// Source language, `None` for per-call auto detection
    pub input_language: Option<String>,

    /// Request budget per minute, drives the guard interval
    pub rate_limit_per_minute: u32,

    /// Worker pool size
    pub thread_count: usize,

    /// SQLite cache location
    pub cache_store_path: PathBuf,

    /// Optional proxy list file
    pub proxy_list_path: Option<PathBuf>,

    /// Translation endpoint base URL
    pub endpoint: String,

    /// Longest single acquire wait before the worker logs and rescans
    pub acquire_wait: Duration,

    /// Sleep between two unsuccessful pool scans
    pub poll_interval: Duration,

    /// Idle time before an ERROR identity is reconsidered
    pub error_cooldown: Duration,

    /// Consecutive failures tolerated before an identity enters ERROR
    pub max_consecutive_errors: u32,

    /// Give up on a word after this long (unbounded when `None`)
    pub word_deadline: Option<Duration>,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        TranslatorConfig {
            output_language: "en".to_string(),
            input_language: None,
            rate_limit_per_minute: 15,
            thread_count: 1,
            cache_store_path: PathBuf::from("word_info.db"),
            proxy_list_path: None,
            endpoint: "https://translate.googleapis.com".to_string(),
            acquire_wait: Duration::from_secs(5),
            poll_interval: Duration::from_secs(1),
            error_cooldown: Duration::from_secs(600),
            max_consecutive_errors: 3,
            word_deadline: None,
        }
    }
}

impl TranslatorConfig {
    /// Apply environment overrides on top of the current values.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(path) = std::env::var(ENV_CACHE_PATH) {
            self.cache_store_path = PathBuf::from(path);
        }
        if let Ok(path) = std::env::var(ENV_PROXY_LIST) {
            self.proxy_list_path = Some(PathBuf::from(path));
        }
        if let Ok(endpoint) = std::env::var(ENV_ENDPOINT) {
            self.endpoint = endpoint;
        }
        self
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.thread_count == 0 {
            return Err("Thread count must be at least 1".to_string());
        }
        if self.rate_limit_per_minute == 0 {
            return Err("Rate limit must be at least 1 request per minute".to_string());
        }
        if self.output_language.trim().is_empty() {
            return Err("Output language must not be empty".to_string());
        }
        Ok(())
    }

    /// Egress pool settings derived from this configuration.
    pub fn pool_config(&self) -> Result<PoolConfig, String> {
        Ok(PoolConfig {
            guard_interval: guard_interval(self.rate_limit_per_minute)?,
            error_cooldown: self.error_cooldown,
            max_consecutive_errors: self.max_consecutive_errors,
            poll_interval: self.poll_interval,
        })
    }
}
