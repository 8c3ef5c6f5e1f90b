//! Shared data types for the dispatch core.
//!
//! Egress identities, release outcomes and the per-word translation result.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::storage::CacheEntry;

/// Milliseconds since the UNIX epoch.
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

// ================================================================================================
// EGRESS IDENTITY
// ================================================================================================

/// Where an outbound call leaves from.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum EgressTarget {
    /// No proxy, the host's own connection
    Direct,
    /// Proxy address as written in the proxy list (`host:port` or a full URL)
    Proxy(String),
}

impl EgressTarget {
    /// Proxy URL suitable for an HTTP client, `None` for a direct connection.
    ///
    /// Bare `host:port` entries are treated as plain HTTP proxies.
    pub fn proxy_url(&self) -> Option<String> {
        match self {
            EgressTarget::Direct => None,
            EgressTarget::Proxy(addr) if addr.contains("://") => Some(addr.clone()),
            EgressTarget::Proxy(addr) => Some(format!("http://{}", addr)),
        }
    }
}

impl fmt::Display for EgressTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EgressTarget::Direct => write!(f, "direct"),
            EgressTarget::Proxy(addr) => write!(f, "proxy {}", addr),
        }
    }
}

/// An immutable egress identity. Id 0 is always the direct connection.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct EgressIdentity {
    pub id: usize,
    pub target: EgressTarget,
}

impl EgressIdentity {
    pub fn direct() -> Self {
        Self {
            id: 0,
            target: EgressTarget::Direct,
        }
    }

    pub fn proxy(id: usize, addr: impl Into<String>) -> Self {
        Self {
            id,
            target: EgressTarget::Proxy(addr.into()),
        }
    }

    pub fn is_direct(&self) -> bool {
        self.target == EgressTarget::Direct
    }
}

impl fmt::Display for EgressIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{} ({})", self.id, self.target)
    }
}

/// How a unit of work on an acquired identity ended.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Failure,
    /// Acquired but never used (shutdown requested before the call)
    Cancelled,
}

// ================================================================================================
// TRANSLATION RESULT
// ================================================================================================

/// Resolved translation of one word, fresh or rebuilt from the cache.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TranslationResult {
    pub translate: String,
    pub extra_data: Value,
}

impl From<CacheEntry> for TranslationResult {
    fn from(entry: CacheEntry) -> Self {
        Self {
            translate: entry.translation,
            extra_data: entry.metadata,
        }
    }
}
