//! Translation client contract.
//!
//! One remote `translate(word, source?, target)` call issued through a given
//! egress identity. Every error is transient as far as the dispatcher is
//! concerned: it releases the identity as failed and tries another one.

pub mod http;
pub mod proxy_check;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

use crate::types::EgressIdentity;

pub use http::{build_client, HttpClientConfig, HttpTranslationClient};
pub use proxy_check::{check_proxies, check_proxy, ProxyCheckConfig, ProxyCheckResult};

/// A single word to translate.
#[derive(Clone, Debug)]
pub struct TranslationRequest<'a> {
    pub word: &'a str,
    /// `None` asks the provider to detect the language
    pub source_lang: Option<&'a str>,
    pub target_lang: &'a str,
}

/// Provider answer for one word.
#[derive(Clone, Debug, PartialEq)]
pub struct TranslationResponse {
    pub text: String,
    /// Language the provider detected, when it reports one
    pub detected_lang: Option<String>,
    /// Provider-specific structure, preserved as is
    pub metadata: Value,
}

#[derive(Error, Debug, Clone)]
pub enum ClientError {
    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Unexpected HTTP status {0}")]
    Status(u16),

    #[error("Rate limited by provider")]
    RateLimited,

    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

/// Remote translation operation.
#[async_trait]
pub trait TranslationClient: Send + Sync {
    async fn translate(
        &self,
        request: &TranslationRequest<'_>,
        egress: &EgressIdentity,
    ) -> Result<TranslationResponse, ClientError>;
}
