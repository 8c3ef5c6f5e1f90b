//! HTTP translation client for the public Google Translate endpoint.
//!
//! Each egress identity gets its own `reqwest::Client`, built on first use.

use async_trait::async_trait;
use log::debug;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::time::Duration;

use super::{ClientError, TranslationClient, TranslationRequest, TranslationResponse};
use crate::types::EgressIdentity;

/// Response slots copied into the metadata object, by index.
const METADATA_SLOTS: [(usize, &str); 11] = [
    (0, "translation"),
    (1, "all-translations"),
    (2, "original-language"),
    (5, "possible-translations"),
    (6, "confidence"),
    (7, "possible-mistakes"),
    (8, "language"),
    (11, "synonyms"),
    (12, "definitions"),
    (13, "examples"),
    (14, "see-also"),
];

/// Detail sections requested alongside the translation.
const DETAIL_SECTIONS: [&str; 9] = ["at", "bd", "ex", "ld", "md", "qca", "rw", "rm", "t"];

#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Base URL, without the `/translate_a/single` path
    pub endpoint: String,
    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://translate.googleapis.com".to_string(),
            timeout: Duration::from_secs(10),
        }
    }
}

pub struct HttpTranslationClient {
    config: HttpClientConfig,
    clients: Mutex<HashMap<usize, reqwest::Client>>,
}

impl HttpTranslationClient {
    pub fn new(config: HttpClientConfig) -> Self {
        Self {
            config,
            clients: Mutex::new(HashMap::new()),
        }
    }

    fn client_for(&self, egress: &EgressIdentity) -> Result<reqwest::Client, ClientError> {
        let mut clients = self.clients.lock();
        if let Some(client) = clients.get(&egress.id) {
            return Ok(client.clone());
        }

        let client = build_client(egress, self.config.timeout)?;
        clients.insert(egress.id, client.clone());
        Ok(client)
    }
}

/// HTTP client that leaves through `egress`.
///
/// Direct identities bypass any system proxy; proxy identities route every
/// scheme through their address (`http`, `https`, `socks5`, `socks5h`).
pub fn build_client(
    egress: &EgressIdentity,
    timeout: Duration,
) -> Result<reqwest::Client, ClientError> {
    let builder = reqwest::Client::builder().timeout(timeout);
    let builder = match egress.target.proxy_url() {
        Some(url) => {
            let proxy = reqwest::Proxy::all(&url)
                .map_err(|e| ClientError::Transport(format!("Invalid proxy {}: {}", url, e)))?;
            builder.proxy(proxy)
        }
        None => builder.no_proxy(),
    };

    builder
        .build()
        .map_err(|e| ClientError::Transport(format!("Failed to build HTTP client: {}", e)))
}

#[async_trait]
impl TranslationClient for HttpTranslationClient {
    async fn translate(
        &self,
        request: &TranslationRequest<'_>,
        egress: &EgressIdentity,
    ) -> Result<TranslationResponse, ClientError> {
        let client = self.client_for(egress)?;
        let url = format!(
            "{}/translate_a/single",
            self.config.endpoint.trim_end_matches('/')
        );

        let mut query: Vec<(&str, &str)> = vec![
            ("client", "gtx"),
            ("sl", request.source_lang.unwrap_or("auto")),
            ("tl", request.target_lang),
            ("hl", request.target_lang),
            ("ie", "UTF-8"),
            ("oe", "UTF-8"),
        ];
        query.extend(DETAIL_SECTIONS.iter().map(|dt| ("dt", *dt)));
        query.push(("q", request.word));

        debug!("GET {} via {}", url, egress);

        let response = client
            .get(&url)
            .query(&query)
            .send()
            .await
            .map_err(|e| ClientError::Transport(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ClientError::RateLimited);
        }
        if !status.is_success() {
            return Err(ClientError::Status(status.as_u16()));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| ClientError::MalformedResponse(e.to_string()))?;

        parse_response(&body)
    }
}

/// Map the endpoint's positional JSON array onto a `TranslationResponse`.
pub fn parse_response(body: &Value) -> Result<TranslationResponse, ClientError> {
    let slots = body
        .as_array()
        .ok_or_else(|| ClientError::MalformedResponse("top level is not an array".to_string()))?;

    let sentences = slots
        .first()
        .and_then(Value::as_array)
        .ok_or_else(|| ClientError::MalformedResponse("missing sentence list".to_string()))?;

    let text: String = sentences
        .iter()
        .filter_map(|sentence| sentence.get(0).and_then(Value::as_str))
        .collect();

    if text.is_empty() {
        return Err(ClientError::MalformedResponse(
            "no translated text in response".to_string(),
        ));
    }

    let detected_lang = slots.get(2).and_then(Value::as_str).map(str::to_string);

    let mut metadata = Map::new();
    for (idx, name) in METADATA_SLOTS {
        if let Some(value) = slots.get(idx) {
            if !value.is_null() {
                metadata.insert(name.to_string(), value.clone());
            }
        }
    }

    Ok(TranslationResponse {
        text,
        detected_lang,
        metadata: Value::Object(metadata),
    })
}
