//! Proxy health check.
//!
//! Sends one GET through each proxy identity to an IP-echo endpoint and keeps
//! the proxies that answer with a 2xx status within the timeout. Free proxy
//! lists are mostly dead, so a list is usually filtered once before a run.

use log::{debug, info, warn};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use super::http::build_client;
use crate::types::EgressIdentity;

/// Endpoint that echoes the caller's address.
pub const DEFAULT_CHECK_URL: &str = "https://httpbin.org/ip";

#[derive(Debug, Clone)]
pub struct ProxyCheckConfig {
    pub check_url: String,
    /// Whole-request timeout per proxy
    pub timeout: Duration,
    /// Proxies checked at the same time
    pub concurrency: usize,
}

impl Default for ProxyCheckConfig {
    fn default() -> Self {
        Self {
            check_url: DEFAULT_CHECK_URL.to_string(),
            timeout: Duration::from_secs(5),
            concurrency: 16,
        }
    }
}

/// Result of checking one proxy.
#[derive(Debug, Clone)]
pub struct ProxyCheckResult {
    pub identity: EgressIdentity,
    /// Round-trip time, or why the proxy was rejected
    pub outcome: Result<Duration, String>,
}

impl ProxyCheckResult {
    pub fn is_ok(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Check a single identity.
pub async fn check_proxy(
    identity: &EgressIdentity,
    config: &ProxyCheckConfig,
) -> Result<Duration, String> {
    let client = build_client(identity, config.timeout).map_err(|e| e.to_string())?;
    let started = Instant::now();

    let response = client
        .get(&config.check_url)
        .send()
        .await
        .map_err(|e| format!("Request failed: {}", e))?;

    let status = response.status();
    if !status.is_success() {
        return Err(format!("Unexpected HTTP status {}", status.as_u16()));
    }

    let body = response
        .text()
        .await
        .map_err(|e| format!("Failed to read response: {}", e))?;
    debug!("{} answered {}", identity, body.trim());

    Ok(started.elapsed())
}

/// Check every proxy identity concurrently. The direct connection is skipped.
///
/// Results come back in identity order.
pub async fn check_proxies(
    identities: &[EgressIdentity],
    config: &ProxyCheckConfig,
) -> Vec<ProxyCheckResult> {
    let config = Arc::new(config.clone());
    let permits = Arc::new(Semaphore::new(config.concurrency.max(1)));
    let mut join_set = JoinSet::new();

    for identity in identities.iter().filter(|i| !i.is_direct()).cloned() {
        let config = Arc::clone(&config);
        let permits = Arc::clone(&permits);

        join_set.spawn(async move {
            let _permit = permits.acquire_owned().await;
            let outcome = check_proxy(&identity, &config).await;
            match &outcome {
                Ok(latency) => info!("Proxy {} OK in {:?}", identity, latency),
                Err(e) => info!("Proxy {} skipped: {}", identity, e),
            }
            ProxyCheckResult { identity, outcome }
        });
    }

    let mut results = Vec::with_capacity(join_set.len());
    while let Some(joined) = join_set.join_next().await {
        match joined {
            Ok(result) => results.push(result),
            Err(e) => warn!("Proxy check task failed: {}", e),
        }
    }

    results.sort_by_key(|r| r.identity.id);
    results
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::SocketAddr;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Local HTTP proxy that answers every request with a fixed JSON body.
    async fn echo_proxy() -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                tokio::spawn(async move {
                    let mut buf = [0u8; 4096];
                    let _ = socket.read(&mut buf).await;
                    let body = r#"{"origin": "192.0.2.7"}"#;
                    let response = format!(
                        "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                        body.len(),
                        body
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                });
            }
        });

        addr
    }

    /// Local proxy that accepts connections and never answers.
    async fn silent_proxy() -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });

        addr
    }

    /// Address nothing listens on.
    fn closed_port() -> SocketAddr {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    }

    fn test_config() -> ProxyCheckConfig {
        ProxyCheckConfig {
            check_url: "http://ip-echo.test/ip".to_string(),
            timeout: Duration::from_millis(500),
            concurrency: 4,
        }
    }

    #[tokio::test]
    async fn test_responding_proxy_passes() {
        let addr = echo_proxy().await;
        let identity = EgressIdentity::proxy(1, addr.to_string());

        assert!(check_proxy(&identity, &test_config()).await.is_ok());
    }

    #[tokio::test]
    async fn test_silent_proxy_times_out() {
        let addr = silent_proxy().await;
        let identity = EgressIdentity::proxy(1, addr.to_string());

        let started = Instant::now();
        assert!(check_proxy(&identity, &test_config()).await.is_err());
        assert!(started.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_check_proxies_keeps_order_and_skips_direct() {
        let live = echo_proxy().await;
        let dead = closed_port();

        let identities = vec![
            EgressIdentity::direct(),
            EgressIdentity::proxy(1, dead.to_string()),
            EgressIdentity::proxy(2, live.to_string()),
        ];

        let results = check_proxies(&identities, &test_config()).await;

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].identity.id, 1);
        assert!(!results[0].is_ok());
        assert_eq!(results[1].identity.id, 2);
        assert!(results[1].is_ok());
    }
}
