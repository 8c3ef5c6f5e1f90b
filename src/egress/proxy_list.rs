//! Proxy list loading.
//!
//! Plain text, one proxy address per line. Blank lines and lines starting
//! with `#` are skipped. The direct connection is always identity 0.
//!
//! Entries are `host:port` (plain HTTP proxy) or a URL whose scheme is one
//! of `SUPPORTED_SCHEMES`. Other schemes are logged and skipped.

use log::error;
use std::fs;
use std::path::Path;

use crate::types::{EgressIdentity, EgressTarget};

/// Proxy schemes the HTTP client can route through.
pub const SUPPORTED_SCHEMES: [&str; 4] = ["http", "https", "socks5", "socks5h"];

/// Scheme of a proxy entry; bare `host:port` is `http`.
fn proxy_scheme(addr: &str) -> &str {
    match addr.split_once("://") {
        Some((scheme, _)) => scheme,
        None => "http",
    }
}

/// Parse proxy list text into egress identities, direct connection first.
pub fn parse_proxy_list(text: &str) -> Vec<EgressIdentity> {
    let mut identities = vec![EgressIdentity::direct()];

    for (line_no, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let scheme = proxy_scheme(line);
        if !SUPPORTED_SCHEMES
            .iter()
            .any(|s| s.eq_ignore_ascii_case(scheme))
        {
            error!(
                "Skipping proxy '{}' on line {}: unsupported scheme '{}'",
                line,
                line_no + 1,
                scheme
            );
            continue;
        }

        let id = identities.len();
        identities.push(EgressIdentity::proxy(id, line));
    }

    identities
}

/// Read and parse a proxy list file.
pub fn load_proxy_list<P: AsRef<Path>>(path: P) -> Result<Vec<EgressIdentity>, String> {
    let path = path.as_ref();
    let text = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read proxy list {}: {}", path.display(), e))?;
    Ok(parse_proxy_list(&text))
}

/// Proxy list text for the given identities. Direct connections are left out.
pub fn format_proxy_list(identities: &[EgressIdentity]) -> String {
    identities
        .iter()
        .filter_map(|identity| match &identity.target {
            EgressTarget::Proxy(addr) => Some(format!("{}\n", addr)),
            EgressTarget::Direct => None,
        })
        .collect()
}

/// Write a proxy list file readable by `load_proxy_list`.
pub fn save_proxy_list<P: AsRef<Path>>(
    path: P,
    identities: &[EgressIdentity],
) -> Result<(), String> {
    let path = path.as_ref();
    fs::write(path, format_proxy_list(identities))
        .map_err(|e| format!("Failed to write proxy list {}: {}", path.display(), e))
}
