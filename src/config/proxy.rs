//! Outbound proxy resolution.
//!
//! # Responsibilities
//! - Read the secure and insecure proxy variables (lower-case form wins)
//! - Reject configurations that set both
//! - Parse the one that is set into a `ProxyDescriptor`

use std::borrow::Cow;

use url::Url;

use crate::config::schema::{ProxyAuth, ProxyDescriptor};
use crate::config::{non_empty, ConfigError, ProxyParseError};

const HTTPS_PROXY_VARS: [&str; 2] = ["https_proxy", "HTTPS_PROXY"];
const HTTP_PROXY_VARS: [&str; 2] = ["http_proxy", "HTTP_PROXY"];

const DEFAULT_HTTPS_PORT: u16 = 443;
const DEFAULT_HTTP_PORT: u16 = 80;

/// Resolve the proxy from the process environment.
pub fn resolve_proxy() -> Result<Option<ProxyDescriptor>, ConfigError> {
    resolve_proxy_from(|name| std::env::var(name).ok())
}

/// Resolve the proxy through an arbitrary variable lookup.
///
/// Returns `Ok(None)` when neither variable is set.
pub fn resolve_proxy_from<F>(lookup: F) -> Result<Option<ProxyDescriptor>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let https_proxy = HTTPS_PROXY_VARS
        .iter()
        .find_map(|name| non_empty(&lookup, name));
    let http_proxy = HTTP_PROXY_VARS
        .iter()
        .find_map(|name| non_empty(&lookup, name));

    let (raw, default_port) = match (https_proxy, http_proxy) {
        (Some(_), Some(_)) => return Err(ConfigError::ConflictingProxy),
        (Some(raw), None) => (raw, DEFAULT_HTTPS_PORT),
        (None, Some(raw)) => (raw, DEFAULT_HTTP_PORT),
        (None, None) => return Ok(None),
    };

    let descriptor = parse_proxy(&raw, default_port).map_err(|source| {
        tracing::error!(error = %source, "Failed to configure HTTP proxy");
        ConfigError::ProxyParse { source }
    })?;

    tracing::info!(
        host = %descriptor.host,
        port = descriptor.port,
        "Configuring HTTP proxy"
    );

    Ok(Some(descriptor))
}

fn parse_proxy(raw: &str, default_port: u16) -> Result<ProxyDescriptor, ProxyParseError> {
    let url = Url::parse(raw)?;
    let host = url
        .host_str()
        .filter(|host| !host.is_empty())
        .ok_or(url::ParseError::EmptyHost)?
        .to_string();

    let auth = if url.username().is_empty() {
        None
    } else {
        Some(ProxyAuth {
            username: percent_decode(url.username())?,
            password: url
                .password()
                .map(percent_decode)
                .transpose()?
                .unwrap_or_default(),
        })
    };

    Ok(ProxyDescriptor {
        host,
        port: url.port().unwrap_or(default_port),
        protocol: format!("{}:", url.scheme()),
        auth,
    })
}

/// Strict percent-decoding: every `%` must start a two-digit hex escape and
/// the decoded bytes must be UTF-8.
fn percent_decode(value: &str) -> Result<String, ProxyParseError> {
    let bytes = value.as_bytes();
    let malformed = bytes.iter().enumerate().any(|(i, b)| {
        *b == b'%'
            && !(bytes.get(i + 1).is_some_and(u8::is_ascii_hexdigit)
                && bytes.get(i + 2).is_some_and(u8::is_ascii_hexdigit))
    });
    if malformed {
        return Err(ProxyParseError::Credentials);
    }

    urlencoding::decode(value)
        .map(Cow::into_owned)
        .map_err(|_| ProxyParseError::Credentials)
}
