//! Authenticated HTTP client for the environment API.
//!
//! # Responsibilities
//! - Carry base URL, API token and proxy (resolved once at construction)
//! - Issue GETs with the fixed header set, 30s timeout and no redirects
//! - Probe connectivity and gate on the cluster version

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONNECTION, CONTENT_TYPE};
use reqwest::redirect::Policy;
use reqwest::{Client as HttpClient, StatusCode};
use serde_json::Value;
use std::time::Duration;

use crate::auth::error::{ClientError, Result};
use crate::auth::params::QueryParams;
use crate::auth::transport::ApiTransport;
use crate::auth::version::{meets_minimum, ClusterVersion, MINIMUM_VERSION};
use crate::config::{resolve_proxy, ConfigError, ConnectionConfig, ProxyDescriptor};
use crate::user_agent::user_agent;

/// Per-request timeout.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Timeout installed by [`ManagedAuthClient::cleanup`] to unblock in-flight sockets.
const DISPOSED_TIMEOUT: Duration = Duration::from_millis(1);

pub const CLUSTER_VERSION_PATH: &str = "/api/v1/config/clusterversion";
pub const METRICS_PROBE_PATH: &str = "/api/v2/metrics";

/// Client wrapper around `reqwest` for one monitored environment.
pub struct ManagedAuthClient {
    /// API base URL (no trailing slash).
    base_url: String,
    /// Dashboard base URL used by formatters for links.
    dashboard_url: String,
    /// API token, only ever placed in the Authorization header.
    api_token: String,
    /// Proxy resolved at construction.
    proxy: Option<ProxyDescriptor>,
    /// Underlying HTTP client.
    http: HttpClient,
    /// Current per-request timeout.
    timeout: Duration,
    /// Set by `cleanup`.
    disposed: bool,
}

impl ManagedAuthClient {
    /// Create a client, resolving the proxy from the process environment.
    pub fn new(config: &ConnectionConfig) -> Result<Self> {
        let proxy = resolve_proxy()?;
        Self::with_proxy(config, proxy)
    }

    /// Create a client with an explicitly resolved proxy.
    pub fn with_proxy(config: &ConnectionConfig, proxy: Option<ProxyDescriptor>) -> Result<Self> {
        let http = build_http(&config.api_token, proxy.as_ref(), REQUEST_TIMEOUT, false)?;

        tracing::info!(
            base_url = %config.api_url,
            proxy = proxy.is_some(),
            timeout_secs = REQUEST_TIMEOUT.as_secs(),
            "Environment API client initialized"
        );

        Ok(Self {
            base_url: config.api_url.trim_end_matches('/').to_string(),
            dashboard_url: config.dashboard_url.trim_end_matches('/').to_string(),
            api_token: config.api_token.clone(),
            proxy,
            http,
            timeout: REQUEST_TIMEOUT,
            disposed: false,
        })
    }

    /// GET `path` with `params` as query string and decode the JSON body.
    ///
    /// `path` gets a leading slash if it lacks one. Any non-2xx status
    /// (3xx included, redirects are never followed) becomes
    /// [`ClientError::HttpStatus`] with the body preserved.
    pub async fn get(&self, path: &str, params: &QueryParams) -> Result<Value> {
        let path = normalize_path(path);
        let url = format!("{}{}", self.base_url, path);

        tracing::debug!(endpoint = %path, params = params.len(), "GET request");

        let response = self.http.get(&url).query(params).send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::debug!(endpoint = %path, status = status.as_u16(), "Request failed");
            return Err(ClientError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }

        tracing::debug!(
            endpoint = %path,
            status = status.as_u16(),
            bytes = body.len(),
            "Response received"
        );

        if body.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&body)?)
    }

    /// Check that the environment is reachable with the configured token.
    ///
    /// Probes the cluster version endpoint first and falls back to a one-item
    /// metrics listing, since the two deployment flavors expose different
    /// always-present endpoints. Never fails; every error becomes `false`.
    pub async fn validate_connection(&self) -> bool {
        match self.probe(CLUSTER_VERSION_PATH, &QueryParams::new()).await {
            Ok(status) => return status == StatusCode::OK,
            Err(e) => {
                tracing::error!(
                    endpoint = CLUSTER_VERSION_PATH,
                    error = %e,
                    "Connection probe failed, falling back to metrics endpoint"
                );
            }
        }

        let mut params = QueryParams::new();
        params.insert("pageSize", 1);

        match self.probe(METRICS_PROBE_PATH, &params).await {
            Ok(status) => status == StatusCode::OK,
            Err(e) => {
                tracing::error!(endpoint = METRICS_PROBE_PATH, error = %e, "Connection probe failed");
                false
            }
        }
    }

    /// Fetch the cluster version. No fallback.
    pub async fn get_cluster_version(&self) -> Result<ClusterVersion> {
        let value = self.get(CLUSTER_VERSION_PATH, &QueryParams::new()).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Whether `version` is at least [`MINIMUM_VERSION`] (equal passes).
    pub fn validate_minimum_version(&self, version: &ClusterVersion) -> bool {
        meets_minimum(&version.version, MINIMUM_VERSION)
    }

    /// Release pooled connections.
    ///
    /// Rebuilds the HTTP client with a 1 ms timeout and no idle pool so that
    /// nothing keeps sockets alive. The client should not be used afterwards.
    pub fn cleanup(&mut self) {
        match build_http(&self.api_token, self.proxy.as_ref(), DISPOSED_TIMEOUT, true) {
            Ok(http) => self.http = http,
            Err(e) => tracing::warn!(error = %e, "Failed to rebuild HTTP client during cleanup"),
        }
        self.timeout = DISPOSED_TIMEOUT;
        self.disposed = true;
    }

    /// Current per-request timeout.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed
    }

    pub fn proxy(&self) -> Option<&ProxyDescriptor> {
        self.proxy.as_ref()
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn dashboard_url(&self) -> &str {
        &self.dashboard_url
    }

    async fn probe(&self, path: &str, params: &QueryParams) -> Result<StatusCode> {
        let url = format!("{}{}", self.base_url, path);
        let response = self.http.get(&url).query(params).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::HttpStatus {
                status: status.as_u16(),
                body,
            });
        }
        Ok(status)
    }
}

#[async_trait]
impl ApiTransport for ManagedAuthClient {
    async fn get(&self, path: &str, params: &QueryParams) -> Result<Value> {
        ManagedAuthClient::get(self, path, params).await
    }

    fn base_url(&self) -> &str {
        &self.base_url
    }

    fn dashboard_url(&self) -> &str {
        &self.dashboard_url
    }
}

impl std::fmt::Debug for ManagedAuthClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManagedAuthClient")
            .field("base_url", &self.base_url)
            .field("proxy", &self.proxy)
            .field("timeout", &self.timeout)
            .field("disposed", &self.disposed)
            .finish()
    }
}

fn normalize_path(path: &str) -> String {
    if path.starts_with('/') {
        path.to_string()
    } else {
        format!("/{}", path)
    }
}

fn build_http(
    api_token: &str,
    proxy: Option<&ProxyDescriptor>,
    timeout: Duration,
    disposed: bool,
) -> Result<HttpClient> {
    let mut auth = HeaderValue::from_str(&format!("Api-Token {}", api_token))
        .map_err(|_| ConfigError::InvalidToken)?;
    auth.set_sensitive(true);

    let mut headers = HeaderMap::new();
    headers.insert(AUTHORIZATION, auth);
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    headers.insert(CONNECTION, HeaderValue::from_static("close"));

    let mut builder = HttpClient::builder()
        .default_headers(headers)
        .user_agent(user_agent())
        .timeout(timeout)
        .redirect(Policy::none());

    if disposed {
        builder = builder.pool_max_idle_per_host(0);
    }

    builder = match proxy {
        Some(descriptor) => {
            let mut proxy = reqwest::Proxy::all(descriptor.url())?;
            if let Some(auth) = &descriptor.auth {
                proxy = proxy.basic_auth(&auth.username, &auth.password);
            }
            builder.proxy(proxy)
        }
        None => builder.no_proxy(),
    };

    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProxyAuth;

    fn test_config() -> ConnectionConfig {
        ConnectionConfig {
            environment_id: "abc123".to_string(),
            api_url: "https://managed.test.com/e/abc123/".to_string(),
            dashboard_url: "https://ui.test.com/e/abc123".to_string(),
            api_token: "dt0c01.secret".to_string(),
        }
    }

    #[test]
    fn test_client_creation() {
        let client = ManagedAuthClient::with_proxy(&test_config(), None).unwrap();
        assert_eq!(client.base_url(), "https://managed.test.com/e/abc123");
        assert_eq!(client.dashboard_url(), "https://ui.test.com/e/abc123");
        assert_eq!(client.timeout(), REQUEST_TIMEOUT);
        assert!(!client.is_disposed());
    }

    #[test]
    fn test_client_with_proxy() {
        let proxy = ProxyDescriptor {
            host: "myhost.com".to_string(),
            port: 1234,
            protocol: "http:".to_string(),
            auth: Some(ProxyAuth {
                username: "myuser".to_string(),
                password: "mypass".to_string(),
            }),
        };
        let client = ManagedAuthClient::with_proxy(&test_config(), Some(proxy.clone())).unwrap();
        assert_eq!(client.proxy(), Some(&proxy));
    }

    #[test]
    fn test_debug_hides_token() {
        let client = ManagedAuthClient::with_proxy(&test_config(), None).unwrap();
        let printed = format!("{:?}", client);
        assert!(printed.contains("managed.test.com"));
        assert!(!printed.contains("dt0c01.secret"));
    }

    #[test]
    fn test_normalize_path() {
        assert_eq!(normalize_path("api/v2/slo"), "/api/v2/slo");
        assert_eq!(normalize_path("/api/v2/slo"), "/api/v2/slo");
    }

    #[test]
    fn test_cleanup_forces_short_timeout() {
        let mut client = ManagedAuthClient::with_proxy(&test_config(), None).unwrap();
        client.cleanup();
        assert_eq!(client.timeout(), Duration::from_millis(1));
        assert!(client.is_disposed());
    }

    #[test]
    fn test_minimum_version() {
        let client = ManagedAuthClient::with_proxy(&test_config(), None).unwrap();
        let version = |v: &str| ClusterVersion {
            version: v.to_string(),
        };
        assert!(client.validate_minimum_version(&version("1.328.0")));
        assert!(client.validate_minimum_version(&version("1.329.0")));
        assert!(!client.validate_minimum_version(&version("1.327.9")));
    }

    #[test]
    fn test_invalid_token_rejected() {
        let mut config = test_config();
        config.api_token = "bad\ntoken".to_string();
        let err = ManagedAuthClient::with_proxy(&config, None).unwrap_err();
        assert!(matches!(err, ClientError::Config(ConfigError::InvalidToken)));
    }

    #[tokio::test]
    async fn test_validate_connection_unreachable() {
        let config = ConnectionConfig {
            api_url: "http://127.0.0.1:1".to_string(),
            ..test_config()
        };
        let client = ManagedAuthClient::with_proxy(&config, None).unwrap();
        assert!(!client.validate_connection().await);
    }
}
