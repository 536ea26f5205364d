//! Configuration types.
//!
//! Both types are produced once at startup and never mutated afterwards.

use serde::Serialize;

/// Connection parameters for one monitored environment.
///
/// All four fields are non-empty and the URLs carry no trailing slash.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ConnectionConfig {
    /// Environment identifier (the `<id>` in `/e/<id>`).
    pub environment_id: String,

    /// Base URL used for REST API calls.
    pub api_url: String,

    /// Base URL used for links into the dashboard UI.
    pub dashboard_url: String,

    /// API token sent as `Authorization: Api-Token <token>`.
    #[serde(skip_serializing)]
    pub api_token: String,
}

/// Proxy derived from `HTTPS_PROXY` or `HTTP_PROXY`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyDescriptor {
    /// Proxy host name.
    pub host: String,

    /// Proxy port (443/80 when the URL omits it).
    pub port: u16,

    /// URL scheme including the trailing colon, e.g. `"http:"`.
    pub protocol: String,

    /// Percent-decoded credentials from the URL's user-info, if any.
    pub auth: Option<ProxyAuth>,
}

impl ProxyDescriptor {
    /// Proxy URL without credentials, e.g. `http://myhost.com:1234`.
    pub fn url(&self) -> String {
        format!("{}//{}:{}", self.protocol, self.host, self.port)
    }
}

/// Basic-auth credentials for the proxy.
#[derive(Clone, PartialEq, Eq)]
pub struct ProxyAuth {
    pub username: String,
    pub password: String,
}

impl std::fmt::Debug for ProxyAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyAuth")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}
