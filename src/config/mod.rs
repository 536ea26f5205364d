//! Connection configuration subsystem.
//!
//! # Data Flow
//! ```text
//! process environment (read once at startup)
//!     → loader.rs (environment id, API token, API/dashboard URLs)
//!     → proxy.rs  (HTTPS_PROXY / HTTP_PROXY → ProxyDescriptor)
//!     → ConnectionConfig + Option<ProxyDescriptor> (immutable)
//!     → handed to ManagedAuthClient at construction
//! ```
//!
//! # Design Decisions
//! - Nothing outside this module reads connection variables
//! - Every reader has a `from_lookup` form so tests never touch the real environment
//! - Ambiguous input (both proxy variables set) is rejected, never resolved by precedence

pub mod loader;
pub mod proxy;
pub mod schema;

use thiserror::Error;

pub use loader::load_config;
pub use proxy::resolve_proxy;
pub use schema::{ConnectionConfig, ProxyAuth, ProxyDescriptor};

/// Errors raised while reading connection configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required environment variable is missing or empty.
    #[error("{0} is required")]
    MissingVariable(&'static str),

    /// Both the secure and insecure proxy variables are set.
    #[error("Cannot specify both HTTPS_PROXY and HTTP_PROXY, use only one.")]
    ConflictingProxy,

    /// The API token cannot be carried in an HTTP header.
    #[error("API token contains characters not allowed in an HTTP header")]
    InvalidToken,

    /// The proxy variable could not be parsed.
    #[error("Failed to parse and configure http(s) proxy: {source}")]
    ProxyParse {
        #[source]
        source: ProxyParseError,
    },
}

/// Why a proxy value was rejected.
#[derive(Debug, Error)]
pub enum ProxyParseError {
    /// Not an absolute URL with a host.
    #[error(transparent)]
    Url(#[from] url::ParseError),

    /// User-info holds a malformed percent-escape or decodes to invalid UTF-8.
    #[error("proxy credentials are not valid percent-encoded UTF-8")]
    Credentials,
}

/// Read a variable through `lookup`, treating empty values as unset.
pub(crate) fn non_empty<F>(lookup: &F, name: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    lookup(name).filter(|value| !value.is_empty())
}

/// Strip exactly one trailing slash.
pub(crate) fn trim_trailing_slash(value: &str) -> &str {
    value.strip_suffix('/').unwrap_or(value)
}
