//! Authenticated request pipeline.
//!
//! # Data Flow
//! ```text
//! ConnectionConfig + Option<ProxyDescriptor>
//!     → client.rs (reqwest client: Api-Token header, 30s timeout, no redirects)
//!     → transport.rs (ApiTransport: the only surface capability modules see)
//!     → GET <api_url><path>?<params.rs>
//!     → serde_json::Value or ClientError (status + body preserved)
//! ```
//!
//! # Design Decisions
//! - No retries; the only fallback is the fixed two-endpoint connection probe
//! - Proxy is resolved once, never re-read per request
//! - Version gate is a pure function (version.rs) so it is testable offline

pub mod client;
pub mod error;
pub mod params;
pub mod transport;
pub mod version;

pub use client::ManagedAuthClient;
pub use error::{ClientError, Result};
pub use params::QueryParams;
pub use transport::ApiTransport;
pub use version::{meets_minimum, ClusterVersion, MINIMUM_VERSION};
