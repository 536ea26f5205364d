//! Dynatrace Managed API client library

pub mod auth;
pub mod capabilities;
pub mod config;
pub mod format;
pub mod observability;
pub mod user_agent;

#[cfg(test)]
mod test_support;

pub use auth::{ApiTransport, ClientError, ManagedAuthClient, QueryParams};
pub use config::{load_config, ConfigError, ConnectionConfig, ProxyDescriptor};
