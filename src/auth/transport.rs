//! The seam between capability modules and HTTP.

use async_trait::async_trait;
use serde_json::Value;

use crate::auth::error::Result;
use crate::auth::params::QueryParams;

/// Something that can issue authenticated GETs against the environment API.
///
/// Implemented by [`ManagedAuthClient`](crate::auth::ManagedAuthClient);
/// capability modules only ever see this trait.
#[async_trait]
pub trait ApiTransport: Send + Sync {
    /// GET `path` (relative to the API base URL) and decode the JSON body.
    async fn get(&self, path: &str, params: &QueryParams) -> Result<Value>;

    /// Base URL of the environment API.
    fn base_url(&self) -> &str;

    /// Base URL for links into the dashboard UI.
    fn dashboard_url(&self) -> &str {
        self.base_url()
    }
}
