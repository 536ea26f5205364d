//! Connection configuration from environment variables.

use url::Url;

use crate::config::schema::ConnectionConfig;
use crate::config::{non_empty, trim_trailing_slash, ConfigError};

pub const ENVIRONMENT_VAR: &str = "DT_MANAGED_ENVIRONMENT";
pub const ALT_ENVIRONMENT_VAR: &str = "DT_ENVIRONMENT";
pub const API_ENDPOINT_URL_VAR: &str = "DT_API_ENDPOINT_URL";
pub const DASHBOARD_URL_VAR: &str = "DT_DYNATRACE_URL";
pub const API_TOKEN_VAR: &str = "DT_MANAGED_API_TOKEN";

/// Token variables accepted, in order, when the alternate `DT_ENVIRONMENT` form is used.
pub const ALT_API_TOKEN_VARS: [&str; 3] = [
    "DT_CLASSIC_API_TOKEN",
    "DT_API_TOKEN",
    "DT_PERSONAL_ACCESS_TOKEN",
];

/// Load connection configuration from the process environment.
pub fn load_config() -> Result<ConnectionConfig, ConfigError> {
    load_config_from(|name| std::env::var(name).ok())
}

/// Load connection configuration through an arbitrary variable lookup.
pub fn load_config_from<F>(lookup: F) -> Result<ConnectionConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let (environment, alternate) = match non_empty(&lookup, ENVIRONMENT_VAR) {
        Some(value) => (value, false),
        None => (
            non_empty(&lookup, ALT_ENVIRONMENT_VAR)
                .ok_or(ConfigError::MissingVariable(ENVIRONMENT_VAR))?,
            true,
        ),
    };

    let mut api_token = non_empty(&lookup, API_TOKEN_VAR);
    if api_token.is_none() && alternate {
        api_token = ALT_API_TOKEN_VARS
            .iter()
            .find_map(|name| non_empty(&lookup, name));
    }
    let api_token = api_token.ok_or(ConfigError::MissingVariable(API_TOKEN_VAR))?;

    let environment = trim_trailing_slash(&environment).to_string();

    let config = match non_empty(&lookup, API_ENDPOINT_URL_VAR) {
        Some(endpoint) => {
            let api_url = format!("{}/e/{}", trim_trailing_slash(&endpoint), environment);
            let dashboard_url = match non_empty(&lookup, DASHBOARD_URL_VAR) {
                Some(dashboard) => {
                    format!("{}/e/{}", trim_trailing_slash(&dashboard), environment)
                }
                None => api_url.clone(),
            };
            ConnectionConfig {
                environment_id: environment,
                api_url,
                dashboard_url,
                api_token,
            }
        }
        // Legacy managed form: the environment variable holds the full environment URL.
        None => {
            let environment_id = environment_id_from_url(&environment)
                .ok_or(ConfigError::MissingVariable(API_ENDPOINT_URL_VAR))?;
            ConnectionConfig {
                environment_id,
                api_url: environment.clone(),
                dashboard_url: environment,
                api_token,
            }
        }
    };

    tracing::debug!(
        environment_id = %config.environment_id,
        api_url = %config.api_url,
        dashboard_url = %config.dashboard_url,
        "Connection configuration loaded"
    );

    Ok(config)
}

/// Last path segment of an absolute http(s) URL, or its host when there is no path.
fn environment_id_from_url(value: &str) -> Option<String> {
    let url = Url::parse(value).ok()?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return None;
    }
    let segment = url
        .path_segments()
        .and_then(|segments| segments.filter(|s| !s.is_empty()).last())
        .map(str::to_string);
    segment.or_else(|| url.host_str().map(str::to_string))
}
