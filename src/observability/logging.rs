//! Structured logging.
//!
//! # Responsibilities
//! - Install the process-wide tracing subscriber (binary only)
//! - Resolve the log filter from `RUST_LOG` or a default directive
//!
//! # Design Decisions
//! - Uses the tracing crate; library code only emits events
//! - Human-readable fmt output on stderr so stdout stays free for results

use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when neither `RUST_LOG` nor a caller default applies.
pub const DEFAULT_FILTER: &str = "dynatrace_managed_client=info,dt_managed_check=info";

/// Pick the filter: a valid `RUST_LOG` value wins, otherwise `default_filter`.
///
/// An unparsable default falls back to [`DEFAULT_FILTER`].
pub fn env_filter(rust_log: Option<&str>, default_filter: &str) -> EnvFilter {
    rust_log
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .or_else(|| EnvFilter::try_new(default_filter).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_FILTER))
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init(default_filter: &str) -> Result<(), TryInitError> {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();

    tracing_subscriber::registry()
        .with(env_filter(rust_log.as_deref(), default_filter))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .try_init()
}
