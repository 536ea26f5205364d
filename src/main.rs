//! dt-managed-check
//!
//! Connectivity check for a Dynatrace Managed environment.
//!
//! ```text
//!   environment ──▶ load_config ──▶ ManagedAuthClient ──▶ validate_connection
//!                                                             │
//!                                                             ▼
//!                                         get_cluster_version + minimum check
//! ```
//!
//! Exits non-zero when configuration is invalid, the environment is
//! unreachable, or the cluster version cannot be read.

use clap::Parser;

use dynatrace_managed_client::auth::MINIMUM_VERSION;
use dynatrace_managed_client::observability::logging;
use dynatrace_managed_client::{load_config, ManagedAuthClient};

#[derive(Parser)]
#[command(name = "dt-managed-check")]
#[command(about = "Check connectivity to a Dynatrace Managed environment", long_about = None)]
struct Cli {
    /// Skip the cluster version lookup and minimum version check
    #[arg(long)]
    skip_version_check: bool,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = logging::DEFAULT_FILTER)]
    log_filter: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    logging::init(&cli.log_filter)?;

    let config = load_config()?;

    tracing::info!(
        environment_id = %config.environment_id,
        api_url = %config.api_url,
        dashboard_url = %config.dashboard_url,
        "Configuration loaded"
    );

    let mut client = ManagedAuthClient::new(&config)?;

    if !client.validate_connection().await {
        client.cleanup();
        return Err(format!("Unable to connect to Dynatrace environment at {}", config.api_url).into());
    }
    println!("Connected to {}", config.api_url);

    if !cli.skip_version_check {
        let version = match client.get_cluster_version().await {
            Ok(version) => version,
            Err(e) => {
                client.cleanup();
                return Err(e.into());
            }
        };

        if client.validate_minimum_version(&version) {
            println!("Cluster version {} (minimum {})", version.version, MINIMUM_VERSION);
        } else {
            tracing::warn!(
                version = %version.version,
                minimum = MINIMUM_VERSION,
                "Cluster version is below the supported minimum"
            );
            println!(
                "Cluster version {} is below the supported minimum {}",
                version.version, MINIMUM_VERSION
            );
        }
    }

    client.cleanup();
    tracing::info!("Check complete");
    Ok(())
}
