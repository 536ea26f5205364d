//! User-Agent header value.

/// `dynatrace-managed-client/v<version> (<os>-<arch>)`
pub fn user_agent() -> String {
    format!(
        "{}/v{} ({}-{})",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS,
        std::env::consts::ARCH
    )
}
