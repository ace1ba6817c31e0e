//! Structured logging setup

use tracing_subscriber::EnvFilter;

use crate::config::Config;

/// Initialize JSON tracing output
///
/// `RUST_LOG` wins over the configured `service.log_level`. An invalid
/// directive falls back to `info`. Calling this more than once is harmless;
/// only the first subscriber is installed.
pub fn init_tracing(config: &Config) {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.service.log_level))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let installed = tracing_subscriber::fmt()
        .json()
        .with_env_filter(filter)
        .with_current_span(true)
        .try_init()
        .is_ok();

    if installed {
        tracing::info!(
            service = %config.service.name,
            environment = %config.service.environment,
            "Tracing initialized"
        );
    }
}

/// Flush and stop tracing
pub fn shutdown_tracing() {
    tracing::info!("Tracing shutdown complete");
}
