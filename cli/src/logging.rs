//! Tracing / logging initialisation.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log output settings.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// Default filter directive: a level ("info") or a full `EnvFilter`
    /// directive ("info,nfttrack_evm=debug"). `RUST_LOG` takes precedence.
    pub level: String,
    /// Emit JSON structured logs (true) or human-readable text (false).
    pub json: bool,
}

/// Build the filter: `RUST_LOG` first, then the configured directive, then `info`.
pub fn env_filter(config: &LogConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Initialise tracing with the given log config.
/// Should be called once at application startup.
pub fn init_tracing(config: &LogConfig) {
    let filter = env_filter(config);

    if config.json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer())
            .init();
    }
}
