use tracing_subscriber::fmt::layer;
use tracing_subscriber::{EnvFilter, Registry, layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_DIRECTIVE: &str = "info";

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVE))
}

/// Initialize tracing with structured JSON output
///
/// Returns `false` when a global subscriber was already installed.
pub fn init_tracing() -> bool {
    Registry::default()
        .with(env_filter())
        .with(layer().json())
        .try_init()
        .is_ok()
}

/// Initialize tracing with human-readable output for interactive use
pub fn init_tracing_pretty() -> bool {
    tracing_subscriber::fmt()
        .with_env_filter(env_filter())
        .with_target(false)
        .with_file(true)
        .with_line_number(true)
        .try_init()
        .is_ok()
}
