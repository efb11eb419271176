use tracing::Level;

use crate::config::LoggingConfig;

/// Set to anything to force debug output regardless of config.
pub const DEBUG_ENV: &str = "PRODUCT_VISION_DEBUG";

pub fn parse_level(name: &str) -> Option<Level> {
    match name.trim().to_ascii_lowercase().as_str() {
        "error" => Some(Level::ERROR),
        "warn" | "warning" => Some(Level::WARN),
        "info" => Some(Level::INFO),
        "debug" => Some(Level::DEBUG),
        "trace" => Some(Level::TRACE),
        _ => None,
    }
}

fn effective_level(config: &LoggingConfig, debug_forced: bool) -> Level {
    if debug_forced {
        return Level::DEBUG;
    }
    parse_level(&config.level).unwrap_or(Level::INFO)
}

/// Installs the stderr subscriber. Later calls are no-ops.
pub fn init(config: &LoggingConfig) {
    let level = effective_level(config, std::env::var_os(DEBUG_ENV).is_some());
    let subscriber = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_max_level(level)
        .finish();
    let _ = tracing::subscriber::set_global_default(subscriber);
}
