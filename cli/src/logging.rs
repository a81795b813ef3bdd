//! Tracing initialisation for the binary.
//!
//! Logs always go to stderr; stdout carries only batch output.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Logging settings from the command line.
#[derive(Debug, Clone)]
pub struct LogConfig {
    /// EnvFilter directives, e.g. `"warn"` or `"info,apibatch_http=debug"`.
    pub level: String,
    /// Emit JSON structured logs instead of human-readable text.
    pub json: bool,
}

/// Install the global subscriber. Call once at startup.
pub fn init_tracing(config: &LogConfig) {
    let filter = EnvFilter::try_new(&config.level).unwrap_or_else(|_| EnvFilter::new("warn"));

    if config.json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}
