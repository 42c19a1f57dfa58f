//! Structured logging setup built on the `tracing` ecosystem.
//!
//! The log level can be overridden with the `RUST_LOG` environment variable:
//! ```bash
//! RUST_LOG=voicenet=trace,tokio=warn my-server
//! ```

use crate::config::LoggingConfig;
use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber from configuration.
///
/// `RUST_LOG` takes precedence over the configured level when set. Calling
/// this more than once per process has no effect beyond the first call.
pub fn init_tracing(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("voicenet={}", config.log_level)));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let result = if config.json_format {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    if let Err(e) = result {
        tracing::debug!(error = %e, "Tracing subscriber already initialized");
    }
}
