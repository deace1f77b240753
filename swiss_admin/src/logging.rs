//! Structured logging configuration.
//!
//! Log output goes to stderr so command results on stdout stay machine-readable.
//! Records emitted by the engine through the `log` facade are captured by the
//! same subscriber.

use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Default filter when `RUST_LOG` is unset
pub const DEFAULT_FILTER: &str = "info,sqlx=warn";

/// Initialize structured logging
///
/// Log levels are configurable via the `RUST_LOG` env var.
///
/// # Example
///
/// ```no_run
/// use swiss_admin::logging;
///
/// logging::init();
/// tracing::info!("Admin tool starting");
/// ```
pub fn init() {
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(true)
        .with_writer(std::io::stderr);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

/// Log a finished admin command
pub fn log_command(command: &str, duration_ms: u64, succeeded: bool) {
    if succeeded {
        tracing::info!(command = command, duration_ms = duration_ms, "Command completed");
    } else {
        tracing::warn!(command = command, duration_ms = duration_ms, "Command failed");
    }

    if duration_ms > 1000 {
        tracing::warn!(
            command = command,
            duration_ms = duration_ms,
            "PERFORMANCE: Slow command"
        );
    }
}
