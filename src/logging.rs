//! Logging initialization.
//!
//! Diagnostics go through `tracing` with an env-filtered subscriber
//! writing to stderr, so rendered output on stdout stays clean. The
//! filter comes from `STENCIL_LOG` when set, otherwise `info` (or `debug`
//! under `--verbose`).

use tracing_subscriber::EnvFilter;

/// Environment variable controlling the log filter.
pub const LOG_ENV: &str = "STENCIL_LOG";

/// Initializes the global tracing subscriber.
///
/// Safe to call more than once; later calls are no-ops.
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
