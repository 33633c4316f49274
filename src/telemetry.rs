//! Initializes the process-wide `tracing` subscriber.

use tracing_subscriber::EnvFilter;

/// Installs a `fmt` subscriber. `RUST_LOG` wins when set; otherwise
/// `verbosity` (a `-v` count from the CLI) selects a default level, richer
/// for each `-v` given.
pub fn init(verbosity: u8) {
    let default_level = match verbosity {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt().with_env_filter(filter).init();
}
