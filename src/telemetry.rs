//! Process-wide tracing setup.

use tracing_subscriber::EnvFilter;

/// Initializes structured logging for this process.
///
/// Verbosity follows `RUST_LOG` (default `info`). Output goes to stderr in
/// every role: a worker's stdout is its command channel to the primary, so
/// stdout must stay clean.
///
/// # Environment Variables
///
/// - `RUST_LOG=info` - lifecycle events and mutations
/// - `RUST_LOG=debug` - every store operation and request
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
