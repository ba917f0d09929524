//! Tracing bootstrap.

use tracing_subscriber::EnvFilter;

/// Installs a stderr fmt subscriber filtered by `RUST_LOG`, defaulting to
/// `info`. Later calls are no-ops.
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .try_init();
}
