//! Logging infrastructure

/// Initialize the tracing subscriber.
///
/// Honors `RUST_LOG`; defaults to `info` for this crate and the POS client.
pub fn init_logger() {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
