use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber.
///
/// `debug` raises the default level to DEBUG, `quiet` suppresses everything
/// below WARN. RUST_LOG overrides both when set.
pub fn init_logging(debug: bool, quiet: bool) {
    let default_level = if debug {
        "debug"
    } else if quiet {
        "warn"
    } else {
        "info"
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}
