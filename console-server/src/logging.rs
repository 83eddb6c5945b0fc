use tracing_subscriber::EnvFilter;

/// Install the stderr subscriber
pub fn init(log_level: &str) {
    // --log-level is the fallback; RUST_LOG wins when set.
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));
    if let Err(error) = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init()
    {
        tracing::warn!(%error, "tracing subscriber already installed");
    }
}
