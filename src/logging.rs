use tracing_subscriber::{fmt, EnvFilter};

/// Install a global `tracing` subscriber printing to stderr.
///
/// `RUST_LOG` wins over `level` when set. Calling this more than once is
/// harmless, later calls are ignored, so every test may call it.
pub fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}
