//! Structured logging with `tracing`.
//!
//! Log context (tenant, channel, connection ID) is propagated via tracing
//! spans and structured fields rather than interpolated strings.

/// Initialize the global tracing subscriber with stderr output.
///
/// Call once at application startup. Subsequent calls are no-ops.
/// `RUST_LOG` overrides the provided default level.
pub fn init_subscriber(level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .compact();

    // try_init is a no-op if a subscriber is already set
    let _ = subscriber.try_init();
}
