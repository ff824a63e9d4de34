//! Tracing setup. Mirrors the `EnvFilter`-driven subscriber construction
//! used across the `dashflow` binaries.

/// Install a global `tracing` subscriber reading its filter from
/// `RUST_LOG`, defaulting to `info` when unset or invalid. Intended for
/// binaries and integration tests that embed this crate; library code
/// never calls this itself.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();
}
