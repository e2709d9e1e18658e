//! Tracing setup for binaries and tests embedding the engine

use tracing_subscriber::EnvFilter;

/// Install a global fmt subscriber filtered by `RUST_LOG` (default `info`)
///
/// Safe to call more than once; later calls are no-ops, which lets every
/// test call it without coordinating.
pub fn init_tracing() {
    init_tracing_with_default("info");
}

/// Like [`init_tracing`] with a caller-chosen fallback directive
pub fn init_tracing_with_default(default_directive: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init();
}
