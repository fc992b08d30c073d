//! Tracing setup for binaries, demos and tests.
//!
//! The library itself only emits `tracing` events; installing a subscriber
//! is the embedding application's call. These helpers give demos and tests
//! the standard formatting with env-filter support.

use tracing_subscriber::EnvFilter;

/// Installs the default fmt subscriber honoring `RUST_LOG`, with `info` as
/// the floor. Safe to call more than once; later calls are no-ops.
pub fn init() {
    init_with("info");
}

/// Installs the default fmt subscriber with an explicit default directive,
/// still overridable through `RUST_LOG`.
pub fn init_with(default_directive: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directive));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}
