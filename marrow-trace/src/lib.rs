//! Helpers for tracing in tests and tools.

/// Init a basic fmt-based tracing subscriber.
///
/// Tests call this first so `trace!`/`warn!` output from the engine shows up
/// under `--nocapture`. Calling it more than once is fine; later calls are
/// no-ops.
pub fn init() {
    let _ = tracing_subscriber::fmt::try_init();
    tracing::debug!("tracing initialized");
}
