//! Tracing and logging setup shared by the binaries.

/// Initialize process-wide logging with `RUST_LOG` (default `info`) and
/// human-readable output.
///
/// This is safe to call multiple times; subsequent calls become no-ops.
pub fn init() {
    tracing::init();
}

/// Tracing configuration (filters, formats).
pub mod tracing;

pub use self::tracing::{LogFormat, init_with};
