//! Diagnostic tracing for packer runs.
//!
//! # Separation of Concerns
//!
//! - **Tracing (this module)**: Progress and debugging detail via `RUST_LOG`,
//!   output to stderr.
//!
//! - **Run report (`report`)**: Per-unit outcome lines printed to stdout.
//!   Always written, unaffected by `RUST_LOG`.

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing subscriber for diagnostics.
///
/// Reads `RUST_LOG` env var. Defaults to `warn` if unset.
/// Output: stderr, compact format.
///
/// # Example
/// ```bash
/// RUST_LOG=packer=info packer ./functions
/// ```
pub fn init() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr).compact())
        .init();
}
