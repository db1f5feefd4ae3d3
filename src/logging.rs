//! Tracing initialization.
//!
//! Diagnostics go to stderr so stdout carries only the report/plot output.

use std::sync::Once;

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

static INIT: Once = Once::new();

/// Initialize logging once per process.
///
/// Reads per-module levels from `EPI_LOG` (e.g. `EPI_LOG=epi_renewal::engine=debug`).
/// Falls back to `epi_renewal=info`, or `epi_renewal=debug` when `verbose` is set.
pub fn init_tracing(verbose: bool) {
    INIT.call_once(|| {
        let fallback = if verbose { "epi_renewal=debug" } else { "epi_renewal=info" };
        let filter = EnvFilter::try_from_env("EPI_LOG").unwrap_or_else(|_| EnvFilter::new(fallback));

        // Another subscriber may already be installed (e.g. by an embedding host).
        let _ = tracing_subscriber::registry()
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .with(filter)
            .try_init();
    });
}
