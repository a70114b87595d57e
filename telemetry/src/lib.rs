//! Tracing initialization shared by indexer binaries and tests.

use std::sync::Once;

use tracing::subscriber::SetGlobalDefaultError;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when `RUST_LOG` is not set.
const DEFAULT_FILTER: &str = "info";

/// Filter used by tests when `RUST_LOG` is not set.
const DEFAULT_TEST_FILTER: &str = "feed=debug,info";

static INIT_TEST_TRACING: Once = Once::new();

/// Installs a global `fmt` subscriber filtered by `RUST_LOG`.
///
/// Records emitted through the `log` crate are forwarded as well. Fails if a global
/// subscriber was already installed.
pub fn init_tracing(app_name: &str) -> Result<(), SetGlobalDefaultError> {
    let _ = tracing_log::LogTracer::init();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let subscriber = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(true));

    tracing::subscriber::set_global_default(subscriber)?;
    tracing::info!(app_name, "tracing initialized");

    Ok(())
}

/// Installs a test writer subscriber once per process.
///
/// Safe to call at the start of every test.
pub fn init_test_tracing() {
    INIT_TEST_TRACING.call_once(|| {
        let filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(DEFAULT_TEST_FILTER));

        let _ = tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_test_writer())
            .try_init();
    });
}
