//! Test doubles and helpers shared by lime's integration tests.
//!
//! - [`fake_builder`]: scripted `Builder` that never touches a toolchain.
//! - [`fake_runner`]: `Runner` that spawns nothing and counts live children.
//! - [`builders`]: `LimeConfig` / `ProxyConfig` shortcuts.

pub mod builders;
pub mod fake_builder;
pub mod fake_runner;

use std::future::Future;
use std::sync::Once;
use std::time::Duration;

use tracing_subscriber::{EnvFilter, fmt};

static TRACING: Once = Once::new();

/// Upper bound for any single awaited step in a test.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Route lime's logs into the test harness writer, filtered by `RUST_LOG`
/// (default `info`). Idempotent.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .init();
    });
}

/// Await `f`, failing the test if it takes longer than [`TEST_TIMEOUT`].
/// Keeps a stuck restart or shutdown from hanging the suite.
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: Future<Output = T>,
{
    match tokio::time::timeout(TEST_TIMEOUT, f).await {
        Ok(out) => out,
        Err(_) => panic!("step did not finish within {TEST_TIMEOUT:?}"),
    }
}
