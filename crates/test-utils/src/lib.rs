//! Shared helpers for monorun's integration tests.
//!
//! - [`fake_executor`]: a `ScriptExecutor` that never spawns processes.
//! - [`builders`]: manifests and monorepo layouts on a `MockFileSystem`.

pub mod builders;
pub mod fake_executor;

use std::future::Future;
use std::sync::Once;
use std::time::Duration;

use tracing_subscriber::{fmt, EnvFilter};

static TRACING: Once = Once::new();

/// Install a test subscriber once per test binary.
///
/// Output is captured per test and only shown for failures. `RUST_LOG`
/// overrides the default `info` filter, e.g. `RUST_LOG=monorun=debug`.
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

/// How long a queue test may wait before a stuck lane counts as a hang.
pub const LANE_DEADLINE: Duration = Duration::from_secs(5);

/// Await `fut`, panicking if it is still pending after [`LANE_DEADLINE`].
///
/// Queue tests wrap their waits in this so a lane that never picks up or
/// settles a job fails the test instead of hanging the run.
pub async fn with_timeout<F: Future>(fut: F) -> F::Output {
    match tokio::time::timeout(LANE_DEADLINE, fut).await {
        Ok(output) => output,
        Err(_) => panic!("no result within {LANE_DEADLINE:?}; a lane is stuck"),
    }
}
