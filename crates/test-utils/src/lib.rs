//! Shared helpers for monowatch's integration tests: config builders, a
//! scripted executor, an in-memory terminal and tracing setup.

pub mod builders;
pub mod fake_executor;

pub use builders::{ConfigFileBuilder, ProjectConfigBuilder};
pub use fake_executor::{FakeExecutor, ScriptedBuild, SharedBuffer};

use std::future::Future;
use std::sync::Once;
use std::time::Duration;

use tracing_subscriber::{fmt, EnvFilter};

static INIT: Once = Once::new();

/// Upper bound for any single async test step.
pub const TEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Initialise tracing for tests.
///
/// Logs are captured per test (`with_test_writer()`) and only printed for
/// failing tests unless run with `-- --nocapture`. Raise the level with the
/// same variable the binary uses, e.g. `MONOWATCH_LOG=debug cargo test`.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_env(monowatch::logging::LOG_ENV_VAR)
            .unwrap_or_else(|_| EnvFilter::new("info"));

        let _ = fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .with_target(true)
            .try_init();
    });
}

/// Run a future, failing the test if it takes longer than [`TEST_TIMEOUT`].
pub async fn with_timeout<F, T>(f: F) -> T
where
    F: Future<Output = T>,
{
    tokio::time::timeout(TEST_TIMEOUT, f)
        .await
        .unwrap_or_else(|_| panic!("test timed out after {TEST_TIMEOUT:?}"))
}
