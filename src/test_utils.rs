//! Shared helpers for unit tests.

use std::sync::Once;

static INIT: Once = Once::new();

/// Installs a `tracing` subscriber that writes through the test harness.
///
/// Honors `RUST_LOG`; defaults to `debug` for this crate.
pub fn init_test_logging() {
    INIT.call_once(|| {
        let filter = tracing_subscriber::EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("guarded_resource=debug"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

/// Phase tracking macro for structured test logging.
#[macro_export]
macro_rules! test_phase {
    ($name:expr) => {
        tracing::info!(test = $name, "=== TEST START ===");
    };
}

/// Marks a test as complete in the log.
#[macro_export]
macro_rules! test_complete {
    ($name:expr) => {
        tracing::info!(test = $name, "=== TEST COMPLETE ===");
    };
}

/// Assertion with logging for better test output.
#[macro_export]
macro_rules! assert_with_log {
    ($cond:expr, $msg:expr, $expected:expr, $actual:expr) => {
        if !$cond {
            tracing::error!(
                message = $msg,
                expected = ?$expected,
                actual = ?$actual,
                "Assertion failed"
            );
        }
        assert!($cond, "{}: expected {:?}, got {:?}", $msg, $expected, $actual);
    };
}
