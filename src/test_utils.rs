//! Test utilities for Raceguard unit tests.
//!
//! - Consistent tracing-based logging initialization
//! - A process-wide lock for tests that mutate environment variables
//! - Guarded host constructors backed by a [`CapturingSink`]

use std::sync::{Arc, Mutex, Once};
use tracing_subscriber::fmt::format::FmtSpan;

use crate::combinator::RaceHost;
use crate::config::{GuardConfig, ENV_ALLOW_OVERHEAD, ENV_UNHANDLED_REJECTIONS};
use crate::guard::RaceGuard;
use crate::observability::{CapturingSink, FaultSink};

static INIT_LOGGING: Once = Once::new();
static ENV_LOCK: Mutex<()> = Mutex::new(());

/// Initialize test logging with trace-level output.
///
/// Safe to call multiple times; only initializes once.
pub fn init_test_logging() {
    init_test_logging_with_level(tracing::Level::TRACE);
}

/// Initialize test logging with a custom level.
///
/// The first call wins; later calls are no-ops.
pub fn init_test_logging_with_level(level: tracing::Level) {
    INIT_LOGGING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(level)
            .with_test_writer()
            .with_file(true)
            .with_line_number(true)
            .with_target(true)
            .with_thread_ids(true)
            .with_span_events(FmtSpan::CLOSE)
            .with_ansi(false)
            .try_init();
    });
}

/// Acquire the global environment lock for tests that mutate env vars.
pub(crate) fn env_lock() -> std::sync::MutexGuard<'static, ()> {
    ENV_LOCK
        .lock()
        .unwrap_or_else(std::sync::PoisonError::into_inner)
}

/// Runs `f` with exactly the given `RACEGUARD_*` variables set, holding the
/// environment lock throughout.
pub(crate) fn with_envs<F, R>(vars: &[(&str, &str)], f: F) -> R
where
    F: FnOnce() -> R,
{
    let _guard = env_lock();
    clear_guard_env();
    for (k, v) in vars {
        std::env::set_var(k, v);
    }
    let result = f();
    clear_guard_env();
    result
}

fn clear_guard_env() {
    for var in [ENV_ALLOW_OVERHEAD, ENV_UNHANDLED_REJECTIONS] {
        std::env::remove_var(var);
    }
}

/// Creates a fresh host guarded with `config`, reporting into a capturing
/// sink whose notifications count as observed.
pub fn guarded_host<T, E>(config: GuardConfig) -> (RaceHost<T, E>, Arc<CapturingSink>)
where
    T: Clone + Send + 'static,
    E: Clone + Send + std::fmt::Display + 'static,
{
    init_test_logging();
    let sink = Arc::new(CapturingSink::observing());
    let host = RaceHost::new();
    RaceGuard::new(config)
        .with_sink(Arc::clone(&sink) as Arc<dyn FaultSink>)
        .install(Some(&host))
        .expect("install guard");
    (host, sink)
}
