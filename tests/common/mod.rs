#![allow(dead_code)]
#![allow(unused_imports)]
//! Shared integration test utilities.
//!
//! Import with:
//! ```
//! mod common;
//! use common::*;
//! ```

use proptest::prelude::ProptestConfig;
use proptest::test_runner::RngSeed;
use raceguard::{CapturingSink, FaultSink, GuardConfig, RaceGuard, RaceHost, Rejection};
use std::sync::{Arc, Once};
use tracing_subscriber::fmt::format::FmtSpan;

static INIT_LOGGING: Once = Once::new();

/// Default seed for property tests when running under CI.
pub const DEFAULT_PROPTEST_SEED: u64 = 0x5EED_5EED;

const PROPTEST_SEED_ENV: &str = "RACEGUARD_PROPTEST_SEED";

/// Initialize test logging with trace-level output.
pub fn init_test_logging() {
    INIT_LOGGING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::TRACE)
            .with_test_writer()
            .with_file(true)
            .with_line_number(true)
            .with_target(true)
            .with_span_events(FmtSpan::CLOSE)
            .with_ansi(false)
            .try_init();
    });
}

/// Build a ProptestConfig with deterministic seed support for CI.
#[must_use]
pub fn test_proptest_config(cases: u32) -> ProptestConfig {
    let mut config = ProptestConfig::with_cases(cases);
    // Honor an existing PROPTEST_RNG_SEED, otherwise apply our own.
    if matches!(config.rng_seed, RngSeed::Random) {
        if let Some(seed) = read_proptest_seed() {
            config.rng_seed = RngSeed::Fixed(seed);
        }
    }
    config
}

fn read_proptest_seed() -> Option<u64> {
    if let Ok(value) = std::env::var(PROPTEST_SEED_ENV) {
        return value.parse::<u64>().ok();
    }
    if std::env::var("CI").is_ok() {
        return Some(DEFAULT_PROPTEST_SEED);
    }
    None
}

/// A host guarded with `config`, reporting into a capturing sink.
pub fn guarded_host<T>(config: GuardConfig) -> (RaceHost<T, Rejection>, Arc<CapturingSink>)
where
    T: Clone + Send + 'static,
{
    guarded_host_with_sink(config, CapturingSink::observing())
}

/// A guarded host reporting into the given capturing sink.
pub fn guarded_host_with_sink<T>(
    config: GuardConfig,
    sink: CapturingSink,
) -> (RaceHost<T, Rejection>, Arc<CapturingSink>)
where
    T: Clone + Send + 'static,
{
    init_test_logging();
    let sink = Arc::new(sink);
    let host = RaceHost::new();
    RaceGuard::new(config)
        .with_sink(Arc::clone(&sink) as Arc<dyn FaultSink>)
        .install(Some(&host))
        .expect("install guard");
    (host, sink)
}

/// Sorted, owned reasons for comparing against expectations.
pub fn reasons(expected: &[&str]) -> Vec<Option<String>> {
    let mut out: Vec<_> = expected.iter().map(|r| Some((*r).to_string())).collect();
    out.sort();
    out
}

/// Log a test phase transition with a visual separator.
#[macro_export]
macro_rules! test_phase {
    ($name:expr) => {
        tracing::info!(phase = %$name, "========================================");
        tracing::info!(phase = %$name, "TEST PHASE: {}", $name);
        tracing::info!(phase = %$name, "========================================");
    };
}

/// Log test completion.
#[macro_export]
macro_rules! test_complete {
    ($name:expr) => {
        tracing::info!(test = %$name, "test completed successfully: {}", $name);
    };
}
