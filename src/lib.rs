//! Raceguard: first-to-settle races that never swallow a losing fault.
//!
//! # Overview
//!
//! A race combinator settles with the outcome of whichever operation settles
//! first. Every other operation keeps running, and if one of them fails
//! nobody is listening: the fault disappears. Raceguard wraps the combinator
//! so that each operation handed to it carries a passive fault observer, and
//! every fault is surfaced on the process-wide failure channel.
//!
//! The wrapper never changes which operation wins, what the race returns, or
//! when it settles. It does not cancel losers either; they run to completion
//! so their faults can still be observed.
//!
//! # Core Guarantees
//!
//! - **Result transparency**: the race result is the unwrapped combinator's result
//! - **Exactly once**: one report per (operation, race submission) that faults
//! - **Never silent**: an unobserved report escalates to a warning on stderr
//! - **Never fatal by accident**: reporting failures degrade to a static diagnostic
//!
//! # Module Structure
//!
//! - [`types`]: Identifiers and the [`Rejection`] fault type
//! - [`runtime`]: Cooperative [`Scheduler`] and the [`Task`] operation abstraction
//! - [`combinator`]: The unwrapped race combinator and the [`RaceHost`] slot
//! - [`guard`]: [`RaceGuard`] installation and the observing wrapper
//! - [`observability`]: Diagnostics, fault sinks and the [`FailureReporter`]
//! - [`config`]: [`GuardConfig`] with environment and file overrides
//! - [`error`]: Error types
//!
//! # Example
//!
//! ```
//! use raceguard::{make_race_safe, GuardConfig, RaceHost, Rejection, Scheduler, Task};
//!
//! let host: RaceHost<&'static str, Rejection> = RaceHost::new();
//! make_race_safe(Some(&host), Some(GuardConfig::default())).unwrap();
//!
//! let sched = Scheduler::new();
//! let race = host.race(
//!     &sched,
//!     vec![Task::ok(&sched, "yes"), Task::err(&sched, Rejection::new("X"))],
//! );
//! assert_eq!(sched.block_on(&race), Some(Ok("yes")));
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::doc_markdown)]

pub mod combinator;
pub mod config;
pub mod error;
pub mod guard;
pub mod observability;
pub mod runtime;
pub mod tracing_compat;
pub mod types;

#[cfg(test)]
pub(crate) mod test_utils;

pub use combinator::{race_all, RaceFn, RaceHost};
pub use config::{ConfigError, GuardConfig, UnhandledPolicy};
pub use error::{Error, ErrorKind, Result};
pub use guard::{make_race_safe, RaceGuard};
pub use observability::{
    CapturingSink, Diagnostic, FailureChannel, FailureReporter, FaultObservation, FaultSink,
    StderrSink, Subscription, Warning, WarningKind, DIAGNOSTIC_PREFIX,
};
pub use runtime::{Scheduler, Settler, Task, TaskState};
pub use types::{RaceId, Rejection, TaskId};
