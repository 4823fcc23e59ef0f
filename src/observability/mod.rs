//! Fault observability: diagnostics, sinks and the failure reporter.
//!
//! Faults of raced operations travel one way:
//!
//! ```text
//! Task fault ──► observer ──► FailureReporter::report_observation
//!                  ├─► Diagnostic::unhandled (or ::minimal)
//!                  ├─► FaultSink::notify ──► FailureChannel listeners
//!                  └─► not observed? ──► FaultSink::escalate (warnings)
//!                                     └─► strict ──► FaultSink::terminate
//! ```
//!
//! - [`diagnostic`]: The [`Diagnostic`] and [`Warning`] records
//! - [`sink`]: The [`FaultSink`] seam, the process-wide [`FailureChannel`],
//!   a stderr sink and a capturing sink for tests
//! - [`reporter`]: [`FailureReporter`] and the per-race [`FaultObservation`]

pub mod diagnostic;
pub mod reporter;
pub mod sink;

pub use diagnostic::{Diagnostic, Warning, WarningKind, DIAGNOSTIC_PREFIX};
pub use reporter::{FailureReporter, FaultObservation};
pub use sink::{CapturingSink, FailureChannel, FaultSink, StderrSink, Subscription};
