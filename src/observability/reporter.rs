//! Failure reporter: turns a fault into exactly one visible diagnostic.
//!
//! # Reporting Protocol
//!
//! ```text
//! report(reason):
//!   d ← Diagnostic::unhandled(stringify(reason))   // or ::minimal() if that fails
//!   if sink.notify(d): done
//!   sink.escalate(Warning::unhandled(d))
//!   sink.escalate(Warning::advisory())
//!   if policy is Strict: sink.terminate(d)
//! ```
//!
//! Nothing here unwinds into the caller. A fault reason whose `Display`
//! errors or panics produces the static [`Diagnostic::minimal`], and a sink
//! that panics in `notify` counts as "not observed", which escalates.
//! Panics in `escalate` or `terminate` are logged and dropped.

use core::fmt::{self, Write as _};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use crate::config::UnhandledPolicy;
use crate::error::{Error, ErrorContext};
use crate::observability::diagnostic::{Diagnostic, Warning};
use crate::observability::sink::{FailureChannel, FaultSink};
use crate::tracing_compat::{debug, error, warn};
use crate::types::{RaceId, TaskId};

/// One observer's claim on one task within one race submission.
///
/// Created when the guard attaches its observer and consumed by
/// [`FailureReporter::report_observation`]. Taking it by value is what makes
/// each attachment report at most once.
#[derive(Debug, PartialEq, Eq)]
pub struct FaultObservation {
    task_id: TaskId,
    race_id: RaceId,
    position: usize,
}

impl FaultObservation {
    /// Records that `task_id` was submitted at `position` in race `race_id`.
    #[must_use]
    pub const fn new(task_id: TaskId, race_id: RaceId, position: usize) -> Self {
        Self {
            task_id,
            race_id,
            position,
        }
    }

    /// Returns the observed task.
    #[must_use]
    pub const fn task_id(&self) -> TaskId {
        self.task_id
    }

    /// Returns the race submission.
    #[must_use]
    pub const fn race_id(&self) -> RaceId {
        self.race_id
    }

    /// Returns the task's position among the race operands.
    #[must_use]
    pub const fn position(&self) -> usize {
        self.position
    }
}

/// Emits diagnostics for faults on a [`FaultSink`].
#[derive(Clone)]
pub struct FailureReporter {
    sink: Arc<dyn FaultSink>,
    policy: UnhandledPolicy,
}

impl FailureReporter {
    /// Creates a reporter on `sink` with the default [`UnhandledPolicy`].
    #[must_use]
    pub fn new(sink: Arc<dyn FaultSink>) -> Self {
        Self {
            sink,
            policy: UnhandledPolicy::default(),
        }
    }

    /// Creates a reporter on the process-wide [`FailureChannel`].
    #[must_use]
    pub fn global() -> Self {
        Self::new(Arc::new(FailureChannel::global().clone()))
    }

    /// Sets the policy applied to unobserved diagnostics.
    #[must_use]
    pub const fn with_policy(mut self, policy: UnhandledPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Returns the unhandled-rejection policy.
    #[must_use]
    pub const fn policy(&self) -> UnhandledPolicy {
        self.policy
    }

    /// Reports a fault with an optional reason.
    pub fn report(&self, reason: Option<&dyn fmt::Display>) {
        let diagnostic = build_diagnostic(reason, ErrorContext::default());
        self.emit(&diagnostic);
    }

    /// Reports the fault seen by one guard observer.
    pub fn report_observation<E: fmt::Display>(&self, observation: FaultObservation, fault: &E) {
        let ctx = ErrorContext {
            task_id: Some(observation.task_id),
            race_id: Some(observation.race_id),
        };
        let diagnostic = build_diagnostic(Some(fault), ctx)
            .with_origin(observation.task_id, observation.race_id);
        debug!(
            task_id = ?observation.task_id,
            race_id = ?observation.race_id,
            position = observation.position,
            "reporting raced task fault"
        );
        self.emit(&diagnostic);
    }

    fn emit(&self, diagnostic: &Diagnostic) {
        let observed = catch_unwind(AssertUnwindSafe(|| self.sink.notify(diagnostic)))
            .unwrap_or_else(|_| {
                error!(
                    error = %Error::reporting_failure("fault sink panicked in notify"),
                    "diagnostic delivery failed"
                );
                false
            });
        if observed {
            return;
        }

        warn!(
            task_id = ?diagnostic.task_id(),
            race_id = ?diagnostic.race_id(),
            "race fault was not observed; escalating"
        );
        let escalated = catch_unwind(AssertUnwindSafe(|| {
            self.sink.escalate(&Warning::unhandled(diagnostic));
            self.sink.escalate(&Warning::advisory());
        }));
        if escalated.is_err() {
            error!(
                error = %Error::reporting_failure("fault sink panicked in escalate"),
                "warning delivery failed"
            );
        }

        if self.policy.is_strict() {
            let terminated = catch_unwind(AssertUnwindSafe(|| self.sink.terminate(diagnostic)));
            if terminated.is_err() {
                error!(
                    error = %Error::reporting_failure("fault sink panicked in terminate"),
                    "strict termination failed"
                );
            }
        }
    }
}

impl fmt::Debug for FailureReporter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FailureReporter")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

fn build_diagnostic(reason: Option<&dyn fmt::Display>, ctx: ErrorContext) -> Diagnostic {
    match catch_unwind(AssertUnwindSafe(|| stringify_reason(reason))) {
        Ok(Ok(reason)) => Diagnostic::unhandled(reason),
        Ok(Err(fmt::Error)) => {
            error!(
                error = %Error::reporting_failure("fault reason failed to format")
                    .with_context(ctx),
                "falling back to minimal diagnostic"
            );
            Diagnostic::minimal()
        }
        Err(_) => {
            error!(
                error = %Error::reporting_failure("fault reason panicked while formatting")
                    .with_context(ctx),
                "falling back to minimal diagnostic"
            );
            Diagnostic::minimal()
        }
    }
}

/// Stringifies a fault reason. An empty rendering counts as no reason.
fn stringify_reason(reason: Option<&dyn fmt::Display>) -> Result<Option<String>, fmt::Error> {
    let Some(reason) = reason else {
        return Ok(None);
    };
    let mut rendered = String::new();
    write!(rendered, "{reason}")?;
    Ok((!rendered.is_empty()).then_some(rendered))
}
