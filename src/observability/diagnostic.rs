//! Diagnostic records emitted for observed faults.

use core::fmt;

use crate::types::{RaceId, TaskId};

/// Prefix carried by every message this crate emits.
pub const DIAGNOSTIC_PREFIX: &str = "[raceguard]: ";

const UNHANDLED_BODY: &str = "This fault originated either from an operation that failed \
     without a fault handler, or from a task whose fault was never observed after it was raced.";

const MINIMAL_BODY: &str = "A raced operation failed, but its fault could not be described.";

const VISIBILITY_NOTE: &str = "Unhandled task rejection in a race. Faults of operations that \
     lose a race are reported so they do not disappear silently.";

const STRICT_HINT: &str = "To terminate the process on unhandled rejections, set \
     RACEGUARD_UNHANDLED_REJECTIONS=strict or configure UnhandledPolicy::Strict.";

const ADVISORY_BODY: &str = "Unhandled race rejections are currently reported as warnings. \
     Under the strict policy an unhandled rejection terminates the process with a non-zero \
     exit code.";

/// A human-readable report of one observed fault.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    message: String,
    reason: Option<String>,
    task_id: Option<TaskId>,
    race_id: Option<RaceId>,
    degraded: bool,
}

impl Diagnostic {
    /// Builds the diagnostic for a fault that nothing else handled.
    ///
    /// `reason` is the already-stringified fault reason; `None` means the
    /// fault carried no reason.
    #[must_use]
    pub fn unhandled(reason: Option<String>) -> Self {
        let mut message = format!("{DIAGNOSTIC_PREFIX}{UNHANDLED_BODY}");
        if let Some(reason) = &reason {
            message.push_str(&format!(" The task was rejected with the reason \"{reason}\"."));
        }
        Self {
            message,
            reason,
            task_id: None,
            race_id: None,
            degraded: false,
        }
    }

    /// Builds the static fallback used when the fault could not be described.
    #[must_use]
    pub fn minimal() -> Self {
        Self {
            message: format!("{DIAGNOSTIC_PREFIX}{MINIMAL_BODY}"),
            reason: None,
            task_id: None,
            race_id: None,
            degraded: true,
        }
    }

    /// Attaches the faulting task and the race it was observed in.
    #[must_use]
    pub const fn with_origin(mut self, task_id: TaskId, race_id: RaceId) -> Self {
        self.task_id = Some(task_id);
        self.race_id = Some(race_id);
        self
    }

    /// Returns the full message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Returns the stringified fault reason, if the fault had one.
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }

    /// Returns the task whose fault this describes.
    #[must_use]
    pub const fn task_id(&self) -> Option<TaskId> {
        self.task_id
    }

    /// Returns the race submission the fault was observed through.
    #[must_use]
    pub const fn race_id(&self) -> Option<RaceId> {
        self.race_id
    }

    /// Returns true if this is the static fallback diagnostic.
    #[must_use]
    pub const fn is_degraded(&self) -> bool {
        self.degraded
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

/// Kind of an escalation warning.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WarningKind {
    /// A fault that no listener observed.
    UnhandledRejection,
    /// A note about the available unhandled-rejection policies.
    Advisory,
}

impl WarningKind {
    /// Returns the stable name printed ahead of the warning.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::UnhandledRejection => "UnhandledRaceRejectionWarning",
            Self::Advisory => "RaceGuardAdvisory",
        }
    }
}

impl fmt::Display for WarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A best-effort warning emitted when a diagnostic went unobserved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Warning {
    kind: WarningKind,
    message: String,
}

impl Warning {
    /// Wraps an unobserved diagnostic with the visibility note and the
    /// strict-policy hint.
    #[must_use]
    pub fn unhandled(diagnostic: &Diagnostic) -> Self {
        let detail = diagnostic
            .message()
            .strip_prefix(DIAGNOSTIC_PREFIX)
            .unwrap_or_else(|| diagnostic.message());
        Self {
            kind: WarningKind::UnhandledRejection,
            message: format!("{DIAGNOSTIC_PREFIX}{VISIBILITY_NOTE} {detail} {STRICT_HINT}"),
        }
    }

    /// The policy advisory that follows an unhandled-rejection warning.
    #[must_use]
    pub fn advisory() -> Self {
        Self {
            kind: WarningKind::Advisory,
            message: format!("{DIAGNOSTIC_PREFIX}{ADVISORY_BODY}"),
        }
    }

    /// Returns the warning kind.
    #[must_use]
    pub const fn kind(&self) -> WarningKind {
        self.kind
    }

    /// Returns the warning text.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unhandled_includes_reason() {
        let d = Diagnostic::unhandled(Some("disk full".to_string()));
        assert!(d.message().starts_with(DIAGNOSTIC_PREFIX));
        assert!(d.message().contains("rejected with the reason \"disk full\""));
        assert_eq!(d.reason(), Some("disk full"));
        assert!(!d.is_degraded());
    }

    #[test]
    fn unhandled_without_reason_omits_clause() {
        let d = Diagnostic::unhandled(None);
        assert!(!d.message().contains("rejected with the reason"));
        assert_eq!(d.reason(), None);
    }

    #[test]
    fn minimal_is_degraded() {
        let d = Diagnostic::minimal();
        assert!(d.is_degraded());
        assert!(d.to_string().starts_with(DIAGNOSTIC_PREFIX));
    }

    #[test]
    fn origin_is_recorded() {
        let d = Diagnostic::unhandled(None)
            .with_origin(TaskId::new_for_test(1), RaceId::new_for_test(2));
        assert_eq!(d.task_id(), Some(TaskId::new_for_test(1)));
        assert_eq!(d.race_id(), Some(RaceId::new_for_test(2)));
    }

    #[test]
    fn unhandled_warning_carries_diagnostic_and_hint() {
        let d = Diagnostic::unhandled(Some("X".to_string()));
        let w = Warning::unhandled(&d);
        assert_eq!(w.kind(), WarningKind::UnhandledRejection);
        assert!(w.message().contains("\"X\""));
        assert!(w.message().contains("RACEGUARD_UNHANDLED_REJECTIONS=strict"));
        assert!(w.to_string().starts_with("UnhandledRaceRejectionWarning: "));
        assert_eq!(w.message().matches(DIAGNOSTIC_PREFIX).count(), 1);
    }

    #[test]
    fn advisory_names_strict_policy() {
        let w = Warning::advisory();
        assert_eq!(w.kind(), WarningKind::Advisory);
        assert!(w.message().contains("strict policy"));
    }
}
