//! A plain fault value for tasks that fail with an optional reason.

use core::fmt;
use std::sync::Arc;

/// A task fault carrying an optional human-readable reason.
///
/// A rejection without a reason displays as the empty string, which the
/// failure reporter treats as "no reason given".
#[derive(Clone, PartialEq, Eq, Hash, Default)]
pub struct Rejection {
    reason: Option<Arc<str>>,
}

impl Rejection {
    /// Creates a rejection with the given reason.
    #[must_use]
    pub fn new(reason: impl Into<Arc<str>>) -> Self {
        Self {
            reason: Some(reason.into()),
        }
    }

    /// Creates a rejection with no reason.
    #[must_use]
    pub const fn without_reason() -> Self {
        Self { reason: None }
    }

    /// Returns the reason, if any.
    #[must_use]
    pub fn reason(&self) -> Option<&str> {
        self.reason.as_deref()
    }
}

impl fmt::Debug for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.reason {
            Some(reason) => write!(f, "Rejection({reason:?})"),
            None => f.write_str("Rejection"),
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.reason.as_deref().unwrap_or(""))
    }
}

impl std::error::Error for Rejection {}

impl From<&str> for Rejection {
    fn from(reason: &str) -> Self {
        Self::new(reason)
    }
}

impl From<String> for Rejection {
    fn from(reason: String) -> Self {
        Self::new(reason)
    }
}
