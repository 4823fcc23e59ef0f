//! Error types and error handling strategy for Raceguard.
//!
//! Only installation can fail in a way the caller sees. Faults produced by
//! raced operations are never errors of this crate: they flow through the
//! race result (for the winner) or through the failure channel (for every
//! operation), and are never re-raised into caller code.
//!
//! # Error Categories
//!
//! - **Installation**: no race host was supplied and no implicit default exists
//! - **Configuration**: an environment variable or config file held an invalid value
//! - **Reporting**: the failure reporter could not format or emit a diagnostic;
//!   these are logged and degraded, never returned

use core::fmt;
use std::sync::Arc;

use crate::types::{RaceId, TaskId};

/// The kind of error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Installation was invoked without a usable race host.
    MissingTarget,
    /// A configuration value could not be parsed.
    InvalidConfig,
    /// The failure reporter failed while building or emitting a diagnostic.
    ReportingFailure,
}

impl ErrorKind {
    /// Returns true if an error of this kind is fatal to the call that raised it.
    ///
    /// Reporting failures are degraded in place and never reach a caller.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::MissingTarget | Self::InvalidConfig)
    }
}

/// Diagnostic context for an error.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ErrorContext {
    /// The task whose fault was being reported.
    pub task_id: Option<TaskId>,
    /// The race submission the task belonged to.
    pub race_id: Option<RaceId>,
}

/// The main error type for Raceguard operations.
#[derive(Debug, Clone)]
pub struct Error {
    kind: ErrorKind,
    message: Option<String>,
    source: Option<Arc<dyn std::error::Error + Send + Sync>>,
    context: ErrorContext,
}

impl Error {
    /// Creates a new error with the given kind.
    #[must_use]
    pub const fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
            source: None,
            context: ErrorContext {
                task_id: None,
                race_id: None,
            },
        }
    }

    /// Returns the error kind.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Adds a message description to the error.
    #[must_use]
    pub fn with_message(mut self, msg: impl Into<String>) -> Self {
        self.message = Some(msg.into());
        self
    }

    /// Adds structured context to the error.
    #[must_use]
    pub const fn with_context(mut self, ctx: ErrorContext) -> Self {
        self.context = ctx;
        self
    }

    /// Adds a source error to the chain.
    #[must_use]
    pub fn with_source(mut self, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        self.source = Some(Arc::new(source));
        self
    }

    /// Returns the error message, if any.
    #[must_use]
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Returns the error context.
    #[must_use]
    pub const fn context(&self) -> &ErrorContext {
        &self.context
    }

    /// Returns true if installation failed for lack of a race host.
    #[must_use]
    pub const fn is_missing_target(&self) -> bool {
        matches!(self.kind, ErrorKind::MissingTarget)
    }

    /// Creates a missing-target error naming the host type that was looked up.
    #[must_use]
    pub fn missing_target(host: &str) -> Self {
        Self::new(ErrorKind::MissingTarget).with_message(format!(
            "no race host supplied and no process-wide {host} has been created"
        ))
    }

    /// Creates a reporting failure with the stage that failed.
    #[must_use]
    pub fn reporting_failure(stage: impl Into<String>) -> Self {
        Self::new(ErrorKind::ReportingFailure).with_message(stage)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.kind)?;
        if let Some(msg) = &self.message {
            write!(f, ": {msg}")?;
        }
        Ok(())
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        self.source.as_ref().map(|e| e.as_ref() as _)
    }
}

impl From<crate::config::ConfigError> for Error {
    fn from(e: crate::config::ConfigError) -> Self {
        Self::new(ErrorKind::InvalidConfig)
            .with_message(e.to_string())
            .with_source(e)
    }
}

/// A specialized Result type for Raceguard operations.
pub type Result<T> = core::result::Result<T, Error>;
