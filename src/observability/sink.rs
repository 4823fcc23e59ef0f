//! Where diagnostics go.
//!
//! [`FaultSink`] is the seam between the reporter and the outside world.
//! The default sink is the process-wide [`FailureChannel`]: diagnostics are
//! handed to its subscribed listeners, and when nobody is subscribed the
//! reporter falls back to warnings on standard error.

use core::fmt;
use parking_lot::{Mutex, RwLock};
use smallvec::SmallVec;
use std::io::Write as _;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock, Weak};

use crate::observability::diagnostic::{Diagnostic, Warning};
use crate::tracing_compat::{error, warn};

/// Exit code used by the default [`FaultSink::terminate`].
pub const STRICT_EXIT_CODE: i32 = 1;

/// Destination for fault diagnostics.
pub trait FaultSink: Send + Sync {
    /// Delivers a diagnostic. Returns true if something observed it.
    fn notify(&self, diagnostic: &Diagnostic) -> bool;

    /// Emits a best-effort warning. Called only for unobserved diagnostics.
    fn escalate(&self, warning: &Warning);

    /// Ends the process under the strict unhandled-rejection policy.
    fn terminate(&self, diagnostic: &Diagnostic) {
        error!(
            task_id = ?diagnostic.task_id(),
            race_id = ?diagnostic.race_id(),
            "terminating on unhandled race rejection"
        );
        std::process::exit(STRICT_EXIT_CODE);
    }
}

/// Writes diagnostics and warnings to standard error.
///
/// Every diagnostic written counts as observed.
#[derive(Debug, Clone, Copy, Default)]
pub struct StderrSink;

impl FaultSink for StderrSink {
    fn notify(&self, diagnostic: &Diagnostic) -> bool {
        let mut stderr = std::io::stderr().lock();
        writeln!(stderr, "{diagnostic}").is_ok()
    }

    fn escalate(&self, warning: &Warning) {
        let mut stderr = std::io::stderr().lock();
        let _ = writeln!(stderr, "{warning}");
    }
}

type Listener = Arc<dyn Fn(&Diagnostic) + Send + Sync>;

struct ChannelInner {
    listeners: RwLock<Vec<(u64, Listener)>>,
    next_id: AtomicU64,
}

/// A failure-notification channel with any number of listeners.
///
/// [`FailureChannel::global`] is the process-wide instance that loggers and
/// supervisors subscribe to. Clones share one listener set.
#[derive(Clone)]
pub struct FailureChannel {
    inner: Arc<ChannelInner>,
}

static GLOBAL_CHANNEL: OnceLock<FailureChannel> = OnceLock::new();

impl FailureChannel {
    /// Creates a channel with no listeners.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Arc::new(ChannelInner {
                listeners: RwLock::new(Vec::new()),
                next_id: AtomicU64::new(1),
            }),
        }
    }

    /// Returns the process-wide channel.
    #[must_use]
    pub fn global() -> &'static Self {
        GLOBAL_CHANNEL.get_or_init(Self::new)
    }

    /// Subscribes a listener. It stays subscribed until the returned
    /// [`Subscription`] is dropped.
    pub fn subscribe(
        &self,
        listener: impl Fn(&Diagnostic) + Send + Sync + 'static,
    ) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.listeners.write().push((id, Arc::new(listener)));
        Subscription {
            channel: Arc::downgrade(&self.inner),
            id,
        }
    }

    /// Returns the number of subscribed listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.read().len()
    }

    /// Delivers `diagnostic` to every listener. Returns true if there was at
    /// least one.
    pub fn emit(&self, diagnostic: &Diagnostic) -> bool {
        // Listeners may subscribe or unsubscribe while being called.
        let listeners: SmallVec<[Listener; 4]> = self
            .inner
            .listeners
            .read()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();
        for listener in &listeners {
            listener(diagnostic);
        }
        !listeners.is_empty()
    }
}

impl Default for FailureChannel {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for FailureChannel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FailureChannel")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

impl FaultSink for FailureChannel {
    fn notify(&self, diagnostic: &Diagnostic) -> bool {
        self.emit(diagnostic)
    }

    fn escalate(&self, warning: &Warning) {
        warn!(kind = %warning.kind(), "{}", warning.message());
        StderrSink.escalate(warning);
    }
}

/// Keeps a [`FailureChannel`] listener subscribed while alive.
#[must_use = "dropping a Subscription unsubscribes the listener"]
pub struct Subscription {
    channel: Weak<ChannelInner>,
    id: u64,
}

impl Subscription {
    /// Keeps the listener subscribed for the rest of the process.
    pub fn detach(self) {
        std::mem::forget(self);
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.channel.upgrade() {
            inner.listeners.write().retain(|(id, _)| *id != self.id);
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

/// A sink that records everything it receives.
///
/// `observed` controls what [`FaultSink::notify`] reports back, which lets a
/// test drive the escalation path. Termination is recorded instead of
/// exiting.
#[derive(Debug)]
pub struct CapturingSink {
    observed: bool,
    notified: Mutex<Vec<Diagnostic>>,
    escalated: Mutex<Vec<Warning>>,
    terminated: Mutex<Vec<Diagnostic>>,
}

impl CapturingSink {
    /// A sink whose notifications count as observed.
    #[must_use]
    pub fn observing() -> Self {
        Self::with_observed(true)
    }

    /// A sink whose notifications count as unobserved, forcing escalation.
    #[must_use]
    pub fn unobserved() -> Self {
        Self::with_observed(false)
    }

    fn with_observed(observed: bool) -> Self {
        Self {
            observed,
            notified: Mutex::new(Vec::new()),
            escalated: Mutex::new(Vec::new()),
            terminated: Mutex::new(Vec::new()),
        }
    }

    /// Returns every diagnostic notified so far.
    #[must_use]
    pub fn diagnostics(&self) -> Vec<Diagnostic> {
        self.notified.lock().clone()
    }

    /// Returns the fault reasons of the notified diagnostics, sorted.
    #[must_use]
    pub fn reasons(&self) -> Vec<Option<String>> {
        let mut reasons: Vec<_> = self
            .notified
            .lock()
            .iter()
            .map(|d| d.reason().map(str::to_owned))
            .collect();
        reasons.sort();
        reasons
    }

    /// Returns the number of notified diagnostics.
    #[must_use]
    pub fn notify_count(&self) -> usize {
        self.notified.lock().len()
    }

    /// Returns every escalation warning so far.
    #[must_use]
    pub fn warnings(&self) -> Vec<Warning> {
        self.escalated.lock().clone()
    }

    /// Returns the diagnostics that would have terminated the process.
    #[must_use]
    pub fn terminations(&self) -> Vec<Diagnostic> {
        self.terminated.lock().clone()
    }
}

impl FaultSink for CapturingSink {
    fn notify(&self, diagnostic: &Diagnostic) -> bool {
        self.notified.lock().push(diagnostic.clone());
        self.observed
    }

    fn escalate(&self, warning: &Warning) {
        self.escalated.lock().push(warning.clone());
    }

    fn terminate(&self, diagnostic: &Diagnostic) {
        self.terminated.lock().push(diagnostic.clone());
    }
}
