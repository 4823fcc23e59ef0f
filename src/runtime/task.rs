//! Deferred operations that settle once with a value or a fault.
//!
//! A [`Task`] is the read side and a [`Settler`] the write side of the same
//! shared slot. The first call to [`Settler::settle`] wins; later calls are
//! ignored. Any number of subscribers may be attached, before or after
//! settlement, and each one receives its own clone of the outcome exactly
//! once, delivered as a scheduler job.
//!
//! Subscribing is passive: it never creates a derived task, so a subscriber
//! cannot turn into a new unobserved fault and cannot change what the other
//! subscribers see.

use core::fmt;
use parking_lot::Mutex;
use smallvec::SmallVec;
use std::sync::Arc;

use crate::runtime::scheduler::Scheduler;
use crate::types::TaskId;

type Subscriber<T, E> = Box<dyn FnOnce(Result<T, E>) + Send + 'static>;

enum Slot<T, E> {
    Pending(SmallVec<[Subscriber<T, E>; 2]>),
    Settled(Result<T, E>),
}

struct Shared<T, E> {
    id: TaskId,
    scheduler: Scheduler,
    slot: Mutex<Slot<T, E>>,
}

/// Observable state of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskState {
    /// Not yet settled.
    Pending,
    /// Settled with a value.
    Fulfilled,
    /// Settled with a fault.
    Rejected,
}

impl TaskState {
    /// Returns true for either settled state.
    #[must_use]
    pub const fn is_settled(self) -> bool {
        !matches!(self, Self::Pending)
    }
}

/// A deferred operation that eventually settles with `Ok(T)` or `Err(E)`.
pub struct Task<T, E> {
    shared: Arc<Shared<T, E>>,
}

/// The write side of a pending [`Task`].
pub struct Settler<T, E> {
    shared: Arc<Shared<T, E>>,
}

impl<T, E> Clone for Task<T, E> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T, E> Clone for Settler<T, E> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T, E> Task<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    /// Creates a pending task and the settler that completes it.
    #[must_use]
    pub fn pending(scheduler: &Scheduler) -> (Self, Settler<T, E>) {
        let shared = Arc::new(Shared {
            id: TaskId::next(),
            scheduler: scheduler.clone(),
            slot: Mutex::new(Slot::Pending(SmallVec::new())),
        });
        (
            Self {
                shared: Arc::clone(&shared),
            },
            Settler { shared },
        )
    }

    /// Creates a task that has already settled with `outcome`.
    #[must_use]
    pub fn settled(scheduler: &Scheduler, outcome: Result<T, E>) -> Self {
        Self {
            shared: Arc::new(Shared {
                id: TaskId::next(),
                scheduler: scheduler.clone(),
                slot: Mutex::new(Slot::Settled(outcome)),
            }),
        }
    }

    /// Creates a task already fulfilled with `value`.
    #[must_use]
    pub fn ok(scheduler: &Scheduler, value: T) -> Self {
        Self::settled(scheduler, Ok(value))
    }

    /// Creates a task already rejected with `fault`.
    #[must_use]
    pub fn err(scheduler: &Scheduler, fault: E) -> Self {
        Self::settled(scheduler, Err(fault))
    }

    /// Returns the task identifier.
    #[must_use]
    pub fn id(&self) -> TaskId {
        self.shared.id
    }

    /// Returns the scheduler that delivers this task's callbacks.
    #[must_use]
    pub fn scheduler(&self) -> &Scheduler {
        &self.shared.scheduler
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> TaskState {
        match &*self.shared.slot.lock() {
            Slot::Pending(_) => TaskState::Pending,
            Slot::Settled(Ok(_)) => TaskState::Fulfilled,
            Slot::Settled(Err(_)) => TaskState::Rejected,
        }
    }

    /// Returns true once the task has settled.
    #[must_use]
    pub fn is_settled(&self) -> bool {
        self.state().is_settled()
    }

    /// Returns a clone of the outcome if the task has settled.
    #[must_use]
    pub fn outcome(&self) -> Option<Result<T, E>> {
        match &*self.shared.slot.lock() {
            Slot::Pending(_) => None,
            Slot::Settled(outcome) => Some(outcome.clone()),
        }
    }

    /// Returns the number of subscribers still waiting for settlement.
    #[must_use]
    pub fn waiting_subscribers(&self) -> usize {
        match &*self.shared.slot.lock() {
            Slot::Pending(subs) => subs.len(),
            Slot::Settled(_) => 0,
        }
    }

    /// Subscribes to the outcome as a whole.
    ///
    /// The callback runs exactly once, as a scheduler job, after the task
    /// settles. If the task has already settled the job is queued now.
    pub fn on_settle(&self, f: impl FnOnce(Result<T, E>) + Send + 'static) {
        let outcome = {
            let mut slot = self.shared.slot.lock();
            match &mut *slot {
                Slot::Pending(subs) => {
                    subs.push(Box::new(f));
                    return;
                }
                Slot::Settled(outcome) => outcome.clone(),
            }
        };
        self.shared.scheduler.spawn(move || f(outcome));
    }

    /// Subscribes with separate success and fault callbacks.
    ///
    /// Exactly one of the two runs.
    pub fn subscribe(
        &self,
        on_ok: impl FnOnce(T) + Send + 'static,
        on_fault: impl FnOnce(E) + Send + 'static,
    ) {
        self.on_settle(move |outcome| match outcome {
            Ok(value) => on_ok(value),
            Err(fault) => on_fault(fault),
        });
    }

    /// Subscribes to the fault only. Successful settlement is ignored.
    pub fn on_fault(&self, on_fault: impl FnOnce(E) + Send + 'static) {
        self.subscribe(|_| {}, on_fault);
    }
}

impl<T, E> Settler<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    /// Returns the identifier of the task this settler completes.
    #[must_use]
    pub fn task_id(&self) -> TaskId {
        self.shared.id
    }

    /// Settles the task. Returns false if it had already settled.
    pub fn settle(&self, outcome: Result<T, E>) -> bool {
        let subscribers = {
            let mut slot = self.shared.slot.lock();
            match &mut *slot {
                Slot::Settled(_) => return false,
                Slot::Pending(subs) => {
                    let subs = std::mem::take(subs);
                    *slot = Slot::Settled(outcome.clone());
                    subs
                }
            }
        };
        for subscriber in subscribers {
            let outcome = outcome.clone();
            self.shared.scheduler.spawn(move || subscriber(outcome));
        }
        true
    }

    /// Fulfils the task with `value`.
    pub fn resolve(&self, value: T) -> bool {
        self.settle(Ok(value))
    }

    /// Rejects the task with `fault`.
    pub fn reject(&self, fault: E) -> bool {
        self.settle(Err(fault))
    }
}

impl<T, E> fmt::Debug for Task<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &*self.shared.slot.lock() {
            Slot::Pending(_) => TaskState::Pending,
            Slot::Settled(Ok(_)) => TaskState::Fulfilled,
            Slot::Settled(Err(_)) => TaskState::Rejected,
        };
        f.debug_struct("Task")
            .field("id", &self.shared.id)
            .field("state", &state)
            .finish()
    }
}

impl<T, E> fmt::Debug for Settler<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Settler")
            .field("task", &self.shared.id)
            .finish()
    }
}
