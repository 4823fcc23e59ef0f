//! The replaceable race slot.
//!
//! Call sites race through a [`RaceHost`] rather than calling
//! [`race_all`](super::race_all) directly, so that a guard can swap in a
//! wrapping implementation. Clones of a host share one slot: replacing the
//! race function through any clone is visible through all of them.
//!
//! A process-wide host per `(T, E)` pair is available through
//! [`RaceHost::global`]. It only exists once something has asked for it;
//! [`RaceHost::try_global`] never creates one.
//!
//! Replacement is last-writer-wins. Installing from several threads at once
//! is not coordinated beyond the slot's lock.

use core::fmt;
use parking_lot::{Mutex, RwLock};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use crate::combinator::race::race_all;
use crate::runtime::{Scheduler, Task};

/// A race implementation: takes the scheduler and the ordered operands, and
/// returns the task that settles with the winner's outcome.
pub type RaceFn<T, E> = Arc<dyn Fn(&Scheduler, Vec<Task<T, E>>) -> Task<T, E> + Send + Sync>;

type GlobalHosts = Mutex<HashMap<TypeId, Box<dyn Any + Send + Sync>>>;

static GLOBAL_HOSTS: OnceLock<GlobalHosts> = OnceLock::new();

/// Holder of the race function used by every call site that races through it.
pub struct RaceHost<T, E> {
    slot: Arc<RwLock<RaceFn<T, E>>>,
}

impl<T, E> Clone for RaceHost<T, E> {
    fn clone(&self) -> Self {
        Self {
            slot: Arc::clone(&self.slot),
        }
    }
}

impl<T, E> RaceHost<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    /// Creates a host holding the unwrapped [`race_all`] combinator.
    #[must_use]
    pub fn new() -> Self {
        Self::with_race(Arc::new(|sched: &Scheduler, tasks: Vec<Task<T, E>>| {
            race_all(sched, tasks)
        }))
    }

    /// Creates a host holding a custom race function.
    #[must_use]
    pub fn with_race(race: RaceFn<T, E>) -> Self {
        Self {
            slot: Arc::new(RwLock::new(race)),
        }
    }

    /// Races `tasks` through the currently installed race function.
    pub fn race(
        &self,
        scheduler: &Scheduler,
        tasks: impl IntoIterator<Item = Task<T, E>>,
    ) -> Task<T, E> {
        // Nested races re-enter the host, so the lock is not held across the call.
        let race = self.race_fn();
        race(scheduler, tasks.into_iter().collect())
    }

    /// Returns the currently installed race function.
    #[must_use]
    pub fn race_fn(&self) -> RaceFn<T, E> {
        Arc::clone(&self.slot.read())
    }

    /// Replaces the race function with `update(current)` under the slot's
    /// write lock, returning the function that was replaced.
    pub fn update_race(&self, update: impl FnOnce(RaceFn<T, E>) -> RaceFn<T, E>) -> RaceFn<T, E> {
        let mut slot = self.slot.write();
        let previous = Arc::clone(&slot);
        *slot = update(Arc::clone(&previous));
        previous
    }

    /// Returns true if both handles share one slot.
    #[must_use]
    pub fn same_slot(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.slot, &other.slot)
    }

    /// Returns the process-wide host for `(T, E)`, creating it on first use.
    #[must_use]
    pub fn global() -> Self {
        let mut hosts = GLOBAL_HOSTS.get_or_init(GlobalHosts::default).lock();
        let entry = hosts
            .entry(TypeId::of::<Self>())
            .or_insert_with(|| Box::new(Self::new()));
        entry
            .downcast_ref::<Self>()
            .cloned()
            .unwrap_or_else(Self::new)
    }

    /// Returns the process-wide host for `(T, E)` if one has been created.
    #[must_use]
    pub fn try_global() -> Option<Self> {
        GLOBAL_HOSTS
            .get()?
            .lock()
            .get(&TypeId::of::<Self>())?
            .downcast_ref::<Self>()
            .cloned()
    }
}

impl<T, E> Default for RaceHost<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<T, E> fmt::Debug for RaceHost<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RaceHost")
            .field("slot", &Arc::as_ptr(&self.slot))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Rejection;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn default_host_races() {
        let sched = Scheduler::new();
        let host: RaceHost<u32, Rejection> = RaceHost::new();
        let race = host.race(&sched, [Task::ok(&sched, 1), Task::ok(&sched, 2)]);
        assert_eq!(sched.block_on(&race), Some(Ok(1)));
    }

    #[test]
    fn update_is_visible_through_clones() {
        let sched = Scheduler::new();
        let host: RaceHost<u32, Rejection> = RaceHost::new();
        let clone = host.clone();
        assert!(host.same_slot(&clone));

        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        host.update_race(move |inner| {
            Arc::new(move |sched: &Scheduler, tasks: Vec<Task<u32, Rejection>>| {
                counter.fetch_add(1, Ordering::SeqCst);
                inner(sched, tasks)
            })
        });

        let race = clone.race(&sched, [Task::ok(&sched, 9)]);
        assert_eq!(sched.block_on(&race), Some(Ok(9)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn global_is_created_once_per_type_pair() {
        #[derive(Clone, Debug, PartialEq)]
        struct OnlyHere;

        assert!(RaceHost::<OnlyHere, Rejection>::try_global().is_none());
        let a = RaceHost::<OnlyHere, Rejection>::global();
        let b = RaceHost::<OnlyHere, Rejection>::try_global().expect("global host");
        assert!(a.same_slot(&b));
        assert!(!a.same_slot(&RaceHost::new()));
    }
}
