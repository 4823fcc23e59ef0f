//! FIFO job scheduler.
//!
//! Jobs run in the order they were spawned. A job may spawn further jobs;
//! those are appended behind everything already queued, which is what gives
//! settlement callbacks their deterministic ordering.

use core::fmt;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::runtime::task::Task;
use crate::tracing_compat::trace;

type Job = Box<dyn FnOnce() + Send + 'static>;

#[derive(Default)]
struct SchedulerInner {
    queue: Mutex<VecDeque<Job>>,
    executed: AtomicU64,
}

/// A single-threaded cooperative scheduler.
///
/// Cloning a `Scheduler` yields another handle to the same job queue.
#[derive(Clone, Default)]
pub struct Scheduler {
    inner: Arc<SchedulerInner>,
}

impl Scheduler {
    /// Creates a scheduler with an empty queue.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Enqueues a job behind all currently queued jobs.
    pub fn spawn(&self, job: impl FnOnce() + Send + 'static) {
        self.inner.queue.lock().push_back(Box::new(job));
    }

    /// Returns the number of queued jobs.
    #[must_use]
    pub fn pending_jobs(&self) -> usize {
        self.inner.queue.lock().len()
    }

    /// Returns true if no jobs are queued.
    #[must_use]
    pub fn is_idle(&self) -> bool {
        self.inner.queue.lock().is_empty()
    }

    /// Returns the total number of jobs run so far.
    #[must_use]
    pub fn executed_jobs(&self) -> u64 {
        self.inner.executed.load(Ordering::Relaxed)
    }

    /// Runs the next queued job, if any.
    ///
    /// Returns false when the queue was empty.
    pub fn step(&self) -> bool {
        // The lock must be released before the job runs: jobs spawn jobs.
        let job = self.inner.queue.lock().pop_front();
        match job {
            Some(job) => {
                job();
                self.inner.executed.fetch_add(1, Ordering::Relaxed);
                true
            }
            None => false,
        }
    }

    /// Runs jobs until the queue is empty. Returns how many jobs ran.
    pub fn run_until_idle(&self) -> usize {
        let mut ran = 0;
        while self.step() {
            ran += 1;
        }
        trace!(ran, "scheduler idle");
        ran
    }

    /// Runs jobs until `task` settles or the queue runs dry.
    ///
    /// Returns `None` if the queue emptied while the task was still pending,
    /// as happens for a race over no operations.
    pub fn block_on<T, E>(&self, task: &Task<T, E>) -> Option<Result<T, E>>
    where
        T: Clone + Send + 'static,
        E: Clone + Send + 'static,
    {
        loop {
            if let Some(outcome) = task.outcome() {
                return Some(outcome);
            }
            if !self.step() {
                return task.outcome();
            }
        }
    }
}

impl fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scheduler")
            .field("pending_jobs", &self.pending_jobs())
            .field("executed_jobs", &self.executed_jobs())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    #[test]
    fn jobs_run_in_fifo_order() {
        let sched = Scheduler::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        for i in 0..3 {
            let log = Arc::clone(&log);
            sched.spawn(move || log.lock().push(i));
        }
        assert_eq!(sched.pending_jobs(), 3);
        assert_eq!(sched.run_until_idle(), 3);
        assert_eq!(*log.lock(), vec![0, 1, 2]);
        assert_eq!(sched.executed_jobs(), 3);
    }

    #[test]
    fn nested_spawn_goes_to_the_back() {
        let sched = Scheduler::new();
        let log = Arc::new(Mutex::new(Vec::new()));

        let inner_sched = sched.clone();
        let inner_log = Arc::clone(&log);
        sched.spawn(move || {
            inner_log.lock().push("outer");
            let nested_log = Arc::clone(&inner_log);
            inner_sched.spawn(move || nested_log.lock().push("nested"));
        });
        let tail_log = Arc::clone(&log);
        sched.spawn(move || tail_log.lock().push("tail"));

        sched.run_until_idle();
        assert_eq!(*log.lock(), vec!["outer", "tail", "nested"]);
    }

    #[test]
    fn step_on_empty_queue() {
        let sched = Scheduler::new();
        assert!(sched.is_idle());
        assert!(!sched.step());
    }

    #[test]
    fn clones_share_the_queue() {
        let sched = Scheduler::new();
        let other = sched.clone();
        let hits = Arc::new(AtomicUsize::new(0));
        let h = Arc::clone(&hits);
        other.spawn(move || {
            h.fetch_add(1, Ordering::SeqCst);
        });
        sched.run_until_idle();
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
