//! Cooperative runtime for deferred operations.
//!
//! The runtime is deliberately small: a single-threaded [`Scheduler`] that
//! drains a FIFO job queue, and the [`Task`] abstraction that represents a
//! deferred operation settling with either a value or a fault.
//!
//! Subscriber callbacks never run inline. Settling a task, or subscribing to
//! one that has already settled, enqueues the callback as a job. Everything
//! the race combinator and the guard do is therefore observable one job at
//! a time through [`Scheduler::step`].
//!
//! # Example
//!
//! ```
//! use raceguard::{Rejection, Scheduler, Task};
//!
//! let sched = Scheduler::new();
//! let (task, settler) = Task::<u32, Rejection>::pending(&sched);
//! settler.resolve(7);
//! assert_eq!(sched.block_on(&task), Some(Ok(7)));
//! ```

pub mod scheduler;
pub mod task;

pub use scheduler::Scheduler;
pub use task::{Settler, Task, TaskState};
