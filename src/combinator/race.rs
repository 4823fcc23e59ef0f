//! Race combinator: settle with whichever operation settles first.
//!
//! ```text
//! race(t1, ..., tn):
//!   r ← pending task
//!   for each ti: on_settle(ti, settle(r))   // first settle wins
//!   return r
//! ```
//!
//! Losers are neither cancelled nor drained; they keep running, and their
//! outcomes are simply not delivered through the race. Ties between tasks
//! that are already settled are broken by position, because their
//! callbacks are queued in subscription order.
//!
//! # Algebraic Laws
//!
//! - Identity: `race([a]) ≃ a`
//! - Absorption: `race([]) ≃ never` (a task that stays pending)
//! - Associativity in the winner: `race([race([a, b]), c]) ≃ race([a, race([b, c])])`
//!   when settlement times are distinct

use crate::runtime::{Scheduler, Task};
use crate::tracing_compat::trace;

/// Races `tasks`, settling with the first outcome delivered.
///
/// An empty race returns a task that never settles.
pub fn race_all<T, E>(scheduler: &Scheduler, tasks: Vec<Task<T, E>>) -> Task<T, E>
where
    T: Clone + Send + 'static,
    E: Clone + Send + 'static,
{
    let (race, settler) = Task::pending(scheduler);
    trace!(race_task = ?race.id(), operands = tasks.len(), "race submitted");
    for task in &tasks {
        let settler = settler.clone();
        task.on_settle(move |outcome| {
            settler.settle(outcome);
        });
    }
    race
}
