//! RaceGuard: install a race function that observes every operand.
//!
//! # Wrapping
//!
//! ```text
//! guarded_race(sched, tasks):
//!   race_id ← fresh
//!   for (i, t) in tasks:                      // synchronously, before delegating
//!     if allow_overhead or t is not fulfilled:
//!       t.on_fault(e ⇒ sched.spawn(report(FaultObservation(t, race_id, i), e)))
//!   return inner(sched, tasks)                // same tasks, same order, same result
//! ```
//!
//! The observer is a plain subscriber. It does not derive a new task, so it
//! cannot add a fault of its own, and it does not affect what the caller's
//! subscribers or the inner race receive. Reports run as their own
//! scheduler job and never block anything.
//!
//! # Installing Twice
//!
//! Installation is not idempotent. Installing onto an already guarded host
//! wraps the guarded function again: results stay correct, and each layer
//! reports the same fault once.

use core::fmt;
use std::sync::Arc;

use crate::combinator::{RaceFn, RaceHost};
use crate::config::GuardConfig;
use crate::error::{Error, Result};
use crate::observability::{FailureReporter, FaultObservation, FaultSink};
use crate::runtime::{Scheduler, Task, TaskState};
use crate::tracing_compat::{debug, info, trace};
use crate::types::RaceId;

/// Installs fault-observing race functions onto [`RaceHost`]s.
#[derive(Debug, Clone)]
pub struct RaceGuard {
    config: GuardConfig,
    reporter: FailureReporter,
}

impl RaceGuard {
    /// Creates a guard reporting on the process-wide failure channel.
    #[must_use]
    pub fn new(config: GuardConfig) -> Self {
        Self {
            config,
            reporter: FailureReporter::global().with_policy(config.unhandled),
        }
    }

    /// Reports on `sink` instead of the process-wide failure channel.
    #[must_use]
    pub fn with_sink(mut self, sink: Arc<dyn FaultSink>) -> Self {
        self.reporter = FailureReporter::new(sink).with_policy(self.config.unhandled);
        self
    }

    /// Returns the configuration this guard installs with.
    #[must_use]
    pub const fn config(&self) -> &GuardConfig {
        &self.config
    }

    /// Returns the reporter used by installed observers.
    #[must_use]
    pub const fn reporter(&self) -> &FailureReporter {
        &self.reporter
    }

    /// Replaces the race function held by `target` with a guarded wrapper
    /// around it.
    ///
    /// With no target, the process-wide host for `(T, E)` is used if one has
    /// been created; otherwise this fails with
    /// [`ErrorKind::MissingTarget`](crate::ErrorKind::MissingTarget).
    pub fn install<T, E>(&self, target: Option<&RaceHost<T, E>>) -> Result<()>
    where
        T: Clone + Send + 'static,
        E: Clone + Send + fmt::Display + 'static,
    {
        let host = match target {
            Some(host) => host.clone(),
            None => RaceHost::<T, E>::try_global()
                .ok_or_else(|| Error::missing_target(std::any::type_name::<RaceHost<T, E>>()))?,
        };
        host.update_race(|inner| self.wrap(inner));
        info!(
            allow_overhead = self.config.allow_overhead,
            unhandled = %self.config.unhandled,
            implicit_target = target.is_none(),
            "race guard installed"
        );
        Ok(())
    }

    /// Wraps a race function so that every operand's fault is reported.
    #[must_use]
    pub fn wrap<T, E>(&self, inner: RaceFn<T, E>) -> RaceFn<T, E>
    where
        T: Clone + Send + 'static,
        E: Clone + Send + fmt::Display + 'static,
    {
        let reporter = self.reporter.clone();
        let allow_overhead = self.config.allow_overhead;
        Arc::new(move |scheduler: &Scheduler, tasks: Vec<Task<T, E>>| {
            let race_id = RaceId::next();
            let mut attached = 0usize;
            for (position, task) in tasks.iter().enumerate() {
                if !allow_overhead && task.state() == TaskState::Fulfilled {
                    continue;
                }
                let observation = FaultObservation::new(task.id(), race_id, position);
                attach_observer(task, observation, reporter.clone());
                attached += 1;
            }
            debug!(
                race_id = ?race_id,
                operands = tasks.len(),
                attached,
                "guarded race submitted"
            );
            inner(scheduler, tasks)
        })
    }
}

fn attach_observer<T, E>(
    task: &Task<T, E>,
    observation: FaultObservation,
    reporter: FailureReporter,
)
where
    T: Clone + Send + 'static,
    E: Clone + Send + fmt::Display + 'static,
{
    trace!(
        task_id = ?observation.task_id(),
        race_id = ?observation.race_id(),
        position = observation.position(),
        "attaching fault observer"
    );
    let scheduler = task.scheduler().clone();
    task.on_fault(move |fault| {
        scheduler.spawn(move || reporter.report_observation(observation, &fault));
    });
}

/// Installs a guard on `target`, or on the process-wide host when `None`.
///
/// Without an explicit `config` the defaults are read from the environment
/// (see [`GuardConfig::from_env`]).
pub fn make_race_safe<T, E>(
    target: Option<&RaceHost<T, E>>,
    config: Option<GuardConfig>,
) -> Result<()>
where
    T: Clone + Send + 'static,
    E: Clone + Send + fmt::Display + 'static,
{
    let config = match config {
        Some(config) => config,
        None => GuardConfig::from_env()?,
    };
    RaceGuard::new(config).install(target)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::observability::CapturingSink;
    use crate::config::{ENV_ALLOW_OVERHEAD, ENV_UNHANDLED_REJECTIONS};
    use crate::test_utils::{guarded_host, init_test_logging, with_envs};
    use crate::types::Rejection;

    #[test]
    fn winner_unchanged_and_losers_reported() {
        let (host, sink) = guarded_host(GuardConfig::default());
        let sched = Scheduler::new();
        let race = host.race(
            &sched,
            [
                Task::ok(&sched, "yes"),
                Task::err(&sched, Rejection::new("X")),
                Task::err(&sched, Rejection::new("Y")),
            ],
        );
        assert_eq!(sched.block_on(&race), Some(Ok("yes")));
        sched.run_until_idle();
        assert_eq!(
            sink.reasons(),
            vec![Some("X".to_string()), Some("Y".to_string())]
        );
    }

    #[test]
    fn nothing_is_reported_synchronously() {
        let (host, sink) = guarded_host(GuardConfig::default());
        let sched = Scheduler::new();
        let _race = host.race(&sched, [Task::<&str, _>::err(&sched, Rejection::new("X"))]);
        assert_eq!(sink.notify_count(), 0);
        sched.run_until_idle();
        assert_eq!(sink.notify_count(), 1);
    }

    #[test]
    fn fulfilled_operands_skipped_without_overhead() {
        let (host, _sink) = guarded_host(GuardConfig::default());
        let sched = Scheduler::new();
        let done = Task::<&str, Rejection>::ok(&sched, "done");
        let (pending, _settler) = Task::<&str, Rejection>::pending(&sched);
        let _race = host.race(&sched, [done, pending.clone()]);
        // inner race + guard observer
        assert_eq!(pending.waiting_subscribers(), 2);
        // inner race only
        assert_eq!(sched.pending_jobs(), 1);
    }

    #[test]
    fn allow_overhead_observes_everything() {
        let (host, _sink) = guarded_host(GuardConfig::default().with_allow_overhead(true));
        let sched = Scheduler::new();
        let _race = host.race(&sched, [Task::<&str, Rejection>::ok(&sched, "done")]);
        // guard observer + inner race
        assert_eq!(sched.pending_jobs(), 2);
    }

    #[test]
    fn missing_target_fails_fast() {
        #[derive(Clone, Debug)]
        struct NeverRaced;

        let err = RaceGuard::new(GuardConfig::default())
            .install::<NeverRaced, Rejection>(None)
            .expect_err("no host");
        assert_eq!(err.kind(), ErrorKind::MissingTarget);
    }

    #[test]
    fn implicit_target_is_the_global_host() {
        #[derive(Clone, Debug, PartialEq)]
        struct GlobalOnly(u8);

        init_test_logging();
        let global = RaceHost::<GlobalOnly, Rejection>::global();
        let sink = Arc::new(CapturingSink::observing());
        RaceGuard::new(GuardConfig::default())
            .with_sink(Arc::clone(&sink) as Arc<dyn FaultSink>)
            .install::<GlobalOnly, Rejection>(None)
            .expect("install on global");

        let sched = Scheduler::new();
        let race = global.race(
            &sched,
            [
                Task::ok(&sched, GlobalOnly(1)),
                Task::err(&sched, Rejection::new("lost")),
            ],
        );
        assert_eq!(sched.block_on(&race), Some(Ok(GlobalOnly(1))));
        sched.run_until_idle();
        assert_eq!(sink.reasons(), vec![Some("lost".to_string())]);
    }

    #[test]
    fn make_race_safe_reads_environment_without_config() {
        init_test_logging();
        let host = RaceHost::<u8, Rejection>::new();
        let err = with_envs(&[(ENV_ALLOW_OVERHEAD, "sometimes")], || {
            make_race_safe(Some(&host), None)
        })
        .expect_err("invalid env");
        assert_eq!(err.kind(), ErrorKind::InvalidConfig);
        assert!(err.to_string().contains("sometimes"));

        with_envs(&[(ENV_UNHANDLED_REJECTIONS, "warn")], || {
            make_race_safe(Some(&host), None)
        })
        .expect("valid env");
        let sched = Scheduler::new();
        let race = host.race(&sched, [Task::ok(&sched, 3)]);
        assert_eq!(sched.block_on(&race), Some(Ok(3)));
    }

    #[test]
    fn reporter_inherits_policy() {
        let guard = RaceGuard::new(
            GuardConfig::default().with_unhandled(crate::config::UnhandledPolicy::Strict),
        )
        .with_sink(Arc::new(CapturingSink::observing()));
        assert!(guard.reporter().policy().is_strict());
        assert!(guard.config().unhandled.is_strict());
    }
}
