//! Cooperative dispatcher: timers plus idle-time callbacks.
//!
//! The dispatcher models a single UI thread's scheduling loop. Each call to
//! [`Dispatcher::process`] is one turn of that loop:
//!
//! 1. every timer whose fire time has passed runs, in fire order;
//! 2. idle callbacks run if the host reports spare capacity, and any idle
//!    callback whose maximum wait has elapsed runs regardless.
//!
//! Callbacks are always executed with no internal lock held, so a callback may
//! start timers, request idle callbacks, or cancel either.
//!
//! # Example
//!
//! ```
//! use sidebar_groups_core::{Dispatcher, ManualClock};
//! use std::sync::Arc;
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use std::time::Duration;
//!
//! let clock = ManualClock::new();
//! let dispatcher = Dispatcher::new(Arc::new(clock.clone()));
//! let runs = Arc::new(AtomicUsize::new(0));
//!
//! let r = runs.clone();
//! dispatcher.request_idle(Duration::from_secs(10), move |_deadline| {
//!     r.fetch_add(1, Ordering::SeqCst);
//! });
//!
//! // Host busy and ceiling not reached: nothing runs.
//! dispatcher.process(false);
//! assert_eq!(runs.load(Ordering::SeqCst), 0);
//!
//! // Ceiling reached: the callback runs even though the host is still busy.
//! clock.advance(Duration::from_secs(10));
//! dispatcher.process(false);
//! assert_eq!(runs.load(Ordering::SeqCst), 1);
//! ```

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;

use crate::clock::{Clock, SystemClock};
use crate::error::{CoreError, Result};
use crate::timer::{TimerId, TimerKind, TimerManager};

/// A unique identifier for an idle callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct IdleTaskId(u64);

impl IdleTaskId {
    /// Get the raw u64 value of this task ID.
    pub fn as_u64(self) -> u64 {
        self.0
    }
}

static NEXT_IDLE_TASK_ID: AtomicU64 = AtomicU64::new(1);

fn next_idle_task_id() -> IdleTaskId {
    IdleTaskId(NEXT_IDLE_TASK_ID.fetch_add(1, Ordering::Relaxed))
}

/// Passed to idle callbacks, describing why they were run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdleDeadline {
    did_timeout: bool,
}

impl IdleDeadline {
    /// `true` if the callback's maximum wait had elapsed by the time it ran,
    /// whether or not the host was idle.
    pub fn did_timeout(&self) -> bool {
        self.did_timeout
    }
}

type IdleTask = Box<dyn FnOnce(IdleDeadline) + Send + 'static>;

struct IdleEntry {
    id: IdleTaskId,
    deadline: Instant,
    task: IdleTask,
}

/// What a single [`Dispatcher::process`] turn did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TurnStats {
    /// Timer callbacks executed.
    pub timers_fired: usize,
    /// Idle callbacks executed.
    pub idle_run: usize,
}

impl TurnStats {
    /// `true` if the turn ran nothing.
    pub fn is_empty(&self) -> bool {
        self.timers_fired == 0 && self.idle_run == 0
    }
}

/// Single-threaded cooperative scheduler for timers and idle callbacks.
///
/// Shared through `Arc`; all methods take `&self`.
pub struct Dispatcher {
    clock: Arc<dyn Clock>,
    timers: Mutex<TimerManager>,
    idle: Mutex<VecDeque<IdleEntry>>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("active_timers", &self.timers.lock().active_count())
            .field("pending_idle", &self.idle.lock().len())
            .finish()
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new(Arc::new(SystemClock))
    }
}

impl Dispatcher {
    /// Create a dispatcher driven by the given clock.
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            timers: Mutex::new(TimerManager::new()),
            idle: Mutex::new(VecDeque::new()),
        }
    }

    /// The dispatcher's current time.
    pub fn now(&self) -> Instant {
        self.clock.now()
    }

    /// Run `task` once, `delay` from now.
    pub fn start_one_shot<F>(&self, delay: Duration, task: F) -> TimerId
    where
        F: FnOnce() + Send + 'static,
    {
        let mut task = Some(task);
        let now = self.clock.now();
        self.timers.lock().start_one_shot(
            now,
            delay,
            Box::new(move || {
                if let Some(task) = task.take() {
                    task();
                }
            }),
        )
    }

    /// Run `task` every `interval` until the timer is stopped.
    pub fn start_repeating<F>(&self, interval: Duration, task: F) -> TimerId
    where
        F: FnMut() + Send + 'static,
    {
        let now = self.clock.now();
        self.timers
            .lock()
            .start_repeating(now, interval, Box::new(task))
    }

    /// Stop a timer. Fails if it already fired (one-shot) or was stopped.
    pub fn stop_timer(&self, id: TimerId) -> Result<()> {
        self.timers.lock().stop(id)
    }

    /// Number of scheduled timers.
    pub fn active_timers(&self) -> usize {
        self.timers.lock().active_count()
    }

    /// Run `task` the next time the host is idle, but no later than `timeout`
    /// from now.
    pub fn request_idle<F>(&self, timeout: Duration, task: F) -> IdleTaskId
    where
        F: FnOnce(IdleDeadline) + Send + 'static,
    {
        let id = next_idle_task_id();
        let deadline = self.clock.now() + timeout;
        self.idle.lock().push_back(IdleEntry {
            id,
            deadline,
            task: Box::new(task),
        });
        tracing::trace!(target: "sidebar_groups_core::scheduler", ?id, ?timeout, "idle callback requested");
        id
    }

    /// Cancel a pending idle callback.
    pub fn cancel_idle(&self, id: IdleTaskId) -> Result<()> {
        let mut idle = self.idle.lock();
        match idle.iter().position(|entry| entry.id == id) {
            Some(pos) => {
                idle.remove(pos);
                Ok(())
            }
            None => Err(CoreError::InvalidIdleTaskId(id)),
        }
    }

    /// Number of idle callbacks waiting to run.
    pub fn pending_idle(&self) -> usize {
        self.idle.lock().len()
    }

    /// Time until the next timer fires or idle ceiling is reached.
    pub fn time_until_next(&self) -> Option<Duration> {
        let now = self.clock.now();
        let timer = self.timers.lock().time_until_next(now);
        let idle = self
            .idle
            .lock()
            .iter()
            .map(|entry| entry.deadline.saturating_duration_since(now))
            .min();
        match (timer, idle) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Run one turn of the loop.
    ///
    /// `host_idle` reports whether the host currently has spare capacity.
    /// Idle callbacks requested while this turn's idle phase is running wait
    /// for the next turn.
    #[tracing::instrument(skip(self), target = "sidebar_groups_core::scheduler", level = "trace")]
    pub fn process(&self, host_idle: bool) -> TurnStats {
        let mut stats = TurnStats::default();

        let due = self.timers.lock().take_expired(self.clock.now());
        for (id, kind, mut task) in due {
            task();
            stats.timers_fired += 1;
            if kind == TimerKind::Repeating {
                self.timers.lock().restore(id, task);
            }
        }

        let now = self.clock.now();
        let ready: Vec<IdleEntry> = {
            let mut idle = self.idle.lock();
            let (ready, waiting): (VecDeque<_>, VecDeque<_>) = idle
                .drain(..)
                .partition(|entry| host_idle || entry.deadline <= now);
            *idle = waiting;
            ready.into()
        };

        for entry in ready {
            let deadline = IdleDeadline {
                did_timeout: entry.deadline <= now,
            };
            tracing::trace!(target: "sidebar_groups_core::scheduler", id = ?entry.id, did_timeout = deadline.did_timeout, "running idle callback");
            (entry.task)(deadline);
            stats.idle_run += 1;
        }

        stats
    }
}

static_assertions::assert_impl_all!(Dispatcher: Send, Sync);
