//! One-shot and repeating timers.
//!
//! [`TimerManager`] is the bookkeeping half of the timer system: it owns the
//! callbacks and a min-heap of fire times but never looks at a clock itself.
//! The [`Dispatcher`](crate::Dispatcher) feeds it the current instant and runs
//! whatever has expired.

use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::time::{Duration, Instant};

use slotmap::{SlotMap, new_key_type};

use crate::error::{CoreError, Result};

new_key_type! {
    /// A unique identifier for a timer.
    pub struct TimerId;
}

/// The type of timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimerKind {
    /// Fires once after the specified duration.
    OneShot,
    /// Fires repeatedly at the specified interval.
    Repeating,
}

/// A timer callback.
pub(crate) type TimerTask = Box<dyn FnMut() + Send + 'static>;

struct TimerData {
    next_fire: Instant,
    interval: Duration,
    kind: TimerKind,
    /// `None` while the callback is checked out for execution.
    task: Option<TimerTask>,
}

/// An entry in the timer queue (min-heap by fire time, FIFO among equals).
#[derive(Debug, Clone, Copy)]
struct TimerQueueEntry {
    id: TimerId,
    fire_time: Instant,
    seq: u64,
}

impl PartialEq for TimerQueueEntry {
    fn eq(&self, other: &Self) -> bool {
        self.fire_time == other.fire_time && self.seq == other.seq
    }
}

impl Eq for TimerQueueEntry {}

impl PartialOrd for TimerQueueEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TimerQueueEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // Reversed: BinaryHeap is a max-heap.
        other
            .fire_time
            .cmp(&self.fire_time)
            .then_with(|| other.seq.cmp(&self.seq))
    }
}

/// Manages all pending timers.
pub(crate) struct TimerManager {
    timers: SlotMap<TimerId, TimerData>,
    queue: BinaryHeap<TimerQueueEntry>,
    seq: u64,
}

impl TimerManager {
    pub fn new() -> Self {
        Self {
            timers: SlotMap::with_key(),
            queue: BinaryHeap::new(),
            seq: 0,
        }
    }

    fn start(&mut self, now: Instant, interval: Duration, kind: TimerKind, task: TimerTask) -> TimerId {
        let next_fire = now + interval;
        let id = self.timers.insert(TimerData {
            next_fire,
            interval,
            kind,
            task: Some(task),
        });
        self.enqueue(id, next_fire);
        id
    }

    fn enqueue(&mut self, id: TimerId, fire_time: Instant) {
        self.seq += 1;
        self.queue.push(TimerQueueEntry {
            id,
            fire_time,
            seq: self.seq,
        });
    }

    /// Start a timer that fires once, `delay` after `now`.
    pub fn start_one_shot(&mut self, now: Instant, delay: Duration, task: TimerTask) -> TimerId {
        self.start(now, delay, TimerKind::OneShot, task)
    }

    /// Start a timer that fires every `interval`, first at `now + interval`.
    pub fn start_repeating(&mut self, now: Instant, interval: Duration, task: TimerTask) -> TimerId {
        self.start(now, interval, TimerKind::Repeating, task)
    }

    /// Stop and remove a timer.
    pub fn stop(&mut self, id: TimerId) -> Result<()> {
        self.timers
            .remove(id)
            .map(|_| ())
            .ok_or(CoreError::InvalidTimerId(id))
    }

    pub fn active_count(&self) -> usize {
        self.timers.len()
    }

    /// Duration from `now` until the next timer fires, if any.
    pub fn time_until_next(&mut self, now: Instant) -> Option<Duration> {
        while let Some(entry) = self.queue.peek() {
            if self.timers.contains_key(entry.id) {
                break;
            }
            self.queue.pop();
        }
        self.queue
            .peek()
            .map(|entry| entry.fire_time.saturating_duration_since(now))
    }

    /// Check out the callbacks of every timer due at `now`, in fire order.
    ///
    /// One-shot timers are removed. Repeating timers are rescheduled and must
    /// get their callback back through [`restore`](Self::restore).
    pub fn take_expired(&mut self, now: Instant) -> Vec<(TimerId, TimerKind, TimerTask)> {
        let mut due = Vec::new();

        while let Some(entry) = self.queue.peek().copied() {
            if entry.fire_time > now {
                break;
            }
            self.queue.pop();

            let Some(timer) = self.timers.get_mut(entry.id) else {
                continue;
            };
            let Some(task) = timer.task.take() else {
                continue;
            };

            tracing::trace!(target: "sidebar_groups_core::timer", id = ?entry.id, "timer fired");
            let kind = timer.kind;
            match kind {
                TimerKind::OneShot => {
                    self.timers.remove(entry.id);
                }
                TimerKind::Repeating => {
                    timer.next_fire = now + timer.interval;
                    let next_fire = timer.next_fire;
                    self.enqueue(entry.id, next_fire);
                }
            }
            due.push((entry.id, kind, task));
        }

        due
    }

    /// Hand a repeating timer's callback back after it ran.
    ///
    /// Does nothing if the timer was stopped while its callback was running.
    pub fn restore(&mut self, id: TimerId, task: TimerTask) {
        if let Some(timer) = self.timers.get_mut(id) {
            timer.task = Some(task);
        }
    }
}

impl Default for TimerManager {
    fn default() -> Self {
        Self::new()
    }
}
