#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Time-driven helpers for the frame loop.
//!
//! [`Scheduler`] and [`Countdown`] advance only when ticked with simulated
//! time, so they stay deterministic. [`MainThreadQueue`] and
//! [`BackgroundTimer`] are the only pieces that involve other threads: the
//! timer thread pushes messages and the frame loop drains them.

pub mod countdown;
pub mod queue;

use std::{collections::BTreeMap, time::Duration};

pub use countdown::{Countdown, CountdownEvent};
pub use queue::{BackgroundTimer, MainThreadQueue, QueueSender, SchedulerError};

/// Handle of an item waiting in a [`Scheduler`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScheduledId(u64);

impl ScheduledId {
    /// Raw handle value.
    #[must_use]
    pub const fn get(&self) -> u64 {
        self.0
    }
}

/// Items released once their delay has elapsed, in due order.
///
/// Items due at the same instant come out in the order they were scheduled.
#[derive(Clone, Debug)]
pub struct Scheduler<T> {
    now: Duration,
    next_id: u64,
    queue: BTreeMap<(Duration, ScheduledId), T>,
    due: BTreeMap<ScheduledId, Duration>,
}

impl<T> Default for Scheduler<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Scheduler<T> {
    /// Creates an empty scheduler at time zero.
    #[must_use]
    pub fn new() -> Self {
        Self {
            now: Duration::ZERO,
            next_id: 0,
            queue: BTreeMap::new(),
            due: BTreeMap::new(),
        }
    }

    /// Time accumulated through [`Scheduler::tick`].
    #[must_use]
    pub fn now(&self) -> Duration {
        self.now
    }

    /// Number of waiting items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Reports whether nothing is waiting.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Releases `item` once `delay` has elapsed.
    pub fn schedule(&mut self, delay: Duration, item: T) -> ScheduledId {
        let id = ScheduledId(self.next_id);
        self.next_id += 1;
        let due = self.now.saturating_add(delay);
        let _ = self.queue.insert((due, id), item);
        let _ = self.due.insert(id, due);
        id
    }

    /// Removes a waiting item. Returns `None` if it already fired or was cancelled.
    pub fn cancel(&mut self, id: ScheduledId) -> Option<T> {
        let due = self.due.remove(&id)?;
        self.queue.remove(&(due, id))
    }

    /// Time left before the item fires.
    #[must_use]
    pub fn remaining(&self, id: ScheduledId) -> Option<Duration> {
        self.due.get(&id).map(|due| due.saturating_sub(self.now))
    }

    /// Advances time by `dt` and appends every item now due to `out`.
    pub fn tick(&mut self, dt: Duration, out: &mut Vec<T>) {
        self.now = self.now.saturating_add(dt);
        while let Some(entry) = self.queue.first_entry() {
            let (due, id) = *entry.key();
            if due > self.now {
                break;
            }
            let _ = self.due.remove(&id);
            out.push(entry.remove());
        }
    }
}
