// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! A min-heap of deferred callbacks keyed by absolute real time.
//!
//! Trigger times are expressed on the clock's real-time axis: a callback
//! scheduled with delay `d` while the clock reads `T` becomes due once the
//! queue is drained with `now >= T + d`. Callbacks sharing a trigger time fire
//! in the order they were scheduled.

use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};
use std::fmt;
use std::time::Duration;

/// Handle to a scheduled callback. Never reused within one queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

impl TimerId {
    /// The raw numeric value of the handle.
    pub fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TimerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "timer#{}", self.0)
    }
}

enum Callback {
    Once(Box<dyn FnOnce() + Send>),
    Repeating {
        period: Duration,
        callback: Box<dyn FnMut() + Send>,
    },
}

struct Timer {
    id: TimerId,
    trigger: Duration,
    callback: Callback,
}

impl Timer {
    fn key(&self) -> (Duration, TimerId) {
        (self.trigger, self.id)
    }
}

impl PartialEq for Timer {
    fn eq(&self, other: &Self) -> bool {
        self.key() == other.key()
    }
}

impl Eq for Timer {}

impl PartialOrd for Timer {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Timer {
    // Reversed: `BinaryHeap` is a max-heap and the earliest trigger must win.
    fn cmp(&self, other: &Self) -> Ordering {
        other.key().cmp(&self.key())
    }
}

/// A due callback removed from the queue, ready to be invoked.
///
/// Splitting "pop" from "fire" lets an owner that shares the queue behind a
/// lock release that lock before running user code.
pub struct DueTimer {
    timer: Timer,
}

impl DueTimer {
    /// The handle the callback was scheduled under.
    pub fn id(&self) -> TimerId {
        self.timer.id
    }

    /// The real time at which the callback became due.
    pub fn trigger(&self) -> Duration {
        self.timer.trigger
    }

    /// Runs the callback.
    ///
    /// Repeating callbacks come back as a [`Rearm`] that must be handed to
    /// [`TimerQueue::rearm`] to be scheduled for their next period.
    pub fn fire(self) -> Option<Rearm> {
        let Timer {
            id,
            trigger,
            callback,
        } = self.timer;

        match callback {
            Callback::Once(callback) => {
                callback();
                None
            }
            Callback::Repeating {
                period,
                mut callback,
            } => {
                callback();
                Some(Rearm {
                    timer: Timer {
                        id,
                        trigger: trigger.saturating_add(period),
                        callback: Callback::Repeating { period, callback },
                    },
                })
            }
        }
    }
}

/// A repeating callback waiting to be put back into its queue.
pub struct Rearm {
    timer: Timer,
}

impl Rearm {
    /// The handle of the repeating callback.
    pub fn id(&self) -> TimerId {
        self.timer.id
    }

    /// The real time of the next firing.
    pub fn next_trigger(&self) -> Duration {
        self.timer.trigger
    }
}

/// Deferred callbacks ordered by ascending trigger time.
///
/// The queue is not self-driving: its owner calls [`TimerQueue::drain`] (or
/// pops and fires entries one by one) once per tick with the clock's current
/// real time.
pub struct TimerQueue {
    heap: BinaryHeap<Timer>,
    /// Repeating timers popped for firing and not yet re-armed.
    in_flight: HashSet<TimerId>,
    next_id: u64,
}

impl TimerQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            in_flight: HashSet::new(),
            next_id: 1,
        }
    }

    /// Schedules `callback` to run once, `delay` after `now`.
    pub fn schedule<F>(&mut self, now: Duration, delay: Duration, callback: F) -> TimerId
    where
        F: FnOnce() + Send + 'static,
    {
        self.push(now.saturating_add(delay), Callback::Once(Box::new(callback)))
    }

    /// Schedules `callback` to run every `period`, first at `now + period`.
    ///
    /// The next trigger is computed from the previous trigger, not from the
    /// moment the callback actually ran, so a repeating timer does not drift.
    /// It fires at most once per drain; missed periods are caught up one per
    /// drain.
    pub fn schedule_repeating<F>(&mut self, now: Duration, period: Duration, callback: F) -> TimerId
    where
        F: FnMut() + Send + 'static,
    {
        self.push(
            now.saturating_add(period),
            Callback::Repeating {
                period,
                callback: Box::new(callback),
            },
        )
    }

    fn push(&mut self, trigger: Duration, callback: Callback) -> TimerId {
        let id = TimerId(self.next_id);
        self.next_id += 1;
        self.heap.push(Timer {
            id,
            trigger,
            callback,
        });
        log::trace!("TimerQueue: scheduled {id} at {trigger:?}");
        id
    }

    /// Cancels a scheduled callback.
    ///
    /// Returns `true` if the callback was pending. Cancelling an unknown or
    /// already fired id is a no-op that returns `false`.
    pub fn cancel(&mut self, id: TimerId) -> bool {
        let before = self.heap.len();
        self.heap.retain(|timer| timer.id != id);
        if self.heap.len() != before {
            log::trace!("TimerQueue: cancelled {id}");
            return true;
        }
        // A repeating timer currently firing: dropping it from `in_flight`
        // makes the pending re-arm a no-op.
        self.in_flight.remove(&id)
    }

    /// Returns `true` if `id` is still scheduled.
    pub fn contains(&self, id: TimerId) -> bool {
        self.in_flight.contains(&id) || self.heap.iter().any(|timer| timer.id == id)
    }

    /// The earliest pending callback and its trigger time.
    pub fn peek_next(&self) -> Option<(TimerId, Duration)> {
        self.heap.peek().map(|timer| (timer.id, timer.trigger))
    }

    /// Removes the earliest callback if it is due at `now`.
    pub fn pop_due(&mut self, now: Duration) -> Option<DueTimer> {
        if self.heap.peek()?.trigger > now {
            return None;
        }
        let timer = self.heap.pop()?;
        if matches!(timer.callback, Callback::Repeating { .. }) {
            self.in_flight.insert(timer.id);
        }
        Some(DueTimer { timer })
    }

    /// Puts a fired repeating callback back, unless it was cancelled meanwhile.
    pub fn rearm(&mut self, rearm: Rearm) {
        if self.in_flight.remove(&rearm.timer.id) {
            self.heap.push(rearm.timer);
        }
    }

    /// Fires every callback due at `now`, earliest first.
    ///
    /// Stops at the first callback whose trigger lies in the future, since
    /// every remaining one is due no earlier. Returns the number of callbacks
    /// that ran.
    pub fn drain(&mut self, now: Duration) -> usize {
        let mut fired = 0;
        let mut rearms = Vec::new();

        while let Some(due) = self.pop_due(now) {
            fired += 1;
            if let Some(rearm) = due.fire() {
                rearms.push(rearm);
            }
        }

        for rearm in rearms {
            self.rearm(rearm);
        }
        fired
    }

    /// Number of pending callbacks.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Returns `true` if no callback is pending.
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Drops every pending callback without running it.
    pub fn clear(&mut self) {
        self.heap.clear();
        self.in_flight.clear();
    }
}

impl Default for TimerQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for TimerQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TimerQueue")
            .field("pending", &self.heap.len())
            .field("next", &self.peek_next())
            .finish()
    }
}
