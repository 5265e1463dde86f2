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

//! The game module: owns the engine clock and its deferred callbacks.

use chrona_core::time::{ClockSnapshot, Rearm};
use chrona_core::{Clock, Module, TimerId, TimerQueue};
use parking_lot::Mutex;
use std::any::Any;
use std::sync::Arc;
use std::time::Duration;

struct GameTime {
    clock: Clock,
    timers: TimerQueue,
}

/// Shared access to the clock and timer queue of a [`GameModule`].
///
/// Cheap to clone. Callbacks run on the tick thread with the lock released,
/// so they may use a handle to schedule or cancel further work.
#[derive(Clone)]
pub struct TimeHandle {
    inner: Arc<Mutex<GameTime>>,
}

impl TimeHandle {
    /// Runs `callback` once, `delay` of real time from now.
    ///
    /// "Now" is the clock's real time as of the last tick.
    pub fn schedule<F>(&self, delay: Duration, callback: F) -> TimerId
    where
        F: FnOnce() + Send + 'static,
    {
        let mut time = self.inner.lock();
        let now = time.clock.real_time();
        time.timers.schedule(now, delay, callback)
    }

    /// Runs `callback` every `period` of real time until cancelled.
    pub fn schedule_repeating<F>(&self, period: Duration, callback: F) -> TimerId
    where
        F: FnMut() + Send + 'static,
    {
        let mut time = self.inner.lock();
        let now = time.clock.real_time();
        time.timers.schedule_repeating(now, period, callback)
    }

    /// Cancels a callback. Unknown or already fired ids are ignored.
    pub fn cancel(&self, id: TimerId) -> bool {
        self.inner.lock().timers.cancel(id)
    }

    /// Freezes or resumes game time.
    pub fn set_paused(&self, paused: bool) {
        self.inner.lock().clock.set_paused(paused);
    }

    /// Whether game time is frozen.
    pub fn is_paused(&self) -> bool {
        self.inner.lock().clock.is_paused()
    }

    /// The clock counters as of the last tick.
    pub fn snapshot(&self) -> ClockSnapshot {
        self.inner.lock().clock.snapshot()
    }

    /// Number of callbacks waiting to fire.
    pub fn pending(&self) -> usize {
        self.inner.lock().timers.len()
    }

    /// Fires every due callback without holding the lock while user code runs.
    fn drain(&self) -> usize {
        let mut fired = 0;
        let mut rearms: Vec<Rearm> = Vec::new();

        loop {
            let due = {
                let mut time = self.inner.lock();
                let now = time.clock.real_time();
                time.timers.pop_due(now)
            };
            let Some(due) = due else {
                break;
            };
            fired += 1;
            if let Some(rearm) = due.fire() {
                rearms.push(rearm);
            }
        }

        if !rearms.is_empty() {
            let mut time = self.inner.lock();
            for rearm in rearms {
                time.timers.rearm(rearm);
            }
        }
        fired
    }
}

/// Advances the clock in `pre_tick` and fires due callbacks in `tick`.
///
/// Any module that depends on [`ModuleType::Game`](chrona_core::ModuleType::Game)
/// therefore sees an up-to-date clock in its own `tick`.
pub struct GameModule {
    time: TimeHandle,
}

impl GameModule {
    /// Creates the module with game time running or frozen.
    pub fn new(start_paused: bool) -> Self {
        Self {
            time: TimeHandle {
                inner: Arc::new(Mutex::new(GameTime {
                    clock: Clock::with_paused(start_paused),
                    timers: TimerQueue::new(),
                })),
            },
        }
    }

    /// A handle to this module's clock and timers.
    pub fn time(&self) -> TimeHandle {
        self.time.clone()
    }
}

impl Module for GameModule {
    fn start(&self) -> anyhow::Result<()> {
        // Measure the first delta from start, not from construction.
        let mut time = self.time.inner.lock();
        let paused = time.clock.is_paused();
        time.clock = Clock::with_paused(paused);
        log::debug!("Game: Clock started (paused: {})", paused);
        Ok(())
    }

    fn pre_tick(&self) -> anyhow::Result<()> {
        self.time.inner.lock().clock.advance();
        Ok(())
    }

    fn tick(&self) -> anyhow::Result<()> {
        let fired = self.time.drain();
        if fired > 0 {
            log::trace!("Game: Fired {} deferred callbacks", fired);
        }
        Ok(())
    }

    fn stop(&self) -> anyhow::Result<()> {
        let mut time = self.time.inner.lock();
        let dropped = time.timers.len();
        time.timers.clear();
        if dropped > 0 {
            log::debug!("Game: Dropped {} pending callbacks on stop", dropped);
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
