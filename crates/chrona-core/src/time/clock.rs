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

//! The engine clock: per-tick delta, cumulative real time and pausable game time.

use crate::utils::timer::Stopwatch;
use std::time::Duration;

/// A copy of the clock's counters at one point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ClockSnapshot {
    /// Duration of the last tick.
    pub delta: Duration,
    /// Time accumulated across all ticks.
    pub real_time: Duration,
    /// Time accumulated across ticks that ran while not paused.
    pub game_time: Duration,
    /// Whether game time is currently frozen.
    pub paused: bool,
    /// Number of times the clock has been advanced.
    pub ticks: u64,
}

/// Monotonic time source advanced once per tick.
///
/// There is exactly one `Clock` per engine: it is owned by the game module
/// and is intentionally neither `Clone` nor globally reachable.
#[derive(Debug)]
pub struct Clock {
    stopwatch: Stopwatch,
    delta: Duration,
    real_time: Duration,
    game_time: Duration,
    paused: bool,
    ticks: u64,
}

impl Clock {
    /// Creates a clock with all counters at zero. The first `advance` measures
    /// from this moment.
    pub fn new() -> Self {
        Self::with_paused(false)
    }

    /// Creates a clock whose game time starts frozen or running.
    pub fn with_paused(paused: bool) -> Self {
        Self {
            stopwatch: Stopwatch::new(),
            delta: Duration::ZERO,
            real_time: Duration::ZERO,
            game_time: Duration::ZERO,
            paused,
            ticks: 0,
        }
    }

    /// Measures the time since the previous call and accumulates it.
    ///
    /// Returns the new delta.
    pub fn advance(&mut self) -> Duration {
        let delta = self.stopwatch.lap();
        self.advance_by(delta);
        delta
    }

    /// Accumulates an explicit delta instead of a measured one.
    ///
    /// Real time always grows; game time only grows while not paused.
    pub fn advance_by(&mut self, delta: Duration) {
        self.delta = delta;
        self.real_time = self.real_time.saturating_add(delta);
        if !self.paused {
            self.game_time = self.game_time.saturating_add(delta);
        }
        self.ticks = self.ticks.wrapping_add(1);
    }

    /// Freezes or resumes game time. Real time is unaffected.
    pub fn set_paused(&mut self, paused: bool) {
        if self.paused != paused {
            log::debug!("Clock: game time {}", if paused { "paused" } else { "resumed" });
        }
        self.paused = paused;
    }

    /// Duration of the last tick.
    pub fn delta(&self) -> Duration {
        self.delta
    }

    /// Cumulative real time.
    pub fn real_time(&self) -> Duration {
        self.real_time
    }

    /// Cumulative game time.
    pub fn game_time(&self) -> Duration {
        self.game_time
    }

    /// Whether game time is frozen.
    pub fn is_paused(&self) -> bool {
        self.paused
    }

    /// Number of completed `advance` calls.
    pub fn tick_count(&self) -> u64 {
        self.ticks
    }

    /// Copies the current counters.
    pub fn snapshot(&self) -> ClockSnapshot {
        ClockSnapshot {
            delta: self.delta,
            real_time: self.real_time,
            game_time: self.game_time,
            paused: self.paused,
            ticks: self.ticks,
        }
    }
}

impl Default for Clock {
    fn default() -> Self {
        Self::new()
    }
}
