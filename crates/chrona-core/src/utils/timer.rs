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

//! Stopwatch used to measure tick deltas.

use std::time::{Duration, Instant};

/// A monotonic stopwatch measuring laps.
///
/// The first lap starts on creation. [`Stopwatch::lap`] returns the time
/// elapsed since the previous lap and starts a new one, which is what a
/// per-tick delta needs.
#[derive(Debug, Clone)]
pub struct Stopwatch {
    lap_start: Instant,
}

impl Stopwatch {
    /// Creates a new Stopwatch instance, already running.
    #[inline]
    pub fn new() -> Self {
        Self {
            lap_start: Instant::now(),
        }
    }

    /// Ends the current lap and returns its duration.
    #[inline]
    pub fn lap(&mut self) -> Duration {
        let now = Instant::now();
        let lap = now.saturating_duration_since(self.lap_start);
        self.lap_start = now;
        lap
    }
}

impl Default for Stopwatch {
    fn default() -> Self {
        Self::new()
    }
}
