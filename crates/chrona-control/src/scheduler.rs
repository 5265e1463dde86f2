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

//! The scheduler module: owns the tick thread that drives [`Systems::tick_all`].

use crate::config::SchedulerConfig;
use crate::systems::Systems;
use anyhow::Context as _;
use chrona_core::{Module, ModuleState, ModuleType, SystemsError, SystemsResult};
use parking_lot::Mutex;
use std::any::Any;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use std::thread;
use std::time::{Duration, Instant};

const THREAD_NAME: &str = "chrona-scheduler";

/// Called on the tick thread when a tick fails. The loop exits afterwards.
pub type FailureHandler = Arc<dyn Fn(&SystemsError) + Send + Sync>;

/// Fixed-cadence deadline computation.
///
/// Deadlines are `origin + k * interval` rather than "now + interval", so the
/// time spent ticking does not accumulate as drift.
#[derive(Debug, Clone)]
pub struct TickSchedule {
    origin: Instant,
    interval: Duration,
    count: u64,
    max_lag_ticks: u32,
    reanchors: u64,
}

impl TickSchedule {
    /// Creates a schedule whose first deadline is `origin + interval`.
    pub fn new(origin: Instant, interval: Duration, max_lag_ticks: u32) -> Self {
        Self {
            origin,
            interval,
            count: 0,
            max_lag_ticks,
            reanchors: 0,
        }
    }

    /// Advances to the next deadline.
    ///
    /// A changed `interval` takes effect from here: the schedule re-anchors at
    /// the previous deadline. When `now` lags the deadline by more than
    /// `max_lag_ticks` intervals, the schedule re-anchors at `now` instead of
    /// bursting through the missed ticks.
    pub fn next_deadline(&mut self, now: Instant, interval: Duration) -> Instant {
        if interval != self.interval {
            self.origin = self.current_deadline();
            self.count = 0;
            self.interval = interval;
        }

        self.count += 1;
        let deadline = self.current_deadline();

        let lag = now.saturating_duration_since(deadline);
        if lag > offset(self.interval, u64::from(self.max_lag_ticks)) {
            log::warn!(
                "Scheduler: {:?} behind schedule, re-anchoring (interval {:?})",
                lag,
                self.interval
            );
            self.origin = now;
            self.count = 1;
            self.reanchors += 1;
            return self.current_deadline();
        }
        deadline
    }

    /// The deadline most recently returned, or the origin before the first one.
    pub fn current_deadline(&self) -> Instant {
        self.origin + offset(self.interval, self.count)
    }

    /// The interval currently in effect.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// How many times the schedule gave up on catching up.
    pub fn reanchors(&self) -> u64 {
        self.reanchors
    }
}

fn offset(interval: Duration, count: u64) -> Duration {
    let nanos = interval.as_nanos().saturating_mul(u128::from(count));
    let nanos = u64::try_from(nanos).unwrap_or(u64::MAX);
    Duration::from_nanos(nanos)
}

/// A point-in-time view of the scheduler counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SchedulerStats {
    /// Ticks executed since start.
    pub ticks: u64,
    /// Times the schedule re-anchored because it fell too far behind.
    pub reanchors: u64,
    /// Whether the tick loop is running.
    pub running: bool,
}

/// State shared with the tick thread.
struct Shared {
    running: AtomicBool,
    interval_nanos: AtomicU64,
    ticks: AtomicU64,
    reanchors: AtomicU64,
}

impl Shared {
    fn interval(&self) -> Duration {
        Duration::from_nanos(self.interval_nanos.load(Ordering::Relaxed))
    }
}

/// The module that owns the tick thread.
///
/// `start()` spawns one thread that calls [`Systems::tick_all`] at a fixed
/// cadence. `stop()` only clears the running flag, so it is safe to call from
/// any thread, including from inside a tick; the loop notices within one
/// interval. `wait()` joins the thread.
///
/// A scheduler runs once: starting it while running, or again after it was
/// stopped, is a [`SystemsError::Misuse`].
pub struct Scheduler {
    systems: Weak<Systems>,
    shared: Arc<Shared>,
    max_lag_ticks: u32,
    lifecycle: Mutex<ModuleState>,
    handle: Mutex<Option<thread::JoinHandle<()>>>,
    on_failure: FailureHandler,
}

impl Scheduler {
    /// Creates a scheduler that will tick `systems`.
    pub fn new(systems: Weak<Systems>, config: &SchedulerConfig) -> Self {
        Self {
            systems,
            shared: Arc::new(Shared {
                running: AtomicBool::new(false),
                interval_nanos: AtomicU64::new(duration_nanos(config.tick_interval())),
                ticks: AtomicU64::new(0),
                reanchors: AtomicU64::new(0),
            }),
            max_lag_ticks: config.max_lag_ticks,
            lifecycle: Mutex::new(ModuleState::Constructed),
            handle: Mutex::new(None),
            on_failure: Arc::new(|err| log::error!("Scheduler: Tick failed: {}", err)),
        }
    }

    /// Replaces the handler invoked when a tick fails.
    pub fn with_failure_handler<F>(mut self, handler: F) -> Self
    where
        F: Fn(&SystemsError) + Send + Sync + 'static,
    {
        self.on_failure = Arc::new(handler);
        self
    }

    /// Changes the tick interval.
    ///
    /// The new interval applies from the next iteration; a wait already in
    /// progress completes with the old one.
    pub fn set_tick_interval(&self, interval: Duration) -> SystemsResult<()> {
        if interval.is_zero() {
            return Err(SystemsError::misuse(
                ModuleType::Scheduler,
                "tick interval must be greater than zero",
            ));
        }
        self.shared
            .interval_nanos
            .store(duration_nanos(interval), Ordering::Relaxed);
        log::debug!("Scheduler: Tick interval set to {:?}", interval);
        Ok(())
    }

    /// The current tick interval.
    pub fn tick_interval(&self) -> Duration {
        self.shared.interval()
    }

    /// Returns true while the tick loop is running.
    pub fn is_running(&self) -> bool {
        self.shared.running.load(Ordering::Acquire)
    }

    /// Asks the tick loop to exit after its current iteration.
    pub fn request_stop(&self) {
        if self.shared.running.swap(false, Ordering::AcqRel) {
            log::info!("Scheduler: Stop requested");
        }
    }

    /// Copies the current counters.
    pub fn stats(&self) -> SchedulerStats {
        SchedulerStats {
            ticks: self.shared.ticks.load(Ordering::Relaxed),
            reanchors: self.shared.reanchors.load(Ordering::Relaxed),
            running: self.is_running(),
        }
    }
}

impl Module for Scheduler {
    fn start(&self) -> anyhow::Result<()> {
        let mut lifecycle = self.lifecycle.lock();
        match *lifecycle {
            ModuleState::Started => {
                return Err(SystemsError::misuse(ModuleType::Scheduler, "already running").into())
            }
            ModuleState::Stopped => {
                return Err(SystemsError::misuse(
                    ModuleType::Scheduler,
                    "cannot be restarted after stop",
                )
                .into())
            }
            ModuleState::Constructed => {}
        }

        self.shared.running.store(true, Ordering::Release);
        let shared = Arc::clone(&self.shared);
        let systems = self.systems.clone();
        let on_failure = Arc::clone(&self.on_failure);
        let max_lag_ticks = self.max_lag_ticks;

        let spawned = thread::Builder::new()
            .name(THREAD_NAME.to_owned())
            .spawn(move || run(shared, systems, on_failure, max_lag_ticks));
        let handle = match spawned {
            Ok(handle) => handle,
            Err(err) => {
                self.shared.running.store(false, Ordering::Release);
                return Err(err).context("failed to spawn the scheduler thread");
            }
        };

        *self.handle.lock() = Some(handle);
        *lifecycle = ModuleState::Started;
        Ok(())
    }

    fn stop(&self) -> anyhow::Result<()> {
        self.request_stop();
        *self.lifecycle.lock() = ModuleState::Stopped;
        Ok(())
    }

    fn wait(&self) {
        let handle = self.handle.lock().take();
        if let Some(handle) = handle {
            if handle.join().is_err() {
                log::error!("Scheduler: Tick thread panicked");
            }
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl Drop for Scheduler {
    fn drop(&mut self) {
        self.request_stop();
        if let Some(handle) = self.handle.get_mut().take() {
            // The last owner may be the tick thread itself.
            if handle.thread().id() != thread::current().id() {
                let _ = handle.join();
            }
        }
    }
}

fn run(shared: Arc<Shared>, systems: Weak<Systems>, on_failure: FailureHandler, max_lag_ticks: u32) {
    let mut schedule = TickSchedule::new(Instant::now(), shared.interval(), max_lag_ticks);
    log::info!(
        "Scheduler: Tick thread started (interval {:?})",
        schedule.interval()
    );

    while shared.running.load(Ordering::Acquire) {
        let deadline = schedule.next_deadline(Instant::now(), shared.interval());
        shared
            .reanchors
            .store(schedule.reanchors(), Ordering::Relaxed);

        let Some(systems) = systems.upgrade() else {
            log::warn!("Scheduler: Orchestrator dropped, leaving tick loop");
            break;
        };
        let result = systems.tick_all();
        drop(systems);
        shared.ticks.fetch_add(1, Ordering::Relaxed);

        if let Err(err) = result {
            on_failure(&err);
            break;
        }

        let now = Instant::now();
        if deadline > now {
            thread::sleep(deadline - now);
        }
    }

    shared.running.store(false, Ordering::Release);
    log::info!(
        "Scheduler: Tick thread stopped after {} ticks",
        shared.ticks.load(Ordering::Relaxed)
    );
}

fn duration_nanos(duration: Duration) -> u64 {
    u64::try_from(duration.as_nanos()).unwrap_or(u64::MAX)
}
