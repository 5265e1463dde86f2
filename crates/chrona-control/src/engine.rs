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

//! The engine context: one orchestrator, one clock, one scheduler.

use crate::config::{ConfigError, EngineConfig};
use crate::game::{GameModule, TimeHandle};
use crate::scheduler::Scheduler;
use crate::systems::Systems;
use chrona_core::{Module, ModuleType, SystemsResult};
use std::sync::Arc;

/// Owns an orchestrator and exposes the engine-level lifecycle.
///
/// Several engines can coexist in one process; nothing here is global.
///
/// # Example
///
/// ```rust,no_run
/// use chrona_control::{Engine, EngineConfig};
/// use std::time::Duration;
///
/// # fn main() -> anyhow::Result<()> {
/// let engine = Engine::new(EngineConfig::default())?.with_builtin_factories();
/// engine.add_module(chrona_core::ModuleType::Game)?;
/// engine.start()?;
///
/// if let Some(time) = engine.time() {
///     time.schedule(Duration::from_millis(100), || log::info!("100ms later"));
/// }
///
/// std::thread::sleep(Duration::from_millis(200));
/// engine.shutdown()?;
/// # Ok(())
/// # }
/// ```
pub struct Engine {
    config: EngineConfig,
    systems: Arc<Systems>,
}

impl Engine {
    /// Creates an engine with no registered factories.
    pub fn new(config: EngineConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            systems: Arc::new(Systems::new()),
        })
    }

    /// Registers the factories for the built-in [`ModuleType::Game`] and
    /// [`ModuleType::Scheduler`] modules, configured from this engine's config.
    pub fn with_builtin_factories(self) -> Self {
        let start_paused = self.config.clock.start_paused;
        self.register_factory(ModuleType::Game, move || {
            Some(Arc::new(GameModule::new(start_paused)) as Arc<dyn Module>)
        });

        let systems = Arc::downgrade(&self.systems);
        let scheduler = self.config.scheduler.clone();
        self.register_factory(ModuleType::Scheduler, move || {
            Some(Arc::new(Scheduler::new(systems.clone(), &scheduler)) as Arc<dyn Module>)
        });
        self
    }

    /// The configuration this engine was built with.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The orchestrator driving this engine's modules.
    pub fn systems(&self) -> &Arc<Systems> {
        &self.systems
    }

    /// See [`Systems::register_factory`].
    pub fn register_factory<F>(&self, module: ModuleType, factory: F) -> bool
    where
        F: Fn() -> Option<Arc<dyn Module>> + Send + Sync + 'static,
    {
        self.systems.register_factory(module, factory)
    }

    /// See [`Systems::add_module`].
    pub fn add_module(&self, module: ModuleType) -> SystemsResult<()> {
        self.systems.add_module(module)
    }

    /// Adds every enabled module listed in the configuration, in file order.
    pub fn add_configured_modules(&self) -> SystemsResult<()> {
        for module in self.config.enabled_modules() {
            self.systems.add_module(module.kind)?;
        }
        Ok(())
    }

    /// Adds the scheduler and starts every loaded module.
    ///
    /// The scheduler is added last, so it is also started last and the first
    /// tick only happens once everything else is up.
    pub fn start(&self) -> SystemsResult<()> {
        self.systems.add_module(ModuleType::Scheduler)?;
        self.systems.start_all()?;
        log::info!(
            "Engine: Started {} modules: {:?}",
            self.systems.len(),
            self.systems.load_order()
        );
        Ok(())
    }

    /// Runs one tick on the calling thread.
    ///
    /// For engines driven without a scheduler.
    pub fn tick(&self) -> SystemsResult<()> {
        self.systems.tick_all()
    }

    /// Asks the tick loop to exit. Returns `false` if no scheduler is live.
    ///
    /// Safe to call from inside a tick.
    pub fn request_stop(&self) -> bool {
        self.systems
            .with_module::<Scheduler, _>(ModuleType::Scheduler, Scheduler::request_stop)
            .is_some()
    }

    /// Blocks until every live module has settled; for the scheduler, until
    /// the tick thread has exited.
    ///
    /// Must not be called from inside a tick.
    pub fn wait(&self) {
        self.systems.wait_all();
    }

    /// Stops the tick loop, waits for it, then stops every module.
    ///
    /// Must not be called from inside a tick.
    pub fn shutdown(&self) -> SystemsResult<()> {
        self.request_stop();
        self.wait();
        let result = self.systems.stop_all();
        log::info!("Engine: Shut down");
        result
    }

    /// A handle to the live game module's clock and timers.
    pub fn time(&self) -> Option<TimeHandle> {
        self.systems
            .with_module::<GameModule, _>(ModuleType::Game, GameModule::time)
    }

    /// The live scheduler's counters.
    pub fn scheduler_stats(&self) -> Option<crate::scheduler::SchedulerStats> {
        self.systems
            .with_module::<Scheduler, _>(ModuleType::Scheduler, Scheduler::stats)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_config_is_rejected() {
        let mut config = EngineConfig::default();
        config.scheduler.tick_interval_ms = 0;
        assert!(matches!(Engine::new(config), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_builtin_factories_are_registered() {
        let engine = Engine::new(EngineConfig::default())
            .unwrap()
            .with_builtin_factories();
        engine.add_module(ModuleType::Game).unwrap();
        assert!(engine.time().is_some());
        assert!(engine.scheduler_stats().is_none());
        assert!(!engine.request_stop(), "No scheduler is live yet");
    }

    #[test]
    fn test_manual_ticking_without_scheduler() {
        let engine = Engine::new(EngineConfig::default())
            .unwrap()
            .with_builtin_factories();
        engine.add_module(ModuleType::Game).unwrap();
        engine.systems().start_all().unwrap();

        let time = engine.time().unwrap();
        engine.tick().unwrap();
        engine.tick().unwrap();
        assert_eq!(time.snapshot().ticks, 2);

        engine.systems().stop_all().unwrap();
        assert!(engine.time().is_none());
    }
}
