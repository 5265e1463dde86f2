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

//! The module orchestrator: owns the live module set and drives its lifecycle.

use crate::factory::{self, FactoryRegistry};
use chrona_core::graph::{resolve_post_order, ResolveError};
use chrona_core::{Module, ModulePhase, ModuleState, ModuleType, SystemsError, SystemsResult};
use parking_lot::ReentrantMutex;
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;

/// A live module and where it is in its lifecycle.
struct Entry {
    module: Arc<dyn Module>,
    state: ModuleState,
}

#[derive(Default)]
struct State {
    factories: FactoryRegistry,
    modules: HashMap<ModuleType, Entry>,
    /// Construction order. Dependencies always precede their dependents.
    load_order: Vec<ModuleType>,
}

/// Owns every live module and sequences its construction, startup, ticking
/// and teardown.
///
/// All state sits behind one re-entrant lock held for the full duration of
/// [`add_module`](Self::add_module), [`start_all`](Self::start_all),
/// [`stop_all`](Self::stop_all) and [`tick_all`](Self::tick_all). Setup calls
/// from other threads are therefore serialized against a running tick, while a
/// module may still call back into `Systems` from inside one of its own phases.
///
/// The inner `RefCell` is never borrowed across a call into module code.
pub struct Systems {
    state: ReentrantMutex<RefCell<State>>,
}

impl Systems {
    /// Creates an orchestrator with no factories and no live modules.
    pub fn new() -> Self {
        Self {
            state: ReentrantMutex::new(RefCell::new(State::default())),
        }
    }

    /// Registers the constructor used to build `module`.
    ///
    /// Returns `true` if an earlier registration was replaced. Already live
    /// instances are not affected.
    pub fn register_factory<F>(&self, module: ModuleType, factory: F) -> bool
    where
        F: Fn() -> Option<Arc<dyn Module>> + Send + Sync + 'static,
    {
        let guard = self.state.lock();
        let replaced = guard.borrow_mut().factories.register(module, factory);
        replaced
    }

    /// Instantiates `module` and every module it transitively depends on.
    ///
    /// Does nothing if `module` is already live. Each missing type is built
    /// exactly once, and the new instances are appended to the load order in
    /// depth-first post-order, so dependencies always come first.
    ///
    /// The call is all-or-nothing: if any factory fails or a cycle is found,
    /// none of the instances built along the way become live.
    pub fn add_module(&self, module: ModuleType) -> SystemsResult<()> {
        let guard = self.state.lock();
        if guard.borrow().modules.contains_key(&module) {
            log::debug!("Systems: {} already loaded", module);
            return Ok(());
        }

        let resolution = resolve_post_order(
            module,
            |ty| guard.borrow().modules.contains_key(ty),
            |ty| -> SystemsResult<(Arc<dyn Module>, Vec<ModuleType>)> {
                let factory = guard.borrow().factories.get(ty)?;
                let instance = factory::invoke(ty, &factory)?;
                let dependencies = instance.dependencies().to_vec();
                Ok((instance, dependencies))
            },
        )
        .map_err(|err| match err {
            ResolveError::Cycle(chain) => SystemsError::CircularDependency { chain },
            ResolveError::Expand(err) => err,
        });

        let resolution = match resolution {
            Ok(resolution) => resolution,
            Err(err) => {
                log::error!("Systems: Failed to add {}: {}", module, err);
                return Err(err);
            }
        };

        let mut state = guard.borrow_mut();
        for (ty, instance) in resolution.order {
            state.modules.insert(
                ty,
                Entry {
                    module: instance,
                    state: ModuleState::Constructed,
                },
            );
            state.load_order.push(ty);
            log::info!("Systems: Loaded {}", ty);
        }
        Ok(())
    }

    /// Starts every module that has not been started yet, in load order.
    ///
    /// Stops at the first failure. Modules started before it stay started and
    /// the failing module stays `Constructed`.
    pub fn start_all(&self) -> SystemsResult<()> {
        let guard = self.state.lock();
        let order = guard.borrow().load_order.clone();

        for ty in order {
            let module = {
                let state = guard.borrow();
                match state.modules.get(&ty) {
                    Some(entry) if entry.state == ModuleState::Constructed => {
                        Arc::clone(&entry.module)
                    }
                    _ => continue,
                }
            };

            if let Err(err) = module.start() {
                log::error!("Systems: {} failed to start: {:#}", ty, err);
                return Err(SystemsError::module_failed(ty, ModulePhase::Start, err));
            }

            if let Some(entry) = guard.borrow_mut().modules.get_mut(&ty) {
                entry.state = ModuleState::Started;
            }
            log::info!("Systems: Started {}", ty);
        }
        Ok(())
    }

    /// Removes every live module, most recently loaded first.
    ///
    /// `stop()` is only called on modules that were started. The drain always
    /// completes: failures are logged and the first one is returned at the end.
    ///
    /// Removed instances are released only after the lock is dropped, since
    /// releasing the scheduler joins its tick thread, which may be blocked on
    /// this lock inside [`tick_all`](Self::tick_all).
    pub fn stop_all(&self) -> SystemsResult<()> {
        let guard = self.state.lock();
        let mut first_error = None;
        let mut removed = Vec::new();

        loop {
            let (ty, entry) = {
                let mut state = guard.borrow_mut();
                let Some(ty) = state.load_order.pop() else {
                    break;
                };
                match state.modules.remove(&ty) {
                    Some(entry) => (ty, entry),
                    None => continue,
                }
            };

            if entry.state != ModuleState::Started {
                log::debug!("Systems: Unloaded {} (never started)", ty);
                removed.push(entry);
                continue;
            }

            match entry.module.stop() {
                Ok(()) => log::info!("Systems: Stopped {}", ty),
                Err(err) => {
                    log::error!("Systems: {} failed to stop: {:#}", ty, err);
                    first_error
                        .get_or_insert_with(|| SystemsError::module_failed(ty, ModulePhase::Stop, err));
                }
            }
            removed.push(entry);
        }

        drop(guard);
        drop(removed);

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Runs one tick over every started module.
    ///
    /// Three full passes in load order: every `pre_tick`, then every `tick`,
    /// then every `post_tick`. The first failure aborts the tick and is
    /// returned to the caller.
    pub fn tick_all(&self) -> SystemsResult<()> {
        let guard = self.state.lock();
        let started: Vec<(ModuleType, Arc<dyn Module>)> = {
            let state = guard.borrow();
            state
                .load_order
                .iter()
                .filter_map(|ty| {
                    let entry = state.modules.get(ty)?;
                    entry
                        .state
                        .is_tickable()
                        .then(|| (*ty, Arc::clone(&entry.module)))
                })
                .collect()
        };

        for phase in [ModulePhase::PreTick, ModulePhase::Tick, ModulePhase::PostTick] {
            for (ty, module) in &started {
                let result = match phase {
                    ModulePhase::PreTick => module.pre_tick(),
                    ModulePhase::Tick => module.tick(),
                    _ => module.post_tick(),
                };
                result.map_err(|err| SystemsError::module_failed(*ty, phase, err))?;
            }
        }
        Ok(())
    }

    /// Blocks on `wait()` for every live module, in load order.
    ///
    /// The orchestrator lock is released first, so a module may be joining a
    /// thread that still needs to tick.
    pub fn wait_all(&self) {
        let modules: Vec<(ModuleType, Arc<dyn Module>)> = {
            let guard = self.state.lock();
            let state = guard.borrow();
            state
                .load_order
                .iter()
                .filter_map(|ty| Some((*ty, Arc::clone(&state.modules.get(ty)?.module))))
                .collect()
        };

        for (ty, module) in modules {
            log::debug!("Systems: Waiting on {}", ty);
            module.wait();
        }
    }

    /// Returns true if `module` is live.
    pub fn contains(&self, module: ModuleType) -> bool {
        let guard = self.state.lock();
        let contains = guard.borrow().modules.contains_key(&module);
        contains
    }

    /// Returns the number of live modules.
    pub fn len(&self) -> usize {
        let guard = self.state.lock();
        let len = guard.borrow().modules.len();
        len
    }

    /// Returns true if no module is live.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The live module types in construction order.
    pub fn load_order(&self) -> Vec<ModuleType> {
        let guard = self.state.lock();
        let order = guard.borrow().load_order.clone();
        order
    }

    /// The lifecycle state of `module`, or `None` if it is not live.
    pub fn state(&self, module: ModuleType) -> Option<ModuleState> {
        let guard = self.state.lock();
        let state = guard.borrow().modules.get(&module).map(|entry| entry.state);
        state
    }

    /// A shared handle to the live instance of `module`.
    pub fn get(&self, module: ModuleType) -> Option<Arc<dyn Module>> {
        let guard = self.state.lock();
        let instance = guard
            .borrow()
            .modules
            .get(&module)
            .map(|entry| Arc::clone(&entry.module));
        instance
    }

    /// Runs `f` on the live instance of `module` downcast to `T`.
    ///
    /// Returns `None` if the module is not live or is not a `T`.
    pub fn with_module<T, R>(&self, module: ModuleType, f: impl FnOnce(&T) -> R) -> Option<R>
    where
        T: Module + 'static,
    {
        let instance = self.get(module)?;
        let concrete = instance.as_any().downcast_ref::<T>()?;
        Some(f(concrete))
    }
}

impl Default for Systems {
    fn default() -> Self {
        Self::new()
    }
}
