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

//! The contract every engine module implements, and the key identifying it.

use serde::{Deserialize, Serialize};
use std::any::Any;
use std::fmt;

/// Identifies the role of a module inside the engine.
///
/// This is the key of both the factory registry and the live module set, so
/// at most one module of each type is ever alive in a given engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub enum ModuleType {
    /// The module owning the tick thread.
    Scheduler,
    /// Game state, clock and deferred callbacks.
    Game,
    /// Input devices.
    Input,
    /// Rendering.
    Graphics,
    /// Audio playback.
    Audio,
    /// Physics simulation.
    Physics,
    /// Script engine embedding.
    Script,
}

impl ModuleType {
    /// Every module type, in declaration order.
    pub const ALL: [ModuleType; 7] = [
        ModuleType::Scheduler,
        ModuleType::Game,
        ModuleType::Input,
        ModuleType::Graphics,
        ModuleType::Audio,
        ModuleType::Physics,
        ModuleType::Script,
    ];
}

impl fmt::Display for ModuleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Where a live module instance sits in its lifecycle.
///
/// Transitions only move forward: `Constructed -> Started -> Stopped`.
/// A stopped module leaves the live set and is never started again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModuleState {
    /// Built by its factory, not started yet. Never ticked.
    Constructed,
    /// `start()` succeeded. Ticked every cycle.
    Started,
    /// `stop()` has been called.
    Stopped,
}

impl ModuleState {
    /// Returns `true` if the module may take part in a tick.
    pub fn is_tickable(self) -> bool {
        matches!(self, ModuleState::Started)
    }
}

/// The capability set of an engine module.
///
/// Modules are shared between the thread that sets the engine up and the
/// scheduler thread, so every method takes `&self`; implementations keep
/// their mutable state behind their own locks or atomics.
///
/// A module declares the types it depends on but never its own type: the
/// orchestrator knows which key it was built for.
///
/// # Example
///
/// ```rust
/// use chrona_core::module::{Module, ModuleType};
/// use std::any::Any;
///
/// struct Audio;
///
/// impl Module for Audio {
///     fn dependencies(&self) -> &[ModuleType] {
///         &[ModuleType::Game]
///     }
///
///     fn as_any(&self) -> &dyn Any { self }
/// }
/// ```
pub trait Module: Send + Sync {
    /// One-time setup. May acquire resources.
    fn start(&self) -> anyhow::Result<()> {
        Ok(())
    }

    /// One-time teardown. Must release everything acquired in `start`.
    fn stop(&self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Runs before any module's `tick` in the same cycle.
    fn pre_tick(&self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Main work of the cycle.
    fn tick(&self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Runs after every module's `tick` in the same cycle.
    fn post_tick(&self) -> anyhow::Result<()> {
        Ok(())
    }

    /// Blocks until any asynchronous work the module runs has settled.
    fn wait(&self) {}

    /// The module types that must be alive (and started first) for this one.
    fn dependencies(&self) -> &[ModuleType] {
        &[]
    }

    /// Allows downcasting to the concrete module type.
    fn as_any(&self) -> &dyn Any;
}
