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

//! # Chrona Control
//!
//! Module orchestration on top of `chrona-core`: the factory registry, the
//! [`Systems`] orchestrator, the [`Scheduler`] tick thread, the built-in
//! [`GameModule`], and the [`Engine`] context tying them together.

#![warn(missing_docs)]

pub mod config;
pub mod engine;
pub mod factory;
pub mod game;
pub mod scheduler;
pub mod systems;

pub use config::{ConfigError, EngineConfig, ModuleConfig, SchedulerConfig};
pub use engine::Engine;
pub use factory::{FactoryRegistry, ModuleFactory};
pub use game::{GameModule, TimeHandle};
pub use scheduler::{Scheduler, SchedulerStats, TickSchedule};
pub use systems::Systems;
