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

//! # Chrona Core
//!
//! Foundational crate containing the module contract, the dependency
//! resolver, and the time primitives (clock and deferred callbacks) that the
//! orchestration layer is built on.

#![warn(missing_docs)]

pub mod error;
pub mod graph;
pub mod module;
pub mod time;
pub mod utils;

pub use error::{ModulePhase, SystemsError, SystemsResult};
pub use module::{Module, ModuleState, ModuleType};
pub use time::{Clock, TimerId, TimerQueue};
pub use utils::timer::Stopwatch;
