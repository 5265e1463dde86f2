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

//! Error types raised by module orchestration.

use crate::module::ModuleType;
use std::fmt;
use thiserror::Error;

/// The lifecycle phase a module was in when it reported a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ModulePhase {
    /// One-time setup.
    Start,
    /// Preparation pass of a tick.
    PreTick,
    /// Main work pass of a tick.
    Tick,
    /// Finalization pass of a tick.
    PostTick,
    /// One-time teardown.
    Stop,
}

impl fmt::Display for ModulePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ModulePhase::Start => "start",
            ModulePhase::PreTick => "pre_tick",
            ModulePhase::Tick => "tick",
            ModulePhase::PostTick => "post_tick",
            ModulePhase::Stop => "stop",
        };
        f.write_str(name)
    }
}

/// Errors produced while building, starting, ticking or stopping modules.
///
/// Every variant except [`SystemsError::ModuleFailed`] is raised by the
/// orchestrator itself and is expected to abort engine startup.
#[derive(Debug, Error)]
pub enum SystemsError {
    /// No factory is registered for the requested module type.
    #[error("no factory registered for module type {module}")]
    Lookup {
        /// The module type that was requested.
        module: ModuleType,
    },

    /// The registered factory did not produce a usable instance.
    #[error("factory for module type {module} produced no instance")]
    NullResult {
        /// The module type whose factory came back empty.
        module: ModuleType,
    },

    /// Dependency resolution reached a module type that is still being resolved.
    #[error("circular module dependency: {}", format_chain(.chain))]
    CircularDependency {
        /// The resolution path, ending with the type that closes the cycle.
        chain: Vec<ModuleType>,
    },

    /// A single-instance component or a lifecycle transition was misused.
    #[error("misuse of module {module}: {reason}")]
    Misuse {
        /// The module that was misused.
        module: ModuleType,
        /// What went wrong.
        reason: String,
    },

    /// A module returned an error from one of its lifecycle phases.
    #[error("module {module} failed during {phase}: {source}")]
    ModuleFailed {
        /// The failing module.
        module: ModuleType,
        /// The phase that failed.
        phase: ModulePhase,
        /// The error reported by the module.
        #[source]
        source: anyhow::Error,
    },
}

/// Convenience alias for results carrying a [`SystemsError`].
pub type SystemsResult<T> = Result<T, SystemsError>;

impl SystemsError {
    /// Convenience constructor for [`SystemsError::Misuse`].
    pub fn misuse(module: ModuleType, reason: impl Into<String>) -> Self {
        SystemsError::Misuse {
            module,
            reason: reason.into(),
        }
    }

    /// Wraps an error returned by a module phase.
    pub fn module_failed(module: ModuleType, phase: ModulePhase, source: anyhow::Error) -> Self {
        SystemsError::ModuleFailed {
            module,
            phase,
            source,
        }
    }
}

fn format_chain(chain: &[ModuleType]) -> String {
    chain
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" -> ")
}
