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

//! Engine configuration, loaded from JSON.

use chrona_core::ModuleType;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Errors raised while loading or validating an [`EngineConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Io {
        /// The file that was requested.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The configuration is not valid JSON for this schema.
    #[error("failed to parse config: {0}")]
    Parse(#[from] serde_json::Error),
    /// The configuration parsed but describes an unusable engine.
    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Tick loop settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Time between two tick starts, in milliseconds. Must be at least 1.
    pub tick_interval_ms: u64,
    /// How many intervals the loop may fall behind before it re-anchors
    /// instead of catching up.
    pub max_lag_ticks: u32,
}

impl SchedulerConfig {
    /// The tick interval as a [`Duration`].
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: 16,
            max_lag_ticks: 8,
        }
    }
}

/// Clock settings.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClockConfig {
    /// Whether game time starts frozen.
    pub start_paused: bool,
}

/// A module the engine should load at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModuleConfig {
    /// Which module to load.
    pub kind: ModuleType,
    /// Disabled entries are kept in the file but not loaded.
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    /// Module types this one depends on.
    #[serde(default)]
    pub dependencies: Vec<ModuleType>,
}

fn enabled_by_default() -> bool {
    true
}

/// Top-level engine configuration.
///
/// Every field has a default, so `{}` is a valid configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Tick loop settings.
    pub scheduler: SchedulerConfig,
    /// Clock settings.
    pub clock: ClockConfig,
    /// Modules loaded by [`Engine::add_configured_modules`](crate::Engine::add_configured_modules).
    pub modules: Vec<ModuleConfig>,
}

impl EngineConfig {
    /// Parses and validates a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!("Config: Loaded {}", path.display());
        Self::from_json_str(&json)
    }

    /// Checks the constraints serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scheduler.tick_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "scheduler.tick_interval_ms must be at least 1".into(),
            ));
        }

        let mut seen = HashSet::new();
        for module in &self.modules {
            if matches!(module.kind, ModuleType::Scheduler | ModuleType::Game) {
                return Err(ConfigError::Invalid(format!(
                    "{} is built in and cannot be configured as a module",
                    module.kind
                )));
            }
            if module.dependencies.contains(&ModuleType::Scheduler) {
                return Err(ConfigError::Invalid(format!(
                    "{} cannot depend on Scheduler, which always loads last",
                    module.kind
                )));
            }
            if !seen.insert(module.kind) {
                return Err(ConfigError::Invalid(format!(
                    "module {} is listed more than once",
                    module.kind
                )));
            }
        }
        Ok(())
    }

    /// The configured modules that are enabled, in file order.
    pub fn enabled_modules(&self) -> impl Iterator<Item = &ModuleConfig> {
        self.modules.iter().filter(|module| module.enabled)
    }
}
