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

//! Placeholder modules whose type and dependencies come from the config file.

use chrona_control::ModuleConfig;
use chrona_core::{Module, ModuleType};
use std::any::Any;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// A module that only logs its lifecycle and counts its ticks.
pub struct ConfiguredModule {
    kind: ModuleType,
    dependencies: Vec<ModuleType>,
    ticks: AtomicU64,
}

impl ConfiguredModule {
    pub fn new(config: &ModuleConfig) -> Self {
        Self {
            kind: config.kind,
            dependencies: config.dependencies.clone(),
            ticks: AtomicU64::new(0),
        }
    }

    /// A factory building a fresh module for `config` on every call.
    pub fn factory(config: &ModuleConfig) -> impl Fn() -> Option<Arc<dyn Module>> + Send + Sync {
        let config = config.clone();
        move || Some(Arc::new(ConfiguredModule::new(&config)) as Arc<dyn Module>)
    }
}

impl Module for ConfiguredModule {
    fn start(&self) -> anyhow::Result<()> {
        log::info!(
            "{}: Started (depends on {:?})",
            self.kind,
            self.dependencies
        );
        Ok(())
    }

    fn tick(&self) -> anyhow::Result<()> {
        let ticks = self.ticks.fetch_add(1, Ordering::Relaxed) + 1;
        log::trace!("{}: Tick {}", self.kind, ticks);
        Ok(())
    }

    fn stop(&self) -> anyhow::Result<()> {
        log::info!(
            "{}: Stopped after {} ticks",
            self.kind,
            self.ticks.load(Ordering::Relaxed)
        );
        Ok(())
    }

    fn dependencies(&self) -> &[ModuleType] {
        &self.dependencies
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
