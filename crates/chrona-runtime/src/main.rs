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

mod modules;

use anyhow::{Context, Result};
use chrona_control::{Engine, EngineConfig};
use chrona_core::ModuleType;
use crossbeam_channel::RecvTimeoutError;
use modules::ConfiguredModule;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

const DEFAULT_CONFIG: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/config/engine.json");
const HEARTBEAT: Duration = Duration::from_millis(500);
const LIVENESS_POLL: Duration = Duration::from_millis(100);

/// The engine configuration plus runtime-only settings.
#[derive(Debug, Deserialize)]
struct RuntimeConfig {
    #[serde(flatten)]
    engine: EngineConfig,
    /// How long to run before shutting down, in milliseconds.
    #[serde(default = "default_run_for_ms")]
    run_for_ms: u64,
}

fn default_run_for_ms() -> u64 {
    2000
}

impl RuntimeConfig {
    fn load(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let config: Self = serde_json::from_str(&json)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        config.engine.validate()?;
        Ok(config)
    }
}

fn main() -> Result<()> {
    use env_logger::{Builder, Env};

    Builder::from_env(Env::default().default_filter_or("info")).init();

    let path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG));
    let config = RuntimeConfig::load(&path).context("failed to load runtime configuration")?;
    log::info!("Runtime: Loaded {}", path.display());

    run(config)
}

fn run(config: RuntimeConfig) -> Result<()> {
    let engine = Engine::new(config.engine.clone())?.with_builtin_factories();
    for module in &config.engine.modules {
        engine.register_factory(module.kind, ConfiguredModule::factory(module));
    }

    engine.add_module(ModuleType::Game)?;
    engine.add_configured_modules()?;
    engine.start()?;

    let time = engine.time().context("game module is not live")?;
    let heartbeat = {
        let clock = time.clone();
        time.schedule_repeating(HEARTBEAT, move || {
            let snapshot = clock.snapshot();
            log::info!(
                "Runtime: Heartbeat (real {:?}, game {:?}, {} ticks)",
                snapshot.real_time,
                snapshot.game_time,
                snapshot.ticks
            );
        })
    };

    let (shutdown_tx, shutdown_rx) = crossbeam_channel::bounded::<()>(1);
    time.schedule(Duration::from_millis(config.run_for_ms), move || {
        log::info!("Runtime: Run time elapsed, requesting shutdown");
        let _ = shutdown_tx.send(());
    });

    loop {
        match shutdown_rx.recv_timeout(LIVENESS_POLL) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {
                let running = engine.scheduler_stats().is_some_and(|stats| stats.running);
                if !running {
                    log::error!("Runtime: Tick loop ended before the run time elapsed");
                    break;
                }
            }
        }
    }

    time.cancel(heartbeat);
    let stats = engine.scheduler_stats();
    engine.shutdown()?;

    if let Some(stats) = stats {
        log::info!(
            "Runtime: {} ticks, {} re-anchors",
            stats.ticks,
            stats.reanchors
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shipped_config_loads() {
        let config = RuntimeConfig::load(Path::new(DEFAULT_CONFIG)).unwrap();
        assert_eq!(config.run_for_ms, 2000);
        assert_eq!(config.engine.scheduler.tick_interval_ms, 16);
        assert_eq!(config.engine.modules.len(), 5);
        assert_eq!(config.engine.enabled_modules().count(), 4);
    }

    #[test]
    fn test_run_for_defaults_when_absent() {
        let config: RuntimeConfig = serde_json::from_str(r#"{ "clock": { "start_paused": true } }"#).unwrap();
        assert_eq!(config.run_for_ms, 2000);
        assert!(config.engine.clock.start_paused);
    }

    #[test]
    fn test_short_run_shuts_down_cleanly() {
        let config: RuntimeConfig = serde_json::from_str(
            r#"{
                "run_for_ms": 50,
                "scheduler": { "tick_interval_ms": 5 },
                "modules": [ { "kind": "Input" }, { "kind": "Audio", "dependencies": ["Input"] } ]
            }"#,
        )
        .unwrap();
        run(config).unwrap();
    }
}
