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

use chrona_control::Systems;
use chrona_core::{Module, ModulePhase, ModuleState, ModuleType, SystemsError};
use parking_lot::Mutex;
use std::any::Any;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

// --- Test Setup: a module that journals every phase it runs ---

type Journal = Arc<Mutex<Vec<String>>>;

struct Recording {
    kind: ModuleType,
    deps: Vec<ModuleType>,
    journal: Journal,
    fail_on: Option<ModulePhase>,
}

impl Recording {
    fn record(&self, phase: ModulePhase) -> anyhow::Result<()> {
        self.journal.lock().push(format!("{}.{}", self.kind, phase));
        if self.fail_on == Some(phase) {
            anyhow::bail!("{} refused {}", self.kind, phase);
        }
        Ok(())
    }
}

impl Module for Recording {
    fn start(&self) -> anyhow::Result<()> {
        self.record(ModulePhase::Start)
    }
    fn stop(&self) -> anyhow::Result<()> {
        self.record(ModulePhase::Stop)
    }
    fn pre_tick(&self) -> anyhow::Result<()> {
        self.record(ModulePhase::PreTick)
    }
    fn tick(&self) -> anyhow::Result<()> {
        self.record(ModulePhase::Tick)
    }
    fn post_tick(&self) -> anyhow::Result<()> {
        self.record(ModulePhase::PostTick)
    }
    fn dependencies(&self) -> &[ModuleType] {
        &self.deps
    }
    fn as_any(&self) -> &dyn Any {
        self
    }
}

struct Harness {
    systems: Systems,
    journal: Journal,
    builds: Arc<AtomicUsize>,
}

impl Harness {
    fn new() -> Self {
        Self {
            systems: Systems::new(),
            journal: Arc::new(Mutex::new(Vec::new())),
            builds: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn register(&self, kind: ModuleType, deps: &[ModuleType]) {
        self.register_failing(kind, deps, None);
    }

    fn register_failing(&self, kind: ModuleType, deps: &[ModuleType], fail_on: Option<ModulePhase>) {
        let deps = deps.to_vec();
        let journal = Arc::clone(&self.journal);
        let builds = Arc::clone(&self.builds);
        self.systems.register_factory(kind, move || {
            builds.fetch_add(1, Ordering::SeqCst);
            Some(Arc::new(Recording {
                kind,
                deps: deps.clone(),
                journal: Arc::clone(&journal),
                fail_on,
            }) as Arc<dyn Module>)
        });
    }

    fn take_journal(&self) -> Vec<String> {
        std::mem::take(&mut *self.journal.lock())
    }

    fn builds(&self) -> usize {
        self.builds.load(Ordering::SeqCst)
    }
}

use ModuleType::{Audio, Graphics, Input, Physics, Script};

// ---

#[test]
fn test_add_module_twice_keeps_one_instance() {
    // ARRANGE
    let h = Harness::new();
    h.register(Input, &[]);

    // ACT
    h.systems.add_module(Input).unwrap();
    let first = h.systems.get(Input).unwrap();
    h.systems.add_module(Input).unwrap();

    // ASSERT
    assert_eq!(h.builds(), 1, "The factory must only run once");
    assert_eq!(h.systems.load_order(), vec![Input]);
    assert!(Arc::ptr_eq(&first, &h.systems.get(Input).unwrap()));
}

#[test]
fn test_chain_loads_dependencies_first_and_stops_in_reverse() {
    // ARRANGE: Script -> Physics -> Input
    let h = Harness::new();
    h.register(Script, &[Physics]);
    h.register(Physics, &[Input]);
    h.register(Input, &[]);

    // ACT
    h.systems.add_module(Script).unwrap();

    // ASSERT
    assert_eq!(h.systems.load_order(), vec![Input, Physics, Script]);

    h.systems.start_all().unwrap();
    assert_eq!(
        h.take_journal(),
        vec!["Input.start", "Physics.start", "Script.start"]
    );

    h.systems.stop_all().unwrap();
    assert_eq!(
        h.take_journal(),
        vec!["Script.stop", "Physics.stop", "Input.stop"]
    );
    assert!(h.systems.is_empty());
    assert!(h.systems.load_order().is_empty());
}

#[test]
fn test_shared_dependency_is_built_once() {
    // ARRANGE: Script -> {Physics, Audio}, both -> Input
    let h = Harness::new();
    h.register(Script, &[Physics, Audio]);
    h.register(Physics, &[Input]);
    h.register(Audio, &[Input]);
    h.register(Input, &[]);

    // ACT
    h.systems.add_module(Script).unwrap();

    // ASSERT
    assert_eq!(h.builds(), 4);
    assert_eq!(h.systems.load_order(), vec![Input, Physics, Audio, Script]);
}

#[test]
fn test_already_live_dependency_is_reused() {
    let h = Harness::new();
    h.register(Physics, &[Input]);
    h.register(Input, &[]);

    h.systems.add_module(Input).unwrap();
    h.systems.start_all().unwrap();
    h.take_journal();

    h.systems.add_module(Physics).unwrap();
    assert_eq!(h.builds(), 2);
    assert_eq!(h.systems.load_order(), vec![Input, Physics]);

    // Only the new module is started by a second start_all.
    h.systems.start_all().unwrap();
    assert_eq!(h.take_journal(), vec!["Physics.start"]);
}

#[test]
fn test_self_dependency_is_circular() {
    let h = Harness::new();
    h.register(Graphics, &[Graphics]);

    let err = h.systems.add_module(Graphics).unwrap_err();

    match err {
        SystemsError::CircularDependency { chain } => assert_eq!(chain, vec![Graphics, Graphics]),
        other => panic!("Expected a circular dependency, got {other:?}"),
    }
    assert!(h.systems.is_empty());
}

#[test]
fn test_indirect_cycle_leaves_live_set_unchanged() {
    // ARRANGE: Script -> Physics -> Audio -> Physics, with Input already live.
    let h = Harness::new();
    h.register(Input, &[]);
    h.register(Script, &[Physics]);
    h.register(Physics, &[Audio]);
    h.register(Audio, &[Physics]);
    h.systems.add_module(Input).unwrap();

    // ACT
    let err = h.systems.add_module(Script).unwrap_err();

    // ASSERT
    match err {
        SystemsError::CircularDependency { chain } => {
            assert_eq!(chain, vec![Physics, Audio, Physics])
        }
        other => panic!("Expected a circular dependency, got {other:?}"),
    }
    assert_eq!(
        h.systems.load_order(),
        vec![Input],
        "Instances built before the cycle was found must be discarded"
    );
    assert!(!h.systems.contains(Script));
    assert!(!h.systems.contains(Physics));
}

#[test]
fn test_missing_dependency_factory_is_lookup_error() {
    let h = Harness::new();
    h.register(Audio, &[Input]);

    let err = h.systems.add_module(Audio).unwrap_err();

    assert!(matches!(err, SystemsError::Lookup { module: Input }));
    assert!(h.systems.is_empty());
}

#[test]
fn test_empty_factory_is_null_result_error() {
    let h = Harness::new();
    h.systems.register_factory(Physics, || None);

    let err = h.systems.add_module(Physics).unwrap_err();

    assert!(matches!(err, SystemsError::NullResult { module: Physics }));
    assert!(h.systems.is_empty());
}

#[test]
fn test_start_all_stops_at_first_failure() {
    // ARRANGE
    let h = Harness::new();
    h.register(Input, &[]);
    h.register_failing(Physics, &[Input], Some(ModulePhase::Start));
    h.register(Script, &[Physics]);
    h.systems.add_module(Script).unwrap();

    // ACT
    let err = h.systems.start_all().unwrap_err();

    // ASSERT
    assert!(matches!(
        err,
        SystemsError::ModuleFailed {
            module: Physics,
            phase: ModulePhase::Start,
            ..
        }
    ));
    assert_eq!(h.take_journal(), vec!["Input.start", "Physics.start"]);
    assert_eq!(h.systems.state(Input), Some(ModuleState::Started));
    assert_eq!(h.systems.state(Physics), Some(ModuleState::Constructed));
    assert_eq!(h.systems.state(Script), Some(ModuleState::Constructed));

    // Teardown only stops what was actually started.
    h.systems.stop_all().unwrap();
    assert_eq!(h.take_journal(), vec!["Input.stop"]);
}

#[test]
fn test_stop_all_drains_despite_failures() {
    // ARRANGE
    let h = Harness::new();
    h.register(Input, &[]);
    h.register_failing(Physics, &[Input], Some(ModulePhase::Stop));
    h.register_failing(Script, &[Physics], Some(ModulePhase::Stop));
    h.systems.add_module(Script).unwrap();
    h.systems.start_all().unwrap();
    h.take_journal();

    // ACT
    let err = h.systems.stop_all().unwrap_err();

    // ASSERT
    assert!(
        matches!(err, SystemsError::ModuleFailed { module: Script, phase: ModulePhase::Stop, .. }),
        "The first failure is reported"
    );
    assert_eq!(
        h.take_journal(),
        vec!["Script.stop", "Physics.stop", "Input.stop"]
    );
    assert!(h.systems.is_empty());
}

#[test]
fn test_tick_runs_three_full_passes_in_load_order() {
    let h = Harness::new();
    h.register(Physics, &[Input]);
    h.register(Input, &[]);
    h.systems.add_module(Physics).unwrap();
    h.systems.start_all().unwrap();
    h.take_journal();

    h.systems.tick_all().unwrap();

    assert_eq!(
        h.take_journal(),
        vec![
            "Input.pre_tick",
            "Physics.pre_tick",
            "Input.tick",
            "Physics.tick",
            "Input.post_tick",
            "Physics.post_tick",
        ]
    );
}

#[test]
fn test_modules_are_never_ticked_before_start() {
    let h = Harness::new();
    h.register(Input, &[]);
    h.register(Audio, &[]);
    h.systems.add_module(Input).unwrap();
    h.systems.start_all().unwrap();
    h.systems.add_module(Audio).unwrap();
    h.take_journal();

    h.systems.tick_all().unwrap();

    let journal = h.take_journal();
    assert_eq!(journal.len(), 3);
    assert!(journal.iter().all(|entry| entry.starts_with("Input.")));
}

#[test]
fn test_tick_failure_aborts_remaining_phases() {
    let h = Harness::new();
    h.register(Input, &[]);
    h.register_failing(Audio, &[Input], Some(ModulePhase::Tick));
    h.register(Script, &[Audio]);
    h.systems.add_module(Script).unwrap();
    h.systems.start_all().unwrap();
    h.take_journal();

    let err = h.systems.tick_all().unwrap_err();

    assert!(matches!(
        err,
        SystemsError::ModuleFailed {
            module: Audio,
            phase: ModulePhase::Tick,
            ..
        }
    ));
    assert_eq!(
        h.take_journal(),
        vec![
            "Input.pre_tick",
            "Audio.pre_tick",
            "Script.pre_tick",
            "Input.tick",
            "Audio.tick",
        ]
    );
    assert_eq!(
        h.systems.state(Audio),
        Some(ModuleState::Started),
        "A failing tick does not change lifecycle state"
    );
}
