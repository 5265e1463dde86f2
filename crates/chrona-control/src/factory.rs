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

//! Factory registry mapping each module type to its constructor.

use chrona_core::{Module, ModuleType, SystemsError, SystemsResult};
use std::collections::HashMap;
use std::sync::Arc;

/// A zero-argument module constructor.
///
/// Returning `None` means the factory could not produce a usable instance.
/// Shared so a caller can invoke it without holding on to the registry.
pub type ModuleFactory = Arc<dyn Fn() -> Option<Arc<dyn Module>> + Send + Sync>;

/// Registry of module constructors, one per [`ModuleType`].
pub struct FactoryRegistry {
    factories: HashMap<ModuleType, ModuleFactory>,
}

impl FactoryRegistry {
    /// Creates a new empty registry.
    pub fn new() -> Self {
        Self {
            factories: HashMap::new(),
        }
    }

    /// Associates `factory` with `module`.
    ///
    /// A later registration for the same type overwrites the earlier one.
    /// Returns `true` if an existing factory was replaced.
    pub fn register<F>(&mut self, module: ModuleType, factory: F) -> bool
    where
        F: Fn() -> Option<Arc<dyn Module>> + Send + Sync + 'static,
    {
        let replaced = self.factories.insert(module, Arc::new(factory)).is_some();
        if replaced {
            log::warn!("FactoryRegistry: Replaced factory for {}", module);
        } else {
            log::debug!("FactoryRegistry: Registered factory for {}", module);
        }
        replaced
    }

    /// Removes the factory for `module`. Returns `true` if one was registered.
    pub fn unregister(&mut self, module: ModuleType) -> bool {
        self.factories.remove(&module).is_some()
    }

    /// Returns the factory registered for `module`.
    pub fn get(&self, module: ModuleType) -> SystemsResult<ModuleFactory> {
        self.factories
            .get(&module)
            .cloned()
            .ok_or(SystemsError::Lookup { module })
    }

    /// Builds a new instance of `module`.
    pub fn create(&self, module: ModuleType) -> SystemsResult<Arc<dyn Module>> {
        invoke(module, &self.get(module)?)
    }

    /// Returns true if a factory is registered for `module`.
    pub fn contains(&self, module: ModuleType) -> bool {
        self.factories.contains_key(&module)
    }

    /// Returns the number of registered factories.
    pub fn len(&self) -> usize {
        self.factories.len()
    }

    /// Returns true if no factory is registered.
    pub fn is_empty(&self) -> bool {
        self.factories.is_empty()
    }

    /// The registered module types, sorted.
    pub fn registered(&self) -> Vec<ModuleType> {
        let mut keys: Vec<_> = self.factories.keys().copied().collect();
        keys.sort();
        keys
    }
}

/// Runs `factory`, turning an empty result into [`SystemsError::NullResult`].
pub(crate) fn invoke(module: ModuleType, factory: &ModuleFactory) -> SystemsResult<Arc<dyn Module>> {
    factory().ok_or(SystemsError::NullResult { module })
}

impl Default for FactoryRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::any::Any;

    struct Marker(u32);

    impl Module for Marker {
        fn as_any(&self) -> &dyn Any {
            self
        }
    }

    fn marker(value: u32) -> impl Fn() -> Option<Arc<dyn Module>> + Send + Sync {
        move || Some(Arc::new(Marker(value)) as Arc<dyn Module>)
    }

    #[test]
    fn test_create_unregistered_is_lookup_error() {
        let registry = FactoryRegistry::new();
        let err = registry.create(ModuleType::Audio).err().unwrap();
        assert!(matches!(
            err,
            SystemsError::Lookup {
                module: ModuleType::Audio
            }
        ));
    }

    #[test]
    fn test_create_null_factory_is_null_result_error() {
        let mut registry = FactoryRegistry::new();
        registry.register(ModuleType::Input, || None);
        let err = registry.create(ModuleType::Input).err().unwrap();
        assert!(matches!(
            err,
            SystemsError::NullResult {
                module: ModuleType::Input
            }
        ));
    }

    #[test]
    fn test_later_registration_overwrites() {
        let mut registry = FactoryRegistry::new();
        assert!(!registry.register(ModuleType::Game, marker(1)));
        assert!(
            registry.register(ModuleType::Game, marker(2)),
            "Second registration should report a replacement"
        );
        assert_eq!(registry.len(), 1);

        let module = registry.create(ModuleType::Game).unwrap();
        let marker = module.as_any().downcast_ref::<Marker>().unwrap();
        assert_eq!(marker.0, 2);
    }

    #[test]
    fn test_each_create_builds_a_fresh_instance() {
        let mut registry = FactoryRegistry::new();
        registry.register(ModuleType::Physics, marker(7));
        let a = registry.create(ModuleType::Physics).unwrap();
        let b = registry.create(ModuleType::Physics).unwrap();
        assert!(!Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_registered_is_sorted_and_unregister_removes() {
        let mut registry = FactoryRegistry::new();
        registry.register(ModuleType::Script, marker(0));
        registry.register(ModuleType::Scheduler, marker(0));
        registry.register(ModuleType::Audio, marker(0));
        assert_eq!(
            registry.registered(),
            vec![ModuleType::Scheduler, ModuleType::Audio, ModuleType::Script]
        );

        assert!(registry.unregister(ModuleType::Audio));
        assert!(!registry.unregister(ModuleType::Audio));
        assert!(!registry.contains(ModuleType::Audio));
        assert_eq!(registry.len(), 2);
    }
}
