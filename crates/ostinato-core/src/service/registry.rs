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

//! An insertion-ordered, type-keyed store of services.
//!
//! The [`ServiceRegistry`] keeps two views of the same services: the order
//! they were registered in (which drives setup and dispose) and a map from
//! [`TypeId`] to slot (which drives lookup). Every service appears exactly
//! once in both.

use super::Service;
use crate::error::{LifecycleError, LifecycleResult};
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::rc::Rc;

struct ServiceSlot {
    name: &'static str,
    service: Rc<dyn Service>,
    any: Rc<dyn Any>,
}

/// The service store of a [`Runtime`](crate::Runtime).
///
/// Lifecycle checks live on the runtime; the registry itself only guarantees
/// uniqueness and ordering.
#[derive(Default)]
pub struct ServiceRegistry {
    slots: Vec<ServiceSlot>,
    kinds: HashMap<TypeId, usize>,
}

impl ServiceRegistry {
    /// Creates an empty service registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            kinds: HashMap::new(),
        }
    }

    /// Adds a service keyed by `S`'s [`TypeId`].
    ///
    /// A second service of the same type is rejected; the first one is kept.
    pub(crate) fn insert<S: Service>(&mut self, service: S) -> LifecycleResult<Rc<S>> {
        let kind = TypeId::of::<S>();
        if self.kinds.contains_key(&kind) {
            return Err(LifecycleError::DuplicateService(std::any::type_name::<S>()));
        }

        let service = Rc::new(service);
        let name = service.name();
        self.kinds.insert(kind, self.slots.len());
        self.slots.push(ServiceSlot {
            name,
            service: Rc::clone(&service) as Rc<dyn Service>,
            any: Rc::clone(&service) as Rc<dyn Any>,
        });
        log::debug!("ServiceRegistry: registered {name}");
        Ok(service)
    }

    /// Retrieves the service of type `T` without any lifecycle check.
    pub(crate) fn resolve<T: Service>(&self) -> Option<Rc<T>> {
        let slot = &self.slots[*self.kinds.get(&TypeId::of::<T>())?];
        Rc::clone(&slot.any).downcast::<T>().ok()
    }

    /// Snapshot of every service in registration order.
    pub(crate) fn ordered(&self) -> Vec<(&'static str, Rc<dyn Service>)> {
        self.slots
            .iter()
            .map(|slot| (slot.name, Rc::clone(&slot.service)))
            .collect()
    }

    pub(crate) fn clear(&mut self) {
        self.kinds.clear();
        self.slots.clear();
    }

    /// Returns `true` if a service of type `T` is registered.
    #[must_use]
    pub fn contains<T: Service>(&self) -> bool {
        self.kinds.contains_key(&TypeId::of::<T>())
    }

    /// Names of the registered services, in registration order.
    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.slots.iter().map(|slot| slot.name)
    }

    /// Returns the number of registered services.
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Returns `true` if no services are registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct FakeDevice {
        name: String,
    }
    impl Service for FakeDevice {}

    struct FakeRenderer;
    impl Service for FakeRenderer {
        fn name(&self) -> &'static str {
            "renderer"
        }
    }

    #[test]
    fn test_insert_and_resolve() {
        let mut registry = ServiceRegistry::new();
        registry
            .insert(FakeDevice {
                name: "GPU-0".to_string(),
            })
            .unwrap();

        let retrieved = registry.resolve::<FakeDevice>().unwrap();
        assert_eq!(retrieved.name, "GPU-0");
    }

    #[test]
    fn test_resolve_missing_returns_none() {
        let registry = ServiceRegistry::new();
        assert!(registry.resolve::<FakeDevice>().is_none());
    }

    #[test]
    fn test_order_is_registration_order() {
        let mut registry = ServiceRegistry::new();
        registry.insert(FakeRenderer).unwrap();
        registry
            .insert(FakeDevice {
                name: "GPU".to_string(),
            })
            .unwrap();

        assert_eq!(registry.len(), 2);
        assert!(registry.contains::<FakeDevice>());
        assert!(registry.contains::<FakeRenderer>());

        let names: Vec<_> = registry.names().collect();
        assert_eq!(names[0], "renderer");
        assert!(names[1].ends_with("FakeDevice"));
    }

    #[test]
    fn test_duplicate_kind_is_rejected() {
        let mut registry = ServiceRegistry::new();
        registry
            .insert(FakeDevice {
                name: "old".to_string(),
            })
            .unwrap();
        let err = registry
            .insert(FakeDevice {
                name: "new".to_string(),
            })
            .unwrap_err();
        assert!(matches!(err, LifecycleError::DuplicateService(_)));

        let retrieved = registry.resolve::<FakeDevice>().unwrap();
        assert_eq!(retrieved.name, "old");
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_default_is_empty() {
        let registry = ServiceRegistry::default();
        assert!(registry.is_empty());
    }
}
