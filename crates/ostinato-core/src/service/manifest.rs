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

//! The fixed, code-level list of services a runtime constructs.

use super::{Service, ServiceRegistry};
use crate::error::{LifecycleError, LifecycleResult};
use std::rc::Rc;

type BuildFn = Box<dyn FnOnce(&mut ServiceRegistry) -> LifecycleResult<()>>;

struct ManifestEntry {
    name: &'static str,
    build: BuildFn,
}

/// Read access to the services constructed so far.
///
/// Passed to every factory: a service may rely on the ones listed before it
/// in the manifest already existing, but none of them has been set up yet.
pub struct ConstructionScope<'a> {
    registry: &'a ServiceRegistry,
}

impl ConstructionScope<'_> {
    /// Returns a previously constructed service of type `T`.
    pub fn get<T: Service>(&self) -> Option<Rc<T>> {
        self.registry.resolve::<T>()
    }
}

/// An ordered list of service factories.
///
/// # Example
///
/// ```rust
/// use ostinato_core::{Service, ServiceManifest};
///
/// #[derive(Default)]
/// struct Audio;
/// impl Service for Audio {}
///
/// struct Mixer { channels: usize }
/// impl Service for Mixer {}
///
/// let manifest = ServiceManifest::new()
///     .with_default::<Audio>()
///     .with(|scope| {
///         assert!(scope.get::<Audio>().is_some());
///         Ok(Mixer { channels: 8 })
///     });
/// assert_eq!(manifest.len(), 2);
/// ```
#[derive(Default)]
pub struct ServiceManifest {
    entries: Vec<ManifestEntry>,
}

impl ServiceManifest {
    /// Creates an empty manifest.
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a service built by `factory`.
    pub fn with<S, F>(mut self, factory: F) -> Self
    where
        S: Service,
        F: FnOnce(&ConstructionScope<'_>) -> anyhow::Result<S> + 'static,
    {
        let name = std::any::type_name::<S>();
        self.entries.push(ManifestEntry {
            name,
            build: Box::new(move |registry: &mut ServiceRegistry| {
                let service = factory(&ConstructionScope { registry: &*registry }).map_err(|e| {
                    LifecycleError::Construction {
                        service: name,
                        source: e.into(),
                    }
                })?;
                registry.insert(service).map(drop)
            }),
        });
        self
    }

    /// Appends a service built with [`Default`].
    pub fn with_default<S: Service + Default>(self) -> Self {
        self.with(|_| Ok(S::default()))
    }

    /// Number of services in the manifest.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the manifest lists no services.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Runs every factory in order, stopping at the first failure.
    pub(crate) fn construct_into(self, registry: &mut ServiceRegistry) -> LifecycleResult<()> {
        for entry in self.entries {
            log::debug!("ServiceManifest: constructing {}", entry.name);
            (entry.build)(registry)?;
        }
        Ok(())
    }
}
