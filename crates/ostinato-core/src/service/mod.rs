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

//! Long-lived subsystems owned by the runtime.

mod manifest;
mod registry;

pub use manifest::{ConstructionScope, ServiceManifest};
pub use registry::ServiceRegistry;

use crate::runtime::Runtime;
use std::any::Any;
use std::rc::Rc;

/// A subsystem owned by a [`Runtime`].
///
/// A service is identified by its concrete type: one instance per type. It is
/// constructed by its [`ServiceManifest`] factory, then receives exactly one
/// [`setup`](Service::setup) once every service exists and exactly one
/// [`dispose`](Service::dispose) at teardown. Both run in registration order.
///
/// Services hand out `Rc<Self>` clones via `setup`'s receiver, which is how a
/// service captures itself (usually as a `Weak`) inside its callbacks.
pub trait Service: Any {
    /// Diagnostic name. Defaults to the type name.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// One-time initialization after every service has been constructed.
    ///
    /// This is where a service resolves its dependencies with
    /// [`Runtime::lookup`] and registers its callbacks. An error is logged and
    /// does not stop the remaining services from being set up.
    fn setup(self: Rc<Self>, runtime: &Runtime) -> anyhow::Result<()> {
        let _ = runtime;
        Ok(())
    }

    /// One-time teardown.
    ///
    /// The runtime is already destroyed when this runs, so lookups panic;
    /// unregistering callbacks is still allowed.
    fn dispose(&self, runtime: &Runtime) -> anyhow::Result<()> {
        let _ = runtime;
        Ok(())
    }
}
