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

//! The runtime context: services, scheduler, and the lifecycle binding them.

use crate::error::{LifecycleError, LifecycleResult};
use crate::lifecycle::{Authority, Lifecycle, LifecycleState};
use crate::phase::CallbackPhase;
use crate::scheduler::{CallbackScheduler, PassReport};
use crate::service::{Service, ServiceManifest, ServiceRegistry};
use crate::task::{self, TaskHandle};
use crate::SchedulerResult;
use std::borrow::Cow;
use std::cell::Cell;
use std::future::Future;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_RUNTIME_ID: AtomicU64 = AtomicU64::new(1);

/// A shared flag services raise to ask the host to stop driving ticks.
#[derive(Debug, Clone, Default)]
pub struct ExitSignal(Rc<Cell<bool>>);

impl ExitSignal {
    /// Raises the flag.
    pub fn request(&self) {
        self.0.set(true);
    }

    /// Returns `true` once an exit was requested.
    pub fn is_requested(&self) -> bool {
        self.0.get()
    }
}

/// The explicitly constructed context a host holds for the lifetime of the
/// application.
///
/// It owns every service, the callback scheduler, and the lifecycle state the
/// two share. Only one runtime per host thread can be active at a time.
pub struct Runtime {
    id: u64,
    lifecycle: Rc<Lifecycle>,
    scheduler: Rc<CallbackScheduler>,
    registry: ServiceRegistry,
    manifest: Option<ServiceManifest>,
    exit: ExitSignal,
}

impl Runtime {
    /// Creates an uninitialized runtime that will construct `manifest`.
    pub fn new(manifest: ServiceManifest) -> Self {
        let lifecycle = Rc::new(Lifecycle::new());
        Self {
            id: NEXT_RUNTIME_ID.fetch_add(1, Ordering::Relaxed),
            scheduler: Rc::new(CallbackScheduler::new(Rc::clone(&lifecycle))),
            lifecycle,
            registry: ServiceRegistry::new(),
            manifest: Some(manifest),
            exit: ExitSignal::default(),
        }
    }

    /// Constructs every service in manifest order, then sets each one up in
    /// the same order.
    ///
    /// Fails without side effects if this runtime was already initialized.
    /// If another runtime is active on this thread, this one is rejected and
    /// destroyed immediately. If a factory fails, the runtime is destroyed and
    /// no service is set up or disposed.
    pub fn initialize(&mut self) -> LifecycleResult<()> {
        let state = self.lifecycle.state();
        if state != LifecycleState::Uninitialized {
            log::error!("Runtime: initialize called twice (state {state:?}). Ignoring.");
            return Err(LifecycleError::AlreadyInitialized { state });
        }

        if !Authority::claim(self.id) {
            log::error!("Runtime: another runtime is already active. Destroying this one.");
            self.lifecycle.advance(LifecycleState::Destroyed);
            self.manifest = None;
            return Err(LifecycleError::AuthorityHeld);
        }

        self.lifecycle.advance(LifecycleState::Constructing);
        let manifest = self.manifest.take().unwrap_or_default();
        log::info!("Runtime: constructing {} services...", manifest.len());
        if let Err(e) = manifest.construct_into(&mut self.registry) {
            log::error!("Runtime: service construction failed: {e}");
            self.lifecycle.advance(LifecycleState::Destroyed);
            self.registry.clear();
            Authority::release(self.id);
            return Err(e);
        }

        self.lifecycle.advance(LifecycleState::SettingUp);
        for (name, service) in self.registry.ordered() {
            log::debug!("Runtime: setting up {name}");
            if let Err(e) = service.setup(self) {
                log::error!("Runtime: setup of {name} failed: {e:#}");
            }
        }

        self.lifecycle.advance(LifecycleState::Active);
        log::info!("Runtime: {} services active.", self.registry.len());
        Ok(())
    }

    /// Tears the runtime down.
    ///
    /// Marks the runtime destroyed first, so lookups fail from here on, then
    /// disposes every service once, in registration order, and drops every
    /// scheduled callback. A runtime that is not the active one does nothing.
    pub fn teardown(&mut self) {
        if !Authority::is_held_by(self.id) {
            return;
        }
        if self.lifecycle.is_destroyed() {
            // An earlier teardown unwound out of a `dispose`. Disposal is
            // never retried.
            log::warn!("Runtime: resuming an interrupted teardown.");
            self.scheduler.clear();
            self.registry.clear();
            Authority::release(self.id);
            return;
        }

        log::info!("Runtime: tearing down {} services...", self.registry.len());
        self.lifecycle.advance(LifecycleState::Destroyed);

        for (name, service) in self.registry.ordered() {
            log::debug!("Runtime: disposing {name}");
            if let Err(e) = service.dispose(self) {
                log::error!("Runtime: dispose of {name} failed: {e:#}");
            }
        }

        self.scheduler.clear();
        self.registry.clear();
        Authority::release(self.id);
        log::info!("Runtime: teardown complete.");
    }

    /// Current lifecycle state.
    pub fn state(&self) -> LifecycleState {
        self.lifecycle.state()
    }

    /// Returns `true` once teardown started or initialization was rejected.
    pub fn is_destroyed(&self) -> bool {
        self.lifecycle.is_destroyed()
    }

    /// Returns the service of type `T`.
    ///
    /// Logs an error and returns `None` when no such service was registered.
    ///
    /// # Panics
    ///
    /// Panics when the runtime is destroyed or has not reached setup yet.
    pub fn lookup<T: Service>(&self) -> Option<Rc<T>> {
        let state = self.lifecycle.state();
        assert!(
            state != LifecycleState::Destroyed,
            "lookup of {} after the runtime was destroyed",
            std::any::type_name::<T>()
        );
        assert!(
            state.accepts_lookup(),
            "lookup of {} before the runtime was initialized (state {state:?})",
            std::any::type_name::<T>()
        );

        let service = self.registry.resolve::<T>();
        if service.is_none() {
            log::error!("Service {} is not registered", std::any::type_name::<T>());
        }
        service
    }

    /// The registered services.
    pub fn registry(&self) -> &ServiceRegistry {
        &self.registry
    }

    /// The callback scheduler. Clone the `Rc` to keep it inside callbacks.
    pub fn scheduler(&self) -> &Rc<CallbackScheduler> {
        &self.scheduler
    }

    /// Runs one pass of `phase`. See [`CallbackScheduler::run_pass`].
    pub fn run_pass(&self, phase: CallbackPhase) -> PassReport {
        self.scheduler.run_pass(phase)
    }

    /// Drives `steps` one item per tick of `phase` until it is exhausted.
    pub fn spawn_steps<I>(
        &self,
        phase: CallbackPhase,
        name: impl Into<Cow<'static, str>>,
        steps: I,
    ) -> SchedulerResult<TaskHandle>
    where
        I: IntoIterator + 'static,
    {
        task::spawn_steps(&self.scheduler, phase, name.into(), steps)
    }

    /// Polls `future` once per tick of `phase` until it completes.
    pub fn spawn_future<F>(
        &self,
        phase: CallbackPhase,
        name: impl Into<Cow<'static, str>>,
        future: F,
    ) -> SchedulerResult<TaskHandle>
    where
        F: Future<Output = ()> + 'static,
    {
        task::spawn_future(&self.scheduler, phase, name.into(), future)
    }

    /// A handle to this runtime's exit flag.
    pub fn exit_signal(&self) -> ExitSignal {
        self.exit.clone()
    }

    /// Asks the host to stop driving ticks.
    pub fn request_exit(&self) {
        log::info!("Runtime: exit requested.");
        self.exit.request();
    }

    /// Returns `true` once a service asked the host to stop.
    pub fn exit_requested(&self) -> bool {
        self.exit.is_requested()
    }
}

impl Drop for Runtime {
    fn drop(&mut self) {
        self.teardown();
    }
}
