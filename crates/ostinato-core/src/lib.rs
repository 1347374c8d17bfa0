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

//! # Ostinato Core
//!
//! The runtime backbone of a host application: a [`Runtime`] context that owns
//! a fixed set of long-lived [`Service`]s, and a [`CallbackScheduler`] those
//! services hook into to receive one call per externally driven tick of a
//! [`CallbackPhase`].
//!
//! The host owns pacing entirely. It calls [`Runtime::initialize`] once, then
//! [`Runtime::run_pass`] once per phase per external tick, and finally
//! [`Runtime::teardown`] (or simply drops the runtime).
//!
//! Everything here is single-threaded by construction: the core types are
//! `!Send`, so all operations are funnelled through the thread that owns the
//! runtime.

#![warn(missing_docs)]

pub mod callback;
pub mod error;
pub mod lifecycle;
pub mod phase;
pub mod runtime;
pub mod scheduler;
pub mod service;
pub mod task;

pub use callback::{CallbackKey, CallbackOp, CallbackResult};
pub use error::{LifecycleError, LifecycleResult, SchedulerError, SchedulerResult};
pub use lifecycle::LifecycleState;
pub use phase::CallbackPhase;
pub use runtime::{ExitSignal, Runtime};
pub use scheduler::{CallbackScheduler, PassReport};
pub use service::{ConstructionScope, Service, ServiceManifest, ServiceRegistry};
pub use task::{yield_tick, TaskHandle};
