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

//! Non-fatal error types reported by the scheduler and the runtime lifecycle.
//!
//! Programming errors (driving a phase before initialization, looking up a
//! service after teardown) are not represented here: they panic.

use crate::lifecycle::LifecycleState;
use crate::phase::CallbackPhase;
use thiserror::Error;

/// A specialized `Result` for scheduler operations.
pub type SchedulerResult<T> = Result<T, SchedulerError>;

/// A specialized `Result` for runtime lifecycle operations.
pub type LifecycleResult<T> = Result<T, LifecycleError>;

/// Configuration errors surfaced by the [`CallbackScheduler`](crate::CallbackScheduler).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchedulerError {
    /// The operation is already registered under this phase.
    #[error("callback '{name}' is already registered for phase {phase}")]
    DuplicateCallback {
        /// The phase the registration targeted.
        phase: CallbackPhase,
        /// Diagnostic name of the rejected registration.
        name: String,
    },
}

/// Errors surfaced while initializing a [`Runtime`](crate::Runtime).
#[derive(Debug, Error)]
pub enum LifecycleError {
    /// `initialize` was called on a runtime that already left `Uninitialized`.
    #[error("runtime already initialized (state {state:?})")]
    AlreadyInitialized {
        /// The state the runtime was in when the call was rejected.
        state: LifecycleState,
    },
    /// Another runtime is authoritative on this thread.
    #[error("another runtime is already authoritative on this thread")]
    AuthorityHeld,
    /// Two services of the same kind were registered.
    #[error("service {0} is registered more than once")]
    DuplicateService(&'static str),
    /// A service factory failed.
    #[error("failed to construct service {service}")]
    Construction {
        /// The service whose factory failed.
        service: &'static str,
        /// The factory's error.
        #[source]
        source: Box<dyn std::error::Error + Send + Sync + 'static>,
    },
}
