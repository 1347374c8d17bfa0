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

//! Lifecycle state shared by the service registry and the scheduler.

use std::cell::Cell;

/// The lifecycle of a [`Runtime`](crate::Runtime).
///
/// `Uninitialized → Constructing → SettingUp → Active → Destroyed`.
/// `Destroyed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LifecycleState {
    /// Created but `initialize` has not run yet.
    #[default]
    Uninitialized,
    /// Services are being constructed in manifest order.
    Constructing,
    /// Every service exists; `setup` is running in registration order.
    SettingUp,
    /// Setup finished. Phases may be driven.
    Active,
    /// Teardown started or initialization was rejected.
    Destroyed,
}

impl LifecycleState {
    /// Returns `true` when callbacks may be registered with the scheduler.
    pub const fn accepts_registration(self) -> bool {
        matches!(
            self,
            LifecycleState::Constructing | LifecycleState::SettingUp | LifecycleState::Active
        )
    }

    /// Returns `true` when service lookups are permitted.
    pub const fn accepts_lookup(self) -> bool {
        matches!(self, LifecycleState::SettingUp | LifecycleState::Active)
    }

    const fn can_advance_to(self, next: LifecycleState) -> bool {
        use LifecycleState::*;
        matches!(
            (self, next),
            (Uninitialized, Constructing)
                | (Constructing, SettingUp)
                | (SettingUp, Active)
                | (Uninitialized | Constructing | SettingUp | Active, Destroyed)
        )
    }
}

/// The single state cell consulted by both the registry and the scheduler.
#[derive(Debug, Default)]
pub(crate) struct Lifecycle {
    state: Cell<LifecycleState>,
}

impl Lifecycle {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn state(&self) -> LifecycleState {
        self.state.get()
    }

    pub(crate) fn is_destroyed(&self) -> bool {
        self.state.get() == LifecycleState::Destroyed
    }

    /// Moves to `next`. Illegal transitions are programming errors.
    pub(crate) fn advance(&self, next: LifecycleState) {
        let current = self.state.get();
        assert!(
            current.can_advance_to(next),
            "illegal lifecycle transition {current:?} -> {next:?}"
        );
        log::trace!("Lifecycle: {current:?} -> {next:?}");
        self.state.set(next);
    }
}

thread_local! {
    static AUTHORITY: Cell<Option<u64>> = const { Cell::new(None) };
}

/// Per-thread slot naming the one runtime allowed to be active.
///
/// The core is single-threaded, so "process-wide" for a host means "on the
/// host thread".
pub(crate) struct Authority;

impl Authority {
    /// Claims the slot for `id`. Returns `false` if another runtime holds it.
    pub(crate) fn claim(id: u64) -> bool {
        AUTHORITY.with(|slot| match slot.get() {
            Some(holder) => holder == id,
            None => {
                slot.set(Some(id));
                true
            }
        })
    }

    pub(crate) fn is_held_by(id: u64) -> bool {
        AUTHORITY.with(|slot| slot.get() == Some(id))
    }

    pub(crate) fn release(id: u64) {
        AUTHORITY.with(|slot| {
            if slot.get() == Some(id) {
                slot.set(None);
            }
        });
    }
}
