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

//! The closed set of scheduling phases.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A scheduling moment within one external tick.
///
/// The set is fixed at compile time. Each variant doubles as an index into the
/// scheduler's phase table, so lookups never hash or allocate.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize, Deserialize,
)]
pub enum CallbackPhase {
    /// Runs before the physics step.
    #[default]
    PrePhysics,
    /// Runs after the physics step.
    PostPhysics,
    /// Runs once every other update of the tick has completed.
    Late,
    /// Debug overlay drawing and diagnostics.
    DebugOverlay,
}

impl CallbackPhase {
    /// Number of phases in the table.
    pub const COUNT: usize = 4;

    /// Every phase, in declaration order.
    pub const ALL: [CallbackPhase; Self::COUNT] = [
        CallbackPhase::PrePhysics,
        CallbackPhase::PostPhysics,
        CallbackPhase::Late,
        CallbackPhase::DebugOverlay,
    ];

    /// Position of this phase in the phase table.
    #[inline]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Human-readable name used in diagnostics.
    pub const fn name(self) -> &'static str {
        match self {
            CallbackPhase::PrePhysics => "PrePhysics",
            CallbackPhase::PostPhysics => "PostPhysics",
            CallbackPhase::Late => "Late",
            CallbackPhase::DebugOverlay => "DebugOverlay",
        }
    }
}

impl fmt::Display for CallbackPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
