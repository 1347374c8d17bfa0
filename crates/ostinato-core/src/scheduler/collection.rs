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

//! Per-phase storage: invocation order plus an identity index.

use crate::callback::{CallbackEntry, CallbackKey, CallbackOp};
use std::borrow::Cow;
use std::collections::HashMap;
use std::rc::Rc;

/// The callbacks registered under one phase.
///
/// `entries` may still hold entries flagged for removal; `index` only ever
/// holds live ones.
#[derive(Default)]
pub(crate) struct PhaseCollection {
    pub(crate) entries: Vec<Rc<CallbackEntry>>,
    index: HashMap<CallbackKey, Rc<CallbackEntry>>,
    pub(crate) running: bool,
}

impl PhaseCollection {
    pub(crate) fn contains(&self, key: CallbackKey) -> bool {
        self.index.contains_key(&key)
    }

    /// Appends a new live entry. The caller has already checked for duplicates.
    pub(crate) fn insert(&mut self, op: CallbackOp, name: Cow<'static, str>) {
        let entry = Rc::new(CallbackEntry::new(op, name));
        self.index.insert(entry.key(), Rc::clone(&entry));
        self.entries.push(entry);
    }

    /// Revokes the identity of `key` and flags its entry for purging.
    pub(crate) fn remove(&mut self, key: CallbackKey) -> Option<Rc<CallbackEntry>> {
        let entry = self.index.remove(&key)?;
        entry.mark_pending_removal();
        Some(entry)
    }

    /// Retires exactly `entry`, leaving a newer registration of the same op alone.
    pub(crate) fn retire(&mut self, entry: &Rc<CallbackEntry>) {
        entry.mark_pending_removal();
        if let Some(current) = self.index.get(&entry.key()) {
            if Rc::ptr_eq(current, entry) {
                self.index.remove(&entry.key());
            }
        }
    }

    /// Number of live registrations.
    pub(crate) fn live_len(&self) -> usize {
        self.index.len()
    }

    /// Diagnostic names of the live entries, in current invocation order.
    pub(crate) fn names(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|entry| !entry.is_pending_removal())
            .map(|entry| entry.name().to_owned())
            .collect()
    }

    /// Empties the collection and hands the entries back, so the caller can
    /// drop them once the phase is no longer borrowed. The `running` flag
    /// survives so an in-flight pass still completes its bookkeeping.
    #[must_use]
    pub(crate) fn take_all(&mut self) -> Vec<Rc<CallbackEntry>> {
        self.index.clear();
        let entries = std::mem::take(&mut self.entries);
        for entry in &entries {
            entry.mark_pending_removal();
        }
        entries
    }
}
