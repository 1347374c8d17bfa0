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

//! The phase-based callback scheduler.
//!
//! Each [`CallbackPhase`] owns an ordered list of callbacks. The host calls
//! [`CallbackScheduler::run_pass`] once per external tick of a phase, and every
//! live callback of that phase runs exactly once. Callbacks stay registered
//! until they return `false`, fault, or are unregistered.
//!
//! Removal is O(1): entries are only flagged when removed, and the next
//! traversal swaps flagged entries into a tail region that is dropped in one
//! go once the pass finishes. The price is that invocation order within a
//! phase is not stable across removals.

mod collection;

use crate::callback::{CallbackEntry, CallbackOp};
use crate::error::{SchedulerError, SchedulerResult};
use crate::lifecycle::Lifecycle;
use crate::phase::CallbackPhase;
use collection::PhaseCollection;
use std::any::Any;
use std::borrow::Cow;
use std::cell::RefCell;
use std::panic::{self, AssertUnwindSafe};
use std::rc::Rc;

/// Counters describing one [`run_pass`](CallbackScheduler::run_pass).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PassReport {
    /// The phase that was driven.
    pub phase: CallbackPhase,
    /// Callbacks invoked during the pass.
    pub invoked: usize,
    /// Callbacks that returned `false` and were retired.
    pub stopped: usize,
    /// Callbacks that panicked or returned an error and were retired.
    pub faulted: usize,
    /// Entries physically removed from the phase.
    pub purged: usize,
}

enum Outcome {
    Continue,
    Stop,
    Fault,
}

/// Owns the phase table and drives passes over it.
///
/// All methods take `&self` so callbacks may register, unregister (including
/// themselves) and inspect the scheduler while a pass is in flight.
pub struct CallbackScheduler {
    lifecycle: Rc<Lifecycle>,
    phases: [RefCell<PhaseCollection>; CallbackPhase::COUNT],
}

impl CallbackScheduler {
    pub(crate) fn new(lifecycle: Rc<Lifecycle>) -> Self {
        Self {
            lifecycle,
            phases: std::array::from_fn(|_| RefCell::new(PhaseCollection::default())),
        }
    }

    fn slot(&self, phase: CallbackPhase) -> &RefCell<PhaseCollection> {
        &self.phases[phase.index()]
    }

    /// Registers `op` under `phase`. It runs starting with the next pass.
    ///
    /// A duplicate registration is logged, leaves the phase untouched and is
    /// returned as [`SchedulerError::DuplicateCallback`].
    ///
    /// # Panics
    ///
    /// Panics if the runtime has not started initializing or is destroyed.
    pub fn register(
        &self,
        phase: CallbackPhase,
        op: &CallbackOp,
        name: impl Into<Cow<'static, str>>,
    ) -> SchedulerResult<()> {
        let mut name = name.into();
        if name.is_empty() {
            name = Cow::Borrowed("anonymous");
        }

        let state = self.lifecycle.state();
        assert!(
            state.accepts_registration(),
            "cannot register callback '{name}' for {phase}: runtime is {state:?}"
        );

        let mut collection = self.slot(phase).borrow_mut();
        if collection.contains(op.key()) {
            log::error!("Callback '{name}' is already registered for phase {phase}. Ignoring.");
            return Err(SchedulerError::DuplicateCallback {
                phase,
                name: name.into_owned(),
            });
        }

        log::debug!("Scheduler: registered '{name}' for {phase}");
        collection.insert(op.clone(), name);
        Ok(())
    }

    /// Unregisters `op` from `phase`.
    ///
    /// The op stops being registered immediately; its slot is purged during the
    /// current or next pass. Returns `false` (and does nothing) if the op was
    /// not registered. Valid at any point, including from inside the op itself
    /// and during teardown.
    pub fn unregister(&self, phase: CallbackPhase, op: &CallbackOp) -> bool {
        let removed = self.slot(phase).borrow_mut().remove(op.key());
        match removed {
            Some(entry) => {
                log::debug!("Scheduler: unregistered '{}' from {phase}", entry.name());
                true
            }
            None => false,
        }
    }

    /// Returns `true` if `op` is currently registered under `phase`.
    pub fn is_registered(&self, phase: CallbackPhase, op: &CallbackOp) -> bool {
        self.slot(phase).borrow().contains(op.key())
    }

    /// Number of live callbacks registered under `phase`.
    pub fn len(&self, phase: CallbackPhase) -> usize {
        self.slot(phase).borrow().live_len()
    }

    /// Returns `true` if no callback is registered under `phase`.
    pub fn is_empty(&self, phase: CallbackPhase) -> bool {
        self.len(phase) == 0
    }

    /// Diagnostic names of the live callbacks of `phase`, in storage order.
    /// A pass visits them back to front.
    pub fn callback_names(&self, phase: CallbackPhase) -> Vec<String> {
        self.slot(phase).borrow().names()
    }

    /// Runs one pass over `phase`.
    ///
    /// Every callback live at the start of the pass, and not removed during
    /// it, is invoked exactly once. Callbacks registered during the pass run
    /// starting with the next one. A callback that panics or returns an error
    /// is logged and retired; the remaining callbacks still run.
    ///
    /// # Panics
    ///
    /// Panics if the runtime is not active, or if `phase` is already being
    /// driven further up the stack.
    pub fn run_pass(&self, phase: CallbackPhase) -> PassReport {
        let state = self.lifecycle.state();
        assert!(
            state == crate::LifecycleState::Active,
            "cannot run a pass of {phase}: runtime is {state:?}"
        );

        let slot = self.slot(phase);
        let snapshot_len = {
            let mut collection = slot.borrow_mut();
            assert!(!collection.running, "re-entrant pass of {phase}");
            collection.running = true;
            collection.entries.len()
        };
        let _running = RunningGuard(slot);

        let mut report = PassReport {
            phase,
            ..PassReport::default()
        };

        // Entries in `live_end..snapshot_len` are purged; anything appended
        // past `snapshot_len` during the pass is left for the next one.
        let mut live_end = snapshot_len;
        let mut cursor = snapshot_len;
        while cursor > 0 {
            cursor -= 1;
            if self.lifecycle.is_destroyed() {
                log::debug!("Scheduler: runtime destroyed mid-pass, abandoning {phase}");
                return report;
            }

            let Some(entry) = slot.borrow().entries.get(cursor).cloned() else {
                return report;
            };

            if !entry.is_pending_removal() {
                report.invoked += 1;
                match invoke_guarded(phase, &entry) {
                    Outcome::Continue => {}
                    Outcome::Stop => {
                        report.stopped += 1;
                        slot.borrow_mut().retire(&entry);
                    }
                    Outcome::Fault => {
                        report.faulted += 1;
                        slot.borrow_mut().retire(&entry);
                    }
                }
                if self.lifecycle.is_destroyed() {
                    return report;
                }
            }

            if entry.is_pending_removal() {
                live_end -= 1;
                slot.borrow_mut().entries.swap(cursor, live_end);
                report.purged += 1;
            }
        }

        // Dropping an entry may run arbitrary `Drop` code that calls back into
        // the scheduler, so the purged tail leaves the phase first.
        let purged: Vec<_> = {
            let mut collection = slot.borrow_mut();
            if collection.entries.len() >= snapshot_len {
                collection.entries.drain(live_end..snapshot_len).collect()
            } else {
                Vec::new()
            }
        };
        drop(purged);

        log::trace!(
            "Scheduler: {phase} pass invoked {} (stopped {}, faulted {}, purged {})",
            report.invoked,
            report.stopped,
            report.faulted,
            report.purged
        );
        report
    }

    /// Drops every registration of every phase.
    pub(crate) fn clear(&self) {
        for slot in &self.phases {
            let released = slot.borrow_mut().take_all();
            drop(released);
        }
    }
}

struct RunningGuard<'a>(&'a RefCell<PhaseCollection>);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut collection) = self.0.try_borrow_mut() {
            collection.running = false;
        }
    }
}

/// Invokes one callback inside its own fault boundary.
fn invoke_guarded(phase: CallbackPhase, entry: &CallbackEntry) -> Outcome {
    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        #[cfg(feature = "profiling")]
        let _span = tracing::trace_span!("callback", phase = phase.name(), name = entry.name())
            .entered();
        entry.op().invoke()
    }));

    match result {
        Ok(Ok(true)) => Outcome::Continue,
        Ok(Ok(false)) => {
            log::debug!("Scheduler: '{}' finished in {phase}", entry.name());
            Outcome::Stop
        }
        Ok(Err(e)) => {
            log::error!(
                "Callback '{}' failed during {phase} and was removed: {e:#}",
                entry.name()
            );
            Outcome::Fault
        }
        Err(payload) => {
            log::error!(
                "Callback '{}' panicked during {phase} and was removed: {}",
                entry.name(),
                panic_message(payload.as_ref())
            );
            Outcome::Fault
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "<non-string panic payload>"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::LifecycleState;
    use std::cell::Cell;

    fn active_scheduler() -> CallbackScheduler {
        let lifecycle = Rc::new(Lifecycle::new());
        lifecycle.advance(LifecycleState::Constructing);
        lifecycle.advance(LifecycleState::SettingUp);
        lifecycle.advance(LifecycleState::Active);
        CallbackScheduler::new(lifecycle)
    }

    fn counting(counter: &Rc<Cell<u32>>, keep_going: bool) -> CallbackOp {
        let counter = Rc::clone(counter);
        CallbackOp::new(move || {
            counter.set(counter.get() + 1);
            keep_going
        })
    }

    #[test]
    fn test_register_and_run() {
        let scheduler = active_scheduler();
        let calls = Rc::new(Cell::new(0));
        let op = counting(&calls, true);
        scheduler.register(CallbackPhase::Late, &op, "tick").unwrap();

        let report = scheduler.run_pass(CallbackPhase::Late);
        assert_eq!(report.invoked, 1);
        assert_eq!(calls.get(), 1);

        // Other phases are independent.
        assert_eq!(scheduler.run_pass(CallbackPhase::PrePhysics).invoked, 0);
        assert_eq!(calls.get(), 1);
    }

    #[test]
    fn test_duplicate_is_rejected() {
        let scheduler = active_scheduler();
        let op = CallbackOp::new(|| true);
        scheduler.register(CallbackPhase::Late, &op, "a").unwrap();
        let err = scheduler.register(CallbackPhase::Late, &op, "b").unwrap_err();
        assert_eq!(
            err,
            SchedulerError::DuplicateCallback {
                phase: CallbackPhase::Late,
                name: "b".to_string()
            }
        );
        assert_eq!(scheduler.len(CallbackPhase::Late), 1);

        // The same op may live in another phase.
        scheduler.register(CallbackPhase::PrePhysics, &op, "a").unwrap();
    }

    #[test]
    fn test_stopped_entries_are_purged_in_the_same_pass() {
        let scheduler = active_scheduler();
        let calls = Rc::new(Cell::new(0));
        for _ in 0..3 {
            scheduler
                .register(CallbackPhase::Late, &counting(&calls, false), "once")
                .unwrap();
        }

        let report = scheduler.run_pass(CallbackPhase::Late);
        assert_eq!(report.invoked, 3);
        assert_eq!(report.stopped, 3);
        assert_eq!(report.purged, 3);
        assert!(scheduler.is_empty(CallbackPhase::Late));
        assert_eq!(scheduler.slot(CallbackPhase::Late).borrow().entries.len(), 0);
    }

    #[test]
    fn test_unregistered_entries_are_skipped_then_purged() {
        let scheduler = active_scheduler();
        let calls = Rc::new(Cell::new(0));
        let keep = counting(&calls, true);
        let gone = counting(&calls, true);
        scheduler.register(CallbackPhase::Late, &keep, "keep").unwrap();
        scheduler.register(CallbackPhase::Late, &gone, "gone").unwrap();

        assert!(scheduler.unregister(CallbackPhase::Late, &gone));
        assert!(!scheduler.unregister(CallbackPhase::Late, &gone));

        let report = scheduler.run_pass(CallbackPhase::Late);
        assert_eq!(report.invoked, 1);
        assert_eq!(report.purged, 1);
        assert_eq!(calls.get(), 1);
        assert_eq!(scheduler.callback_names(CallbackPhase::Late), vec!["keep"]);
    }

    #[test]
    fn test_empty_name_is_replaced() {
        let scheduler = active_scheduler();
        let op = CallbackOp::new(|| true);
        scheduler.register(CallbackPhase::Late, &op, "").unwrap();
        assert_eq!(scheduler.callback_names(CallbackPhase::Late), vec!["anonymous"]);
    }

    #[test]
    #[should_panic(expected = "cannot run a pass")]
    fn test_pass_before_initialization_panics() {
        let scheduler = CallbackScheduler::new(Rc::new(Lifecycle::new()));
        scheduler.run_pass(CallbackPhase::Late);
    }

    #[test]
    #[should_panic(expected = "cannot register callback")]
    fn test_register_after_destroy_panics() {
        let scheduler = active_scheduler();
        scheduler.lifecycle.advance(LifecycleState::Destroyed);
        scheduler
            .register(CallbackPhase::Late, &CallbackOp::new(|| true), "late")
            .ok();
    }

    #[test]
    fn test_panic_message_extraction() {
        let owned: Box<dyn Any + Send> = Box::new(String::from("owned"));
        let borrowed: Box<dyn Any + Send> = Box::new("borrowed");
        let other: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(owned.as_ref()), "owned");
        assert_eq!(panic_message(borrowed.as_ref()), "borrowed");
        assert_eq!(panic_message(other.as_ref()), "<non-string panic payload>");
    }
}
