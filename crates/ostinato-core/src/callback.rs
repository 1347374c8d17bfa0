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

//! Identity-keyed units of work and the entries that wrap them.

use std::borrow::Cow;
use std::cell::{Cell, RefCell};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

/// What a callback returns: `Ok(true)` to keep running, `Ok(false)` to stop.
///
/// An `Err` is a fault. It is logged and the callback is retired.
pub type CallbackResult = anyhow::Result<bool>;

type Operation = RefCell<Box<dyn FnMut() -> CallbackResult>>;

/// A shareable handle to a repeating unit of work.
///
/// Identity is the handle, not the behaviour: clones of one `CallbackOp`
/// compare equal, while two ops built from identical closures do not. Keep a
/// clone around to [`unregister`](crate::CallbackScheduler::unregister) later.
///
/// # Example
///
/// ```rust
/// use ostinato_core::CallbackOp;
///
/// let op = CallbackOp::new(|| true);
/// let same = op.clone();
/// assert_eq!(op, same);
/// assert_ne!(op, CallbackOp::new(|| true));
/// ```
#[derive(Clone)]
pub struct CallbackOp {
    inner: Rc<Operation>,
}

impl CallbackOp {
    /// Wraps an infallible operation returning the continuation flag.
    pub fn new<F>(mut op: F) -> Self
    where
        F: FnMut() -> bool + 'static,
    {
        Self::fallible(move || Ok(op()))
    }

    /// Wraps an operation that may fail. An `Err` counts as a callback fault.
    pub fn fallible<F>(op: F) -> Self
    where
        F: FnMut() -> CallbackResult + 'static,
    {
        Self {
            inner: Rc::new(RefCell::new(Box::new(op))),
        }
    }

    /// The identity key of this operation.
    #[inline]
    pub fn key(&self) -> CallbackKey {
        CallbackKey(Rc::as_ptr(&self.inner) as *const () as usize)
    }

    /// Runs the operation once.
    ///
    /// An operation that is already executing further up the stack (e.g. it
    /// is registered in two phases and drives the other phase itself) is
    /// reported as a fault instead of aliasing its state.
    pub(crate) fn invoke(&self) -> CallbackResult {
        let mut guard = self
            .inner
            .try_borrow_mut()
            .map_err(|_| anyhow::anyhow!("callback re-entered while already running"))?;
        let op: &mut dyn FnMut() -> CallbackResult = &mut **guard;
        op()
    }
}

impl PartialEq for CallbackOp {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for CallbackOp {}

impl Hash for CallbackOp {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

impl fmt::Debug for CallbackOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("CallbackOp").field(&self.key()).finish()
    }
}

/// Allocation-free identity of a [`CallbackOp`].
///
/// Valid for as long as some clone of the op is alive, which the scheduler
/// guarantees for every registered entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallbackKey(usize);

/// A registered callback: the op, its diagnostic name, and the deferred
/// removal flag.
pub(crate) struct CallbackEntry {
    op: CallbackOp,
    name: Cow<'static, str>,
    pending_removal: Cell<bool>,
}

impl CallbackEntry {
    pub(crate) fn new(op: CallbackOp, name: Cow<'static, str>) -> Self {
        Self {
            op,
            name,
            pending_removal: Cell::new(false),
        }
    }

    pub(crate) fn op(&self) -> &CallbackOp {
        &self.op
    }

    pub(crate) fn key(&self) -> CallbackKey {
        self.op.key()
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn is_pending_removal(&self) -> bool {
        self.pending_removal.get()
    }

    pub(crate) fn mark_pending_removal(&self) {
        self.pending_removal.set(true);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_clones_share_identity() {
        let op = CallbackOp::new(|| true);
        let clone = op.clone();
        assert_eq!(op.key(), clone.key());

        let mut set = HashSet::new();
        set.insert(op);
        assert!(set.contains(&clone));
    }

    #[test]
    fn test_identical_closures_are_distinct() {
        let a = CallbackOp::new(|| true);
        let b = CallbackOp::new(|| true);
        assert_ne!(a, b);
        assert_ne!(a.key(), b.key());
    }

    #[test]
    fn test_invoke_keeps_closure_state() {
        let mut calls = 0;
        let op = CallbackOp::new(move || {
            calls += 1;
            calls < 2
        });
        assert!(op.invoke().unwrap());
        assert!(!op.invoke().unwrap());
    }

    #[test]
    fn test_fallible_error_is_returned() {
        let op = CallbackOp::fallible(|| Err(anyhow::anyhow!("boom")));
        let err = op.invoke().unwrap_err();
        assert_eq!(err.to_string(), "boom");
    }

    #[test]
    fn test_entry_removal_flag() {
        let entry = CallbackEntry::new(CallbackOp::new(|| true), "flag".into());
        assert!(!entry.is_pending_removal());
        entry.mark_pending_removal();
        assert!(entry.is_pending_removal());
        assert_eq!(entry.name(), "flag");
    }
}
