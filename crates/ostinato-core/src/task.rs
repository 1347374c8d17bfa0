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

//! Cooperative tasks driven by phase ticks.
//!
//! A task is an ordinary callback underneath: each tick of its phase advances
//! it by one step, and it unregisters itself once it completes. Long-running
//! work is chunked this way instead of blocking a pass.

use crate::callback::CallbackOp;
use crate::error::SchedulerResult;
use crate::phase::CallbackPhase;
use crate::scheduler::CallbackScheduler;
use std::borrow::Cow;
use std::cell::Cell;
use std::future::Future;
use std::pin::Pin;
use std::rc::{Rc, Weak};
use std::task::{Context, Poll, Waker};

/// A handle to a spawned task.
pub struct TaskHandle {
    op: CallbackOp,
    phase: CallbackPhase,
    scheduler: Weak<CallbackScheduler>,
    completed: Rc<Cell<bool>>,
}

impl TaskHandle {
    /// The phase the task is driven by.
    pub fn phase(&self) -> CallbackPhase {
        self.phase
    }

    /// Returns `true` once the task completed normally.
    pub fn is_completed(&self) -> bool {
        self.completed.get()
    }

    /// Returns `true` once the task will not be driven again: it completed,
    /// faulted, was cancelled, or the runtime was torn down.
    pub fn is_finished(&self) -> bool {
        self.completed.get()
            || self
                .scheduler
                .upgrade()
                .map_or(true, |scheduler| !scheduler.is_registered(self.phase, &self.op))
    }

    /// Stops the task. Returns `false` if it was no longer scheduled.
    pub fn cancel(&self) -> bool {
        self.scheduler
            .upgrade()
            .is_some_and(|scheduler| scheduler.unregister(self.phase, &self.op))
    }
}

pub(crate) fn spawn_steps<I>(
    scheduler: &Rc<CallbackScheduler>,
    phase: CallbackPhase,
    name: Cow<'static, str>,
    steps: I,
) -> SchedulerResult<TaskHandle>
where
    I: IntoIterator + 'static,
{
    let mut steps = steps.into_iter();
    let completed = Rc::new(Cell::new(false));
    let done = Rc::clone(&completed);
    let op = CallbackOp::new(move || match steps.next() {
        Some(_) => true,
        None => {
            done.set(true);
            false
        }
    });
    spawn(scheduler, phase, name, op, completed)
}

pub(crate) fn spawn_future<F>(
    scheduler: &Rc<CallbackScheduler>,
    phase: CallbackPhase,
    name: Cow<'static, str>,
    future: F,
) -> SchedulerResult<TaskHandle>
where
    F: Future<Output = ()> + 'static,
{
    let mut future: Pin<Box<dyn Future<Output = ()>>> = Box::pin(future);
    let completed = Rc::new(Cell::new(false));
    let done = Rc::clone(&completed);
    let op = CallbackOp::new(move || {
        // Tasks are polled on every tick regardless of wake-ups.
        let mut cx = Context::from_waker(Waker::noop());
        match future.as_mut().poll(&mut cx) {
            Poll::Ready(()) => {
                done.set(true);
                false
            }
            Poll::Pending => true,
        }
    });
    spawn(scheduler, phase, name, op, completed)
}

fn spawn(
    scheduler: &Rc<CallbackScheduler>,
    phase: CallbackPhase,
    name: Cow<'static, str>,
    op: CallbackOp,
    completed: Rc<Cell<bool>>,
) -> SchedulerResult<TaskHandle> {
    scheduler.register(phase, &op, name)?;
    Ok(TaskHandle {
        op,
        phase,
        scheduler: Rc::downgrade(scheduler),
        completed,
    })
}

/// Suspends a spawned future until the next tick of its phase.
///
/// ```rust,ignore
/// runtime.spawn_future(CallbackPhase::Late, "stream", async {
///     for chunk in 0..4 {
///         load_chunk(chunk);
///         ostinato_core::yield_tick().await;
///     }
/// })?;
/// ```
pub fn yield_tick() -> YieldTick {
    YieldTick { yielded: false }
}

/// Future returned by [`yield_tick`].
#[must_use = "futures do nothing unless awaited"]
pub struct YieldTick {
    yielded: bool,
}

impl Future for YieldTick {
    type Output = ();

    fn poll(mut self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<()> {
        if self.yielded {
            Poll::Ready(())
        } else {
            self.yielded = true;
            Poll::Pending
        }
    }
}
