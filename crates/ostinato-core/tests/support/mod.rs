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

//! Shared helpers for the integration tests.

#![allow(dead_code)]

use log::{Level, LevelFilter, Log, Metadata, Record};
use ostinato_core::{CallbackOp, Runtime, ServiceManifest};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::Once;

thread_local! {
    static RECORDS: RefCell<Vec<(Level, String)>> = const { RefCell::new(Vec::new()) };
}

/// Records log lines per thread, so parallel tests do not see each other.
struct CaptureLogger;

impl Log for CaptureLogger {
    fn enabled(&self, _metadata: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        let line = record.args().to_string();
        let _ = RECORDS.try_with(|records| records.borrow_mut().push((record.level(), line)));
    }

    fn flush(&self) {}
}

static LOGGER: CaptureLogger = CaptureLogger;
static INIT: Once = Once::new();

/// Installs the capturing logger (once per binary) and clears this thread's
/// records.
pub fn capture_logs() {
    INIT.call_once(|| {
        let _ = log::set_logger(&LOGGER);
        log::set_max_level(LevelFilter::Trace);
    });
    RECORDS.with(|records| records.borrow_mut().clear());
}

/// Number of error records logged on this thread since [`capture_logs`].
pub fn error_count() -> usize {
    RECORDS.with(|records| {
        records
            .borrow()
            .iter()
            .filter(|(level, _)| *level == Level::Error)
            .count()
    })
}

/// Error lines logged on this thread since [`capture_logs`].
pub fn errors() -> Vec<String> {
    RECORDS.with(|records| {
        records
            .borrow()
            .iter()
            .filter(|(level, _)| *level == Level::Error)
            .map(|(_, line)| line.clone())
            .collect()
    })
}

/// An initialized runtime with no services.
pub fn active_runtime() -> Runtime {
    let mut runtime = Runtime::new(ServiceManifest::new());
    runtime
        .initialize()
        .expect("empty runtime should initialize");
    runtime
}

/// A callback that counts its invocations and always continues.
pub fn counter() -> (CallbackOp, Rc<Cell<u32>>) {
    let calls = Rc::new(Cell::new(0));
    let seen = Rc::clone(&calls);
    let op = CallbackOp::new(move || {
        seen.set(seen.get() + 1);
        true
    });
    (op, calls)
}

/// A shared, ordered journal of events.
#[derive(Clone, Default)]
pub struct Journal(Rc<RefCell<Vec<String>>>);

impl Journal {
    pub fn push(&self, event: impl Into<String>) {
        self.0.borrow_mut().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.0.borrow().clone()
    }
}
