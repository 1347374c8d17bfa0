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

use ostinato_core::{CallbackOp, CallbackPhase, ExitSignal, Runtime, Service, ServiceManifest};
use ostinato_host::{ConfigError, Host, HostConfig};
use std::cell::{Cell, RefCell};
use std::rc::Rc;

/// Records which phase ran, and asks for exit after `exit_after` frames.
struct PhaseRecorder {
    log: Rc<RefCell<Vec<CallbackPhase>>>,
    exit_after: Option<usize>,
}

impl Service for PhaseRecorder {
    fn setup(self: Rc<Self>, runtime: &Runtime) -> anyhow::Result<()> {
        for phase in CallbackPhase::ALL {
            let log = Rc::clone(&self.log);
            let op = CallbackOp::new(move || {
                log.borrow_mut().push(phase);
                true
            });
            runtime.scheduler().register(phase, &op, phase.name())?;
        }

        if let Some(frames) = self.exit_after {
            let exit: ExitSignal = runtime.exit_signal();
            runtime.spawn_steps(
                CallbackPhase::Late,
                "exit-timer",
                (0..frames).map(|_| ()).chain(std::iter::once_with(move || exit.request())),
            )?;
        }
        Ok(())
    }
}

fn recorder(exit_after: Option<usize>) -> (ServiceManifest, Rc<RefCell<Vec<CallbackPhase>>>) {
    let log = Rc::new(RefCell::new(Vec::new()));
    let shared = Rc::clone(&log);
    let manifest = ServiceManifest::new().with(move |_| {
        Ok(PhaseRecorder {
            log: shared,
            exit_after,
        })
    });
    (manifest, log)
}

#[test]
fn test_frame_ticks_phases_in_configured_order() {
    let (manifest, log) = recorder(None);
    let config = HostConfig {
        phase_order: vec![CallbackPhase::Late, CallbackPhase::PrePhysics],
        ..HostConfig::default()
    };
    let mut host = Host::new(config, manifest).unwrap();
    host.start().unwrap();

    let report = host.run_frame();
    assert_eq!(report.frame, 0);
    assert_eq!(report.passes.len(), 2);
    assert_eq!(report.invoked(), 2);
    assert_eq!(
        *log.borrow(),
        vec![CallbackPhase::Late, CallbackPhase::PrePhysics]
    );
    assert_eq!(host.frame(), 1);
}

#[test]
fn test_run_stops_at_frame_limit() {
    let (manifest, log) = recorder(None);
    let config = HostConfig {
        max_frames: Some(5),
        ..HostConfig::default()
    };
    let mut host = Host::new(config, manifest).unwrap();

    assert_eq!(host.run().unwrap(), 5);
    assert_eq!(log.borrow().len(), 5 * CallbackPhase::COUNT);
    assert!(host.runtime().is_destroyed());
}

#[test]
fn test_run_stops_on_exit_request() {
    let (manifest, _log) = recorder(Some(3));
    let mut host = Host::new(HostConfig::default(), manifest).unwrap();

    // The timer steps on frames 0..=2 and requests exit on frame 3.
    assert_eq!(host.run().unwrap(), 4);
    assert!(host.runtime().is_destroyed());
}

#[test]
fn test_invalid_config_is_rejected() {
    let config = HostConfig {
        phase_order: Vec::new(),
        ..HostConfig::default()
    };
    assert!(matches!(
        Host::new(config, ServiceManifest::new()),
        Err(ConfigError::EmptyPhaseOrder)
    ));
}

#[test]
fn test_start_twice_fails() {
    let mut host = Host::new(HostConfig::default(), ServiceManifest::new()).unwrap();
    host.start().unwrap();
    assert!(host.start().is_err());
    host.shutdown();
    host.shutdown();
    assert!(host.runtime().is_destroyed());
}

/// Counts how often it was disposed.
struct DisposeCounter(Rc<Cell<u32>>);

impl Service for DisposeCounter {
    fn dispose(&self, _runtime: &Runtime) -> anyhow::Result<()> {
        self.0.set(self.0.get() + 1);
        Ok(())
    }
}

#[test]
fn test_dropping_a_started_host_shuts_it_down() {
    let disposals = Rc::new(Cell::new(0));
    let shared = Rc::clone(&disposals);
    let manifest = ServiceManifest::new().with(move |_| Ok(DisposeCounter(shared)));

    let mut host = Host::new(HostConfig::default(), manifest).unwrap();
    host.start().unwrap();
    host.run_frame();
    drop(host);
    assert_eq!(disposals.get(), 1);

    // The next host on this thread can become active.
    let mut next = Host::new(HostConfig::default(), ServiceManifest::new()).unwrap();
    assert!(next.start().is_ok());
}
