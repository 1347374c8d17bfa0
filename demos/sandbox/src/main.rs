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

// Ostinato Sandbox
// Headless demo: a few services sharing one host loop.

use std::cell::{Cell, RefCell};
use std::path::Path;
use std::rc::{Rc, Weak};

use anyhow::{Context, Result};
use ostinato_core::{CallbackOp, CallbackPhase, Runtime, Service, ServiceManifest};
use ostinato_host::{init_logging, Host, HostConfig};

const GRAVITY: f32 = -9.81;
const STEP: f32 = 1.0 / 60.0;
const DEFAULT_CONFIG: &str = "demos/sandbox/host.ron";

/// Counts frames. Everything else reads the frame number from here.
#[derive(Default)]
struct FrameClock {
    frame: Cell<u64>,
}

impl Service for FrameClock {
    fn setup(self: Rc<Self>, runtime: &Runtime) -> Result<()> {
        let this = Rc::downgrade(&self);
        let op = CallbackOp::new(move || {
            this.upgrade().is_some_and(|clock| {
                clock.frame.set(clock.frame.get() + 1);
                true
            })
        });
        runtime
            .scheduler()
            .register(CallbackPhase::PrePhysics, &op, "clock")?;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy)]
struct Body {
    height: f32,
    velocity: f32,
}

/// A toy rigid-body world: integrate before physics, resolve the floor after.
#[derive(Default)]
struct Bodies {
    bodies: RefCell<Vec<Body>>,
    bounces: Cell<u32>,
}

impl Bodies {
    fn spawn(&self, height: f32) {
        self.bodies.borrow_mut().push(Body {
            height,
            velocity: 0.0,
        });
    }

    fn integrate(&self) {
        for body in self.bodies.borrow_mut().iter_mut() {
            body.velocity += GRAVITY * STEP;
            body.height += body.velocity * STEP;
        }
    }

    fn resolve_floor(&self) {
        for body in self.bodies.borrow_mut().iter_mut() {
            if body.height < 0.0 {
                body.height = 0.0;
                body.velocity = -body.velocity * 0.5;
                self.bounces.set(self.bounces.get() + 1);
            }
        }
    }
}

fn every_tick(this: &Rc<Bodies>, step: fn(&Bodies)) -> CallbackOp {
    let this: Weak<Bodies> = Rc::downgrade(this);
    CallbackOp::new(move || {
        this.upgrade().is_some_and(|bodies| {
            step(&bodies);
            true
        })
    })
}

impl Service for Bodies {
    fn setup(self: Rc<Self>, runtime: &Runtime) -> Result<()> {
        let scheduler = runtime.scheduler();
        scheduler.register(
            CallbackPhase::PrePhysics,
            &every_tick(&self, Bodies::integrate),
            "bodies.integrate",
        )?;
        scheduler.register(
            CallbackPhase::PostPhysics,
            &every_tick(&self, Bodies::resolve_floor),
            "bodies.floor",
        )?;
        Ok(())
    }

    fn dispose(&self, _runtime: &Runtime) -> Result<()> {
        log::info!(
            "Bodies: {} bodies, {} bounces",
            self.bodies.borrow().len(),
            self.bounces.get()
        );
        Ok(())
    }
}

/// Drops one body per tick until the wave is complete.
struct Spawner {
    bodies: Rc<Bodies>,
    wave: usize,
}

impl Service for Spawner {
    fn setup(self: Rc<Self>, runtime: &Runtime) -> Result<()> {
        let bodies = Rc::clone(&self.bodies);
        runtime.spawn_steps(
            CallbackPhase::Late,
            "spawner.wave",
            (0..self.wave).map(move |i| bodies.spawn(2.0 + i as f32)),
        )?;
        Ok(())
    }
}

/// Prints a status line every `interval` frames.
struct DebugHud {
    interval: u64,
}

impl Service for DebugHud {
    fn setup(self: Rc<Self>, runtime: &Runtime) -> Result<()> {
        let clock = runtime
            .lookup::<FrameClock>()
            .context("the HUD needs a frame clock")?;
        let bodies = runtime
            .lookup::<Bodies>()
            .context("the HUD needs the body world")?;
        let interval = self.interval;

        let op = CallbackOp::new(move || {
            let frame = clock.frame.get();
            if frame % interval == 0 {
                let list = bodies.bodies.borrow();
                let resting = list.iter().filter(|b| b.height < 0.01).count();
                log::info!(
                    "[frame {frame:>4}] bodies: {} (resting {resting}), bounces: {}",
                    list.len(),
                    bodies.bounces.get()
                );
            }
            true
        });
        runtime
            .scheduler()
            .register(CallbackPhase::DebugOverlay, &op, "hud")?;
        Ok(())
    }
}

fn manifest() -> ServiceManifest {
    ServiceManifest::new()
        .with_default::<FrameClock>()
        .with_default::<Bodies>()
        .with(|scope| {
            let bodies = scope
                .get::<Bodies>()
                .context("Bodies must be listed before Spawner")?;
            Ok(Spawner { bodies, wave: 5 })
        })
        .with(|_| Ok(DebugHud { interval: 30 }))
}

fn main() -> Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => HostConfig::load(&path)?,
        None if Path::new(DEFAULT_CONFIG).exists() => HostConfig::load(DEFAULT_CONFIG)?,
        None => HostConfig {
            max_frames: Some(240),
            ..HostConfig::default()
        },
    };
    init_logging(&config.log_filter);

    log::info!("Ostinato Sandbox: starting...");
    let mut host = Host::new(config, manifest())?;
    let frames = host.run()?;
    log::info!("Ostinato Sandbox: finished after {frames} frames.");
    Ok(())
}
