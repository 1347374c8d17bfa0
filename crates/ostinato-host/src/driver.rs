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

//! A minimal frame driver: ticks every configured phase once per frame.

use crate::config::{ConfigError, HostConfig};
use anyhow::Result;
use ostinato_core::{LifecycleState, PassReport, Runtime, ServiceManifest};

/// What happened during one frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameReport {
    /// Zero-based frame number.
    pub frame: u64,
    /// One report per ticked phase, in tick order.
    pub passes: Vec<PassReport>,
}

impl FrameReport {
    /// Total callback invocations across every phase of the frame.
    pub fn invoked(&self) -> usize {
        self.passes.iter().map(|pass| pass.invoked).sum()
    }

    /// Total callback faults across every phase of the frame.
    pub fn faulted(&self) -> usize {
        self.passes.iter().map(|pass| pass.faulted).sum()
    }
}

/// Drives a [`Runtime`] frame by frame.
///
/// The host only decides *when* phases run; it never sleeps or paces frames.
pub struct Host {
    config: HostConfig,
    runtime: Runtime,
    frame: u64,
}

impl Host {
    /// Creates a host for `manifest`. The runtime is not initialized yet.
    pub fn new(config: HostConfig, manifest: ServiceManifest) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            config,
            runtime: Runtime::new(manifest),
            frame: 0,
        })
    }

    /// Initializes the runtime: constructs and sets up every service.
    pub fn start(&mut self) -> Result<()> {
        log::info!("Host: starting...");
        self.runtime.initialize()?;
        Ok(())
    }

    /// Ticks every phase of the configured order once.
    ///
    /// # Panics
    ///
    /// Panics if the host was not started or was already shut down.
    pub fn run_frame(&mut self) -> FrameReport {
        let passes = self
            .config
            .phase_order
            .iter()
            .map(|&phase| self.runtime.run_pass(phase))
            .collect();
        let report = FrameReport {
            frame: self.frame,
            passes,
        };
        log::trace!("Host: frame {} done", self.frame);
        self.frame += 1;
        report
    }

    /// Starts the runtime if needed, then runs frames until the frame limit
    /// or an exit request, and shuts down. Returns the number of frames run.
    pub fn run(&mut self) -> Result<u64> {
        if self.runtime.state() == LifecycleState::Uninitialized {
            self.start()?;
        }

        let first = self.frame;
        while !self.should_stop() {
            self.run_frame();
        }

        let frames = self.frame - first;
        log::info!("Host: ran {frames} frames.");
        self.shutdown();
        Ok(frames)
    }

    fn should_stop(&self) -> bool {
        self.runtime.exit_requested()
            || self
                .config
                .max_frames
                .is_some_and(|limit| self.frame >= limit)
    }

    /// Tears the runtime down. Called automatically when the host is dropped.
    pub fn shutdown(&mut self) {
        if !self.runtime.is_destroyed() {
            log::info!("Host: shutting down...");
            self.runtime.teardown();
        }
    }

    /// The runtime being driven.
    pub fn runtime(&self) -> &Runtime {
        &self.runtime
    }

    /// The host configuration.
    pub fn config(&self) -> &HostConfig {
        &self.config
    }

    /// Number of frames run so far.
    pub fn frame(&self) -> u64 {
        self.frame
    }
}

impl Drop for Host {
    fn drop(&mut self) {
        self.shutdown();
    }
}
