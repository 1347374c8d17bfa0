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

//! Host configuration.

use ostinato_core::CallbackPhase;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Errors raised while loading or validating a [`HostConfig`].
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("failed to read host config {path}")]
    Io {
        /// The file that was read.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
    /// The configuration is not valid RON for [`HostConfig`].
    #[error("failed to parse host config: {0}")]
    Parse(#[from] ron::error::SpannedError),
    /// No phase would ever be ticked.
    #[error("phase_order must list at least one phase")]
    EmptyPhaseOrder,
    /// A phase is ticked twice per frame.
    #[error("phase {0} appears more than once in phase_order")]
    DuplicatePhase(CallbackPhase),
}

/// Configuration for the [`Host`](crate::Host) driver.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Phases ticked every frame, in order.
    pub phase_order: Vec<CallbackPhase>,
    /// Stop after this many frames. `None` runs until a service requests exit.
    pub max_frames: Option<u64>,
    /// Default `env_logger` filter. `RUST_LOG` takes precedence.
    pub log_filter: String,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            phase_order: CallbackPhase::ALL.to_vec(),
            max_frames: None,
            log_filter: "info".to_string(),
        }
    }
}

impl HostConfig {
    /// Parses and validates a RON document. Missing fields take their defaults.
    pub fn from_ron_str(source: &str) -> Result<Self, ConfigError> {
        let config: HostConfig = ron::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a RON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        log::debug!("Loaded host config from {}", path.display());
        Self::from_ron_str(&source)
    }

    /// Checks that every frame ticks at least one phase, each at most once.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.phase_order.is_empty() {
            return Err(ConfigError::EmptyPhaseOrder);
        }
        let mut seen = [false; CallbackPhase::COUNT];
        for phase in &self.phase_order {
            if std::mem::replace(&mut seen[phase.index()], true) {
                return Err(ConfigError::DuplicatePhase(*phase));
            }
        }
        Ok(())
    }
}
