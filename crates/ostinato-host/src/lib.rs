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

//! A reference host for ostinato runtimes.
//!
//! Real applications usually drive phases from their own event loop. This
//! crate provides the headless equivalent: a [`Host`] that ticks the
//! configured phases once per frame, plus configuration loading and logger
//! setup.

pub mod config;
pub mod driver;
mod logging;

pub use config::{ConfigError, HostConfig};
pub use driver::{FrameReport, Host};
pub use logging::init_logging;
