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

use env_logger::Env;

/// Installs `env_logger` with `default_filter`, unless `RUST_LOG` is set.
///
/// Safe to call more than once; later calls leave the first logger in place.
pub fn init_logging(default_filter: &str) {
    let result = env_logger::Builder::from_env(Env::default().default_filter_or(default_filter))
        .format_timestamp_millis()
        .try_init();

    if let Err(e) = result {
        log::debug!("Logger already initialized: {e}");
    }
}
