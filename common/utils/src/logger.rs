// Copyright (C) 2024 Huawei Device Co., Ltd.
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

//! Logger initialization backed by `env_logger`.

use std::sync::Once;

static INIT: Once = Once::new();

/// Installs the process-wide logger.
///
/// The log level is taken from `RUST_LOG` and defaults to `info`. Calling this
/// more than once is harmless; only the first call installs the logger.
///
/// # Examples
///
/// ```rust
/// ability_utils::logger::init();
/// log::info!("logger ready");
/// ```
pub fn init() {
    INIT.call_once(|| {
        let env = env_logger::Env::default().default_filter_or("info");
        if let Err(e) = env_logger::Builder::from_env(env).try_init() {
            eprintln!("logger already installed: {}", e);
        }
    });
}
