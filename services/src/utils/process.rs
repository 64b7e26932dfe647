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

//! Process name lookup.
//!
//! The caller name recorded for a connection comes from the caller's bundle
//! when the caller is an ability, and from its process otherwise. Looking up
//! a process is platform dependent, so it is injected as a
//! `ProcessNameResolver`.

use std::fs;
use std::path::PathBuf;

/// Resolves the name of a running process.
pub trait ProcessNameResolver: Send + Sync {
    /// Returns the name of process `pid`, or `None` if it cannot be resolved.
    fn process_name(&self, pid: i32) -> Option<String>;
}

/// Resolver for platforms without process lookup. Always returns `None`.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullProcessNameResolver;

impl ProcessNameResolver for NullProcessNameResolver {
    fn process_name(&self, _pid: i32) -> Option<String> {
        None
    }
}

/// Resolver reading `<root>/<pid>/cmdline`.
#[derive(Clone, Debug)]
pub struct ProcfsProcessNameResolver {
    root: PathBuf,
}

impl ProcfsProcessNameResolver {
    /// Creates a resolver reading from `/proc`.
    pub fn new() -> Self {
        Self::with_root("/proc")
    }

    /// Creates a resolver reading from another procfs style directory.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl ProcessNameResolver for ProcfsProcessNameResolver {
    fn process_name(&self, pid: i32) -> Option<String> {
        if pid <= 0 {
            return None;
        }
        let path = self.root.join(pid.to_string()).join("cmdline");
        let cmdline = match fs::read(&path) {
            Ok(cmdline) => cmdline,
            Err(e) => {
                debug!("read {:?} failed, err: {}", path, e);
                return None;
            }
        };
        // argv[0], NUL terminated
        let name = cmdline.split(|b| *b == 0).next()?;
        if name.is_empty() {
            return None;
        }
        Some(String::from_utf8_lossy(name).into_owned())
    }
}
