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

//! Per data ability caller tracking.

use super::{ConnectionData, DataAbilityCaller};
use crate::record::{AbilityRecord, ExtensionAbilityType};
use crate::remote::WeakRemoteObj;

struct CallerInfo {
    is_not_hap: bool,
    caller_pid: i32,
    caller_token: Option<WeakRemoteObj>,
}

impl CallerInfo {
    fn matches(&self, caller: &DataAbilityCaller) -> bool {
        if caller.is_not_hap {
            return self.is_not_hap && self.caller_pid == caller.caller_pid;
        }
        match (&self.caller_token, &caller.caller_token) {
            (Some(mine), Some(theirs)) => mine.is_same(theirs),
            _ => false,
        }
    }
}

/// Records the callers of one data ability on behalf of one process.
///
/// Caller tokens are held weakly and only used for identity.
#[derive(Default)]
pub struct ConnectedDataAbility {
    data_ability_pid: i32,
    data_ability_uid: i32,
    bundle_name: String,
    module_name: String,
    ability_name: String,
    callers: Vec<CallerInfo>,
}

impl ConnectedDataAbility {
    /// Creates a tracker describing `target`.
    pub fn new(target: &AbilityRecord) -> Self {
        let info = target.info();
        Self {
            data_ability_pid: target.pid(),
            data_ability_uid: target.uid(),
            bundle_name: info.bundle_name.clone(),
            module_name: info.module_name.clone(),
            ability_name: info.name.clone(),
            callers: Vec::new(),
        }
    }

    /// Adds `caller`. Returns `true` if it is the first caller.
    pub fn add_caller(&mut self, caller: &DataAbilityCaller) -> bool {
        if !caller.is_valid() {
            return false;
        }
        let need_notify = self.callers.is_empty();
        if !self.callers.iter().any(|info| info.matches(caller)) {
            self.callers.push(CallerInfo {
                is_not_hap: caller.is_not_hap,
                caller_pid: caller.caller_pid,
                caller_token: caller.caller_token.as_ref().map(|token| token.downgrade()),
            });
        }
        need_notify
    }

    /// Removes `caller`. Returns `true` if no caller remains.
    pub fn remove_caller(&mut self, caller: &DataAbilityCaller) -> bool {
        if !caller.is_valid() {
            return false;
        }
        if let Some(index) = self.callers.iter().position(|info| info.matches(caller)) {
            self.callers.remove(index);
        }
        self.callers.is_empty()
    }

    /// Fills the target part of `data`.
    pub fn generate_extension_info(&self, data: &mut ConnectionData) {
        data.extension_pid = self.data_ability_pid;
        data.extension_uid = self.data_ability_uid;
        data.extension_bundle_name = self.bundle_name.clone();
        data.extension_module_name = self.module_name.clone();
        data.extension_name = self.ability_name.clone();
        data.extension_type = ExtensionAbilityType::DataShare;
    }
}
