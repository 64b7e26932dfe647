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

//! DLP manager state.

use super::DlpStateData;
use crate::record::AbilityRecord;
use crate::remote::RemoteObj;

/// Abilities opened through one DLP manager.
pub struct DlpStateItem {
    dlp_uid: i32,
    dlp_pid: i32,
    dlp_name: String,
    dlp_abilities: Vec<RemoteObj>,
}

impl DlpStateItem {
    /// Creates an item for the DLP manager `manager`.
    pub fn new(manager: &AbilityRecord) -> Self {
        Self {
            dlp_uid: manager.uid(),
            dlp_pid: manager.pid(),
            dlp_name: manager.info().bundle_name.clone(),
            dlp_abilities: Vec::new(),
        }
    }

    /// Gets the uid of the DLP manager.
    pub fn dlp_uid(&self) -> i32 {
        self.dlp_uid
    }

    /// Gets the pid of the DLP manager.
    pub fn dlp_pid(&self) -> i32 {
        self.dlp_pid
    }

    /// Records `ability` as opened. Returns the data to publish if it was
    /// not opened yet.
    pub fn add_dlp_connection_state(&mut self, ability: &AbilityRecord) -> Option<DlpStateData> {
        if self.dlp_abilities.contains(ability.token()) {
            return None;
        }
        self.dlp_abilities.push(ability.token().clone());
        Some(self.generate_dlp_state_data(ability))
    }

    /// Records `ability` as closed. Returns the data to publish if it was
    /// opened.
    pub fn remove_dlp_connection_state(
        &mut self,
        ability: &AbilityRecord,
    ) -> Option<DlpStateData> {
        let index = self
            .dlp_abilities
            .iter()
            .position(|token| token == ability.token())?;
        self.dlp_abilities.remove(index);
        Some(self.generate_dlp_state_data(ability))
    }

    /// Number of currently opened DLP abilities.
    pub fn opened_ability_size(&self) -> usize {
        self.dlp_abilities.len()
    }

    fn generate_dlp_state_data(&self, ability: &AbilityRecord) -> DlpStateData {
        let info = ability.info();
        DlpStateData {
            caller_uid: self.dlp_uid,
            caller_pid: self.dlp_pid,
            caller_name: self.dlp_name.clone(),
            target_pid: ability.pid(),
            target_uid: ability.uid(),
            target_bundle_name: info.bundle_name.clone(),
            target_module_name: info.module_name.clone(),
            target_ability_name: info.name.clone(),
        }
    }
}
