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

//! Per-extension connection multiplicity tracking.

use std::collections::HashMap;

use super::{ConnectionData, ConnectionEvent};
use crate::record::{AbilityRecord, AbilityType, ExtensionAbilityType};
use crate::remote::RemoteObj;

/// Records the connections made to one extension by one caller.
///
/// Each connection handle maps to its suspended flag. The extension is active
/// while at least one handle is not suspended.
#[derive(Debug, Default)]
pub struct ConnectedExtension {
    extension_pid: i32,
    extension_uid: i32,
    extension_bundle_name: String,
    extension_module_name: String,
    extension_name: String,
    extension_type: ExtensionAbilityType,
    connections: HashMap<RemoteObj, bool>,
}

impl ConnectedExtension {
    /// Creates a tracker describing `target`.
    pub fn new(target: &AbilityRecord) -> Self {
        let info = target.info();
        let extension_type = match info.ability_type {
            AbilityType::Service => ExtensionAbilityType::Service,
            AbilityType::Data => ExtensionAbilityType::DataShare,
            _ => info.extension_ability_type,
        };
        Self {
            extension_pid: target.pid(),
            extension_uid: target.uid(),
            extension_bundle_name: info.bundle_name.clone(),
            extension_module_name: info.module_name.clone(),
            extension_name: info.name.clone(),
            extension_type,
            connections: HashMap::new(),
        }
    }

    /// Adds (or re-activates) `connection`.
    ///
    /// Returns `connected_event` for the first connection and
    /// `resumed_event` when every other connection was suspended.
    pub fn add_connection(&mut self, connection: &RemoteObj) -> Option<ConnectionEvent> {
        if self.connections.is_empty() {
            self.connections.insert(connection.clone(), false);
            return Some(ConnectionEvent::connected());
        }

        let need_notify = !self.has_active_connection();
        self.connections.insert(connection.clone(), false);
        need_notify.then(ConnectionEvent::resumed)
    }

    /// Removes `connection`.
    ///
    /// Returns `disconnected_event` when it was the last one and
    /// `suspended_event` when the last active one went away.
    pub fn remove_connection(&mut self, connection: &RemoteObj) -> Option<ConnectionEvent> {
        let suspended = self.connections.remove(connection)?;
        if self.connections.is_empty() {
            return Some(ConnectionEvent::disconnected());
        }
        if suspended {
            return None;
        }
        (!self.has_active_connection()).then(ConnectionEvent::suspended)
    }

    /// Suspends `connection`. Returns `true` if no active connection remains.
    pub fn suspend_connection(&mut self, connection: &RemoteObj) -> bool {
        match self.connections.get_mut(connection) {
            Some(suspended) if !*suspended => *suspended = true,
            _ => return false,
        }
        !self.has_active_connection()
    }

    /// Resumes `connection`. Returns `true` if no connection was active
    /// before.
    pub fn resume_connection(&mut self, connection: &RemoteObj) -> bool {
        if !self.connections.contains_key(connection) {
            return false;
        }
        let need_notify = !self.has_active_connection();
        self.connections.insert(connection.clone(), false);
        need_notify
    }

    /// Returns `true` if no connection is tracked.
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Fills the extension part of `data`.
    pub fn generate_extension_info(&self, data: &mut ConnectionData) {
        data.is_suspended = !self.has_active_connection();
        data.extension_pid = self.extension_pid;
        data.extension_uid = self.extension_uid;
        data.extension_bundle_name = self.extension_bundle_name.clone();
        data.extension_module_name = self.extension_module_name.clone();
        data.extension_name = self.extension_name.clone();
        data.extension_type = self.extension_type;
    }

    fn has_active_connection(&self) -> bool {
        self.connections.values().any(|suspended| !*suspended)
    }
}
