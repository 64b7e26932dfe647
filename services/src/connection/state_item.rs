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

//! Per caller process connection state.

use std::collections::HashMap;

use super::{
    ConnectedDataAbility, ConnectedExtension, ConnectionData, ConnectionEvent, DataAbilityCaller,
};
use crate::record::{ConnectionRecord, DataAbilityRecord};
use crate::remote::RemoteObj;

/// Connection state of one caller process.
///
/// Routes connection changes to the tracker of the target, keyed by the
/// target token. Trackers are created on first use and dropped once their
/// last connection goes away. Returns the `ConnectionData` to publish
/// whenever a tracker reports a visible transition.
pub struct ConnectionStateItem {
    caller: CallerIdentity,
    connection_map: HashMap<RemoteObj, ConnectedExtension>,
    data_ability_map: HashMap<RemoteObj, ConnectedDataAbility>,
}

impl ConnectionStateItem {
    /// Creates an empty item for the given caller.
    pub fn new(caller_uid: i32, caller_pid: i32, caller_name: &str) -> Self {
        Self {
            caller: CallerIdentity {
                uid: caller_uid,
                pid: caller_pid,
                name: caller_name.to_string(),
            },
            connection_map: HashMap::new(),
            data_ability_map: HashMap::new(),
        }
    }

    /// Creates an empty item for the caller of `record`.
    pub fn from_record(record: &ConnectionRecord) -> Self {
        Self::new(
            record.caller_uid(),
            record.caller_pid(),
            &record.caller_name(),
        )
    }

    /// Creates an empty item for a data ability caller.
    pub fn from_data_caller(caller: &DataAbilityCaller) -> Self {
        Self::new(caller.caller_uid, caller.caller_pid, &caller.caller_name)
    }

    /// Gets the caller uid.
    pub fn caller_uid(&self) -> i32 {
        self.caller.uid
    }

    /// Gets the caller pid.
    pub fn caller_pid(&self) -> i32 {
        self.caller.pid
    }

    /// Gets the caller name.
    pub fn caller_name(&self) -> &str {
        &self.caller.name
    }

    /// Adds the connection of `record`.
    pub fn add_connection(
        &mut self,
        record: &ConnectionRecord,
    ) -> Option<(ConnectionData, ConnectionEvent)> {
        let connection = check_remote!(record.connection(), None, "no connection callback");
        let token = record.target_token();
        let extension = self
            .connection_map
            .entry(token.clone())
            .or_insert_with(|| ConnectedExtension::new(record.ability_record()));
        let event = extension.add_connection(&connection)?;
        let data = self.caller.connection_data(|data| extension.generate_extension_info(data));
        Some((data, event))
    }

    /// Removes the connection of `record`.
    pub fn remove_connection(
        &mut self,
        record: &ConnectionRecord,
    ) -> Option<(ConnectionData, ConnectionEvent)> {
        let connection = check_remote!(record.connection(), None, "no connection callback");
        let token = record.target_token();
        let extension = check_remote!(
            self.connection_map.get_mut(token),
            None,
            "no such connectedExtension"
        );
        let event = extension.remove_connection(&connection)?;
        let data = self.caller.connection_data(|data| extension.generate_extension_info(data));
        if event.disconnected_event {
            self.connection_map.remove(token);
        }
        Some((data, event))
    }

    /// Suspends the connection of `record`. Returns the data to publish if
    /// the target became suspended.
    pub fn suspend_connection(&mut self, record: &ConnectionRecord) -> Option<ConnectionData> {
        let connection = check_remote!(record.connection(), None, "no connection callback");
        let extension = check_remote!(
            self.connection_map.get_mut(record.target_token()),
            None,
            "no such connectedExtension"
        );
        if !extension.suspend_connection(&connection) {
            return None;
        }
        Some(self.caller.connection_data(|data| extension.generate_extension_info(data)))
    }

    /// Resumes the connection of `record`. Returns the data to publish if
    /// the target became active again.
    pub fn resume_connection(&mut self, record: &ConnectionRecord) -> Option<ConnectionData> {
        let connection = check_remote!(record.connection(), None, "no connection callback");
        let extension = check_remote!(
            self.connection_map.get_mut(record.target_token()),
            None,
            "no such connectedExtension"
        );
        if !extension.resume_connection(&connection) {
            return None;
        }
        Some(self.caller.connection_data(|data| extension.generate_extension_info(data)))
    }

    /// Adds `caller` to the data ability `record`. Returns the data to
    /// publish for the first caller.
    pub fn add_data_ability_connection(
        &mut self,
        caller: &DataAbilityCaller,
        record: &DataAbilityRecord,
    ) -> Option<ConnectionData> {
        let ability = check_remote!(record.ability_record(), None, "invalid dataAbility");
        let connected = self
            .data_ability_map
            .entry(ability.token().clone())
            .or_insert_with(|| ConnectedDataAbility::new(ability));
        if !connected.add_caller(caller) {
            return None;
        }
        Some(self.caller.connection_data(|data| connected.generate_extension_info(data)))
    }

    /// Removes `caller` from the data ability `record`. Returns the data to
    /// publish once no caller remains.
    pub fn remove_data_ability_connection(
        &mut self,
        caller: &DataAbilityCaller,
        record: &DataAbilityRecord,
    ) -> Option<ConnectionData> {
        let token = check_remote!(record.token(), None, "invalid data ability token");
        let connected = check_remote!(
            self.data_ability_map.get_mut(&token),
            None,
            "no such connected data ability"
        );
        if !connected.remove_caller(caller) {
            return None;
        }
        let data = self.caller.connection_data(|data| connected.generate_extension_info(data));
        self.data_ability_map.remove(&token);
        Some(data)
    }

    /// Drops the data ability identified by `token`.
    pub fn handle_data_ability_died(&mut self, token: &RemoteObj) -> Option<ConnectionData> {
        let connected = check_remote!(
            self.data_ability_map.remove(token),
            None,
            "no such data ability"
        );
        Some(self.caller.connection_data(|data| connected.generate_extension_info(data)))
    }

    /// Returns `true` if the caller has no connection left.
    pub fn is_empty(&self) -> bool {
        self.connection_map.is_empty() && self.data_ability_map.is_empty()
    }

    /// Snapshot of every connection of this caller.
    pub fn generate_all_connection_data(&self) -> Vec<ConnectionData> {
        let extensions = self.connection_map.values().map(|extension| {
            self.caller.connection_data(|data| extension.generate_extension_info(data))
        });
        let data_abilities = self.data_ability_map.values().map(|connected| {
            self.caller.connection_data(|data| connected.generate_extension_info(data))
        });
        extensions.chain(data_abilities).collect()
    }
}

struct CallerIdentity {
    uid: i32,
    pid: i32,
    name: String,
}

impl CallerIdentity {
    fn connection_data(&self, fill: impl FnOnce(&mut ConnectionData)) -> ConnectionData {
        let mut data = ConnectionData::default();
        fill(&mut data);
        data.caller_uid = self.uid;
        data.caller_pid = self.pid;
        data.caller_name = self.name.clone();
        data
    }
}
