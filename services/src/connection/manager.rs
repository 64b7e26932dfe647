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

//! Process wide connection state.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use super::{
    ConnectionData, ConnectionObserver, ConnectionObserverController, ConnectionStateItem,
    DataAbilityCaller,
};
cfg_dlp! {
    use super::{DlpConnectionInfo, DlpStateItem};
    use crate::record::AbilityRecord;
}
use crate::error::ErrorCode;
use crate::record::{ConnectionRecord, DataAbilityRecord};

/// Tracks the connections of every caller process and publishes the
/// resulting transitions to the registered observers.
///
/// Items are keyed by caller pid. All bookkeeping happens under the item
/// lock; observers are called after it is released.
pub struct ConnectionStateManager {
    controller: Arc<ConnectionObserverController>,
    connection_states: Mutex<HashMap<i32, ConnectionStateItem>>,
    #[cfg(feature = "dlp")]
    dlp_items: Mutex<HashMap<i32, DlpStateItem>>,
}

impl ConnectionStateManager {
    /// Creates a manager without any observer.
    pub fn new() -> Self {
        Self {
            controller: ConnectionObserverController::new(),
            connection_states: Mutex::new(HashMap::new()),
            #[cfg(feature = "dlp")]
            dlp_items: Mutex::new(HashMap::new()),
        }
    }

    /// Gets the observer controller.
    pub fn controller(&self) -> &Arc<ConnectionObserverController> {
        &self.controller
    }

    /// Registers a connection observer.
    pub fn register_observer(&self, observer: Arc<dyn ConnectionObserver>) -> ErrorCode {
        self.controller.add_observer(observer)
    }

    /// Unregisters a connection observer.
    pub fn unregister_observer(&self, observer: &Arc<dyn ConnectionObserver>) -> ErrorCode {
        self.controller.remove_observer(observer);
        ErrorCode::ErrOk
    }

    /// Records that `record` got connected.
    pub fn add_connection(&self, record: &ConnectionRecord) {
        let caller_pid = record.caller_pid();
        let result = {
            let mut states = self.connection_states.lock().unwrap();
            let item = states
                .entry(caller_pid)
                .or_insert_with(|| ConnectionStateItem::from_record(record));
            let result = item.add_connection(record);
            if item.is_empty() {
                states.remove(&caller_pid);
            }
            result
        };

        let Some((data, event)) = result else {
            return;
        };
        if event.connected_event {
            info!(
                "extension {} connected by {}",
                data.extension_name, data.caller_pid
            );
            self.controller.notify_extension_connected(&data);
        }
        if event.resumed_event {
            info!(
                "extension {} resumed by {}",
                data.extension_name, data.caller_pid
            );
            self.controller.notify_extension_resumed(&data);
        }
    }

    /// Records that `record` got disconnected.
    ///
    /// When the caller died every connection of the caller is dropped at
    /// once.
    pub fn remove_connection(&self, record: &ConnectionRecord, is_caller_died: bool) {
        let caller_pid = record.caller_pid();
        if is_caller_died {
            self.handle_caller_died(caller_pid);
            return;
        }

        let result = {
            let mut states = self.connection_states.lock().unwrap();
            let Some(item) = states.get_mut(&caller_pid) else {
                debug!("no connection state of caller {}", caller_pid);
                return;
            };
            let result = item.remove_connection(record);
            if item.is_empty() {
                states.remove(&caller_pid);
            }
            result
        };

        let Some((data, event)) = result else {
            return;
        };
        if event.disconnected_event {
            info!(
                "extension {} disconnected by {}",
                data.extension_name, data.caller_pid
            );
            self.controller.notify_extension_disconnected(&data);
        }
        if event.suspended_event {
            info!(
                "extension {} suspended by {}",
                data.extension_name, data.caller_pid
            );
            self.controller.notify_extension_suspended(&data);
        }
    }

    /// Suspends or resumes the connection of `record`.
    pub fn suspend_or_resume_connection(&self, record: &ConnectionRecord, is_suspend: bool) {
        let caller_pid = record.caller_pid();
        let data = {
            let mut states = self.connection_states.lock().unwrap();
            let Some(item) = states.get_mut(&caller_pid) else {
                debug!("no connection state of caller {}", caller_pid);
                return;
            };
            if is_suspend {
                item.suspend_connection(record)
            } else {
                item.resume_connection(record)
            }
        };

        match data {
            Some(data) if is_suspend => self.controller.notify_extension_suspended(&data),
            Some(data) => self.controller.notify_extension_resumed(&data),
            None => {}
        }
    }

    /// Records that `caller` acquired the data ability `record`.
    pub fn add_data_ability_connection(
        &self,
        caller: &DataAbilityCaller,
        record: &DataAbilityRecord,
    ) {
        if !Self::check_data_ability_connection_params(caller, record) {
            return;
        }

        let data = {
            let mut states = self.connection_states.lock().unwrap();
            let item = states
                .entry(caller.caller_pid)
                .or_insert_with(|| ConnectionStateItem::from_data_caller(caller));
            let data = item.add_data_ability_connection(caller, record);
            if item.is_empty() {
                states.remove(&caller.caller_pid);
            }
            data
        };

        if let Some(data) = data {
            self.controller.notify_extension_connected(&data);
        }
    }

    /// Records that `caller` released the data ability `record`.
    pub fn remove_data_ability_connection(
        &self,
        caller: &DataAbilityCaller,
        record: &DataAbilityRecord,
    ) {
        if !Self::check_data_ability_connection_params(caller, record) {
            return;
        }

        let data = {
            let mut states = self.connection_states.lock().unwrap();
            let Some(item) = states.get_mut(&caller.caller_pid) else {
                debug!("no connection state of caller {}", caller.caller_pid);
                return;
            };
            let data = item.remove_data_ability_connection(caller, record);
            if item.is_empty() {
                states.remove(&caller.caller_pid);
            }
            data
        };

        if let Some(data) = data {
            self.controller.notify_extension_disconnected(&data);
        }
    }

    /// Drops the data ability `record` from every caller.
    pub fn handle_data_ability_died(&self, record: &DataAbilityRecord) {
        let Some(token) = record.token() else {
            error!("invalid data ability token");
            return;
        };

        let all_data: Vec<ConnectionData> = {
            let mut states = self.connection_states.lock().unwrap();
            let all_data: Vec<ConnectionData> = states
                .values_mut()
                .filter_map(|item| item.handle_data_ability_died(&token))
                .collect();
            states.retain(|_, item| !item.is_empty());
            all_data
        };

        for data in all_data.iter() {
            self.controller.notify_extension_disconnected(data);
        }
    }

    /// Drops every connection of a data ability caller that died.
    pub fn handle_data_ability_caller_died(&self, caller_pid: i32) {
        if caller_pid <= 0 {
            warn!("invalid data ability caller pid: {}", caller_pid);
            return;
        }
        self.handle_caller_died(caller_pid);
    }

    /// Drops every state owned by the process `pid`.
    pub fn handle_app_died(&self, pid: i32) {
        self.handle_caller_died(pid);

        #[cfg(feature = "dlp")]
        self.dlp_items
            .lock()
            .unwrap()
            .retain(|_, item| item.dlp_pid() != pid);
    }

    /// Gets a snapshot of every tracked connection.
    pub fn get_connection_data(&self) -> Vec<ConnectionData> {
        self.connection_states
            .lock()
            .unwrap()
            .values()
            .flat_map(|item| item.generate_all_connection_data())
            .collect()
    }

    /// Starts tracking the DLP manager `manager`.
    #[cfg(feature = "dlp")]
    pub fn add_dlp_manager(&self, manager: &AbilityRecord) {
        self.dlp_items
            .lock()
            .unwrap()
            .entry(manager.owner_user_id())
            .or_insert_with(|| DlpStateItem::new(manager));
    }

    /// Stops tracking the DLP manager `manager`.
    #[cfg(feature = "dlp")]
    pub fn remove_dlp_manager(&self, manager: &AbilityRecord) {
        self.dlp_items
            .lock()
            .unwrap()
            .remove(&manager.owner_user_id());
    }

    /// Records that the DLP ability `ability` was opened.
    #[cfg(feature = "dlp")]
    pub fn add_dlp_ability(&self, ability: &AbilityRecord) {
        let data = {
            let mut items = self.dlp_items.lock().unwrap();
            let Some(item) = items.get_mut(&ability.owner_user_id()) else {
                warn!("no dlp manager of user {}", ability.owner_user_id());
                return;
            };
            item.add_dlp_connection_state(ability)
        };
        if let Some(data) = data {
            self.controller.notify_dlp_ability_opened(&data);
        }
    }

    /// Records that the DLP ability `ability` was closed.
    #[cfg(feature = "dlp")]
    pub fn remove_dlp_ability(&self, ability: &AbilityRecord) {
        let data = {
            let mut items = self.dlp_items.lock().unwrap();
            let Some(item) = items.get_mut(&ability.owner_user_id()) else {
                warn!("no dlp manager of user {}", ability.owner_user_id());
                return;
            };
            item.remove_dlp_connection_state(ability)
        };
        if let Some(data) = data {
            self.controller.notify_dlp_ability_closed(&data);
        }
    }

    /// Gets the number of opened DLP abilities per DLP manager.
    #[cfg(feature = "dlp")]
    pub fn get_dlp_connection_infos(&self) -> Vec<DlpConnectionInfo> {
        self.dlp_items
            .lock()
            .unwrap()
            .values()
            .map(|item| DlpConnectionInfo {
                dlp_uid: item.dlp_uid(),
                opened_ability_count: item.opened_ability_size() as i32,
            })
            .collect()
    }

    fn handle_caller_died(&self, caller_pid: i32) {
        let Some(item) = self.connection_states.lock().unwrap().remove(&caller_pid) else {
            return;
        };
        info!("caller {} died, drop its connections", caller_pid);
        for data in item.generate_all_connection_data() {
            self.controller.notify_extension_disconnected(&data);
        }
    }

    fn check_data_ability_connection_params(
        caller: &DataAbilityCaller,
        record: &DataAbilityRecord,
    ) -> bool {
        if caller.caller_pid == 0 {
            error!("invalid data ability caller pid");
            return false;
        }
        if record.token().is_none() {
            error!("invalid data ability token");
            return false;
        }
        true
    }
}
