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

//! Composition root of the ability connection service.

use std::sync::{Arc, Mutex};

use ability_utils::logger;

use crate::config::ExtensionConfig;
cfg_dlp! {
    use crate::connection::DlpConnectionInfo;
}
use crate::connection::{ConnectionData, ConnectionObserver, ConnectionStateManager};
use crate::error::ErrorCode;
use crate::record::{
    AbilityConnection, AbilityRecord, CallingIdentity, ConnectionRecord, ConnectionState,
    DisconnectMode,
};
use crate::remote::RemoteObj;
use crate::utils::{ProcessNameResolver, ProcfsProcessNameResolver};

/// The ability connection service.
///
/// Owns the extension configuration, the connection state manager and the
/// live connection records, and drives records through their lifecycle.
pub struct AbilityConnectionService {
    config: ExtensionConfig,
    state_manager: ConnectionStateManager,
    resolver: Box<dyn ProcessNameResolver>,
    connections: Mutex<Vec<Arc<ConnectionRecord>>>,
}

impl AbilityConnectionService {
    /// Creates a service from its parts.
    pub fn new(config: ExtensionConfig, resolver: Box<dyn ProcessNameResolver>) -> Self {
        Self {
            config,
            state_manager: ConnectionStateManager::new(),
            resolver,
            connections: Mutex::new(Vec::new()),
        }
    }

    /// Creates a service with the system configuration and procfs process
    /// lookup.
    pub fn init() -> Self {
        logger::init();
        info!("ability connection service init");

        let config = ExtensionConfig::new();
        config.load_extension_configuration();
        info!("extension config init ok");

        let service = Self::new(config, Box::new(ProcfsProcessNameResolver::new()));
        info!("ability connection service init succeed");
        service
    }

    /// Gets the extension configuration.
    pub fn extension_config(&self) -> &ExtensionConfig {
        &self.config
    }

    /// Gets the connection state manager.
    pub fn state_manager(&self) -> &ConnectionStateManager {
        &self.state_manager
    }

    /// Registers a connection observer.
    pub fn register_observer(&self, observer: Arc<dyn ConnectionObserver>) -> ErrorCode {
        self.state_manager.register_observer(observer)
    }

    /// Unregisters a connection observer.
    pub fn unregister_observer(&self, observer: &Arc<dyn ConnectionObserver>) -> ErrorCode {
        self.state_manager.unregister_observer(observer)
    }

    /// Gets a snapshot of every tracked connection.
    pub fn get_connection_data(&self) -> Vec<ConnectionData> {
        self.state_manager.get_connection_data()
    }

    /// Gets the number of opened DLP abilities per DLP manager.
    #[cfg(feature = "dlp")]
    pub fn get_dlp_connection_infos(&self) -> Vec<DlpConnectionInfo> {
        self.state_manager.get_dlp_connection_infos()
    }

    /// Connects `callback` to `target` on behalf of the calling process.
    ///
    /// If the target is already connected the connection completes at once;
    /// otherwise it waits for [`Self::schedule_connect_ability_done`].
    pub fn connect_ability(
        &self,
        target: Arc<AbilityRecord>,
        callback: Arc<dyn AbilityConnection>,
        caller: Option<&AbilityRecord>,
        calling: CallingIdentity,
    ) -> Result<Arc<ConnectionRecord>, ErrorCode> {
        if callback.as_object().is_none() {
            error!("connect failed, invalid connection callback");
            return Err(ErrorCode::InvalidValue);
        }
        let caller_token = caller.map(|caller| caller.token().clone());
        let record = ConnectionRecord::create(caller_token, target.clone(), Some(callback));
        record.attach_caller_info(caller, calling, self.resolver.as_ref());
        record.connect_ability()?;
        self.connections.lock().unwrap().push(record.clone());

        if target.conn_remote_object().is_some() {
            debug!("target {} already connected", target.element_name());
            record.complete_connect(ErrorCode::ErrOk as i32, &self.state_manager);
        }
        Ok(record)
    }

    /// Called by the target once it is connected, with the object it
    /// returned.
    pub fn schedule_connect_ability_done(
        &self,
        target_token: &RemoteObj,
        remote: Option<RemoteObj>,
    ) -> ErrorCode {
        let records = self.records(|record| {
            record.target_token() == target_token
                && record.connect_state() == ConnectionState::Connecting
        });
        let Some(first) = records.first() else {
            error!("no connecting record of target");
            return ErrorCode::ConnectionNotExist;
        };
        first.ability_record().set_conn_remote_object(remote);
        let mut need_disconnect = false;
        for record in records.iter() {
            if !record.schedule_connect_ability_done(&self.state_manager) {
                need_disconnect = true;
            }
        }
        if need_disconnect {
            warn!("target returned no object, disconnect it");
            return self.schedule_disconnect_ability_done(target_token);
        }
        ErrorCode::ErrOk
    }

    /// Disconnects every connected record using `connection`.
    pub fn disconnect_ability(&self, connection: &RemoteObj) -> ErrorCode {
        let records = self.records(|record| {
            record.connection().as_ref() == Some(connection)
                && record.connect_state() == ConnectionState::Connected
        });
        if records.is_empty() {
            error!("connection not exist");
            return ErrorCode::ConnectionNotExist;
        }
        for record in records.iter() {
            match record.disconnect_ability() {
                Ok(DisconnectMode::Detached) => {
                    record.complete_disconnect(
                        ErrorCode::ErrOk as i32,
                        false,
                        false,
                        &self.state_manager,
                    );
                    self.remove_record(record);
                }
                Ok(DisconnectMode::ScheduleTarget) => {
                    debug!("wait for target {}", record.ability_record().element_name());
                }
                Err(code) => return code,
            }
        }
        ErrorCode::ErrOk
    }

    /// Called by the target once it is disconnected.
    pub fn schedule_disconnect_ability_done(&self, target_token: &RemoteObj) -> ErrorCode {
        let records = self.records(|record| {
            record.target_token() == target_token
                && record.connect_state() == ConnectionState::Disconnecting
        });
        if records.is_empty() {
            error!("no disconnecting record of target");
            return ErrorCode::ConnectionNotExist;
        }
        for record in records.iter() {
            record.schedule_disconnect_ability_done(&self.state_manager);
            self.remove_record(record);
            let target = record.ability_record();
            if target.connect_record_count() == 0 {
                target.set_conn_remote_object(None);
            }
        }
        ErrorCode::ErrOk
    }

    /// Drops every record using `connection` after the client process
    /// died.
    pub fn handle_connection_died(&self, connection: &RemoteObj) {
        let records = self.records(|record| record.connection().as_ref() == Some(connection));
        for record in records.iter() {
            self.force_disconnect(record);
        }
    }

    /// Completes every record of the target `target_token` after the
    /// target process died.
    ///
    /// Clients are told with the result code `-1`.
    pub fn handle_ability_died(&self, target_token: &RemoteObj) {
        let records = self.records(|record| {
            record.target_token() == target_token
                && record.connect_state() != ConnectionState::Disconnected
        });
        let Some(first) = records.first() else {
            debug!("no record of died target");
            return;
        };
        info!("ability died: {}", first.ability_record().element_name());
        first.ability_record().set_conn_remote_object(None);
        for record in records.iter() {
            record.complete_disconnect(ErrorCode::ErrOk as i32, false, true, &self.state_manager);
            record.ability_record().remove_connect_record(record.record_id());
            self.remove_record(record);
        }
    }

    /// Drops every state owned by the process `pid`.
    pub fn handle_app_died(&self, pid: i32) {
        info!("app {} died", pid);
        let records = self.records(|record| record.caller_pid() == pid);
        for record in records.iter() {
            self.force_disconnect(record);
        }
        self.state_manager.handle_app_died(pid);
    }

    /// Describes the live connection records, one line each.
    pub fn dump(&self) -> Vec<String> {
        let mut info = Vec::new();
        for record in self.connections.lock().unwrap().iter() {
            record.dump(&mut info);
        }
        info
    }

    fn force_disconnect(&self, record: &Arc<ConnectionRecord>) {
        record.ability_record().remove_connect_record(record.record_id());
        record.complete_disconnect(ErrorCode::ErrOk as i32, true, false, &self.state_manager);
        record.clear_conn_callback();
        self.remove_record(record);
    }

    fn records(&self, f: impl Fn(&ConnectionRecord) -> bool) -> Vec<Arc<ConnectionRecord>> {
        self.connections
            .lock()
            .unwrap()
            .iter()
            .filter(|record| f(record))
            .cloned()
            .collect()
    }

    fn remove_record(&self, record: &Arc<ConnectionRecord>) {
        self.connections
            .lock()
            .unwrap()
            .retain(|item| !Arc::ptr_eq(item, record));
    }
}
