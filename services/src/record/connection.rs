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

//! Connection record and its lifecycle.

use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::{Arc, Mutex, RwLock};

use ability_utils::element_name::ElementName;

use super::{AbilityRecord, ExtensionAbilityType};
use crate::connection::ConnectionStateManager;
use crate::error::ErrorCode;
use crate::remote::RemoteObj;
use crate::utils::ProcessNameResolver;

static NEXT_RECORD_ID: AtomicI64 = AtomicI64::new(0);

/// Lifecycle state of a connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    /// Created, connect not requested yet.
    Init,
    /// Connect requested, waiting for the target.
    Connecting,
    /// Target reported the connection done.
    Connected,
    /// Disconnect requested, waiting for the target.
    Disconnecting,
    /// Connection finished.
    Disconnected,
}

impl ConnectionState {
    /// Returns the upper-case name used in dumps.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectionState::Init => "INIT",
            ConnectionState::Connecting => "CONNECTING",
            ConnectionState::Connected => "CONNECTED",
            ConnectionState::Disconnecting => "DISCONNECTING",
            ConnectionState::Disconnected => "DISCONNECTED",
        }
    }
}

/// Client side callback of a connection.
pub trait AbilityConnection: Send + Sync {
    /// Gets the remote object identifying this callback.
    fn as_object(&self) -> Option<RemoteObj>;

    /// Called once the target ability has been connected.
    fn on_ability_connect_done(&self, element: &ElementName, remote: &RemoteObj, result_code: i32);

    /// Called once the target ability has been disconnected.
    fn on_ability_disconnect_done(&self, element: &ElementName, result_code: i32);
}

/// Identity of the process issuing a request.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CallingIdentity {
    /// Calling uid.
    pub uid: i32,
    /// Calling pid.
    pub pid: i32,
}

/// What has to happen after [`ConnectionRecord::disconnect_ability`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DisconnectMode {
    /// The target must be told to disconnect; the record waits in
    /// `Disconnecting` for `schedule_disconnect_ability_done`.
    ScheduleTarget,
    /// Other connections keep the target alive; the record was detached and
    /// is already `Disconnected`.
    Detached,
}

#[derive(Clone, Default)]
struct CallerInfo {
    uid: i32,
    pid: i32,
    name: String,
}

/// One connection from a caller to a target ability.
pub struct ConnectionRecord {
    record_id: i64,
    state: Mutex<ConnectionState>,
    caller_token: Option<RemoteObj>,
    target: Arc<AbilityRecord>,
    callback: Mutex<Option<Arc<dyn AbilityConnection>>>,
    caller: RwLock<CallerInfo>,
}

impl ConnectionRecord {
    /// Creates a connection record in `Init` state and attaches it to the
    /// target ability.
    pub fn create(
        caller_token: Option<RemoteObj>,
        target: Arc<AbilityRecord>,
        callback: Option<Arc<dyn AbilityConnection>>,
    ) -> Arc<Self> {
        let record_id = NEXT_RECORD_ID.fetch_add(1, Ordering::Relaxed);
        target.add_connect_record(record_id);
        Arc::new(Self {
            record_id,
            state: Mutex::new(ConnectionState::Init),
            caller_token,
            target,
            callback: Mutex::new(callback),
            caller: RwLock::new(CallerInfo::default()),
        })
    }

    /// Gets the unique id of this record.
    pub fn record_id(&self) -> i64 {
        self.record_id
    }

    /// Gets the current lifecycle state.
    pub fn connect_state(&self) -> ConnectionState {
        *self.state.lock().unwrap()
    }

    /// Sets the lifecycle state.
    pub fn set_connect_state(&self, state: ConnectionState) {
        *self.state.lock().unwrap() = state;
    }

    /// Gets the token of the caller ability, if the caller is an ability.
    pub fn caller_token(&self) -> Option<&RemoteObj> {
        self.caller_token.as_ref()
    }

    /// Gets the target ability.
    pub fn ability_record(&self) -> &Arc<AbilityRecord> {
        &self.target
    }

    /// Gets the token of the target ability.
    pub fn target_token(&self) -> &RemoteObj {
        self.target.token()
    }

    /// Gets the client callback.
    pub fn ability_connect_callback(&self) -> Option<Arc<dyn AbilityConnection>> {
        self.callback.lock().unwrap().clone()
    }

    /// Gets the remote object of the client callback.
    pub fn connection(&self) -> Option<RemoteObj> {
        self.ability_connect_callback()?.as_object()
    }

    /// Drops the client callback, e.g. after the client died.
    pub fn clear_conn_callback(&self) {
        self.callback.lock().unwrap().take();
    }

    /// Fills in the caller identity.
    ///
    /// When the caller is an ability its record wins; otherwise the calling
    /// identity is used and the name is resolved from the pid.
    pub fn attach_caller_info(
        &self,
        caller_ability: Option<&AbilityRecord>,
        calling: CallingIdentity,
        resolver: &dyn ProcessNameResolver,
    ) {
        let mut caller = self.caller.write().unwrap();
        if let Some(ability) = caller_ability {
            caller.uid = ability.uid();
            caller.pid = ability.pid();
            caller.name = ability.info().bundle_name.clone();
            return;
        }
        caller.uid = calling.uid;
        caller.pid = calling.pid;
        caller.name = resolver.process_name(calling.pid).unwrap_or_default();
    }

    /// Gets the caller uid.
    pub fn caller_uid(&self) -> i32 {
        self.caller.read().unwrap().uid
    }

    /// Gets the caller pid.
    pub fn caller_pid(&self) -> i32 {
        self.caller.read().unwrap().pid
    }

    /// Gets the caller process or bundle name.
    pub fn caller_name(&self) -> String {
        self.caller.read().unwrap().name.clone()
    }

    /// Starts connecting. Only valid from `Init`.
    pub fn connect_ability(&self) -> Result<(), ErrorCode> {
        let mut state = self.state.lock().unwrap();
        if *state != ConnectionState::Init {
            error!("connect failed, state: {}", state.as_str());
            return Err(ErrorCode::InvalidConnectionState);
        }
        *state = ConnectionState::Connecting;
        Ok(())
    }

    /// Starts disconnecting. Only valid from `Connected`.
    pub fn disconnect_ability(&self) -> Result<DisconnectMode, ErrorCode> {
        let mut state = self.state.lock().unwrap();
        if *state != ConnectionState::Connected {
            error!("connection not established, state: {}", state.as_str());
            return Err(ErrorCode::InvalidConnectionState);
        }
        *state = ConnectionState::Disconnecting;

        let connect_nums = self.target.connect_record_count();
        let is_ui_service =
            self.target.info().extension_ability_type == ExtensionAbilityType::UiService;
        if connect_nums == 1 || is_ui_service {
            return Ok(DisconnectMode::ScheduleTarget);
        }
        debug!(
            "current connection count: {}, no need disconnect, just remove",
            connect_nums
        );
        self.target.remove_connect_record(self.record_id);
        *state = ConnectionState::Disconnected;
        Ok(DisconnectMode::Detached)
    }

    /// Completes a connect request and reports it to `manager`.
    ///
    /// Returns `false` if the target gave no connect object; the record is
    /// then left `Disconnecting` and the target must be disconnected.
    pub fn complete_connect(
        self: &Arc<Self>,
        result_code: i32,
        manager: &ConnectionStateManager,
    ) -> bool {
        if result_code == ErrorCode::ErrOk as i32 {
            self.set_connect_state(ConnectionState::Connected);
        }
        let element = self.target.element_name();
        let Some(remote) = self.target.conn_remote_object() else {
            warn!("extension returned null: {}", element);
            self.set_connect_state(ConnectionState::Disconnecting);
            return false;
        };
        if let Some(callback) = self.ability_connect_callback() {
            callback.on_ability_connect_done(&element, &remote, result_code);
        }
        manager.add_connection(self);
        info!(
            "result: {}, connectState: {}",
            result_code,
            self.connect_state().as_str()
        );
        true
    }

    /// Completes a disconnect request and reports it to `manager`.
    pub fn complete_disconnect(
        self: &Arc<Self>,
        result_code: i32,
        is_caller_died: bool,
        is_target_died: bool,
        manager: &ConnectionStateManager,
    ) {
        if result_code == ErrorCode::ErrOk as i32 {
            self.set_connect_state(ConnectionState::Disconnected);
            self.target.remove_connect_record(self.record_id);
        }
        let element = self.target.element_name();
        let code = if is_target_died {
            result_code - 1
        } else {
            result_code
        };
        match self.ability_connect_callback() {
            Some(callback) => callback.on_ability_disconnect_done(&element, code),
            None => debug!("null connCallback"),
        }
        manager.remove_connection(self, is_caller_died);
        debug!(
            "result: {}, connectState: {}",
            result_code,
            self.connect_state().as_str()
        );
    }

    /// Called when the target reports connect done.
    ///
    /// Returns `false` if the record has to be disconnected instead, see
    /// [`Self::complete_connect`].
    pub fn schedule_connect_ability_done(
        self: &Arc<Self>,
        manager: &ConnectionStateManager,
    ) -> bool {
        if self.connect_state() != ConnectionState::Connecting {
            error!("failed, current state not connecting");
            return true;
        }
        self.complete_connect(ErrorCode::ErrOk as i32, manager)
    }

    /// Called when the target reports disconnect done.
    pub fn schedule_disconnect_ability_done(self: &Arc<Self>, manager: &ConnectionStateManager) {
        if self.connect_state() != ConnectionState::Disconnecting {
            error!("failed, current state not disconnecting");
            return;
        }
        let is_caller_died = self.ability_connect_callback().is_none();
        self.complete_disconnect(ErrorCode::ErrOk as i32, is_caller_died, false, manager);
    }

    /// Appends a one line description of this record to `info`.
    pub fn dump(&self, info: &mut Vec<String>) {
        let ability_info = self.target.info();
        info.push(format!(
            "       > {}/{}   connectionState #{}",
            ability_info.bundle_name,
            ability_info.name,
            self.connect_state().as_str()
        ));
    }
}
