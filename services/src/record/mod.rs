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

//! Ability side records.
//!
//! The records here describe the targets of connections: running abilities
//! and data abilities, together with the per-connection `ConnectionRecord`.

mod connection;

use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, Mutex};

use ability_utils::element_name::ElementName;
pub use connection::{
    AbilityConnection, CallingIdentity, ConnectionRecord, ConnectionState, DisconnectMode,
};

use crate::remote::RemoteObj;

const ABILITY_TOKEN_DESCRIPTOR: &str = "ohos.aafwk.AbilityToken";

/// Kind of an ability.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AbilityType {
    /// Unknown ability type.
    #[default]
    Unknown,
    /// Page (UI) ability.
    Page,
    /// Service ability (FA model).
    Service,
    /// Data ability (FA model).
    Data,
    /// Extension ability (stage model).
    Extension,
}

/// Kind of an extension ability.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum ExtensionAbilityType {
    /// Form extension.
    Form,
    /// Work scheduler extension.
    WorkScheduler,
    /// Input method extension.
    InputMethod,
    /// Service extension.
    Service,
    /// Accessibility extension.
    Accessibility,
    /// Data share extension.
    DataShare,
    /// Static subscriber extension.
    StaticSubscriber,
    /// Wallpaper extension.
    Wallpaper,
    /// Backup extension.
    Backup,
    /// Window extension.
    Window,
    /// Enterprise admin extension.
    EnterpriseAdmin,
    /// File access extension.
    FileAccess,
    /// Vpn extension.
    Vpn,
    /// UI extension.
    Ui,
    /// UI service extension.
    UiService,
    /// System common UI extension.
    SysCommonUi,
    /// App service extension.
    AppService,
    /// Unspecified extension type.
    #[default]
    Unspecified,
}

/// Static description of an ability.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AbilityInfo {
    /// Device the ability runs on, empty for the local device.
    pub device_id: String,
    /// Bundle the ability belongs to.
    pub bundle_name: String,
    /// Module the ability belongs to.
    pub module_name: String,
    /// Ability name.
    pub name: String,
    /// Kind of the ability.
    pub ability_type: AbilityType,
    /// Kind of the extension, only meaningful for extension abilities.
    pub extension_ability_type: ExtensionAbilityType,
}

impl AbilityInfo {
    /// Gets the element name of this ability.
    pub fn element_name(&self) -> ElementName {
        ElementName::new(
            &self.device_id,
            &self.bundle_name,
            &self.name,
            &self.module_name,
        )
    }
}

/// A running (or starting) ability instance.
pub struct AbilityRecord {
    info: AbilityInfo,
    token: RemoteObj,
    uid: i32,
    owner_user_id: i32,
    pid: AtomicI32,
    conn_remote_object: Mutex<Option<RemoteObj>>,
    connect_records: Mutex<Vec<i64>>,
}

impl AbilityRecord {
    /// Creates a new ability record with a fresh token.
    pub fn new(info: AbilityInfo, uid: i32, owner_user_id: i32) -> Self {
        Self {
            info,
            token: RemoteObj::new(ABILITY_TOKEN_DESCRIPTOR),
            uid,
            owner_user_id,
            pid: AtomicI32::new(0),
            conn_remote_object: Mutex::new(None),
            connect_records: Mutex::new(Vec::new()),
        }
    }

    /// Gets the static ability info.
    pub fn info(&self) -> &AbilityInfo {
        &self.info
    }

    /// Gets the token identifying this ability.
    pub fn token(&self) -> &RemoteObj {
        &self.token
    }

    /// Gets the pid of the hosting process, 0 before it is attached.
    pub fn pid(&self) -> i32 {
        self.pid.load(Ordering::Acquire)
    }

    /// Records the pid of the hosting process.
    pub fn set_pid(&self, pid: i32) {
        self.pid.store(pid, Ordering::Release);
    }

    /// Gets the uid of the hosting application.
    pub fn uid(&self) -> i32 {
        self.uid
    }

    /// Gets the user id owning this ability.
    pub fn owner_user_id(&self) -> i32 {
        self.owner_user_id
    }

    /// Gets the element name of this ability.
    pub fn element_name(&self) -> ElementName {
        self.info.element_name()
    }

    /// Gets the object returned by the extension when it was connected.
    pub fn conn_remote_object(&self) -> Option<RemoteObj> {
        self.conn_remote_object.lock().unwrap().clone()
    }

    /// Stores the object returned by the extension on connect.
    pub fn set_conn_remote_object(&self, remote: Option<RemoteObj>) {
        *self.conn_remote_object.lock().unwrap() = remote;
    }

    /// Number of connection records attached to this ability.
    pub fn connect_record_count(&self) -> usize {
        self.connect_records.lock().unwrap().len()
    }

    pub(crate) fn add_connect_record(&self, record_id: i64) {
        let mut records = self.connect_records.lock().unwrap();
        if !records.contains(&record_id) {
            records.push(record_id);
        }
    }

    pub(crate) fn remove_connect_record(&self, record_id: i64) {
        self.connect_records
            .lock()
            .unwrap()
            .retain(|id| *id != record_id);
    }
}

/// A data ability, which may not be backed by a running ability yet.
#[derive(Clone, Default)]
pub struct DataAbilityRecord {
    ability: Option<Arc<AbilityRecord>>,
}

impl DataAbilityRecord {
    /// Creates a data ability record.
    pub fn new(ability: Option<Arc<AbilityRecord>>) -> Self {
        Self { ability }
    }

    /// Gets the backing ability record.
    pub fn ability_record(&self) -> Option<&Arc<AbilityRecord>> {
        self.ability.as_ref()
    }

    /// Gets the token of the backing ability.
    pub fn token(&self) -> Option<RemoteObj> {
        self.ability.as_ref().map(|ability| ability.token().clone())
    }
}
