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

//! Connection state tracking.
//!
//! Tracks which processes are connected to which extensions and data
//! abilities, derives connected / suspended / resumed / disconnected edges
//! from connection count transitions, and fans those edges out to the
//! registered connection observers.

mod data_ability;
mod extension;
mod manager;
mod observer;
mod state_item;

cfg_dlp! {
    mod dlp;
    pub use dlp::DlpStateItem;
}

pub use data_ability::ConnectedDataAbility;
pub use extension::ConnectedExtension;
pub use manager::ConnectionStateManager;
pub use observer::{ConnectionObserver, ConnectionObserverController};
pub use state_item::ConnectionStateItem;

use crate::record::ExtensionAbilityType;
use crate::remote::RemoteObj;

/// Snapshot of one caller to target connection, as reported to observers.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ConnectionData {
    /// Pid of the connected extension.
    pub extension_pid: i32,
    /// Uid of the connected extension.
    pub extension_uid: i32,
    /// Bundle of the connected extension.
    pub extension_bundle_name: String,
    /// Module of the connected extension.
    pub extension_module_name: String,
    /// Ability name of the connected extension.
    pub extension_name: String,
    /// Kind of the connected extension.
    pub extension_type: ExtensionAbilityType,
    /// Uid of the caller.
    pub caller_uid: i32,
    /// Pid of the caller.
    pub caller_pid: i32,
    /// Process or bundle name of the caller.
    pub caller_name: String,
    /// `true` when every connection to the extension is suspended.
    pub is_suspended: bool,
}

/// Edge produced by a connection count transition.
///
/// At most one flag is set per transition.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ConnectionEvent {
    /// The first connection to the target was added.
    pub connected_event: bool,
    /// A connection became active while all others were suspended.
    pub resumed_event: bool,
    /// The last active connection went away while others remain.
    pub suspended_event: bool,
    /// The last connection to the target was removed.
    pub disconnected_event: bool,
}

impl ConnectionEvent {
    pub(crate) fn connected() -> Self {
        Self {
            connected_event: true,
            ..Default::default()
        }
    }

    pub(crate) fn resumed() -> Self {
        Self {
            resumed_event: true,
            ..Default::default()
        }
    }

    pub(crate) fn suspended() -> Self {
        Self {
            suspended_event: true,
            ..Default::default()
        }
    }

    pub(crate) fn disconnected() -> Self {
        Self {
            disconnected_event: true,
            ..Default::default()
        }
    }
}

/// Caller of a data ability.
#[derive(Clone, Debug, Default)]
pub struct DataAbilityCaller {
    /// `true` for native (non hap) callers, identified by pid.
    pub is_not_hap: bool,
    /// Pid of the caller.
    pub caller_pid: i32,
    /// Uid of the caller.
    pub caller_uid: i32,
    /// Process or bundle name of the caller.
    pub caller_name: String,
    /// Token of the caller ability, identifies hap callers.
    pub caller_token: Option<RemoteObj>,
}

impl DataAbilityCaller {
    pub(crate) fn is_valid(&self) -> bool {
        self.is_not_hap || self.caller_token.is_some()
    }
}

/// State of one DLP ability opened by a DLP manager.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DlpStateData {
    /// Uid of the DLP manager.
    pub caller_uid: i32,
    /// Pid of the DLP manager.
    pub caller_pid: i32,
    /// Bundle name of the DLP manager.
    pub caller_name: String,
    /// Pid of the opened ability.
    pub target_pid: i32,
    /// Uid of the opened ability.
    pub target_uid: i32,
    /// Bundle of the opened ability.
    pub target_bundle_name: String,
    /// Module of the opened ability.
    pub target_module_name: String,
    /// Name of the opened ability.
    pub target_ability_name: String,
}

/// Number of DLP abilities opened through one DLP manager.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DlpConnectionInfo {
    /// Uid of the DLP manager.
    pub dlp_uid: i32,
    /// Number of opened DLP abilities.
    pub opened_ability_count: i32,
}
