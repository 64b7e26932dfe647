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

//! Connection observers and their registry.

use std::sync::{Arc, Mutex, Weak};

use super::ConnectionData;
cfg_dlp! {
    use super::DlpStateData;
}
use crate::error::ErrorCode;
use crate::remote::{DeathRecipient, RemoteObj, WeakRemoteObj};

/// Receiver of connection state changes, usually living in another process.
#[allow(unused)]
pub trait ConnectionObserver: Send + Sync {
    /// Gets the remote object identifying this observer.
    fn as_object(&self) -> Option<RemoteObj>;

    /// An extension got its first connection from a caller.
    fn on_extension_connected(&self, data: &ConnectionData) {}

    /// An extension lost its last connection from a caller.
    fn on_extension_disconnected(&self, data: &ConnectionData) {}

    /// Every connection from a caller to an extension is suspended.
    fn on_extension_suspended(&self, data: &ConnectionData) {}

    /// A suspended extension got an active connection again.
    fn on_extension_resumed(&self, data: &ConnectionData) {}

    /// A DLP ability was opened.
    #[cfg(feature = "dlp")]
    fn on_dlp_ability_opened(&self, data: &DlpStateData) {}

    /// A DLP ability was closed.
    #[cfg(feature = "dlp")]
    fn on_dlp_ability_closed(&self, data: &DlpStateData) {}
}

struct ObserverDeathRecipient {
    controller: Weak<ConnectionObserverController>,
}

impl DeathRecipient for ObserverDeathRecipient {
    fn on_remote_died(&self, remote: &WeakRemoteObj) {
        if let Some(controller) = self.controller.upgrade() {
            controller.handle_remote_died(remote);
        }
    }
}

struct Observers {
    list: Vec<Arc<dyn ConnectionObserver>>,
    death_recipient: Option<Arc<dyn DeathRecipient>>,
}

/// Registry of connection observers.
///
/// Observers are identified by their remote object. An observer whose
/// process dies is dropped from the registry automatically.
pub struct ConnectionObserverController {
    observers: Mutex<Observers>,
    this: Weak<ConnectionObserverController>,
}

impl ConnectionObserverController {
    /// Creates an empty controller.
    pub fn new() -> Arc<Self> {
        Arc::new_cyclic(|this| Self {
            observers: Mutex::new(Observers {
                list: Vec::new(),
                death_recipient: None,
            }),
            this: this.clone(),
        })
    }

    /// Registers `observer`.
    ///
    /// Registering an observer twice keeps a single entry. An observer whose
    /// process already died is rejected with `InvalidObserver`.
    pub fn add_observer(&self, observer: Arc<dyn ConnectionObserver>) -> ErrorCode {
        let Some(object) = observer.as_object() else {
            error!("invalid observer");
            return ErrorCode::InvalidObserver;
        };
        let mut observers = self.observers.lock().unwrap();
        if observers
            .list
            .iter()
            .any(|item| item.as_object().as_ref() == Some(&object))
        {
            warn!("observer already added");
            return ErrorCode::ErrOk;
        }

        let this = self.this.clone();
        let recipient = observers
            .death_recipient
            .get_or_insert_with(|| {
                Arc::new(ObserverDeathRecipient { controller: this }) as Arc<dyn DeathRecipient>
            })
            .clone();
        if !object.add_death_recipient(recipient) {
            error!("AddDeathRecipient failed, observer already died");
            return ErrorCode::InvalidObserver;
        }
        observers.list.push(observer);
        debug!("observer added, total {}", observers.list.len());
        ErrorCode::ErrOk
    }

    /// Unregisters `observer`. Unknown observers are ignored.
    pub fn remove_observer(&self, observer: &Arc<dyn ConnectionObserver>) {
        let Some(object) = observer.as_object() else {
            error!("observer invalid");
            return;
        };
        let mut observers = self.observers.lock().unwrap();
        if let Some(index) = observers
            .list
            .iter()
            .position(|item| item.as_object().as_ref() == Some(&object))
        {
            observers.list.remove(index);
            if let Some(recipient) = observers.death_recipient.as_ref() {
                object.remove_death_recipient(recipient);
            }
        }
    }

    /// Notifies every observer that an extension was connected.
    pub fn notify_extension_connected(&self, data: &ConnectionData) {
        self.call_observers(|observer| observer.on_extension_connected(data));
    }

    /// Notifies every observer that an extension was disconnected.
    pub fn notify_extension_disconnected(&self, data: &ConnectionData) {
        self.call_observers(|observer| observer.on_extension_disconnected(data));
    }

    /// Notifies every observer that an extension was suspended.
    pub fn notify_extension_suspended(&self, data: &ConnectionData) {
        self.call_observers(|observer| observer.on_extension_suspended(data));
    }

    /// Notifies every observer that an extension was resumed.
    pub fn notify_extension_resumed(&self, data: &ConnectionData) {
        self.call_observers(|observer| observer.on_extension_resumed(data));
    }

    /// Notifies every observer that a DLP ability was opened.
    #[cfg(feature = "dlp")]
    pub fn notify_dlp_ability_opened(&self, data: &DlpStateData) {
        self.call_observers(|observer| observer.on_dlp_ability_opened(data));
    }

    /// Notifies every observer that a DLP ability was closed.
    #[cfg(feature = "dlp")]
    pub fn notify_dlp_ability_closed(&self, data: &DlpStateData) {
        self.call_observers(|observer| observer.on_dlp_ability_closed(data));
    }

    /// Gets a snapshot of the registered observers.
    pub fn get_observers(&self) -> Vec<Arc<dyn ConnectionObserver>> {
        self.observers.lock().unwrap().list.clone()
    }

    /// Drops the observer living behind `remote`.
    pub fn handle_remote_died(&self, remote: &WeakRemoteObj) {
        debug!("remote connection observer died");
        let mut observers = self.observers.lock().unwrap();
        if let Some(object) = remote.upgrade() {
            if let Some(recipient) = observers.death_recipient.as_ref() {
                object.remove_death_recipient(recipient);
            }
        }
        observers.list.retain(|item| match item.as_object() {
            Some(object) => !remote.is_same(&object),
            None => false,
        });
    }

    fn call_observers(&self, f: impl Fn(&dyn ConnectionObserver)) {
        for observer in self.get_observers() {
            f(observer.as_ref());
        }
    }
}
