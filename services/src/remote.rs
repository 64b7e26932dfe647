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

//! Handles to remote objects and their liveness.
//!
//! A `RemoteObj` stands for an object living in another process: a connection
//! callback, an ability token or a registered observer. Handles are compared
//! by identity only. When the peer process dies the owner of the handle calls
//! [`RemoteObj::notify_died`], which fires every registered
//! [`DeathRecipient`] exactly once.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex, Weak};

/// Callback invoked when the peer behind a `RemoteObj` dies.
pub trait DeathRecipient: Send + Sync {
    /// Called once, from the thread reporting the death.
    fn on_remote_died(&self, remote: &WeakRemoteObj);
}

struct RemoteState {
    dead: bool,
    recipients: Vec<Arc<dyn DeathRecipient>>,
}

struct RemoteInner {
    descriptor: String,
    state: Mutex<RemoteState>,
}

/// Shared handle to a remote object.
#[derive(Clone)]
pub struct RemoteObj {
    inner: Arc<RemoteInner>,
}

impl RemoteObj {
    /// Creates a new live remote object with the given interface descriptor.
    pub fn new(descriptor: &str) -> Self {
        Self {
            inner: Arc::new(RemoteInner {
                descriptor: descriptor.to_string(),
                state: Mutex::new(RemoteState {
                    dead: false,
                    recipients: Vec::new(),
                }),
            }),
        }
    }

    /// Gets the interface descriptor of this object.
    pub fn descriptor(&self) -> &str {
        &self.inner.descriptor
    }

    /// Returns `true` once the peer has been reported dead.
    pub fn is_dead(&self) -> bool {
        self.inner.state.lock().unwrap().dead
    }

    /// Subscribes `recipient` to the death of this object.
    ///
    /// Returns `false` if the object is already dead. Adding the same
    /// recipient twice keeps a single subscription.
    pub fn add_death_recipient(&self, recipient: Arc<dyn DeathRecipient>) -> bool {
        let mut state = self.inner.state.lock().unwrap();
        if state.dead {
            return false;
        }
        if !state.recipients.iter().any(|r| same_recipient(r, &recipient)) {
            state.recipients.push(recipient);
        }
        true
    }

    /// Unsubscribes `recipient`. Returns `false` if it was not subscribed.
    pub fn remove_death_recipient(&self, recipient: &Arc<dyn DeathRecipient>) -> bool {
        let mut state = self.inner.state.lock().unwrap();
        let len = state.recipients.len();
        state.recipients.retain(|r| !same_recipient(r, recipient));
        state.recipients.len() != len
    }

    /// Reports the death of the peer process.
    ///
    /// Recipients are called outside the internal lock so they may call back
    /// into this object. Subsequent calls are no-ops.
    pub fn notify_died(&self) {
        let recipients = {
            let mut state = self.inner.state.lock().unwrap();
            if state.dead {
                return;
            }
            state.dead = true;
            std::mem::take(&mut state.recipients)
        };
        debug!(
            "remote {} died, {} recipients",
            self.descriptor(),
            recipients.len()
        );
        let weak = self.downgrade();
        for recipient in recipients {
            recipient.on_remote_died(&weak);
        }
    }

    /// Creates a weak handle that does not keep the object alive.
    pub fn downgrade(&self) -> WeakRemoteObj {
        WeakRemoteObj {
            inner: Arc::downgrade(&self.inner),
        }
    }

    fn addr(&self) -> usize {
        Arc::as_ptr(&self.inner) as usize
    }
}

fn same_recipient(a: &Arc<dyn DeathRecipient>, b: &Arc<dyn DeathRecipient>) -> bool {
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}

impl PartialEq for RemoteObj {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for RemoteObj {}

impl Hash for RemoteObj {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.addr().hash(state);
    }
}

impl PartialOrd for RemoteObj {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for RemoteObj {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.addr().cmp(&other.addr())
    }
}

impl fmt::Debug for RemoteObj {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RemoteObj({}@{:#x})", self.descriptor(), self.addr())
    }
}

/// Weak counterpart of [`RemoteObj`].
#[derive(Clone)]
pub struct WeakRemoteObj {
    inner: Weak<RemoteInner>,
}

impl WeakRemoteObj {
    /// Attempts to get a strong handle back.
    pub fn upgrade(&self) -> Option<RemoteObj> {
        self.inner.upgrade().map(|inner| RemoteObj { inner })
    }

    /// Returns `true` if this handle was created from `remote`, whether or
    /// not the object is still alive.
    pub fn is_same(&self, remote: &RemoteObj) -> bool {
        std::ptr::eq(self.inner.as_ptr(), Arc::as_ptr(&remote.inner))
    }
}
