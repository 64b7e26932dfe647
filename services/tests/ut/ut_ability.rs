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

use std::sync::atomic::{AtomicI32, AtomicUsize, Ordering};

use ability_utils::element_name::ElementName;

use super::*;
use crate::record::{AbilityInfo, AbilityType, ExtensionAbilityType};
use crate::utils::NullProcessNameResolver;

struct TestConnection {
    object: Option<RemoteObj>,
    connected: AtomicUsize,
    disconnected: AtomicUsize,
    last_code: AtomicI32,
}

impl TestConnection {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            object: Some(RemoteObj::new("ohos.aafwk.AbilityConnection")),
            connected: AtomicUsize::new(0),
            disconnected: AtomicUsize::new(0),
            last_code: AtomicI32::new(i32::MIN),
        })
    }

    fn object(&self) -> &RemoteObj {
        self.object.as_ref().unwrap()
    }
}

impl AbilityConnection for TestConnection {
    fn as_object(&self) -> Option<RemoteObj> {
        self.object.clone()
    }

    fn on_ability_connect_done(&self, _element: &ElementName, _remote: &RemoteObj, code: i32) {
        self.connected.fetch_add(1, Ordering::SeqCst);
        self.last_code.store(code, Ordering::SeqCst);
    }

    fn on_ability_disconnect_done(&self, _element: &ElementName, code: i32) {
        self.disconnected.fetch_add(1, Ordering::SeqCst);
        self.last_code.store(code, Ordering::SeqCst);
    }
}

#[derive(Default)]
struct CountingObserver {
    object: Option<RemoteObj>,
    connected: AtomicUsize,
    disconnected: AtomicUsize,
}

impl ConnectionObserver for CountingObserver {
    fn as_object(&self) -> Option<RemoteObj> {
        self.object.clone()
    }

    fn on_extension_connected(&self, _data: &ConnectionData) {
        self.connected.fetch_add(1, Ordering::SeqCst);
    }

    fn on_extension_disconnected(&self, _data: &ConnectionData) {
        self.disconnected.fetch_add(1, Ordering::SeqCst);
    }
}

fn service() -> (AbilityConnectionService, Arc<CountingObserver>) {
    let service =
        AbilityConnectionService::new(ExtensionConfig::new(), Box::new(NullProcessNameResolver));
    let observer = Arc::new(CountingObserver {
        object: Some(RemoteObj::new("ohos.abilityruntime.IConnectionObserver")),
        ..Default::default()
    });
    assert_eq!(service.register_observer(observer.clone()), ErrorCode::ErrOk);
    (service, observer)
}

fn target() -> Arc<AbilityRecord> {
    let info = AbilityInfo {
        bundle_name: "com.example.service".to_string(),
        module_name: "entry".to_string(),
        name: "ServiceExtAbility".to_string(),
        ability_type: AbilityType::Extension,
        extension_ability_type: ExtensionAbilityType::Service,
        ..Default::default()
    };
    Arc::new(AbilityRecord::new(info, 20010090, 100))
}

fn calling(pid: i32) -> CallingIdentity {
    CallingIdentity {
        uid: 20010100,
        pid,
    }
}

// @tc.name: ut_ability_init
// @tc.desc: Test service initialization without a system configuration
// @tc.precon: NA
// @tc.step: 1. Initialize the service
// @tc.expect: The configuration returns defaults and nothing is connected
// @tc.type: FUNC
// @tc.require: issueNumber
// @tc.level: Level 1
#[test]
fn ut_ability_init() {
    let service = AbilityConnectionService::init();
    assert!(service.extension_config().is_extension_network_enable("service"));
    assert!(service.get_connection_data().is_empty());
    assert!(service.dump().is_empty());
}

// @tc.name: ut_ability_connect_invalid_callback
// @tc.desc: Test connecting with a callback without object
// @tc.precon: NA
// @tc.step: 1. Connect with a callback whose as_object returns None
// @tc.expect: InvalidValue is returned and nothing is recorded
// @tc.type: FUNC
// @tc.require: issueNumber
// @tc.level: Level 2
#[test]
fn ut_ability_connect_invalid_callback() {
    let (service, _observer) = service();
    let callback = Arc::new(TestConnection {
        object: None,
        connected: AtomicUsize::new(0),
        disconnected: AtomicUsize::new(0),
        last_code: AtomicI32::new(0),
    });
    let target = target();
    let result = service.connect_ability(target.clone(), callback, None, calling(100));
    assert_eq!(result.err(), Some(ErrorCode::InvalidValue));
    assert_eq!(target.connect_record_count(), 0);
}

// @tc.name: ut_ability_connect_flow
// @tc.desc: Test a full connect and disconnect through the service
// @tc.precon: NA
// @tc.step: 1. Connect and report connect done
//           2. Disconnect and report disconnect done
// @tc.expect: Callbacks and observers see one connect and one disconnect
// @tc.type: FUNC
// @tc.require: issueNumber
// @tc.level: Level 0
#[test]
fn ut_ability_connect_flow() {
    let (service, observer) = service();
    let target = target();
    let callback = TestConnection::new();

    let record = service
        .connect_ability(target.clone(), callback.clone(), None, calling(100))
        .unwrap();
    assert_eq!(record.connect_state(), ConnectionState::Connecting);
    assert_eq!(
        service.schedule_connect_ability_done(
            target.token(),
            Some(RemoteObj::new("ohos.aafwk.ServiceStub"))
        ),
        ErrorCode::ErrOk
    );
    assert_eq!(record.connect_state(), ConnectionState::Connected);
    assert_eq!(callback.connected.load(Ordering::SeqCst), 1);
    assert_eq!(observer.connected.load(Ordering::SeqCst), 1);
    assert_eq!(service.get_connection_data().len(), 1);
    assert_eq!(service.dump().len(), 1);

    assert_eq!(service.disconnect_ability(callback.object()), ErrorCode::ErrOk);
    assert_eq!(record.connect_state(), ConnectionState::Disconnecting);
    assert_eq!(
        service.schedule_disconnect_ability_done(target.token()),
        ErrorCode::ErrOk
    );
    assert_eq!(record.connect_state(), ConnectionState::Disconnected);
    assert_eq!(callback.disconnected.load(Ordering::SeqCst), 1);
    assert_eq!(callback.last_code.load(Ordering::SeqCst), 0);
    assert_eq!(observer.disconnected.load(Ordering::SeqCst), 1);
    assert!(service.get_connection_data().is_empty());
    assert!(service.dump().is_empty());
    assert!(target.conn_remote_object().is_none());
}

// @tc.name: ut_ability_connect_connected_target
// @tc.desc: Test connecting to a target that is already connected
// @tc.precon: NA
// @tc.step: 1. Connect a first client and report connect done
//           2. Connect a second client
//           3. Disconnect the first client
// @tc.expect: The second client connects at once, the first is detached
// @tc.type: FUNC
// @tc.require: issueNumber
// @tc.level: Level 1
#[test]
fn ut_ability_connect_connected_target() {
    let (service, observer) = service();
    let target = target();
    let first = TestConnection::new();
    let second = TestConnection::new();

    service
        .connect_ability(target.clone(), first.clone(), None, calling(100))
        .unwrap();
    service.schedule_connect_ability_done(
        target.token(),
        Some(RemoteObj::new("ohos.aafwk.ServiceStub")),
    );
    let record = service
        .connect_ability(target.clone(), second.clone(), None, calling(100))
        .unwrap();
    assert_eq!(record.connect_state(), ConnectionState::Connected);
    assert_eq!(second.connected.load(Ordering::SeqCst), 1);
    assert_eq!(observer.connected.load(Ordering::SeqCst), 1);

    assert_eq!(service.disconnect_ability(first.object()), ErrorCode::ErrOk);
    assert_eq!(first.disconnected.load(Ordering::SeqCst), 1);
    assert_eq!(observer.disconnected.load(Ordering::SeqCst), 0);
    assert_eq!(target.connect_record_count(), 1);
    assert_eq!(service.dump().len(), 1);
}

// @tc.name: ut_ability_unknown_connection
// @tc.desc: Test operations on unknown connections and targets
// @tc.precon: NA
// @tc.step: 1. Disconnect an unknown connection
//           2. Report connect and disconnect done for an unknown target
// @tc.expect: ConnectionNotExist is returned each time
// @tc.type: FUNC
// @tc.require: issueNumber
// @tc.level: Level 2
#[test]
fn ut_ability_unknown_connection() {
    let (service, _observer) = service();
    let unknown = RemoteObj::new("ohos.aafwk.AbilityConnection");
    assert_eq!(
        service.disconnect_ability(&unknown),
        ErrorCode::ConnectionNotExist
    );
    assert_eq!(
        service.schedule_connect_ability_done(&unknown, None),
        ErrorCode::ConnectionNotExist
    );
    assert_eq!(
        service.schedule_disconnect_ability_done(&unknown),
        ErrorCode::ConnectionNotExist
    );
}

// @tc.name: ut_ability_connection_died
// @tc.desc: Test cleanup after the client connection died
// @tc.precon: NA
// @tc.step: 1. Connect a client
//           2. Report its connection dead
// @tc.expect: The observer sees a disconnect and no record is left
// @tc.type: FUNC
// @tc.require: issueNumber
// @tc.level: Level 1
#[test]
fn ut_ability_connection_died() {
    let (service, observer) = service();
    let target = target();
    let callback = TestConnection::new();
    let record = service
        .connect_ability(target.clone(), callback.clone(), None, calling(100))
        .unwrap();
    service.schedule_connect_ability_done(
        target.token(),
        Some(RemoteObj::new("ohos.aafwk.ServiceStub")),
    );

    service.handle_connection_died(callback.object());
    assert_eq!(observer.disconnected.load(Ordering::SeqCst), 1);
    assert!(record.ability_connect_callback().is_none());
    assert!(service.dump().is_empty());
    assert_eq!(target.connect_record_count(), 0);
    assert!(service.get_connection_data().is_empty());
}

// @tc.name: ut_ability_app_died
// @tc.desc: Test cleanup after a caller process died
// @tc.precon: NA
// @tc.step: 1. Connect callers 100 and 101
//           2. Report 100 dead
// @tc.expect: Only the records of 100 are dropped
// @tc.type: FUNC
// @tc.require: issueNumber
// @tc.level: Level 1
#[test]
fn ut_ability_app_died() {
    let (service, observer) = service();
    let target = target();
    service
        .connect_ability(target.clone(), TestConnection::new(), None, calling(100))
        .unwrap();
    service
        .connect_ability(target.clone(), TestConnection::new(), None, calling(101))
        .unwrap();
    service.schedule_connect_ability_done(
        target.token(),
        Some(RemoteObj::new("ohos.aafwk.ServiceStub")),
    );
    assert_eq!(observer.connected.load(Ordering::SeqCst), 2);

    service.handle_app_died(100);
    assert_eq!(observer.disconnected.load(Ordering::SeqCst), 1);
    assert_eq!(service.dump().len(), 1);
    let data = service.get_connection_data();
    assert_eq!(data.len(), 1);
    assert_eq!(data[0].caller_pid, 101);
}

// @tc.name: ut_ability_connect_done_without_object
// @tc.desc: Test connect done when the target returned no object
// @tc.precon: NA
// @tc.step: 1. Connect a client
//           2. Report connect done without object
// @tc.expect: The record ends Disconnected, the client is told and dropped
// @tc.type: FUNC
// @tc.require: issueNumber
// @tc.level: Level 1
#[test]
fn ut_ability_connect_done_without_object() {
    let (service, observer) = service();
    let target = target();
    let callback = TestConnection::new();
    let record = service
        .connect_ability(target.clone(), callback.clone(), None, calling(100))
        .unwrap();

    assert_eq!(
        service.schedule_connect_ability_done(target.token(), None),
        ErrorCode::ErrOk
    );
    assert_eq!(record.connect_state(), ConnectionState::Disconnected);
    assert_eq!(callback.connected.load(Ordering::SeqCst), 0);
    assert_eq!(callback.disconnected.load(Ordering::SeqCst), 1);
    assert_eq!(callback.last_code.load(Ordering::SeqCst), 0);
    assert_eq!(observer.connected.load(Ordering::SeqCst), 0);
    assert_eq!(observer.disconnected.load(Ordering::SeqCst), 0);
    assert_eq!(target.connect_record_count(), 0);
    assert!(service.dump().is_empty());
    assert!(service.get_connection_data().is_empty());
}

// @tc.name: ut_ability_target_died
// @tc.desc: Test cleanup after the connected target died
// @tc.precon: NA
// @tc.step: 1. Connect two clients of different callers
//           2. Report the target dead
//           3. Report it dead again
// @tc.expect: Clients get -1, observers see two disconnects, nothing is left
// @tc.type: FUNC
// @tc.require: issueNumber
// @tc.level: Level 1
#[test]
fn ut_ability_target_died() {
    let (service, observer) = service();
    let target = target();
    let first = TestConnection::new();
    let second = TestConnection::new();
    let first_record = service
        .connect_ability(target.clone(), first.clone(), None, calling(100))
        .unwrap();
    service
        .connect_ability(target.clone(), second.clone(), None, calling(101))
        .unwrap();
    service.schedule_connect_ability_done(
        target.token(),
        Some(RemoteObj::new("ohos.aafwk.ServiceStub")),
    );
    assert_eq!(observer.connected.load(Ordering::SeqCst), 2);

    service.handle_ability_died(target.token());
    assert_eq!(first_record.connect_state(), ConnectionState::Disconnected);
    assert_eq!(first.disconnected.load(Ordering::SeqCst), 1);
    assert_eq!(first.last_code.load(Ordering::SeqCst), -1);
    assert_eq!(second.disconnected.load(Ordering::SeqCst), 1);
    assert_eq!(second.last_code.load(Ordering::SeqCst), -1);
    assert_eq!(observer.disconnected.load(Ordering::SeqCst), 2);
    assert!(target.conn_remote_object().is_none());
    assert_eq!(target.connect_record_count(), 0);
    assert!(service.dump().is_empty());
    assert!(service.get_connection_data().is_empty());

    service.handle_ability_died(target.token());
    assert_eq!(first.disconnected.load(Ordering::SeqCst), 1);
    assert_eq!(observer.disconnected.load(Ordering::SeqCst), 2);
}

// @tc.name: ut_ability_unregister_observer
// @tc.desc: Test unregistering an observer through the service
// @tc.precon: NA
// @tc.step: 1. Unregister the observer
//           2. Connect a client
// @tc.expect: The observer is not notified
// @tc.type: FUNC
// @tc.require: issueNumber
// @tc.level: Level 2
#[test]
fn ut_ability_unregister_observer() {
    let (service, observer) = service();
    let observer_dyn: Arc<dyn ConnectionObserver> = observer.clone();
    assert_eq!(service.unregister_observer(&observer_dyn), ErrorCode::ErrOk);

    let target = target();
    service
        .connect_ability(target.clone(), TestConnection::new(), None, calling(100))
        .unwrap();
    service.schedule_connect_ability_done(
        target.token(),
        Some(RemoteObj::new("ohos.aafwk.ServiceStub")),
    );
    assert_eq!(observer.connected.load(Ordering::SeqCst), 0);
}

// @tc.name: ut_ability_dlp_infos
// @tc.desc: Test DLP connection infos through the service
// @tc.precon: NA
// @tc.step: 1. Register a DLP manager and open an ability
// @tc.expect: One info with one opened ability
// @tc.type: FUNC
// @tc.require: issueNumber
// @tc.level: Level 2
#[cfg(feature = "dlp")]
#[test]
fn ut_ability_dlp_infos() {
    let (service, _observer) = service();
    let dlp_manager = target();
    service.state_manager().add_dlp_manager(&dlp_manager);
    service.state_manager().add_dlp_ability(&target());
    let infos = service.get_dlp_connection_infos();
    assert_eq!(infos.len(), 1);
    assert_eq!(infos[0].opened_ability_count, 1);
}
