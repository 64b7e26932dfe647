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

use std::sync::Arc;

use ability_utils::element_name::ElementName;

use super::*;
use crate::record::{
    AbilityConnection, AbilityInfo, AbilityRecord, AbilityType, CallingIdentity,
    ExtensionAbilityType,
};
use crate::utils::NullProcessNameResolver;

struct TestConnection {
    object: Option<RemoteObj>,
}

impl AbilityConnection for TestConnection {
    fn as_object(&self) -> Option<RemoteObj> {
        self.object.clone()
    }

    fn on_ability_connect_done(&self, _element: &ElementName, _remote: &RemoteObj, _code: i32) {}

    fn on_ability_disconnect_done(&self, _element: &ElementName, _code: i32) {}
}

const CALLER_UID: i32 = 20010010;
const CALLER_PID: i32 = 6001;

fn target(name: &str, ability_type: AbilityType) -> Arc<AbilityRecord> {
    let info = AbilityInfo {
        bundle_name: "com.example.target".to_string(),
        module_name: "entry".to_string(),
        name: name.to_string(),
        ability_type,
        extension_ability_type: ExtensionAbilityType::Service,
        ..Default::default()
    };
    let record = AbilityRecord::new(info, 20010020, 100);
    record.set_pid(7001);
    Arc::new(record)
}

fn record(target: &Arc<AbilityRecord>) -> Arc<ConnectionRecord> {
    record_with_object(target, Some(RemoteObj::new("ohos.aafwk.AbilityConnection")))
}

fn record_with_object(
    target: &Arc<AbilityRecord>,
    object: Option<RemoteObj>,
) -> Arc<ConnectionRecord> {
    let callback: Arc<dyn AbilityConnection> = Arc::new(TestConnection { object });
    let record = ConnectionRecord::create(None, target.clone(), Some(callback));
    let calling = CallingIdentity {
        uid: CALLER_UID,
        pid: CALLER_PID,
    };
    record.attach_caller_info(None, calling, &NullProcessNameResolver);
    record
}

fn item() -> ConnectionStateItem {
    ConnectionStateItem::new(CALLER_UID, CALLER_PID, "client")
}

fn data_caller(pid: i32) -> DataAbilityCaller {
    DataAbilityCaller {
        is_not_hap: true,
        caller_pid: pid,
        caller_uid: CALLER_UID,
        caller_name: "client".to_string(),
        caller_token: None,
    }
}

// @tc.name: ut_state_item_from_record
// @tc.desc: Test caller identity taken from a connection record
// @tc.precon: NA
// @tc.step: 1. Create an item from a connection record
// @tc.expect: The caller identity matches the record
// @tc.type: FUNC
// @tc.require: issueNumber
// @tc.level: Level 1
#[test]
fn ut_state_item_from_record() {
    let record = record(&target("ServiceA", AbilityType::Extension));
    let item = ConnectionStateItem::from_record(&record);
    assert_eq!(item.caller_uid(), CALLER_UID);
    assert_eq!(item.caller_pid(), CALLER_PID);
    assert_eq!(item.caller_name(), "");
    assert!(item.is_empty());
}

// @tc.name: ut_state_item_no_callback
// @tc.desc: Test that records without callback object are rejected
// @tc.precon: NA
// @tc.step: 1. Add, suspend, resume and remove a record whose callback has no object
// @tc.expect: Every call returns None and the item stays empty
// @tc.type: FUNC
// @tc.require: issueNumber
// @tc.level: Level 2
#[test]
fn ut_state_item_no_callback() {
    let mut item = item();
    let record = record_with_object(&target("ServiceA", AbilityType::Extension), None);
    assert!(item.add_connection(&record).is_none());
    assert!(item.suspend_connection(&record).is_none());
    assert!(item.resume_connection(&record).is_none());
    assert!(item.remove_connection(&record).is_none());
    assert!(item.is_empty());
}

// @tc.name: ut_state_item_connect_disconnect
// @tc.desc: Test connected and disconnected data for one target
// @tc.precon: NA
// @tc.step: 1. Add two records to the same target
//           2. Remove both
// @tc.expect: Connected on the first add, disconnected on the last remove
// @tc.type: FUNC
// @tc.require: issueNumber
// @tc.level: Level 1
#[test]
fn ut_state_item_connect_disconnect() {
    let mut item = item();
    let target = target("ServiceA", AbilityType::Extension);
    let first = record(&target);
    let second = record(&target);

    let (data, event) = item.add_connection(&first).unwrap();
    assert!(event.connected_event);
    assert_eq!(data.caller_pid, CALLER_PID);
    assert_eq!(data.caller_uid, CALLER_UID);
    assert_eq!(data.caller_name, "client");
    assert_eq!(data.extension_name, "ServiceA");
    assert_eq!(data.extension_pid, 7001);
    assert!(item.add_connection(&second).is_none());

    assert!(item.remove_connection(&first).is_none());
    let (data, event) = item.remove_connection(&second).unwrap();
    assert!(event.disconnected_event);
    assert_eq!(data.extension_name, "ServiceA");
    assert!(item.is_empty());
    assert!(item.remove_connection(&second).is_none());
}

// @tc.name: ut_state_item_suspend_resume
// @tc.desc: Test suspended and resumed data
// @tc.precon: NA
// @tc.step: 1. Add one record
//           2. Suspend, suspend again, resume
// @tc.expect: Suspend and resume report data once each
// @tc.type: FUNC
// @tc.require: issueNumber
// @tc.level: Level 1
#[test]
fn ut_state_item_suspend_resume() {
    let mut item = item();
    let record = record(&target("ServiceA", AbilityType::Extension));
    item.add_connection(&record);

    let data = item.suspend_connection(&record).unwrap();
    assert!(data.is_suspended);
    assert!(item.suspend_connection(&record).is_none());
    let data = item.resume_connection(&record).unwrap();
    assert!(!data.is_suspended);
    assert!(item.resume_connection(&record).is_none());
}

// @tc.name: ut_state_item_remove_keeps_suspended_target
// @tc.desc: Test that a suspended event keeps the tracker
// @tc.precon: NA
// @tc.step: 1. Add A and B to one target, suspend B
//           2. Remove A, then resume B
// @tc.expect: Removing A reports suspended and B can still be resumed
// @tc.type: FUNC
// @tc.require: issueNumber
// @tc.level: Level 1
#[test]
fn ut_state_item_remove_keeps_suspended_target() {
    let mut item = item();
    let target = target("ServiceA", AbilityType::Extension);
    let a = record(&target);
    let b = record(&target);
    item.add_connection(&a);
    item.add_connection(&b);
    assert!(item.suspend_connection(&b).is_none());

    let (data, event) = item.remove_connection(&a).unwrap();
    assert!(event.suspended_event);
    assert!(data.is_suspended);
    assert!(!item.is_empty());
    assert!(item.resume_connection(&b).is_some());
}

// @tc.name: ut_state_item_data_ability
// @tc.desc: Test data ability connections
// @tc.precon: NA
// @tc.step: 1. Add two callers to one data ability
//           2. Remove them
// @tc.expect: Connected data on the first add, disconnected data on the last remove
// @tc.type: FUNC
// @tc.require: issueNumber
// @tc.level: Level 1
#[test]
fn ut_state_item_data_ability() {
    let mut item = item();
    let record = DataAbilityRecord::new(Some(target("DataA", AbilityType::Data)));
    let data = item
        .add_data_ability_connection(&data_caller(1), &record)
        .unwrap();
    assert_eq!(data.extension_type, ExtensionAbilityType::DataShare);
    assert_eq!(data.extension_name, "DataA");
    assert!(item
        .add_data_ability_connection(&data_caller(2), &record)
        .is_none());

    assert!(item
        .remove_data_ability_connection(&data_caller(1), &record)
        .is_none());
    assert!(item
        .remove_data_ability_connection(&data_caller(2), &record)
        .is_some());
    assert!(item.is_empty());
}

// @tc.name: ut_state_item_data_ability_without_ability
// @tc.desc: Test data ability records without backing ability
// @tc.precon: NA
// @tc.step: 1. Add and remove a caller on an empty data ability record
// @tc.expect: Both return None
// @tc.type: FUNC
// @tc.require: issueNumber
// @tc.level: Level 2
#[test]
fn ut_state_item_data_ability_without_ability() {
    let mut item = item();
    let record = DataAbilityRecord::default();
    assert!(item
        .add_data_ability_connection(&data_caller(1), &record)
        .is_none());
    assert!(item
        .remove_data_ability_connection(&data_caller(1), &record)
        .is_none());
    assert!(item.is_empty());
}

// @tc.name: ut_state_item_data_ability_died
// @tc.desc: Test removal of a dead data ability
// @tc.precon: NA
// @tc.step: 1. Add a caller to a data ability
//           2. Report the data ability dead twice
// @tc.expect: The first report returns data, the second returns None
// @tc.type: FUNC
// @tc.require: issueNumber
// @tc.level: Level 1
#[test]
fn ut_state_item_data_ability_died() {
    let mut item = item();
    let ability = target("DataA", AbilityType::Data);
    let record = DataAbilityRecord::new(Some(ability.clone()));
    item.add_data_ability_connection(&data_caller(1), &record);

    let data = item.handle_data_ability_died(ability.token()).unwrap();
    assert_eq!(data.extension_name, "DataA");
    assert!(item.handle_data_ability_died(ability.token()).is_none());
    assert!(item.is_empty());
}

// @tc.name: ut_state_item_generate_all
// @tc.desc: Test the full connection snapshot
// @tc.precon: NA
// @tc.step: 1. Connect to two extensions and one data ability
//           2. Generate all connection data
// @tc.expect: Three entries with the caller identity
// @tc.type: FUNC
// @tc.require: issueNumber
// @tc.level: Level 1
#[test]
fn ut_state_item_generate_all() {
    let mut item = item();
    item.add_connection(&record(&target("ServiceA", AbilityType::Extension)));
    item.add_connection(&record(&target("ServiceB", AbilityType::Service)));
    let data_record = DataAbilityRecord::new(Some(target("DataA", AbilityType::Data)));
    item.add_data_ability_connection(&data_caller(1), &data_record);

    let mut all = item.generate_all_connection_data();
    assert_eq!(all.len(), 3);
    assert!(all.iter().all(|data| data.caller_pid == CALLER_PID));
    all.sort_by(|a, b| a.extension_name.cmp(&b.extension_name));
    let names: Vec<_> = all.iter().map(|data| data.extension_name.as_str()).collect();
    assert_eq!(names, vec!["DataA", "ServiceA", "ServiceB"]);
}
