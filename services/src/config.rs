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

//! Extension access configuration.
//!
//! Loads `ams_extension_config.json`, which describes per extension type
//! what an extension may start or access. Missing or malformed entries fall
//! back to permissive defaults.

use std::collections::{HashMap, HashSet};
use std::fs;
use std::path::Path;
use std::sync::Mutex;

use ability_utils::element_name::ElementName;
use serde_json::{Map, Value};

use crate::error::ServiceError;

/// Path of the system extension configuration.
pub const EXTENSION_CONFIG_DEFAULT_PATH: &str = "/system/etc/ams_extension_config.json";

const EXTENSION_CONFIG_NAME: &str = "ams_extension_config";
const EXTENSION_TYPE_NAME: &str = "extension_type_name";
const EXTENSION_AUTO_DISCONNECT_TIME: &str = "auto_disconnect_time";

// Legacy flags, only read without `ability_access`.
const EXTENSION_THIRD_PARTY_APP_BLOCKED_FLAG_NAME: &str = "third_party_app_blocked_flag";
const EXTENSION_SERVICE_BLOCKED_LIST_NAME: &str = "service_blocked_list";
const EXTENSION_SERVICE_STARTUP_ENABLE_FLAG: &str = "service_startup_enable_flag";

const ABILITY_ACCESS: &str = "ability_access";
const THIRD_PARTY_APP_ACCESS_FLAG: &str = "third_party_app_access_flag";
const SERVICE_ACCESS_FLAG: &str = "service_access_flag";
const DEFAULT_ACCESS_FLAG: &str = "default_access_flag";
const BLOCK_LIST: &str = "blocklist";
const ALLOW_LIST: &str = "allowlist";
const NETWORK_ACCESS_ENABLE_FLAG: &str = "network_access_enable_flag";
const SA_ACCESS_ENABLE_FLAG: &str = "sa_access_enable_flag";

const DEFAULT_EXTENSION_AUTO_DISCONNECT_TIME: i32 = -1;
const EXTENSION_THIRD_PARTY_APP_ENABLE_FLAG_DEFAULT: bool = true;
const EXTENSION_START_SERVICE_ENABLE_FLAG_DEFAULT: bool = true;
const EXTENSION_NETWORK_ENABLE_FLAG_DEFAULT: bool = true;
const EXTENSION_SA_ENABLE_FLAG_DEFAULT: bool = true;

const URI_MEMBER_NUM: usize = 4;

#[derive(Clone, Debug, Default)]
struct AbilityAccessItem {
    third_party_app_access_flag: Option<bool>,
    service_access_flag: Option<bool>,
    default_access_flag: Option<bool>,
    allow_list: HashSet<String>,
    block_list: HashSet<String>,
}

#[derive(Clone, Debug)]
struct ExtensionConfigItem {
    auto_disconnect_time: i32,
    third_party_app_enable_flag: bool,
    service_enable_flag: bool,
    service_blocked_list: HashSet<String>,
    has_ability_access: bool,
    ability_access: AbilityAccessItem,
    network_enable_flag: bool,
    sa_enable_flag: bool,
}

impl Default for ExtensionConfigItem {
    fn default() -> Self {
        Self {
            auto_disconnect_time: DEFAULT_EXTENSION_AUTO_DISCONNECT_TIME,
            third_party_app_enable_flag: EXTENSION_THIRD_PARTY_APP_ENABLE_FLAG_DEFAULT,
            service_enable_flag: EXTENSION_START_SERVICE_ENABLE_FLAG_DEFAULT,
            service_blocked_list: HashSet::new(),
            has_ability_access: false,
            ability_access: AbilityAccessItem::default(),
            network_enable_flag: EXTENSION_NETWORK_ENABLE_FLAG_DEFAULT,
            sa_enable_flag: EXTENSION_SA_ENABLE_FLAG_DEFAULT,
        }
    }
}

/// Per extension type access configuration.
pub struct ExtensionConfig {
    config_map: Mutex<HashMap<String, ExtensionConfigItem>>,
}

impl ExtensionConfig {
    /// Creates an empty configuration; every query returns its default.
    pub fn new() -> Self {
        Self {
            config_map: Mutex::new(HashMap::new()),
        }
    }

    /// Loads the configuration at [`EXTENSION_CONFIG_DEFAULT_PATH`].
    pub fn load_extension_configuration(&self) {
        if let Err(e) = self.load_from_path(EXTENSION_CONFIG_DEFAULT_PATH) {
            debug!("extension config not loaded: {}", e);
        }
    }

    /// Loads the configuration file at `path`.
    ///
    /// A missing or empty file is reported as an error and leaves the
    /// current configuration untouched.
    pub fn load_from_path<P: AsRef<Path>>(&self, path: P) -> Result<(), ServiceError> {
        let content = fs::read_to_string(path.as_ref())?;
        if content.trim().is_empty() {
            error!("empty file");
            return Err(ServiceError::EmptyFile);
        }
        self.load_from_str(&content)
    }

    /// Loads the configuration from its JSON text.
    pub fn load_from_str(&self, content: &str) -> Result<(), ServiceError> {
        let json: Value = serde_json::from_str(content).map_err(|e| {
            error!("bad profile file: {}", e);
            ServiceError::from(e)
        })?;
        self.load_extension_config(&json);
        Ok(())
    }

    fn load_extension_config(&self, json: &Value) {
        let Some(configs) = json.get(EXTENSION_CONFIG_NAME).and_then(Value::as_array) else {
            error!("extension config null");
            return;
        };
        let mut config_map = self.config_map.lock().unwrap();
        for object in configs.iter().filter_map(Value::as_object) {
            let Some(type_name) = object.get(EXTENSION_TYPE_NAME).and_then(Value::as_str) else {
                continue;
            };
            let item = config_map.entry(type_name.to_string()).or_default();
            load_auto_disconnect_time(object, item);
            if !load_ability_access(object, item) {
                load_third_party_app_blocked_flag(object, item);
                load_service_blocked_list(object, item);
            }
            if let Some(flag) = object.get(NETWORK_ACCESS_ENABLE_FLAG).and_then(Value::as_bool) {
                item.network_enable_flag = flag;
            }
            if let Some(flag) = object.get(SA_ACCESS_ENABLE_FLAG).and_then(Value::as_bool) {
                item.sa_enable_flag = flag;
            }
            debug!("extension {} config loaded: {:?}", type_name, item);
        }
    }

    /// Gets the idle time after which the extension is disconnected, `-1`
    /// when it never is.
    pub fn get_extension_auto_disconnect_time(&self, extension_type_name: &str) -> i32 {
        self.with_item(extension_type_name, |item| item.auto_disconnect_time)
            .unwrap_or(DEFAULT_EXTENSION_AUTO_DISCONNECT_TIME)
    }

    /// Legacy check of whether the extension may start third party apps.
    pub fn is_extension_start_third_party_app_enable(&self, extension_type_name: &str) -> bool {
        self.with_item(extension_type_name, |item| item.third_party_app_enable_flag)
            .unwrap_or(EXTENSION_THIRD_PARTY_APP_ENABLE_FLAG_DEFAULT)
    }

    /// Legacy check of whether the extension may start the service at
    /// `target_uri`.
    pub fn is_extension_start_service_enable(
        &self,
        extension_type_name: &str,
        target_uri: &str,
    ) -> bool {
        let config_map = self.config_map.lock().unwrap();
        let Some(item) = config_map.get(extension_type_name) else {
            return EXTENSION_START_SERVICE_ENABLE_FLAG_DEFAULT;
        };
        if !item.service_enable_flag {
            return false;
        }
        let Some(target) = ElementName::parse_uri(target_uri) else {
            return EXTENSION_START_SERVICE_ENABLE_FLAG_DEFAULT;
        };
        !find_target_uri_in_list(&target, &item.service_blocked_list)
    }

    /// Returns `true` if the extension type has an `ability_access` section.
    pub fn has_ability_access(&self, extension_type_name: &str) -> bool {
        self.with_item(extension_type_name, |item| item.has_ability_access)
            .unwrap_or(false)
    }

    /// Returns `true` if `third_party_app_access_flag` is configured.
    pub fn has_third_party_app_access_flag(&self, extension_type_name: &str) -> bool {
        self.get_single_access_flag(extension_type_name, |access| {
            access.third_party_app_access_flag
        })
        .is_some()
    }

    /// Returns `true` if `service_access_flag` is configured.
    pub fn has_service_access_flag(&self, extension_type_name: &str) -> bool {
        self.get_single_access_flag(extension_type_name, |access| access.service_access_flag)
            .is_some()
    }

    /// Returns `true` if `default_access_flag` is configured.
    pub fn has_default_access_flag(&self, extension_type_name: &str) -> bool {
        self.get_single_access_flag(extension_type_name, |access| access.default_access_flag)
            .is_some()
    }

    /// Checks whether the extension may start the third party app at
    /// `target_uri`.
    pub fn is_extension_start_third_party_app_enable_new(
        &self,
        extension_type_name: &str,
        target_uri: &str,
    ) -> bool {
        self.is_extension_ability_access_enable(extension_type_name, target_uri, |access| {
            access.third_party_app_access_flag
        })
    }

    /// Checks whether the extension may start the service at `target_uri`.
    pub fn is_extension_start_service_enable_new(
        &self,
        extension_type_name: &str,
        target_uri: &str,
    ) -> bool {
        self.is_extension_ability_access_enable(extension_type_name, target_uri, |access| {
            access.service_access_flag
        })
    }

    /// Checks whether the extension may start the ability at `target_uri`
    /// when neither of the more specific rules applies.
    pub fn is_extension_start_default_enable(
        &self,
        extension_type_name: &str,
        target_uri: &str,
    ) -> bool {
        self.is_extension_ability_access_enable(extension_type_name, target_uri, |access| {
            access.default_access_flag
        })
    }

    /// Checks whether the extension may use the network.
    pub fn is_extension_network_enable(&self, extension_type_name: &str) -> bool {
        self.with_item(extension_type_name, |item| item.network_enable_flag)
            .unwrap_or(EXTENSION_NETWORK_ENABLE_FLAG_DEFAULT)
    }

    /// Checks whether the extension may access system abilities.
    pub fn is_extension_sa_enable(&self, extension_type_name: &str) -> bool {
        self.with_item(extension_type_name, |item| item.sa_enable_flag)
            .unwrap_or(EXTENSION_SA_ENABLE_FLAG_DEFAULT)
    }

    fn with_item<T>(
        &self,
        extension_type_name: &str,
        f: impl FnOnce(&ExtensionConfigItem) -> T,
    ) -> Option<T> {
        self.config_map.lock().unwrap().get(extension_type_name).map(f)
    }

    fn get_single_access_flag(
        &self,
        extension_type_name: &str,
        get_access_flag: impl FnOnce(&AbilityAccessItem) -> Option<bool>,
    ) -> Option<bool> {
        self.with_item(extension_type_name, |item| {
            get_access_flag(&item.ability_access)
        })
        .flatten()
    }

    fn is_extension_ability_access_enable(
        &self,
        extension_type_name: &str,
        target_uri: &str,
        get_access_flag: impl FnOnce(&AbilityAccessItem) -> Option<bool>,
    ) -> bool {
        let Some(ability_access) =
            self.with_item(extension_type_name, |item| item.ability_access.clone())
        else {
            return true;
        };
        let Some(access_flag) = get_access_flag(&ability_access) else {
            return true;
        };
        let Some(target) = ElementName::parse_uri(target_uri) else {
            return access_flag;
        };
        if access_flag {
            !find_target_uri_in_list(&target, &ability_access.block_list)
        } else {
            find_target_uri_in_list(&target, &ability_access.allow_list)
        }
    }
}

/// Checks the shape `/bundle/module/ability` of a configured URI.
pub fn is_valid_extension_uri(uri: &str) -> bool {
    if uri.matches('/').count() != URI_MEMBER_NUM - 1 {
        error!("invalid uri: {}", uri);
        return false;
    }
    let parts: Vec<&str> = uri.split('/').collect();
    if parts[2].is_empty() || parts[3].is_empty() {
        error!("invalid uri: {}", uri);
        return false;
    }
    true
}

fn find_target_uri_in_list(target: &ElementName, list: &HashSet<String>) -> bool {
    list.iter()
        .filter_map(|uri| ElementName::parse_uri(uri))
        .any(|element| element.is_same_ability(target))
}

fn load_auto_disconnect_time(object: &Map<String, Value>, item: &mut ExtensionConfigItem) {
    match object
        .get(EXTENSION_AUTO_DISCONNECT_TIME)
        .and_then(Value::as_f64)
    {
        Some(time) => item.auto_disconnect_time = time as i32,
        None => debug!("auto disconnect time config null"),
    }
}

fn load_third_party_app_blocked_flag(object: &Map<String, Value>, item: &mut ExtensionConfigItem) {
    match object
        .get(EXTENSION_THIRD_PARTY_APP_BLOCKED_FLAG_NAME)
        .and_then(Value::as_bool)
    {
        Some(flag) => item.third_party_app_enable_flag = flag,
        None => debug!("third party config null"),
    }
}

fn load_service_blocked_list(object: &Map<String, Value>, item: &mut ExtensionConfigItem) {
    let Some(enable) = object
        .get(EXTENSION_SERVICE_STARTUP_ENABLE_FLAG)
        .and_then(Value::as_bool)
    else {
        debug!("service enable config null");
        return;
    };
    if !enable {
        item.service_enable_flag = false;
        return;
    }
    let Some(list) = object.get(EXTENSION_SERVICE_BLOCKED_LIST_NAME) else {
        debug!("service config null");
        return;
    };
    if let Some(list) = load_uri_list(list) {
        item.service_blocked_list = list;
    }
}

fn load_ability_access(object: &Map<String, Value>, item: &mut ExtensionConfigItem) -> bool {
    let Some(access) = object.get(ABILITY_ACCESS).and_then(Value::as_object) else {
        item.has_ability_access = false;
        return false;
    };
    item.has_ability_access = true;
    let ability_access = &mut item.ability_access;
    ability_access.third_party_app_access_flag =
        access.get(THIRD_PARTY_APP_ACCESS_FLAG).and_then(Value::as_bool);
    ability_access.service_access_flag = access.get(SERVICE_ACCESS_FLAG).and_then(Value::as_bool);
    ability_access.default_access_flag = access.get(DEFAULT_ACCESS_FLAG).and_then(Value::as_bool);
    if let Some(list) = access.get(ALLOW_LIST).and_then(load_uri_list) {
        ability_access.allow_list = list;
    }
    if let Some(list) = access.get(BLOCK_LIST).and_then(load_uri_list) {
        ability_access.block_list = list;
    }
    true
}

fn load_uri_list(value: &Value) -> Option<HashSet<String>> {
    let list = value.as_array()?;
    Some(
        list.iter()
            .filter_map(Value::as_str)
            .filter(|uri| is_valid_extension_uri(uri))
            .map(str::to_string)
            .collect(),
    )
}
