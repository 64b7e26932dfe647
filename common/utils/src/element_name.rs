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

//! Element name utilities.
//!
//! An element name identifies one ability inside the system. Its textual form
//! is the URI `device/bundle/module/ability`, where the device part may be
//! empty for the local device.

use std::fmt::Display;

const URI_MEMBER_NUM: usize = 4;
const URI_SEPARATOR: char = '/';

/// Identifies an ability by device, bundle, module and ability name.
///
/// # Examples
///
/// ```rust
/// use ability_utils::element_name::ElementName;
///
/// let element = ElementName::parse_uri("/com.example/entry/MainAbility").unwrap();
/// assert_eq!(element.bundle_name(), "com.example");
/// assert_eq!(element.ability_name(), "MainAbility");
/// assert_eq!(element.to_string(), "/com.example/entry/MainAbility");
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct ElementName {
    device_id: String,
    bundle_name: String,
    module_name: String,
    ability_name: String,
}

impl ElementName {
    /// Creates a new `ElementName` from its parts.
    pub fn new(device_id: &str, bundle_name: &str, ability_name: &str, module_name: &str) -> Self {
        Self {
            device_id: device_id.to_string(),
            bundle_name: bundle_name.to_string(),
            module_name: module_name.to_string(),
            ability_name: ability_name.to_string(),
        }
    }

    /// Parses an element URI.
    ///
    /// The URI must contain exactly three separators. Returns `None` for any
    /// other shape.
    pub fn parse_uri(uri: &str) -> Option<Self> {
        if uri.matches(URI_SEPARATOR).count() != URI_MEMBER_NUM - 1 {
            return None;
        }
        let mut parts = uri.split(URI_SEPARATOR);
        Some(Self {
            device_id: parts.next()?.to_string(),
            bundle_name: parts.next()?.to_string(),
            module_name: parts.next()?.to_string(),
            ability_name: parts.next()?.to_string(),
        })
    }

    /// Gets the device id.
    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    /// Gets the bundle name.
    pub fn bundle_name(&self) -> &str {
        &self.bundle_name
    }

    /// Gets the module name.
    pub fn module_name(&self) -> &str {
        &self.module_name
    }

    /// Gets the ability name.
    pub fn ability_name(&self) -> &str {
        &self.ability_name
    }

    /// Returns `true` if both elements name the same ability of the same
    /// bundle, ignoring device and module.
    pub fn is_same_ability(&self, other: &ElementName) -> bool {
        self.bundle_name == other.bundle_name && self.ability_name == other.ability_name
    }
}

impl Display for ElementName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}/{}/{}/{}",
            self.device_id, self.bundle_name, self.module_name, self.ability_name
        )
    }
}
