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

//! Common utilities for the ability connection service.
//!
//! This crate provides element name parsing and logger initialization shared
//! by the ability framework crates.

#![warn(missing_docs)]
#![allow(clippy::new_without_default)]

/// Element name (`device/bundle/module/ability`) parsing.
pub mod element_name;

/// Logger initialization.
pub mod logger;
