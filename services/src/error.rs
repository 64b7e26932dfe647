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

//! Error codes of the ability connection service.

use std::{fmt, io};

/// Result codes returned by the ability connection service.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ErrorCode {
    /// Success.
    ErrOk = 0,
    /// A required argument was missing or malformed.
    InvalidValue = 22,
    /// The connection to disconnect does not exist.
    ConnectionNotExist = 2097161,
    /// The connection is not in a state that allows the operation.
    InvalidConnectionState = 2097162,
    /// The connection observer is invalid.
    InvalidObserver = 2228224,
}

/// Errors raised while loading service configuration files.
#[derive(Debug)]
pub enum ServiceError {
    /// The file could not be read.
    IoError(io::Error),
    /// The file is not valid JSON.
    JsonError(serde_json::Error),
    /// The file exists but has no content.
    EmptyFile,
}

impl From<io::Error> for ServiceError {
    fn from(value: io::Error) -> Self {
        ServiceError::IoError(value)
    }
}

impl From<serde_json::Error> for ServiceError {
    fn from(value: serde_json::Error) -> Self {
        ServiceError::JsonError(value)
    }
}

impl std::error::Error for ServiceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ServiceError::IoError(e) => Some(e),
            ServiceError::JsonError(e) => Some(e),
            ServiceError::EmptyFile => None,
        }
    }
}

impl fmt::Display for ServiceError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            ServiceError::IoError(e) => write!(f, "io error: {}", e),
            ServiceError::JsonError(e) => write!(f, "bad json: {}", e),
            ServiceError::EmptyFile => write!(f, "empty file"),
        }
    }
}
