use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceErrorCode {
    Connectivity,
    Locked,
    RefusedByUser,
    Io,
    Unknown,
}

/// Opaque failure reported by the external device providers. Displayed to
/// the user as-is; never classified or recovered from in this layer.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{code:?}: {message}")]
pub struct DeviceError {
    pub code: DeviceErrorCode,
    pub message: String,
}

impl DeviceError {
    pub fn new(code: DeviceErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn connectivity(message: impl Into<String>) -> Self {
        Self::new(DeviceErrorCode::Connectivity, message)
    }

    pub fn locked(message: impl Into<String>) -> Self {
        Self::new(DeviceErrorCode::Locked, message)
    }

    pub fn refused(message: impl Into<String>) -> Self {
        Self::new(DeviceErrorCode::RefusedByUser, message)
    }
}
