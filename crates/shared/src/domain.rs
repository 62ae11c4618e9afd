use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque handle for one connected device, valid until the device
/// disconnects. Issued by the connectivity provider, never inspected here.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DeviceSessionId(pub Uuid);

impl DeviceSessionId {
    pub fn random() -> Self {
        Self(Uuid::new_v4())
    }
}

impl std::fmt::Display for DeviceSessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceModel {
    NanoS,
    NanoSPlus,
    NanoX,
    Stax,
    Flex,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscoveredDevice {
    pub device_id: String,
    pub name: String,
    pub model: DeviceModel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeviceStatus {
    Connected,
    NotConnected,
    Locked,
    Busy,
}

/// Snapshot pushed by the session state observer while a session is open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionState {
    pub device_status: DeviceStatus,
    pub current_app: Option<String>,
}

/// What the device is waiting on from its owner, carried by pending
/// action notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserInteraction {
    None,
    UnlockDevice,
    ConfirmOpenApp,
    VerifyAddress,
    SignTransaction,
    AllowAppManagement,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActionProgress {
    pub user_interaction: UserInteraction,
}

impl ActionProgress {
    pub fn none() -> Self {
        Self {
            user_interaction: UserInteraction::None,
        }
    }

    pub fn awaiting(user_interaction: UserInteraction) -> Self {
        Self { user_interaction }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddressOutput {
    pub address: String,
    pub public_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionSignature {
    pub r: String,
    pub s: String,
    pub v: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppOperationReport {
    pub app_name: String,
}
