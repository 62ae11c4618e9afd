//! Software stand-in for a real hardware wallet.
//!
//! Implements the `device_kit` contracts in-process with deterministic
//! pseudo key material (sha2 over session + derivation path), so demo runs
//! and tests are reproducible without USB hardware. A locked variant
//! scripts the unlock-refused path.

use std::{
    collections::BTreeSet,
    sync::Mutex,
};

use async_trait::async_trait;
use device_kit::{ActionEvent, ActionStream, DeviceAppManager, DeviceConnector, EthereumSigner};
use futures::stream::{self, BoxStream, StreamExt};
use sha2::{Digest, Sha256};
use shared::{
    domain::{
        ActionProgress, AddressOutput, AppOperationReport, DeviceModel, DeviceSessionId,
        DeviceStatus, DiscoveredDevice, SessionState, TransactionSignature, UserInteraction,
    },
    error::{DeviceError, DeviceErrorCode},
};
use tracing::info;

pub struct SoftDevice {
    descriptor: DiscoveredDevice,
    locked: bool,
    installed_apps: Mutex<BTreeSet<String>>,
}

impl SoftDevice {
    pub fn new() -> Self {
        Self {
            descriptor: DiscoveredDevice {
                device_id: "soft-device-0".to_string(),
                name: "Soft Nano".to_string(),
                model: DeviceModel::NanoX,
            },
            locked: false,
            installed_apps: Mutex::new(BTreeSet::from(["Ethereum".to_string()])),
        }
    }

    /// A device whose owner never enters the PIN: every signing or app
    /// action fails with a locked error after the unlock prompt.
    pub fn locked() -> Self {
        Self {
            locked: true,
            ..Self::new()
        }
    }

    fn digest(parts: &[&[u8]]) -> Vec<u8> {
        let mut hasher = Sha256::new();
        for part in parts {
            hasher.update(part);
        }
        hasher.finalize().to_vec()
    }

    fn locked_stream<O: Send + 'static>(&self) -> ActionStream<O> {
        stream::iter(vec![
            ActionEvent::Pending(ActionProgress::awaiting(UserInteraction::UnlockDevice)),
            ActionEvent::Failed(DeviceError::locked("device is locked")),
        ])
        .boxed()
    }
}

impl Default for SoftDevice {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DeviceConnector for SoftDevice {
    fn start_discovery(&self) -> BoxStream<'static, DiscoveredDevice> {
        stream::iter(vec![self.descriptor.clone()]).boxed()
    }

    async fn connect(&self, device: &DiscoveredDevice) -> anyhow::Result<DeviceSessionId> {
        if device.device_id != self.descriptor.device_id {
            anyhow::bail!("unknown device {}", device.device_id);
        }
        let session = DeviceSessionId::random();
        info!("soft device connected session={session}");
        Ok(session)
    }

    async fn disconnect(&self, session: DeviceSessionId) -> anyhow::Result<()> {
        info!("soft device disconnected session={session}");
        Ok(())
    }

    fn observe_session_state(&self, _session: DeviceSessionId) -> BoxStream<'static, SessionState> {
        let status = if self.locked {
            DeviceStatus::Locked
        } else {
            DeviceStatus::Connected
        };
        let snapshot = SessionState {
            device_status: status,
            current_app: Some("BOLOS".to_string()),
        };
        // One snapshot, then the stream stays open for the session lifetime.
        stream::iter(vec![snapshot])
            .chain(stream::pending())
            .boxed()
    }
}

impl EthereumSigner for SoftDevice {
    fn get_address(
        &self,
        session: DeviceSessionId,
        derivation_path: &str,
    ) -> ActionStream<AddressOutput> {
        if self.locked {
            return self.locked_stream();
        }
        let public_key = Self::digest(&[b"pub", session.0.as_bytes(), derivation_path.as_bytes()]);
        let account = Self::digest(&[b"addr", &public_key]);
        let output = AddressOutput {
            address: format!("0x{}", hex::encode(&account[..20])),
            public_key: hex::encode(public_key),
        };
        stream::iter(vec![
            ActionEvent::Pending(ActionProgress::awaiting(UserInteraction::VerifyAddress)),
            ActionEvent::Completed(output),
        ])
        .boxed()
    }

    fn sign_transaction(
        &self,
        session: DeviceSessionId,
        derivation_path: &str,
        raw_transaction: Vec<u8>,
    ) -> ActionStream<TransactionSignature> {
        if self.locked {
            return self.locked_stream();
        }
        let r = Self::digest(&[
            b"r",
            session.0.as_bytes(),
            derivation_path.as_bytes(),
            &raw_transaction,
        ]);
        let s = Self::digest(&[
            b"s",
            session.0.as_bytes(),
            derivation_path.as_bytes(),
            &raw_transaction,
        ]);
        let signature = TransactionSignature {
            v: 27 + (r[0] & 1),
            r: format!("0x{}", hex::encode(r)),
            s: format!("0x{}", hex::encode(s)),
        };
        stream::iter(vec![
            ActionEvent::Pending(ActionProgress::awaiting(UserInteraction::SignTransaction)),
            ActionEvent::Completed(signature),
        ])
        .boxed()
    }
}

impl DeviceAppManager for SoftDevice {
    fn install_app(
        &self,
        _session: DeviceSessionId,
        app_name: &str,
    ) -> ActionStream<AppOperationReport> {
        if self.locked {
            return self.locked_stream();
        }
        self.installed_apps
            .lock()
            .expect("installed apps lock")
            .insert(app_name.to_string());
        stream::iter(vec![
            ActionEvent::Pending(ActionProgress::awaiting(UserInteraction::AllowAppManagement)),
            ActionEvent::Completed(AppOperationReport {
                app_name: app_name.to_string(),
            }),
        ])
        .boxed()
    }

    fn uninstall_app(
        &self,
        _session: DeviceSessionId,
        app_name: &str,
    ) -> ActionStream<AppOperationReport> {
        if self.locked {
            return self.locked_stream();
        }
        let removed = self
            .installed_apps
            .lock()
            .expect("installed apps lock")
            .remove(app_name);
        if !removed {
            return stream::iter(vec![ActionEvent::Failed(DeviceError::new(
                DeviceErrorCode::Unknown,
                format!("app {app_name} is not installed"),
            ))])
            .boxed();
        }
        stream::iter(vec![
            ActionEvent::Pending(ActionProgress::awaiting(UserInteraction::AllowAppManagement)),
            ActionEvent::Completed(AppOperationReport {
                app_name: app_name.to_string(),
            }),
        ])
        .boxed()
    }
}
