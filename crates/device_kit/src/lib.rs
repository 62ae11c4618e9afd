//! Contracts for the external device management and signing providers.
//!
//! Everything behind these traits (USB/HID transport, APDU exchange, key
//! derivation, signature computation) is owned by the provider. This crate
//! only fixes the notification vocabulary the client orchestrates against.

use async_trait::async_trait;
use futures::stream::BoxStream;
use shared::{
    domain::{
        ActionProgress, AddressOutput, AppOperationReport, DeviceSessionId, DiscoveredDevice,
        SessionState, TransactionSignature,
    },
    error::DeviceError,
};

/// One notification from a long-running device action. A well-behaved
/// provider emits zero or more `Pending` items followed by exactly one
/// terminal `Completed` or `Failed`, then ends the stream.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionEvent<O> {
    Pending(ActionProgress),
    Completed(O),
    Failed(DeviceError),
}

impl<O> ActionEvent<O> {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, ActionEvent::Pending(_))
    }
}

pub type ActionStream<O> = BoxStream<'static, ActionEvent<O>>;

/// Device discovery, connection, and session state reporting.
#[async_trait]
pub trait DeviceConnector: Send + Sync {
    /// Starts a discovery pass. The stream yields devices as they respond
    /// and ends when discovery stops; it may end without yielding anything.
    fn start_discovery(&self) -> BoxStream<'static, DiscoveredDevice>;

    async fn connect(&self, device: &DiscoveredDevice) -> anyhow::Result<DeviceSessionId>;

    async fn disconnect(&self, session: DeviceSessionId) -> anyhow::Result<()>;

    /// Pushes session state snapshots for as long as the session exists.
    fn observe_session_state(&self, session: DeviceSessionId) -> BoxStream<'static, SessionState>;
}

/// Ethereum address derivation and transaction signing for one session.
pub trait EthereumSigner: Send + Sync {
    fn get_address(&self, session: DeviceSessionId, derivation_path: &str)
        -> ActionStream<AddressOutput>;

    fn sign_transaction(
        &self,
        session: DeviceSessionId,
        derivation_path: &str,
        raw_transaction: Vec<u8>,
    ) -> ActionStream<TransactionSignature>;
}

/// On-device app install/uninstall, reported through the same action
/// lifecycle as signing.
pub trait DeviceAppManager: Send + Sync {
    fn install_app(&self, session: DeviceSessionId, app_name: &str)
        -> ActionStream<AppOperationReport>;

    fn uninstall_app(
        &self,
        session: DeviceSessionId,
        app_name: &str,
    ) -> ActionStream<AppOperationReport>;
}
