//! Client-side mediator between UI actions and the external device SDK.
//!
//! `WalletClient` owns the current device session, a session state watch,
//! and one [`ActionSlot`] per operation kind. UI handlers call the `run`
//! style methods fire-and-forget; results land asynchronously in the slots.

use std::sync::{Arc, Mutex, RwLock};

use anyhow::anyhow;
use async_trait::async_trait;
use device_kit::{ActionEvent, ActionStream, DeviceAppManager, DeviceConnector, EthereumSigner};
use futures::{
    stream::{self, BoxStream},
    StreamExt,
};
use shared::{
    domain::{
        AddressOutput, AppOperationReport, DeviceSessionId, DiscoveredDevice, SessionState,
        TransactionSignature,
    },
    error::DeviceError,
    hex::decode_hex_string,
};
use tokio::{sync::watch, task::JoinHandle};
use tracing::info;

pub mod action;
pub use action::{settled, ActionError, ActionSlot, ActionState};

#[cfg(test)]
mod tests;

fn provider_unavailable<O: Send + 'static>(what: &str) -> ActionStream<O> {
    stream::iter(vec![ActionEvent::Failed(DeviceError::connectivity(format!(
        "{what} provider is unavailable"
    )))])
    .boxed()
}

pub struct MissingDeviceConnector;

#[async_trait]
impl DeviceConnector for MissingDeviceConnector {
    fn start_discovery(&self) -> BoxStream<'static, DiscoveredDevice> {
        stream::empty().boxed()
    }

    async fn connect(&self, _device: &DiscoveredDevice) -> anyhow::Result<DeviceSessionId> {
        Err(anyhow!("device connectivity provider is unavailable"))
    }

    async fn disconnect(&self, _session: DeviceSessionId) -> anyhow::Result<()> {
        Err(anyhow!("device connectivity provider is unavailable"))
    }

    fn observe_session_state(
        &self,
        _session: DeviceSessionId,
    ) -> BoxStream<'static, SessionState> {
        stream::empty().boxed()
    }
}

pub struct MissingEthereumSigner;

impl EthereumSigner for MissingEthereumSigner {
    fn get_address(
        &self,
        _session: DeviceSessionId,
        _derivation_path: &str,
    ) -> ActionStream<AddressOutput> {
        provider_unavailable("signing")
    }

    fn sign_transaction(
        &self,
        _session: DeviceSessionId,
        _derivation_path: &str,
        _raw_transaction: Vec<u8>,
    ) -> ActionStream<TransactionSignature> {
        provider_unavailable("signing")
    }
}

pub struct MissingDeviceAppManager;

impl DeviceAppManager for MissingDeviceAppManager {
    fn install_app(
        &self,
        _session: DeviceSessionId,
        _app_name: &str,
    ) -> ActionStream<AppOperationReport> {
        provider_unavailable("app management")
    }

    fn uninstall_app(
        &self,
        _session: DeviceSessionId,
        _app_name: &str,
    ) -> ActionStream<AppOperationReport> {
        provider_unavailable("app management")
    }
}

pub struct WalletClient {
    connector: Arc<dyn DeviceConnector>,
    signer: Arc<dyn EthereumSigner>,
    app_manager: Arc<dyn DeviceAppManager>,
    session: RwLock<Option<DeviceSessionId>>,
    session_state: Arc<watch::Sender<Option<SessionState>>>,
    session_state_task: Mutex<Option<JoinHandle<()>>>,
    connect: ActionSlot<DeviceSessionId>,
    address: ActionSlot<AddressOutput>,
    signature: ActionSlot<TransactionSignature>,
    install_app: ActionSlot<AppOperationReport>,
    uninstall_app: ActionSlot<AppOperationReport>,
}

impl WalletClient {
    pub fn new() -> Arc<Self> {
        Self::new_with_providers(
            Arc::new(MissingDeviceConnector),
            Arc::new(MissingEthereumSigner),
            Arc::new(MissingDeviceAppManager),
        )
    }

    pub fn new_with_providers(
        connector: Arc<dyn DeviceConnector>,
        signer: Arc<dyn EthereumSigner>,
        app_manager: Arc<dyn DeviceAppManager>,
    ) -> Arc<Self> {
        let (session_state, _) = watch::channel(None);
        Arc::new(Self {
            connector,
            signer,
            app_manager,
            session: RwLock::new(None),
            session_state: Arc::new(session_state),
            session_state_task: Mutex::new(None),
            connect: ActionSlot::new("connect"),
            address: ActionSlot::new("get_address"),
            signature: ActionSlot::new("sign_transaction"),
            install_app: ActionSlot::new("install_app"),
            uninstall_app: ActionSlot::new("uninstall_app"),
        })
    }

    pub fn session_id(&self) -> Option<DeviceSessionId> {
        *self.session.read().expect("session lock")
    }

    pub fn session_state(&self) -> Option<SessionState> {
        self.session_state.borrow().clone()
    }

    pub fn subscribe_session_state(&self) -> watch::Receiver<Option<SessionState>> {
        self.session_state.subscribe()
    }

    pub fn connect_action(&self) -> &ActionSlot<DeviceSessionId> {
        &self.connect
    }

    pub fn address_action(&self) -> &ActionSlot<AddressOutput> {
        &self.address
    }

    pub fn signature_action(&self) -> &ActionSlot<TransactionSignature> {
        &self.signature
    }

    pub fn install_app_action(&self) -> &ActionSlot<AppOperationReport> {
        &self.install_app
    }

    pub fn uninstall_app_action(&self) -> &ActionSlot<AppOperationReport> {
        &self.uninstall_app
    }

    fn require_session(&self) -> Result<DeviceSessionId, ActionError> {
        self.session_id().ok_or(ActionError::NoSession)
    }

    fn start_session_state_task(&self, session: DeviceSessionId) {
        let mut states = self.connector.observe_session_state(session);
        let sink = Arc::clone(&self.session_state);
        let task = tokio::spawn(async move {
            while let Some(state) = states.next().await {
                sink.send_replace(Some(state));
            }
        });
        let previous = self
            .session_state_task
            .lock()
            .expect("session state task lock")
            .replace(task);
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    /// Takes the first device that answers discovery, connects it, and
    /// records the resulting session. Connectivity failures (including an
    /// empty discovery pass) settle the connect slot as failed.
    pub fn connect_first_device(self: &Arc<Self>) {
        let client = Arc::clone(self);
        self.connect.run_future(async move {
            let mut discovery = client.connector.start_discovery();
            let device = discovery.next().await.ok_or_else(|| {
                ActionError::Device(DeviceError::connectivity(
                    "no device responded to discovery",
                ))
            })?;
            info!(
                "discovered device id={} name={}",
                device.device_id, device.name
            );
            let session = client
                .connector
                .connect(&device)
                .await
                .map_err(|err| ActionError::Device(DeviceError::connectivity(err.to_string())))?;
            *client.session.write().expect("session lock") = Some(session);
            client.start_session_state_task(session);
            info!("device session opened session={session}");
            Ok(session)
        });
    }

    pub fn derive_address(&self, derivation_path: &str) {
        let session = match self.require_session() {
            Ok(session) => session,
            Err(error) => return self.address.fail(error),
        };
        if derivation_path.trim().is_empty() {
            return self
                .address
                .fail(ActionError::InvalidRequest("derivation path is empty".into()));
        }
        self.address
            .run(self.signer.get_address(session, derivation_path));
    }

    /// Decodes the raw transaction hex before touching the device; a
    /// payload that does not decode never reaches the signer.
    pub fn sign_transaction(&self, derivation_path: &str, raw_transaction_hex: &str) {
        let session = match self.require_session() {
            Ok(session) => session,
            Err(error) => return self.signature.fail(error),
        };
        if derivation_path.trim().is_empty() {
            return self
                .signature
                .fail(ActionError::InvalidRequest("derivation path is empty".into()));
        }
        let raw_transaction = match decode_hex_string(raw_transaction_hex) {
            Ok(bytes) => bytes,
            Err(error) => {
                return self.signature.fail(ActionError::InvalidRequest(format!(
                    "raw transaction: {error}"
                )))
            }
        };
        self.signature.run(self.signer.sign_transaction(
            session,
            derivation_path,
            raw_transaction,
        ));
    }

    pub fn install_app(&self, app_name: &str) {
        let session = match self.require_session() {
            Ok(session) => session,
            Err(error) => return self.install_app.fail(error),
        };
        if app_name.trim().is_empty() {
            return self
                .install_app
                .fail(ActionError::InvalidRequest("app name is empty".into()));
        }
        self.install_app
            .run(self.app_manager.install_app(session, app_name));
    }

    pub fn uninstall_app(&self, app_name: &str) {
        let session = match self.require_session() {
            Ok(session) => session,
            Err(error) => return self.uninstall_app.fail(error),
        };
        if app_name.trim().is_empty() {
            return self
                .uninstall_app
                .fail(ActionError::InvalidRequest("app name is empty".into()));
        }
        self.uninstall_app
            .run(self.app_manager.uninstall_app(session, app_name));
    }

    /// Tears down the session: stops state observation, clears every slot,
    /// and tells the connector to release the device.
    pub async fn disconnect(&self) -> anyhow::Result<()> {
        let session = self.session.write().expect("session lock").take();
        if let Some(task) = self
            .session_state_task
            .lock()
            .expect("session state task lock")
            .take()
        {
            task.abort();
        }
        self.session_state.send_replace(None);
        self.connect.reset();
        self.address.reset();
        self.signature.reset();
        self.install_app.reset();
        self.uninstall_app.reset();

        if let Some(session) = session {
            self.connector.disconnect(session).await?;
            info!("device session closed session={session}");
        }
        Ok(())
    }
}
