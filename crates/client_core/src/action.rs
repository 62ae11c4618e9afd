//! Single-slot orchestration of long-running device actions.
//!
//! Each operation kind (connect, derive address, sign, ...) owns one
//! `ActionSlot`. Starting an action resets the slot, then a driver task
//! mirrors the provider's notification stream into a watch channel the
//! presentation layer renders from. Starting a new action while one is in
//! flight aborts the previous driver, so the newer invocation always wins.

use std::{
    future::Future,
    sync::{Arc, Mutex},
};

use device_kit::{ActionEvent, ActionStream};
use futures::StreamExt;
use shared::{domain::ActionProgress, error::DeviceError};
use thiserror::Error;
use tokio::{sync::watch, task::JoinHandle};
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ActionError {
    #[error("no active device session")]
    NoSession,
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error(transparent)]
    Device(#[from] DeviceError),
    #[error("device action stream ended without a terminal event")]
    StreamClosed,
}

/// Lifecycle of one operation kind. `Completed` and `Failed` are mutually
/// exclusive by construction; there is no way to hold both an output and
/// an error.
#[derive(Debug, Clone, PartialEq)]
pub enum ActionState<O> {
    Idle,
    Pending(ActionProgress),
    Completed(O),
    Failed(ActionError),
}

impl<O> ActionState<O> {
    pub fn is_busy(&self) -> bool {
        matches!(self, ActionState::Pending(_))
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, ActionState::Completed(_) | ActionState::Failed(_))
    }

    pub fn output(&self) -> Option<&O> {
        match self {
            ActionState::Completed(output) => Some(output),
            _ => None,
        }
    }

    pub fn error(&self) -> Option<&ActionError> {
        match self {
            ActionState::Failed(error) => Some(error),
            _ => None,
        }
    }
}

pub struct ActionSlot<O> {
    state: Arc<watch::Sender<ActionState<O>>>,
    task: Mutex<Option<JoinHandle<()>>>,
    kind: &'static str,
}

impl<O: Clone + Send + Sync + 'static> ActionSlot<O> {
    pub fn new(kind: &'static str) -> Self {
        let (state, _) = watch::channel(ActionState::Idle);
        Self {
            state: Arc::new(state),
            task: Mutex::new(None),
            kind,
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<ActionState<O>> {
        self.state.subscribe()
    }

    pub fn state(&self) -> ActionState<O> {
        self.state.borrow().clone()
    }

    pub fn is_busy(&self) -> bool {
        self.state.borrow().is_busy()
    }

    /// Aborts the in-flight driver (if any) and clears the slot. Always the
    /// first step of a new invocation, so stale notifications from a
    /// superseded stream can never land here.
    fn supersede(&self) {
        if let Some(task) = self.task.lock().expect("slot task lock").take() {
            if !task.is_finished() {
                debug!(slot = self.kind, "aborting superseded device action");
            }
            task.abort();
        }
        self.state.send_replace(ActionState::Idle);
    }

    pub fn reset(&self) {
        self.supersede();
    }

    /// Local-validation path: the external operation was never invoked.
    pub fn fail(&self, error: ActionError) {
        self.supersede();
        warn!(slot = self.kind, %error, "device action rejected before dispatch");
        self.state.send_replace(ActionState::Failed(error));
    }

    /// Drives the slot from a provider notification stream. A stream that
    /// ends without a terminal event counts as a failure.
    pub fn run(&self, mut stream: ActionStream<O>) {
        self.supersede();
        let state = Arc::clone(&self.state);
        let kind = self.kind;
        let task = tokio::spawn(async move {
            while let Some(event) = stream.next().await {
                match event {
                    ActionEvent::Pending(progress) => {
                        state.send_replace(ActionState::Pending(progress));
                    }
                    ActionEvent::Completed(output) => {
                        debug!(slot = kind, "device action completed");
                        state.send_replace(ActionState::Completed(output));
                        return;
                    }
                    ActionEvent::Failed(error) => {
                        warn!(slot = kind, %error, "device action failed");
                        state.send_replace(ActionState::Failed(error.into()));
                        return;
                    }
                }
            }
            warn!(slot = kind, "device action stream closed without terminal event");
            state.send_replace(ActionState::Failed(ActionError::StreamClosed));
        });
        *self.task.lock().expect("slot task lock") = Some(task);
    }

    /// Drives the slot from a promise-shaped operation (no intermediate
    /// notifications), e.g. the discover-and-connect flow.
    pub fn run_future<F>(&self, operation: F)
    where
        F: Future<Output = Result<O, ActionError>> + Send + 'static,
    {
        self.supersede();
        let state = Arc::clone(&self.state);
        let kind = self.kind;
        let task = tokio::spawn(async move {
            match operation.await {
                Ok(output) => {
                    debug!(slot = kind, "device action completed");
                    state.send_replace(ActionState::Completed(output));
                }
                Err(error) => {
                    warn!(slot = kind, %error, "device action failed");
                    state.send_replace(ActionState::Failed(error));
                }
            }
        });
        *self.task.lock().expect("slot task lock") = Some(task);
    }
}

/// Waits until the observed slot reaches `Completed` or `Failed` and
/// returns that state.
pub async fn settled<O: Clone>(rx: &mut watch::Receiver<ActionState<O>>) -> ActionState<O> {
    loop {
        let current = rx.borrow_and_update().clone();
        if current.is_terminal() {
            return current;
        }
        if rx.changed().await.is_err() {
            return rx.borrow().clone();
        }
    }
}
