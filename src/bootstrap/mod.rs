//! Bootstrap - create, open, recover and delete the wallet
//!
//! The orchestrator behind the splash screen. It composes the connection
//! gate and the wallet lifecycle into three flows and publishes a [`Status`]
//! the presentation layer observes.
//!
//! ```text
//! create_wallet()          open_wallet()               recover_wallet_if_needed()
//!   │                        │                           │
//!   ├─ create_new(None)      ├─ VersionValidator         ├─ RecoveryService::recover
//!   ├─ join(gate, start)     │    └─ outdated → delete   └─ open_wallet()
//!   │    └─ err → rollback   ├─ start (unless Started)
//!   ├─ persist network       ├─ persist network
//!   └─ Success               └─ Success | SuccessRestored | SuccessSync
//! ```
//!
//! Every failure ends here: status returns to `Idle` and a [`MessageModel`]
//! is published. Create/open/delete share one single-flight lock, so a delete
//! waits for an in-flight flow and flows started during a delete are ignored.

mod messages;

pub use messages::{templates, ErrorMessages, MessageAction, MessageModel, Severity};

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use serde::Serialize;
use tokio::sync::{broadcast, watch};

use crate::engine::{BaseNode, Network};
use crate::error::{AuroraError, AuroraResult};
use crate::recovery::{RecoveryMode, RecoveryPayload, RecoveryService};
use crate::transport::ConnectionGate;
use crate::wallet::{keys, VersionValidator, WalletBackend, WalletLifecycle};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BootstrapStatus {
    Idle,
    Working,
    Success,
    SuccessRestored,
    SuccessSync,
}

/// How the presentation layer should animate into the next screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusTransition {
    Content,
    Logo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Status {
    pub status: BootstrapStatus,
    pub transition: StatusTransition,
}

impl Status {
    pub fn new(status: BootstrapStatus, transition: StatusTransition) -> Self {
        Self { status, transition }
    }

    pub fn idle() -> Self { Self::new(BootstrapStatus::Idle, StatusTransition::Content) }
}

/// Services the orchestrator is built from.
#[derive(Clone)]
pub struct BootstrapDeps {
    pub lifecycle: WalletLifecycle,
    pub gate: ConnectionGate,
    pub validator: Arc<dyn VersionValidator>,
    pub recovery: Arc<dyn RecoveryService>,
    pub network: Network,
    pub custom_base_node: Option<BaseNode>,
}

#[derive(Clone)]
pub struct Bootstrap {
    inner: Arc<BootstrapInner>,
}

struct BootstrapInner {
    deps: BootstrapDeps,
    recovery_payload: Option<RecoveryPayload>,
    recovery_mode: RecoveryMode,
    status: watch::Sender<Status>,
    messages: broadcast::Sender<MessageModel>,
    last_message: Mutex<Option<MessageModel>>,
    is_wallet_exist: AtomicBool,
    can_automatically_reconnect: AtomicBool,
    is_recovery_in_progress: AtomicBool,
    flight: tokio::sync::Mutex<()>,
}

impl Bootstrap {
    pub fn new(deps: BootstrapDeps, recovery_payload: Option<RecoveryPayload>) -> Self {
        let recovery_mode =
            recovery_payload.as_ref().map(RecoveryPayload::mode).unwrap_or_default();
        let exists = deps.lifecycle.backend().db_exists();
        let (status, _) = watch::channel(Status::idle());
        let (messages, _) = broadcast::channel(16);
        Self {
            inner: Arc::new(BootstrapInner {
                deps,
                recovery_payload,
                recovery_mode,
                status,
                messages,
                last_message: Mutex::new(None),
                is_wallet_exist: AtomicBool::new(exists),
                can_automatically_reconnect: AtomicBool::new(false),
                is_recovery_in_progress: AtomicBool::new(false),
                flight: tokio::sync::Mutex::new(()),
            }),
        }
    }

    // Observables
    pub fn status(&self) -> Status { *self.inner.status.borrow() }
    pub fn subscribe_status(&self) -> watch::Receiver<Status> { self.inner.status.subscribe() }
    pub fn subscribe_messages(&self) -> broadcast::Receiver<MessageModel> {
        self.inner.messages.subscribe()
    }
    pub fn last_message(&self) -> Option<MessageModel> {
        self.inner.last_message.lock().unwrap_or_else(|p| p.into_inner()).clone()
    }
    pub fn recovery_mode(&self) -> RecoveryMode { self.inner.recovery_mode }
    pub fn is_wallet_exist(&self) -> bool { self.inner.is_wallet_exist.load(Ordering::SeqCst) }
    pub fn can_automatically_reconnect(&self) -> bool {
        self.inner.can_automatically_reconnect.load(Ordering::SeqCst)
    }
    pub fn is_recovery_in_progress(&self) -> bool {
        self.inner.is_recovery_in_progress.load(Ordering::SeqCst)
    }

    /// Create a new wallet and wait until it is connected.
    ///
    /// Ignored while another flow is `Working` or a delete is in progress.
    pub async fn create_wallet(&self) {
        if self.status().status == BootstrapStatus::Working {
            tracing::debug!("create ignored: already working");
            return;
        }
        let Ok(_flight) = self.inner.flight.try_lock() else {
            tracing::debug!("create ignored: flow in flight");
            return;
        };
        self.set_status(BootstrapStatus::Working, StatusTransition::Content);

        match self.run_create().await {
            Ok(()) => self.set_status(BootstrapStatus::Success, StatusTransition::Content),
            Err(e) => self.fail(e),
        }
    }

    async fn run_create(&self) -> AuroraResult<()> {
        self.backend().create_new(None).await?;
        self.refresh_wallet_exist();

        if let Err(e) = self.connect_created().await {
            self.rollback_create().await;
            return Err(e);
        }
        self.inner.can_automatically_reconnect.store(true, Ordering::SeqCst);
        Ok(())
    }

    async fn connect_created(&self) -> AuroraResult<()> {
        let deps = &self.inner.deps;
        tokio::try_join!(deps.gate.wait_ready(), deps.lifecycle.started())?;
        self.persist_settings().await
    }

    /// Remove a wallet that was created but never connected, so the next
    /// `create_wallet` starts from an empty store.
    async fn rollback_create(&self) {
        if let Err(e) = self.inner.deps.lifecycle.stop().await {
            tracing::warn!(error = %e, "wallet stop failed during create rollback");
        }
        match self.backend().delete().await {
            Ok(()) => tracing::info!("rolled back unconnected wallet"),
            Err(e) => tracing::error!(error = %e, "create rollback could not delete wallet"),
        }
        self.refresh_wallet_exist();
    }

    /// Start the open flow when a wallet database exists.
    ///
    /// Returns `false`, with no other effect, when there is none.
    pub fn open_wallet_if_exists(&self) -> bool {
        if !self.backend().db_exists() {
            return false;
        }
        let this = self.clone();
        tokio::spawn(async move { this.open_wallet().await });
        true
    }

    /// Open the existing wallet. Ignored while another flow is in flight.
    pub async fn open_wallet(&self) {
        if self.status().status == BootstrapStatus::Working {
            tracing::debug!("open ignored: already working");
            return;
        }
        let Ok(_flight) = self.inner.flight.try_lock() else {
            tracing::debug!("open ignored: flow in flight");
            return;
        };
        let transition = self.status().transition;
        self.set_status(BootstrapStatus::Working, transition);

        match self.run_open().await {
            Ok(Some(status)) => self.set_status(status, StatusTransition::Logo),
            Ok(None) => {
                tracing::warn!("wallet failed version validation, deleting");
                self.delete_locked().await;
            }
            Err(e) => self.fail(e),
        }
    }

    /// `None` when the stored wallet failed version validation. Storage
    /// errors met while validating are returned, never treated as outdated.
    async fn run_open(&self) -> AuroraResult<Option<BootstrapStatus>> {
        if !self.inner.deps.validator.validate(self.backend().as_ref()).await? {
            return Ok(None);
        }

        if !self.inner.deps.lifecycle.state().is_started() {
            self.inner.deps.lifecycle.started().await?;
        }

        self.persist_settings().await?;
        self.inner.can_automatically_reconnect.store(true, Ordering::SeqCst);

        Ok(Some(match self.inner.recovery_mode {
            RecoveryMode::PaperWallet => BootstrapStatus::SuccessSync,
            RecoveryMode::SeedPhrase => BootstrapStatus::SuccessRestored,
            RecoveryMode::None => BootstrapStatus::Success,
        }))
    }

    /// Hand the recovery payload to the recovery service, then open the wallet.
    ///
    /// Returns `false` when no payload was supplied at construction.
    pub fn recover_wallet_if_needed(&self) -> bool {
        let Some(payload) = self.inner.recovery_payload.clone() else {
            return false;
        };
        if self.inner.is_recovery_in_progress.swap(true, Ordering::SeqCst) {
            return true;
        }

        let this = self.clone();
        tokio::spawn(async move {
            let backend = this.backend().clone();
            let base_node = this.inner.deps.custom_base_node.clone();
            let result = this
                .inner
                .deps
                .recovery
                .recover(
                    backend.as_ref(),
                    payload.cipher.as_str(),
                    payload.passphrase.as_deref().map(String::as_str),
                    base_node.as_ref().map(|n| n.public_key_hex.as_str()),
                    base_node.as_ref().map(|n| n.address.as_str()),
                )
                .await;
            this.refresh_wallet_exist();

            match result {
                Ok(()) => this.open_wallet().await,
                Err(e) => this.publish_error(&e),
            }
            this.inner.is_recovery_in_progress.store(false, Ordering::SeqCst);
        });
        true
    }

    /// Run [`recover_wallet_if_needed`](Self::recover_wallet_if_needed) and
    /// wait for the flow to settle.
    ///
    /// Settles on a published message or on the first status after `Working`
    /// (a success, or `Idle` once an outdated wallet is deleted). `false`
    /// without a payload.
    pub async fn recover_wallet(&self) -> bool {
        let mut status = self.subscribe_status();
        let mut messages = self.subscribe_messages();
        if !self.recover_wallet_if_needed() {
            return false;
        }

        // Every status sent after subscribing comes from this flow, so any
        // change that is not `Working` ends it, even if `Working` was coalesced.
        loop {
            tokio::select! {
                _ = messages.recv() => break,
                changed = status.changed() => {
                    if changed.is_err() {
                        break;
                    }
                    if status.borrow_and_update().status != BootstrapStatus::Working {
                        break;
                    }
                }
            }
        }
        true
    }

    /// Delete the wallet. Waits for any in-flight create/open first.
    pub async fn delete_wallet(&self) {
        let _flight = self.inner.flight.lock().await;
        self.delete_locked().await;
    }

    async fn delete_locked(&self) {
        if let Err(e) = self.inner.deps.lifecycle.stop().await {
            tracing::warn!(error = %e, "wallet stop failed during delete");
        }
        if let Err(e) = self.backend().delete().await {
            tracing::error!(error = %e, "wallet delete failed");
            self.publish_error(&e);
        }
        self.inner.can_automatically_reconnect.store(false, Ordering::SeqCst);
        self.set_status(BootstrapStatus::Idle, StatusTransition::Content);
        self.refresh_wallet_exist();
    }

    fn backend(&self) -> &Arc<dyn WalletBackend> { self.inner.deps.lifecycle.backend() }

    async fn persist_settings(&self) -> AuroraResult<()> {
        let backend = self.backend();
        backend.set_value(keys::NETWORK, self.inner.deps.network.as_str()).await?;
        if let Some(node) = &self.inner.deps.custom_base_node {
            backend.set_value(keys::BASE_NODE_HEX, &node.public_key_hex).await?;
            backend.set_value(keys::BASE_NODE_ADDRESS, &node.address).await?;
        }
        Ok(())
    }

    fn refresh_wallet_exist(&self) {
        self.inner.is_wallet_exist.store(self.backend().db_exists(), Ordering::SeqCst);
    }

    fn set_status(&self, status: BootstrapStatus, transition: StatusTransition) {
        let next = Status::new(status, transition);
        tracing::info!(status = ?status, transition = ?transition, "bootstrap status");
        self.inner.status.send_replace(next);
    }

    fn fail(&self, error: AuroraError) {
        tracing::error!(error = %error, signature = %error.signature(), "bootstrap failed");
        self.set_status(BootstrapStatus::Idle, StatusTransition::Content);
        self.publish_error(&error);
    }

    fn publish_error(&self, error: &AuroraError) {
        let message = ErrorMessages::message_for(error);
        *self.inner.last_message.lock().unwrap_or_else(|p| p.into_inner()) = Some(message.clone());
        let _ = self.inner.messages.send(message);
    }
}
