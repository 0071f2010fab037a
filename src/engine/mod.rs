//! Engine - composition root
//!
//! Wires configuration into the running services:
//!
//! ```text
//! EngineConfig
//!   ├── Transport ◀── PortProbe (when tor_port is set, else ready)
//!   ├── FileWallet ─▶ WalletLifecycle
//!   ├── EventBus ─▶ RefreshCoordinator
//!   └── Bootstrap (gate + lifecycle + MinimumVersion + BackendRecovery)
//! ```
//!
//! Must be built inside a tokio runtime: the probe and the coordinator are
//! spawned immediately and stop on [`Engine::shutdown`].

mod config;

pub use config::{BaseNode, EngineConfig, Network, RefreshTimings};

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::bootstrap::{Bootstrap, BootstrapDeps};
use crate::error::AuroraResult;
use crate::events::EventBus;
use crate::recovery::{BackendRecovery, RecoveryPayload};
use crate::refresh::RefreshCoordinator;
use crate::runtime::Shutdown;
use crate::transport::{ConnectionGate, PortProbe, Transport};
use crate::wallet::{FileWallet, MinimumVersion, WalletBackend, WalletLifecycle};

pub struct Engine {
    config: EngineConfig,
    transport: Transport,
    wallet: Arc<FileWallet>,
    lifecycle: WalletLifecycle,
    bus: EventBus,
    bootstrap: Bootstrap,
    refresh: RefreshCoordinator,
    shutdown: Shutdown,
    tasks: Vec<JoinHandle<()>>,
}

impl Engine {
    pub fn from_config(
        config: EngineConfig,
        recovery: Option<RecoveryPayload>,
    ) -> AuroraResult<Self> {
        let data_dir = config.resolved_data_dir();
        std::fs::create_dir_all(&data_dir)?;

        let shutdown = Shutdown::new();
        let mut tasks = Vec::new();

        let transport = match config.tor_port {
            Some(port) => {
                let transport = Transport::new();
                let probe = PortProbe::localhost(transport.clone(), port, config.probe_interval);
                tasks.push(probe.spawn(shutdown.subscribe()));
                transport
            }
            None => Transport::ready(),
        };

        let wallet = Arc::new(FileWallet::open(&data_dir));
        let backend: Arc<dyn WalletBackend> = wallet.clone();
        let lifecycle = WalletLifecycle::new(backend);

        let bus = EventBus::new();
        let refresh = RefreshCoordinator::new(config.refresh);
        tasks.push(refresh.spawn(&bus, shutdown.subscribe()));

        let gate = ConnectionGate::new(transport.clone()).with_timeout(config.transport_timeout);
        let bootstrap = Bootstrap::new(
            BootstrapDeps {
                lifecycle: lifecycle.clone(),
                gate,
                validator: Arc::new(MinimumVersion::new(config.minimum_wallet_version.clone())),
                recovery: Arc::new(BackendRecovery),
                network: config.network,
                custom_base_node: config.custom_base_node.clone(),
            },
            recovery,
        );

        tracing::info!(
            data_dir = %data_dir.display(),
            network = config.network.as_str(),
            tor_port = ?config.tor_port,
            "engine ready"
        );

        Ok(Self { config, transport, wallet, lifecycle, bus, bootstrap, refresh, shutdown, tasks })
    }

    pub fn config(&self) -> &EngineConfig { &self.config }
    pub fn transport(&self) -> &Transport { &self.transport }
    pub fn wallet(&self) -> &Arc<FileWallet> { &self.wallet }
    pub fn lifecycle(&self) -> &WalletLifecycle { &self.lifecycle }
    pub fn bus(&self) -> &EventBus { &self.bus }
    pub fn bootstrap(&self) -> &Bootstrap { &self.bootstrap }
    pub fn refresh(&self) -> &RefreshCoordinator { &self.refresh }
    pub fn shutdown_handle(&self) -> &Shutdown { &self.shutdown }

    /// Stop background tasks and the wallet.
    pub async fn shutdown(self) -> AuroraResult<()> {
        self.shutdown.trigger();
        for task in self.tasks {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "background task ended abnormally");
            }
        }
        self.lifecycle.stop().await?;
        tracing::info!("engine stopped");
        Ok(())
    }
}
