//! Aurora: wallet bootstrap and transaction sync orchestration.
//!
//! The native wallet library does the cryptography and talks to base nodes.
//! This crate decides *when*: it waits for the Tor relay, starts the wallet
//! exactly once, runs the create/open/recover/delete flows behind the splash
//! screen, and drives the pull-to-refresh animation from sync events.
//!
//! # Architecture
//!
//! ```text
//! Engine (composition root)
//!   │
//!   ├── Transport ◀── PortProbe            relay readiness (watch)
//!   │     └── ConnectionGate               one-shot "ports open" continuation
//!   │
//!   ├── WalletLifecycle                    NotReady → Starting → Started | StartFailed
//!   │     └── Arc<dyn WalletBackend>       FileWallet
//!   │
//!   ├── Bootstrap                          create / open / recover / delete → Status
//!   │     ├── VersionValidator
//!   │     └── RecoveryService
//!   │
//!   └── EventBus ─▶ RefreshCoordinator     SyncStatus → animation phases
//! ```
//!
//! # Flows
//!
//! | Flow | Method | Ends in |
//! |------|--------|---------|
//! | create | `bootstrap.create_wallet()` | `Success` |
//! | open | `bootstrap.open_wallet_if_exists()` | `Success` / `SuccessRestored` / `SuccessSync` |
//! | recover | `bootstrap.recover_wallet_if_needed()` | open flow |
//! | delete | `bootstrap.delete_wallet()` | `Idle` |
//!
//! Failures never escape a flow: status returns to `Idle` and a
//! [`MessageModel`] is published.
//!
//! # Usage
//!
//! ```ignore
//! use aurora::{Engine, EngineConfig, Network};
//!
//! let engine = Engine::from_config(
//!     EngineConfig::new("aurora").with_network(Network::NextNet).with_tor_port(9050),
//!     None,
//! )?;
//!
//! if !engine.bootstrap().open_wallet_if_exists() {
//!     engine.bootstrap().create_wallet().await;
//! }
//! let mut status = engine.bootstrap().subscribe_status();
//! ```

pub mod bootstrap;
pub mod engine;
pub mod error;
pub mod events;
pub mod logging;
pub mod recovery;
pub mod refresh;
pub mod runtime;
pub mod transport;
pub mod wallet;

pub use bootstrap::{
    Bootstrap, BootstrapDeps, BootstrapStatus, MessageModel, Status, StatusTransition,
};
pub use engine::{BaseNode, Engine, EngineConfig, Network, RefreshTimings};
pub use error::{AuroraError, AuroraResult, WalletError};
pub use events::{EventBus, SyncStatus, TxEvent, TxKind};
pub use recovery::{RecoveryMode, RecoveryPayload, RecoveryService};
pub use refresh::{RefreshCoordinator, RefreshPhase, RefreshSequenceFlags, RefreshSignal};
pub use runtime::{install_signal_handlers, Shutdown};
pub use transport::{ConnectionGate, Transport, TransportState};
pub use wallet::{FileWallet, WalletBackend, WalletLifecycle, WalletState};
