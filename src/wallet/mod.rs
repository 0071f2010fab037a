//! Wallet module - native wallet seam and lifecycle
//!
//! The real cryptography and base-node protocol live in the native wallet
//! library. This module only defines the seam to it ([`WalletBackend`]),
//! a file-backed implementation, and the lifecycle state machine that is the
//! single owner of wallet start/stop transitions.
//!
//! # Architecture
//!
//! ```text
//! WalletLifecycle (NotReady → Starting → Started | StartFailed)
//!     │
//!     └── Arc<dyn WalletBackend>
//!               │
//!               └── FileWallet (wallet.json: seed words + key/value store)
//!
//! VersionValidator ── reads the `version` value before opening
//! ```

mod file;
pub mod keys;
mod lifecycle;
mod version;

use async_trait::async_trait;

use crate::error::AuroraResult;

pub use file::FileWallet;
pub use lifecycle::{WalletLifecycle, WalletState};
pub use version::{parse_version, MinimumVersion, VersionValidator};

/// Operations the orchestration core needs from the native wallet.
#[async_trait]
pub trait WalletBackend: Send + Sync {
    async fn start(&self) -> AuroraResult<()>;
    async fn stop(&self) -> AuroraResult<()>;
    /// Create the wallet database. `None` generates fresh seed words.
    async fn create_new(&self, seed_words: Option<Vec<String>>) -> AuroraResult<()>;
    fn db_exists(&self) -> bool;
    async fn delete(&self) -> AuroraResult<()>;
    async fn set_value(&self, key: &str, value: &str) -> AuroraResult<()>;
    async fn get_value(&self, key: &str) -> AuroraResult<Option<String>>;
    async fn seed_words(&self) -> AuroraResult<Vec<String>>;
}
