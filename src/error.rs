//! Errors - one taxonomy for every orchestration layer
//!
//! Lower layers return [`AuroraResult`] and propagate with `?`. The bootstrap
//! orchestrator is the boundary: it converts errors into a
//! [`MessageModel`](crate::bootstrap::MessageModel) and never re-raises them.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;

pub type AuroraResult<T> = Result<T, AuroraError>;

/// Failures reported by the native wallet store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WalletError {
    #[error("wallet database is corrupted")]
    CorruptedDatabase,
    #[error("wallet database does not exist")]
    DatabaseMissing,
    #[error("wallet database already exists")]
    AlreadyExists,
    #[error("invalid seed words")]
    InvalidSeedWords,
    #[error("wallet error code {0}")]
    Code(i32),
}

impl WalletError {
    pub fn signature(&self) -> String {
        match self {
            WalletError::CorruptedDatabase => "wallet.corrupted_database".into(),
            WalletError::DatabaseMissing => "wallet.database_missing".into(),
            WalletError::AlreadyExists => "wallet.already_exists".into(),
            WalletError::InvalidSeedWords => "wallet.invalid_seed_words".into(),
            WalletError::Code(code) => format!("wallet.code.{code}"),
        }
    }
}

#[derive(Debug, Clone, Error)]
pub enum AuroraError {
    #[error("disconnected from tor")]
    DisconnectedFromTor,
    #[error("transport not ready after {0:?}")]
    TransportTimeout(Duration),
    #[error(transparent)]
    Wallet(#[from] WalletError),
    #[error("recovery failed: {0}")]
    Recovery(String),
    #[error("wallet version {stored} is older than {minimum}")]
    VersionMismatch { stored: String, minimum: String },
    #[error("io: {0}")]
    Io(Arc<std::io::Error>),
    #[error("json: {0}")]
    Json(Arc<serde_json::Error>),
    #[error("{0}")]
    Other(String),
}

impl From<std::io::Error> for AuroraError {
    fn from(e: std::io::Error) -> Self { AuroraError::Io(Arc::new(e)) }
}

impl From<serde_json::Error> for AuroraError {
    fn from(e: serde_json::Error) -> Self { AuroraError::Json(Arc::new(e)) }
}

impl AuroraError {
    /// Stable key used to look up user-facing messages.
    pub fn signature(&self) -> String {
        match self {
            AuroraError::DisconnectedFromTor => "tor.disconnected".into(),
            AuroraError::TransportTimeout(_) => "tor.timeout".into(),
            AuroraError::Wallet(e) => e.signature(),
            AuroraError::Recovery(_) => "recovery.failed".into(),
            AuroraError::VersionMismatch { .. } => "wallet.version".into(),
            AuroraError::Io(_) => "io".into(),
            AuroraError::Json(_) => "json".into(),
            AuroraError::Other(_) => "other".into(),
        }
    }

    pub fn is_transport(&self) -> bool {
        matches!(self, AuroraError::DisconnectedFromTor | AuroraError::TransportTimeout(_))
    }
}
