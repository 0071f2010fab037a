//! Version migration check run before an existing wallet is opened

use async_trait::async_trait;

use super::{keys, WalletBackend};
use crate::error::{AuroraError, AuroraResult};

#[async_trait]
pub trait VersionValidator: Send + Sync {
    /// `Ok(false)` means the stored wallet cannot be migrated and must be
    /// deleted. Storage failures are errors, never a verdict.
    async fn validate(&self, backend: &dyn WalletBackend) -> AuroraResult<bool>;
}

/// Accepts wallets created by this version or any later than `minimum`.
#[derive(Debug, Clone)]
pub struct MinimumVersion {
    minimum: String,
}

impl MinimumVersion {
    pub fn new(minimum: impl Into<String>) -> Self {
        Self { minimum: minimum.into() }
    }

    pub async fn check(&self, backend: &dyn WalletBackend) -> AuroraResult<()> {
        let stored = backend.get_value(keys::VERSION).await?.unwrap_or_default();
        match (parse_version(&stored), parse_version(&self.minimum)) {
            (Some(have), Some(need)) if have >= need => Ok(()),
            _ => Err(AuroraError::VersionMismatch {
                stored,
                minimum: self.minimum.clone(),
            }),
        }
    }
}

#[async_trait]
impl VersionValidator for MinimumVersion {
    async fn validate(&self, backend: &dyn WalletBackend) -> AuroraResult<bool> {
        match self.check(backend).await {
            Ok(()) => Ok(true),
            Err(e @ AuroraError::VersionMismatch { .. }) => {
                tracing::warn!(error = %e, "wallet version check failed");
                Ok(false)
            }
            Err(e) => Err(e),
        }
    }
}

/// Parse `major[.minor[.patch]][-suffix]` into a comparable triple.
pub fn parse_version(value: &str) -> Option<(u64, u64, u64)> {
    let core = value.trim().split(['-', '+']).next()?;
    let mut parts = core.split('.').map(|p| p.parse::<u64>());
    let major = parts.next()?.ok()?;
    let minor = parts.next().transpose().ok()?.unwrap_or(0);
    let patch = parts.next().transpose().ok()?.unwrap_or(0);
    if parts.next().is_some() {
        return None;
    }
    Some((major, minor, patch))
}
