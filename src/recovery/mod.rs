//! Recovery - restore a wallet from seed words or a paper wallet
//!
//! # Paper wallet cipher
//!
//! A paper wallet is the 32-byte BIP39 entropy of the seed words, XORed with
//! a key derived from the passphrase, hex encoded:
//!
//! ```text
//! key    = blake3::derive_key("aurora paper wallet v1", passphrase)
//! cipher = hex(entropy ⊕ key)
//! ```

use async_trait::async_trait;
use bip39::Mnemonic;
use zeroize::Zeroizing;

use crate::error::{AuroraError, AuroraResult};
use crate::wallet::{keys, WalletBackend};

const PAPER_CONTEXT: &str = "aurora paper wallet v1";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecoveryMode {
    #[default]
    None,
    SeedPhrase,
    PaperWallet,
}

/// Caller-supplied recovery data.
#[derive(Clone)]
pub struct RecoveryPayload {
    pub cipher: Zeroizing<String>,
    pub passphrase: Option<Zeroizing<String>>,
}

impl RecoveryPayload {
    pub fn seed_phrase(words: impl Into<String>) -> Self {
        Self { cipher: Zeroizing::new(words.into()), passphrase: None }
    }

    pub fn paper_wallet(cipher: impl Into<String>, passphrase: impl Into<String>) -> Self {
        Self {
            cipher: Zeroizing::new(cipher.into()),
            passphrase: Some(Zeroizing::new(passphrase.into())),
        }
    }

    pub fn mode(&self) -> RecoveryMode {
        if self.passphrase.is_some() { RecoveryMode::PaperWallet } else { RecoveryMode::SeedPhrase }
    }
}

impl std::fmt::Debug for RecoveryPayload {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RecoveryPayload").field("mode", &self.mode()).finish_non_exhaustive()
    }
}

#[async_trait]
pub trait RecoveryService: Send + Sync {
    async fn recover(
        &self,
        wallet: &dyn WalletBackend,
        cipher: &str,
        passphrase: Option<&str>,
        custom_base_node_hex: Option<&str>,
        custom_base_node_address: Option<&str>,
    ) -> AuroraResult<()>;
}

/// Recovers by recreating the wallet database from the decoded seed words.
#[derive(Debug, Clone, Default)]
pub struct BackendRecovery;

#[async_trait]
impl RecoveryService for BackendRecovery {
    async fn recover(
        &self,
        wallet: &dyn WalletBackend,
        cipher: &str,
        passphrase: Option<&str>,
        custom_base_node_hex: Option<&str>,
        custom_base_node_address: Option<&str>,
    ) -> AuroraResult<()> {
        let words = match passphrase {
            Some(passphrase) => open_paper_wallet(cipher, passphrase)?,
            None => cipher.split_whitespace().map(String::from).collect(),
        };
        let count = words.len();
        wallet.create_new(Some(words)).await?;

        if let (Some(hex), Some(address)) = (custom_base_node_hex, custom_base_node_address) {
            wallet.set_value(keys::BASE_NODE_HEX, hex).await?;
            wallet.set_value(keys::BASE_NODE_ADDRESS, address).await?;
        }
        tracing::info!(words = count, paper = passphrase.is_some(), "wallet recovered");
        Ok(())
    }
}

fn paper_key(passphrase: &str) -> Zeroizing<[u8; 32]> {
    Zeroizing::new(blake3::derive_key(PAPER_CONTEXT, passphrase.as_bytes()))
}

/// Encode seed words as a paper wallet cipher.
pub fn seal_paper_wallet(words: &[String], passphrase: &str) -> AuroraResult<String> {
    let mnemonic = Mnemonic::parse(words.join(" "))
        .map_err(|e| AuroraError::Recovery(format!("seed words: {e}")))?;
    let entropy = Zeroizing::new(mnemonic.to_entropy());
    if entropy.len() != 32 {
        return Err(AuroraError::Recovery("paper wallets need 24 seed words".into()));
    }
    let key = paper_key(passphrase);
    let sealed: Vec<u8> = entropy.iter().zip(key.iter()).map(|(a, b)| a ^ b).collect();
    Ok(hex::encode(sealed))
}

/// Decode a paper wallet cipher into seed words.
pub fn open_paper_wallet(cipher: &str, passphrase: &str) -> AuroraResult<Vec<String>> {
    let sealed = hex::decode(cipher.trim())
        .map_err(|e| AuroraError::Recovery(format!("cipher: {e}")))?;
    if sealed.len() != 32 {
        return Err(AuroraError::Recovery(format!("cipher must be 32 bytes, got {}", sealed.len())));
    }
    let key = paper_key(passphrase);
    let entropy: Zeroizing<Vec<u8>> =
        Zeroizing::new(sealed.iter().zip(key.iter()).map(|(a, b)| a ^ b).collect());
    let mnemonic = Mnemonic::from_entropy(&entropy[..])
        .map_err(|e| AuroraError::Recovery(format!("entropy: {e}")))?;
    Ok(mnemonic.to_string().split_whitespace().map(String::from).collect())
}
