//! FileWallet - wallet database as a single JSON document
//!
//! Holds the seed words and the wallet key/value store. Every write is a
//! read-modify-write of the whole document under one async lock.

use std::collections::BTreeMap;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use bip39::Mnemonic;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use super::{keys, WalletBackend};
use crate::error::{AuroraResult, WalletError};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WalletFile {
    created_at: String,
    seed_words: Vec<String>,
    values: BTreeMap<String, String>,
}

pub struct FileWallet {
    path: PathBuf,
    running: AtomicBool,
    write_lock: Mutex<()>,
}

impl FileWallet {
    /// Wallet stored as `wallet.json` inside `data_dir`.
    pub fn open(data_dir: &Path) -> Self {
        Self::at(data_dir.join(keys::DB_FILE))
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), running: AtomicBool::new(false), write_lock: Mutex::new(()) }
    }

    pub fn path(&self) -> &Path { &self.path }

    pub fn is_running(&self) -> bool { self.running.load(Ordering::SeqCst) }

    async fn read_file(&self) -> AuroraResult<WalletFile> {
        let raw = match tokio::fs::read_to_string(&self.path).await {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                return Err(WalletError::DatabaseMissing.into())
            }
            Err(e) => return Err(e.into()),
        };
        serde_json::from_str(&raw).map_err(|e| {
            tracing::warn!(path = %self.path.display(), error = %e, "wallet database unreadable");
            WalletError::CorruptedDatabase.into()
        })
    }

    async fn write_file(&self, file: &WalletFile) -> AuroraResult<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&self.path, serde_json::to_string_pretty(file)?).await?;
        Ok(())
    }
}

fn generate_seed_words() -> AuroraResult<Vec<String>> {
    let mut entropy = zeroize::Zeroizing::new([0u8; 32]);
    rand::thread_rng().fill_bytes(&mut entropy[..]);
    let mnemonic = Mnemonic::from_entropy(&entropy[..]).map_err(|_| WalletError::InvalidSeedWords)?;
    Ok(mnemonic.to_string().split_whitespace().map(String::from).collect())
}

fn validate_seed_words(words: Vec<String>) -> AuroraResult<Vec<String>> {
    Mnemonic::parse(words.join(" ")).map_err(|_| WalletError::InvalidSeedWords)?;
    Ok(words)
}

#[async_trait]
impl WalletBackend for FileWallet {
    async fn start(&self) -> AuroraResult<()> {
        self.read_file().await?;
        self.running.store(true, Ordering::SeqCst);
        tracing::info!(path = %self.path.display(), "wallet started");
        Ok(())
    }

    async fn stop(&self) -> AuroraResult<()> {
        self.running.store(false, Ordering::SeqCst);
        Ok(())
    }

    async fn create_new(&self, seed_words: Option<Vec<String>>) -> AuroraResult<()> {
        let _guard = self.write_lock.lock().await;
        if self.db_exists() {
            return Err(WalletError::AlreadyExists.into());
        }
        let seed_words = match seed_words {
            Some(words) => validate_seed_words(words)?,
            None => generate_seed_words()?,
        };
        let mut values = BTreeMap::new();
        values.insert(keys::VERSION.to_string(), env!("CARGO_PKG_VERSION").to_string());
        let file = WalletFile { created_at: chrono::Utc::now().to_rfc3339(), seed_words, values };
        self.write_file(&file).await?;
        tracing::info!(path = %self.path.display(), "wallet created");
        Ok(())
    }

    fn db_exists(&self) -> bool { self.path.exists() }

    async fn delete(&self) -> AuroraResult<()> {
        let _guard = self.write_lock.lock().await;
        self.running.store(false, Ordering::SeqCst);
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                tracing::info!(path = %self.path.display(), "wallet deleted");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn set_value(&self, key: &str, value: &str) -> AuroraResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut file = self.read_file().await?;
        file.values.insert(key.to_string(), value.to_string());
        self.write_file(&file).await
    }

    async fn get_value(&self, key: &str) -> AuroraResult<Option<String>> {
        Ok(self.read_file().await?.values.get(key).cloned())
    }

    async fn seed_words(&self) -> AuroraResult<Vec<String>> {
        Ok(self.read_file().await?.seed_words)
    }
}
