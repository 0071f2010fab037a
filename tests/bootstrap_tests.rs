//! Integration Tests: bootstrap flows against an in-memory wallet
//!
//! These tests verify:
//! 1. create is ignored while a flow is working
//! 2. open_wallet_if_exists has no effect without a database
//! 3. the final open status follows the recovery mode
//! 4. delete always resets existence and status
//! 5. create waits for both the relay and the wallet start
//! 6. wallet start failures surface the right message
//! 7. a create that never connects leaves nothing behind
//! 8. file-backed opens tell corruption apart from an outdated version

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tempfile::TempDir;
use tokio::time::Instant;

use aurora::bootstrap::{templates, BootstrapStatus, MessageAction, StatusTransition};
use aurora::recovery::{seal_paper_wallet, BackendRecovery, RecoveryMode, RecoveryPayload};
use aurora::wallet::{keys, MinimumVersion, WalletState};
use aurora::{
    AuroraResult, Bootstrap, BootstrapDeps, ConnectionGate, FileWallet, Network, Transport,
    WalletBackend, WalletError, WalletLifecycle,
};

const WORDS_24: &str = concat!(
    "abandon abandon abandon abandon abandon abandon abandon abandon ",
    "abandon abandon abandon abandon abandon abandon abandon abandon ",
    "abandon abandon abandon abandon abandon abandon abandon art",
);

/// Wallet backend kept in memory with a scripted start.
#[derive(Default)]
struct MemoryWallet {
    exists: AtomicBool,
    start_delay: Duration,
    start_error: Option<WalletError>,
    values: Mutex<HashMap<String, String>>,
    words: Mutex<Vec<String>>,
    starts: AtomicUsize,
    creates: AtomicUsize,
}

impl MemoryWallet {
    fn empty() -> Self { Self::default() }

    fn existing(version: &str) -> Self {
        let wallet = Self::default();
        wallet.exists.store(true, Ordering::SeqCst);
        wallet.values.lock().unwrap().insert(keys::VERSION.into(), version.into());
        wallet
    }

    fn start_after(mut self, delay: Duration) -> Self {
        self.start_delay = delay;
        self
    }

    fn start_fails(mut self, error: WalletError) -> Self {
        self.start_error = Some(error);
        self
    }

    fn value(&self, key: &str) -> Option<String> {
        self.values.lock().unwrap().get(key).cloned()
    }
    fn starts(&self) -> usize { self.starts.load(Ordering::SeqCst) }
    fn creates(&self) -> usize { self.creates.load(Ordering::SeqCst) }

    fn require(&self) -> AuroraResult<()> {
        if self.exists.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(WalletError::DatabaseMissing.into())
        }
    }
}

#[async_trait]
impl WalletBackend for MemoryWallet {
    async fn start(&self) -> AuroraResult<()> {
        self.starts.fetch_add(1, Ordering::SeqCst);
        tokio::time::sleep(self.start_delay).await;
        match &self.start_error {
            Some(e) => Err(e.clone().into()),
            None => self.require(),
        }
    }

    async fn stop(&self) -> AuroraResult<()> { Ok(()) }

    async fn create_new(&self, seed_words: Option<Vec<String>>) -> AuroraResult<()> {
        if self.exists.swap(true, Ordering::SeqCst) {
            return Err(WalletError::AlreadyExists.into());
        }
        self.creates.fetch_add(1, Ordering::SeqCst);
        let words = seed_words.unwrap_or_else(|| WORDS_24.split(' ').map(String::from).collect());
        *self.words.lock().unwrap() = words;
        self.values
            .lock()
            .unwrap()
            .insert(keys::VERSION.into(), env!("CARGO_PKG_VERSION").into());
        Ok(())
    }

    fn db_exists(&self) -> bool { self.exists.load(Ordering::SeqCst) }

    async fn delete(&self) -> AuroraResult<()> {
        self.exists.store(false, Ordering::SeqCst);
        self.values.lock().unwrap().clear();
        Ok(())
    }

    async fn set_value(&self, key: &str, value: &str) -> AuroraResult<()> {
        self.require()?;
        self.values.lock().unwrap().insert(key.into(), value.into());
        Ok(())
    }

    async fn get_value(&self, key: &str) -> AuroraResult<Option<String>> {
        self.require()?;
        Ok(self.value(key))
    }

    async fn seed_words(&self) -> AuroraResult<Vec<String>> {
        self.require()?;
        Ok(self.words.lock().unwrap().clone())
    }
}

fn deps(backend: Arc<dyn WalletBackend>, gate: ConnectionGate) -> BootstrapDeps {
    BootstrapDeps {
        lifecycle: WalletLifecycle::new(backend),
        gate,
        validator: Arc::new(MinimumVersion::new("0.1.0")),
        recovery: Arc::new(BackendRecovery),
        network: Network::NextNet,
        custom_base_node: None,
    }
}

fn bootstrap(
    wallet: &Arc<MemoryWallet>,
    transport: &Transport,
    payload: Option<RecoveryPayload>,
) -> Bootstrap {
    Bootstrap::new(deps(wallet.clone(), ConnectionGate::new(transport.clone())), payload)
}

/// Bootstrap over a `wallet.json` inside `dir`.
fn file_bootstrap(dir: &TempDir) -> (Arc<FileWallet>, Bootstrap) {
    let wallet = Arc::new(FileWallet::open(dir.path()));
    let gate = ConnectionGate::new(Transport::ready());
    let bootstrap = Bootstrap::new(deps(wallet.clone(), gate), None);
    (wallet, bootstrap)
}

async fn wait_for_status(bootstrap: &Bootstrap, status: BootstrapStatus) {
    let mut rx = bootstrap.subscribe_status();
    rx.wait_for(|s| s.status == status).await.unwrap();
}

/// Record every status the bootstrap publishes until `last`.
fn record_statuses(
    bootstrap: &Bootstrap,
    last: BootstrapStatus,
) -> tokio::task::JoinHandle<Vec<BootstrapStatus>> {
    let mut rx = bootstrap.subscribe_status();
    tokio::spawn(async move {
        let mut seen = vec![rx.borrow_and_update().status];
        while rx.changed().await.is_ok() {
            let status = rx.borrow_and_update().status;
            seen.push(status);
            if status == last {
                break;
            }
        }
        seen
    })
}

#[tokio::test(start_paused = true)]
async fn create_is_ignored_while_working() {
    let wallet = Arc::new(MemoryWallet::empty());
    let transport = Transport::new();
    let bootstrap = bootstrap(&wallet, &transport, None);

    let first = tokio::spawn({
        let bootstrap = bootstrap.clone();
        async move { bootstrap.create_wallet().await }
    });
    wait_for_status(&bootstrap, BootstrapStatus::Working).await;

    // Returns at once: the first flow is still waiting for the relay.
    bootstrap.create_wallet().await;
    bootstrap.create_wallet().await;
    assert_eq!(bootstrap.status().status, BootstrapStatus::Working);
    assert_eq!(wallet.creates(), 1);

    transport.mark_ports_open();
    first.await.unwrap();
    assert_eq!(bootstrap.status().status, BootstrapStatus::Success);
    assert_eq!(wallet.creates(), 1);
    assert_eq!(wallet.starts(), 1);
    assert!(bootstrap.last_message().is_none());
}

#[tokio::test]
async fn open_without_database_has_no_effect() {
    let wallet = Arc::new(MemoryWallet::empty());
    let bootstrap = bootstrap(&wallet, &Transport::ready(), None);
    let mut messages = bootstrap.subscribe_messages();
    let mut status = bootstrap.subscribe_status();

    assert!(!bootstrap.open_wallet_if_exists());
    tokio::task::yield_now().await;

    assert!(!status.has_changed().unwrap());
    assert_eq!(bootstrap.status().status, BootstrapStatus::Idle);
    assert!(messages.try_recv().is_err());
    assert_eq!(wallet.starts(), 0);
    assert!(!bootstrap.is_wallet_exist());
    assert!(!bootstrap.can_automatically_reconnect());
}

#[tokio::test]
async fn open_status_follows_recovery_mode() {
    let cases = [
        (None, RecoveryMode::None, BootstrapStatus::Success),
        (
            Some(RecoveryPayload::seed_phrase(WORDS_24)),
            RecoveryMode::SeedPhrase,
            BootstrapStatus::SuccessRestored,
        ),
        (
            Some(RecoveryPayload::paper_wallet("00", "pw")),
            RecoveryMode::PaperWallet,
            BootstrapStatus::SuccessSync,
        ),
    ];

    for (payload, mode, expected) in cases {
        let wallet = Arc::new(MemoryWallet::existing(env!("CARGO_PKG_VERSION")));
        let bootstrap = bootstrap(&wallet, &Transport::ready(), payload);
        assert_eq!(bootstrap.recovery_mode(), mode);

        assert!(bootstrap.open_wallet_if_exists());
        wait_for_status(&bootstrap, expected).await;
        assert_eq!(bootstrap.status().transition, StatusTransition::Logo);
        assert!(bootstrap.can_automatically_reconnect());
        assert_eq!(wallet.value(keys::NETWORK).as_deref(), Some("nextnet"));
    }
}

#[tokio::test(start_paused = true)]
async fn open_skips_start_when_already_started() {
    let wallet = Arc::new(MemoryWallet::existing(env!("CARGO_PKG_VERSION")));
    let backend: Arc<dyn WalletBackend> = wallet.clone();
    let lifecycle = WalletLifecycle::new(backend);
    lifecycle.started().await.unwrap();

    let bootstrap = Bootstrap::new(
        BootstrapDeps {
            lifecycle: lifecycle.clone(),
            gate: ConnectionGate::new(Transport::ready()),
            validator: Arc::new(MinimumVersion::new("0.1.0")),
            recovery: Arc::new(BackendRecovery),
            network: Network::MainNet,
            custom_base_node: None,
        },
        None,
    );
    bootstrap.open_wallet().await;
    assert_eq!(bootstrap.status().status, BootstrapStatus::Success);
    assert_eq!(wallet.starts(), 1);
    assert_eq!(wallet.value(keys::NETWORK).as_deref(), Some("mainnet"));
}

#[tokio::test(start_paused = true)]
async fn recover_seed_phrase_then_open() {
    let wallet = Arc::new(MemoryWallet::empty());
    let payload = RecoveryPayload::seed_phrase(WORDS_24);
    let bootstrap = bootstrap(&wallet, &Transport::ready(), Some(payload));

    assert!(bootstrap.recover_wallet_if_needed());
    assert!(bootstrap.is_recovery_in_progress());

    wait_for_status(&bootstrap, BootstrapStatus::SuccessRestored).await;
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(!bootstrap.is_recovery_in_progress());
    assert!(bootstrap.is_wallet_exist());
    assert_eq!(wallet.seed_words().await.unwrap().join(" "), WORDS_24);
}

#[tokio::test(start_paused = true)]
async fn recover_paper_wallet_ends_in_sync() {
    let words: Vec<String> = WORDS_24.split(' ').map(String::from).collect();
    let cipher = seal_paper_wallet(&words, "correct horse").unwrap();
    let wallet = Arc::new(MemoryWallet::empty());
    let payload = RecoveryPayload::paper_wallet(cipher, "correct horse");
    let bootstrap = bootstrap(&wallet, &Transport::ready(), Some(payload));

    assert!(bootstrap.recover_wallet_if_needed());
    wait_for_status(&bootstrap, BootstrapStatus::SuccessSync).await;
    assert_eq!(wallet.seed_words().await.unwrap(), words);
}

#[tokio::test(start_paused = true)]
async fn recovery_failure_publishes_message() {
    let wallet = Arc::new(MemoryWallet::empty());
    let payload = RecoveryPayload::paper_wallet("not-hex", "pw");
    let bootstrap = bootstrap(&wallet, &Transport::ready(), Some(payload));
    let mut messages = bootstrap.subscribe_messages();

    assert!(bootstrap.recover_wallet_if_needed());
    let message = messages.recv().await.unwrap();
    assert_eq!(message.description, templates::RECOVERY_FAILED);

    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(!bootstrap.is_recovery_in_progress());
    assert_eq!(bootstrap.status().status, BootstrapStatus::Idle);
    assert!(!bootstrap.is_wallet_exist());
}

#[tokio::test]
async fn recover_without_payload_returns_false() {
    let wallet = Arc::new(MemoryWallet::empty());
    let bootstrap = bootstrap(&wallet, &Transport::ready(), None);
    assert!(!bootstrap.recover_wallet_if_needed());
    assert!(!bootstrap.is_recovery_in_progress());
}

#[tokio::test(start_paused = true)]
async fn delete_resets_existence_and_status() {
    let wallet = Arc::new(MemoryWallet::empty());
    let bootstrap = bootstrap(&wallet, &Transport::ready(), None);
    bootstrap.create_wallet().await;
    assert_eq!(bootstrap.status().status, BootstrapStatus::Success);
    assert!(bootstrap.is_wallet_exist());

    bootstrap.delete_wallet().await;
    assert!(!bootstrap.is_wallet_exist());
    assert!(!wallet.db_exists());
    assert_eq!(bootstrap.status().status, BootstrapStatus::Idle);
    assert_eq!(bootstrap.status().transition, StatusTransition::Content);
    assert!(!bootstrap.can_automatically_reconnect());

    // Deleting with nothing on disk still lands in the same place.
    bootstrap.delete_wallet().await;
    assert!(!bootstrap.is_wallet_exist());
    assert_eq!(bootstrap.status().status, BootstrapStatus::Idle);
}

#[tokio::test(start_paused = true)]
async fn delete_waits_for_in_flight_create() {
    let wallet = Arc::new(MemoryWallet::empty());
    let transport = Transport::new();
    let bootstrap = bootstrap(&wallet, &transport, None);

    let create = tokio::spawn({
        let bootstrap = bootstrap.clone();
        async move { bootstrap.create_wallet().await }
    });
    wait_for_status(&bootstrap, BootstrapStatus::Working).await;

    let delete = tokio::spawn({
        let bootstrap = bootstrap.clone();
        async move { bootstrap.delete_wallet().await }
    });
    tokio::time::sleep(Duration::from_millis(50)).await;
    assert!(!delete.is_finished());
    assert!(wallet.db_exists());

    transport.mark_ports_open();
    create.await.unwrap();
    delete.await.unwrap();
    assert!(!wallet.db_exists());
    assert_eq!(bootstrap.status().status, BootstrapStatus::Idle);
}

#[tokio::test(start_paused = true)]
async fn outdated_wallet_is_deleted_without_message() {
    let wallet = Arc::new(MemoryWallet::existing("0.0.9"));
    let bootstrap = bootstrap(&wallet, &Transport::ready(), None);
    assert!(bootstrap.is_wallet_exist());

    bootstrap.open_wallet().await;
    assert!(!wallet.db_exists());
    assert!(!bootstrap.is_wallet_exist());
    assert_eq!(bootstrap.status().status, BootstrapStatus::Idle);
    assert_eq!(wallet.starts(), 0);
    assert!(bootstrap.last_message().is_none());
}

#[tokio::test(start_paused = true)]
async fn create_end_to_end_waits_for_relay_and_start() {
    let wallet = Arc::new(MemoryWallet::empty().start_after(Duration::from_millis(300)));
    let transport = Transport::new();
    let bootstrap = bootstrap(&wallet, &transport, None);
    let recorder = record_statuses(&bootstrap, BootstrapStatus::Success);
    tokio::task::yield_now().await;

    tokio::spawn({
        let transport = transport.clone();
        async move {
            tokio::time::sleep(Duration::from_millis(200)).await;
            transport.mark_ports_open();
        }
    });

    let started = Instant::now();
    bootstrap.create_wallet().await;
    assert_eq!(started.elapsed(), Duration::from_millis(300));

    assert_eq!(
        recorder.await.unwrap(),
        vec![BootstrapStatus::Idle, BootstrapStatus::Working, BootstrapStatus::Success]
    );
    assert_eq!(wallet.value(keys::NETWORK).as_deref(), Some("nextnet"));
    assert!(bootstrap.can_automatically_reconnect());
}

#[tokio::test]
async fn corrupted_database_start_failure() {
    let wallet = Arc::new(MemoryWallet::empty().start_fails(WalletError::CorruptedDatabase));
    let bootstrap = bootstrap(&wallet, &Transport::ready(), None);

    bootstrap.create_wallet().await;

    let message = bootstrap.last_message().expect("message published");
    assert_eq!(message.description, templates::CORRUPTED_DATABASE);
    assert_eq!(message.action, Some(MessageAction::DeleteAndRetry));
    assert_eq!(bootstrap.status().status, BootstrapStatus::Idle);
    assert!(!bootstrap.can_automatically_reconnect());
}

#[tokio::test]
async fn relay_disconnect_fails_create_with_tor_message() {
    let wallet = Arc::new(MemoryWallet::empty());
    let transport = Transport::new();
    transport.mark_disconnected();
    let bootstrap = bootstrap(&wallet, &transport, None);

    bootstrap.create_wallet().await;
    let message = bootstrap.last_message().expect("message published");
    assert_eq!(message.description, templates::TOR_DESCRIPTION);
    assert_eq!(bootstrap.status().status, BootstrapStatus::Idle);
}

#[tokio::test]
async fn failed_start_can_be_retried_by_open() {
    let wallet = Arc::new(
        MemoryWallet::existing(env!("CARGO_PKG_VERSION")).start_fails(WalletError::Code(101)),
    );
    let backend: Arc<dyn WalletBackend> = wallet.clone();
    let lifecycle = WalletLifecycle::new(backend);
    let bootstrap = Bootstrap::new(
        BootstrapDeps {
            lifecycle: lifecycle.clone(),
            gate: ConnectionGate::new(Transport::ready()),
            validator: Arc::new(MinimumVersion::new("0.1.0")),
            recovery: Arc::new(BackendRecovery),
            network: Network::NextNet,
            custom_base_node: None,
        },
        None,
    );

    bootstrap.open_wallet().await;
    assert!(matches!(lifecycle.state(), WalletState::StartFailed(_)));
    assert!(bootstrap.last_message().unwrap().description.contains("wallet.code.101"));

    bootstrap.open_wallet().await;
    assert_eq!(wallet.starts(), 2);
}

#[tokio::test(start_paused = true)]
async fn create_after_relay_timeout_starts_clean() {
    let wallet = Arc::new(MemoryWallet::empty());
    let transport = Transport::new();
    let gate = ConnectionGate::new(transport.clone()).with_timeout(Some(Duration::from_millis(50)));
    let bootstrap = Bootstrap::new(deps(wallet.clone(), gate), None);

    bootstrap.create_wallet().await;
    assert_eq!(bootstrap.status().status, BootstrapStatus::Idle);
    assert_eq!(bootstrap.last_message().unwrap().description, templates::TOR_DESCRIPTION);
    assert!(!wallet.db_exists());
    assert!(!bootstrap.is_wallet_exist());

    transport.mark_ports_open();
    bootstrap.create_wallet().await;
    assert_eq!(bootstrap.status().status, BootstrapStatus::Success);
    assert_eq!(wallet.creates(), 2);
    assert!(bootstrap.is_wallet_exist());
    assert!(bootstrap.can_automatically_reconnect());
}

#[tokio::test]
async fn corrupted_file_wallet_is_kept_and_reported() {
    let dir = TempDir::new().unwrap();
    let (wallet, bootstrap) = file_bootstrap(&dir);
    std::fs::write(wallet.path(), "{not json").unwrap();

    bootstrap.open_wallet().await;

    assert!(wallet.db_exists());
    assert_eq!(bootstrap.status().status, BootstrapStatus::Idle);
    let message = bootstrap.last_message().expect("message published");
    assert_eq!(message.description, templates::CORRUPTED_DATABASE);
    assert_eq!(message.action, Some(MessageAction::DeleteAndRetry));
    assert!(!bootstrap.can_automatically_reconnect());
}

#[tokio::test]
async fn outdated_file_wallet_is_deleted() {
    let dir = TempDir::new().unwrap();
    let (wallet, bootstrap) = file_bootstrap(&dir);
    wallet.create_new(None).await.unwrap();
    wallet.set_value(keys::VERSION, "0.0.9").await.unwrap();

    bootstrap.open_wallet().await;

    assert!(!wallet.db_exists());
    assert!(!wallet.path().exists());
    assert!(!bootstrap.is_wallet_exist());
    assert!(!wallet.is_running());
    assert_eq!(bootstrap.status().status, BootstrapStatus::Idle);
    assert!(bootstrap.last_message().is_none());
}

#[tokio::test]
async fn current_file_wallet_opens() {
    let dir = TempDir::new().unwrap();
    let (wallet, bootstrap) = file_bootstrap(&dir);
    wallet.create_new(None).await.unwrap();

    bootstrap.open_wallet().await;

    assert_eq!(bootstrap.status().status, BootstrapStatus::Success);
    assert!(wallet.is_running());
    assert_eq!(wallet.get_value(keys::NETWORK).await.unwrap().as_deref(), Some("nextnet"));
}

#[tokio::test(start_paused = true)]
async fn recover_wallet_returns_once_settled() {
    let wallet = Arc::new(MemoryWallet::empty());
    let payload = RecoveryPayload::seed_phrase(WORDS_24);
    let bootstrap = bootstrap(&wallet, &Transport::ready(), Some(payload));

    let started = Instant::now();
    assert!(bootstrap.recover_wallet().await);
    assert!(started.elapsed() < Duration::from_millis(25));
    assert_eq!(bootstrap.status().status, BootstrapStatus::SuccessRestored);
    assert!(bootstrap.is_wallet_exist());
}

#[tokio::test(start_paused = true)]
async fn recover_wallet_returns_on_failure_message() {
    let wallet = Arc::new(MemoryWallet::empty());
    let payload = RecoveryPayload::paper_wallet("not-hex", "pw");
    let bootstrap = bootstrap(&wallet, &Transport::ready(), Some(payload));

    let started = Instant::now();
    assert!(bootstrap.recover_wallet().await);
    assert!(started.elapsed() < Duration::from_millis(25));
    assert_eq!(bootstrap.last_message().unwrap().description, templates::RECOVERY_FAILED);
    assert_eq!(bootstrap.status().status, BootstrapStatus::Idle);
}

#[tokio::test]
async fn recover_wallet_without_payload_returns_false() {
    let wallet = Arc::new(MemoryWallet::empty());
    let bootstrap = bootstrap(&wallet, &Transport::ready(), None);
    assert!(!bootstrap.recover_wallet().await);
    assert_eq!(bootstrap.status().status, BootstrapStatus::Idle);
}
