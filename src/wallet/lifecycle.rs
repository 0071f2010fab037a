//! WalletLifecycle - the only component allowed to move wallet state
//!
//! ```text
//! NotReady ──start_wallet()──▶ Starting ──▶ Started
//!    ▲                            │
//!    │                            └──────▶ StartFailed(err)
//!    └──────── stop() / reset() ◀─────────────┘
//! ```
//!
//! Transitions are broadcast to every subscriber. The stream is hot and does
//! not replay: a new subscriber only sees transitions that happen after it
//! subscribed.

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

use super::WalletBackend;
use crate::error::{AuroraError, AuroraResult};

#[derive(Debug, Clone)]
pub enum WalletState {
    NotReady,
    Starting,
    Started,
    StartFailed(AuroraError),
}

impl WalletState {
    pub fn is_started(&self) -> bool { matches!(self, WalletState::Started) }
    pub fn is_terminal(&self) -> bool {
        matches!(self, WalletState::Started | WalletState::StartFailed(_))
    }
}

#[derive(Clone)]
pub struct WalletLifecycle {
    inner: Arc<LifecycleInner>,
}

struct LifecycleInner {
    backend: Arc<dyn WalletBackend>,
    state: Mutex<WalletState>,
    events: broadcast::Sender<WalletState>,
}

impl WalletLifecycle {
    pub fn new(backend: Arc<dyn WalletBackend>) -> Self {
        let (events, _) = broadcast::channel(16);
        Self {
            inner: Arc::new(LifecycleInner {
                backend,
                state: Mutex::new(WalletState::NotReady),
                events,
            }),
        }
    }

    pub fn backend(&self) -> &Arc<dyn WalletBackend> { &self.inner.backend }

    pub fn state(&self) -> WalletState { self.lock().clone() }

    pub fn subscribe(&self) -> broadcast::Receiver<WalletState> { self.inner.events.subscribe() }

    /// Begin starting the wallet. No-op unless the state is `NotReady`.
    pub fn start_wallet(&self) {
        {
            let mut state = self.lock();
            if !matches!(*state, WalletState::NotReady) {
                return;
            }
            self.transition(&mut state, WalletState::Starting);
        }

        let this = self.clone();
        tokio::spawn(async move {
            let next = match this.inner.backend.start().await {
                Ok(()) => WalletState::Started,
                Err(e) => {
                    tracing::warn!(error = %e, "wallet start failed");
                    WalletState::StartFailed(e)
                }
            };
            let mut state = this.lock();
            // A stop() while starting wins over the late result.
            if matches!(*state, WalletState::Starting) {
                this.transition(&mut state, next);
            }
        });
    }

    /// Call `on_complete` once the wallet is started, or `on_error` if it fails.
    ///
    /// Only future transitions are observed; other states are ignored until a
    /// terminal one arrives. The subscription ends after either callback.
    pub fn wait_for_start<C, E>(&self, on_complete: C, on_error: E) -> tokio::task::JoinHandle<()>
    where
        C: FnOnce() + Send + 'static,
        E: FnOnce(AuroraError) + Send + 'static,
    {
        let mut rx = self.subscribe();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(WalletState::Started) => return on_complete(),
                    Ok(WalletState::StartFailed(e)) => return on_error(e),
                    Ok(_) | Err(RecvError::Lagged(_)) => continue,
                    Err(RecvError::Closed) => return,
                }
            }
        })
    }

    /// Start the wallet if needed and wait for the outcome.
    ///
    /// Resolves immediately when already started. A previous failure is
    /// cleared and the start is attempted again.
    pub async fn started(&self) -> AuroraResult<()> {
        let mut rx = {
            let mut state = self.lock();
            match &*state {
                WalletState::Started => return Ok(()),
                WalletState::StartFailed(_) => self.transition(&mut state, WalletState::NotReady),
                _ => {}
            }
            self.inner.events.subscribe()
        };

        self.start_wallet();

        loop {
            match rx.recv().await {
                Ok(WalletState::Started) => return Ok(()),
                Ok(WalletState::StartFailed(e)) => return Err(e),
                Ok(WalletState::NotReady) => {
                    return Err(AuroraError::Other("wallet stopped while starting".into()))
                }
                Ok(WalletState::Starting) | Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => {
                    return Err(AuroraError::Other("wallet lifecycle closed".into()))
                }
            }
        }
    }

    pub async fn stop(&self) -> AuroraResult<()> {
        self.inner.backend.stop().await?;
        let mut state = self.lock();
        if !matches!(*state, WalletState::NotReady) {
            self.transition(&mut state, WalletState::NotReady);
        }
        Ok(())
    }

    /// Clear a `StartFailed` state so the wallet can be started again.
    pub fn reset(&self) {
        let mut state = self.lock();
        if matches!(*state, WalletState::StartFailed(_)) {
            self.transition(&mut state, WalletState::NotReady);
        }
    }

    fn lock(&self) -> MutexGuard<'_, WalletState> {
        self.inner.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    fn transition(&self, state: &mut WalletState, next: WalletState) {
        tracing::debug!(from = ?state, to = ?next, "wallet state");
        *state = next.clone();
        let _ = self.inner.events.send(next);
    }
}
