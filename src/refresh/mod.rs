//! Refresh - the pull-to-refresh affordance driven by base node sync
//!
//! ```text
//! SyncStatus::Syncing ──▶ Loading (only from Idle)
//! SyncStatus::Synced  ──▶ update mode ──update_delay──▶ sequence
//!                            │
//!      received|mined ─▶ Receiving ─phase_delay─┐
//!      broadcast      ─▶ Completing ─phase_delay┤   phases whose flag is
//!      cancelled      ─▶ Updating ─phase_delay──┤   unset are skipped
//!                        Success ─success_delay─┴─▶ EndRefreshing, Idle
//! SyncStatus::Failed  ──▶ cancel, Idle, RetrySync { attempt, after }
//! ```
//!
//! Transaction events always produce `ReloadTransactions`. They only set a
//! sequence flag while the coordinator is in update mode.
//!
//! Every phase sleep races the sequence's `CancellationToken`, so a second
//! `Synced` restarts the sequence and `Failed` aborts it.

use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;

use serde::Serialize;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::engine::RefreshTimings;
use crate::events::{EventBus, Subscription, SyncStatus, TxKind};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RefreshPhase {
    Idle,
    Loading,
    Receiving,
    Completing,
    Updating,
    Success,
}

/// What the presentation layer is told to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshSignal {
    Affordance(RefreshPhase),
    ReloadTransactions,
    EndRefreshing,
    RetrySync { attempt: u32, after: Duration },
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RefreshSequenceFlags {
    pub received: bool,
    pub mined: bool,
    pub broadcast: bool,
    pub cancelled: bool,
}

impl RefreshSequenceFlags {
    fn set(&mut self, kind: TxKind) {
        match kind {
            TxKind::Received => self.received = true,
            TxKind::Mined => self.mined = true,
            TxKind::Broadcast => self.broadcast = true,
            TxKind::Cancelled => self.cancelled = true,
        }
    }
}

#[derive(Clone)]
pub struct RefreshCoordinator {
    inner: Arc<RefreshInner>,
}

struct RefreshInner {
    timings: RefreshTimings,
    state: Mutex<RefreshState>,
    signals: broadcast::Sender<RefreshSignal>,
    stop: CancellationToken,
    subscriptions: Mutex<Vec<Subscription>>,
}

#[derive(Default)]
struct RefreshState {
    affordance: Option<RefreshPhase>,
    update_mode: bool,
    flags: RefreshSequenceFlags,
    sequence: Option<(u64, CancellationToken)>,
    next_sequence: u64,
    retry_attempt: u32,
}

impl RefreshCoordinator {
    pub fn new(timings: RefreshTimings) -> Self {
        let (signals, _) = broadcast::channel(64);
        Self {
            inner: Arc::new(RefreshInner {
                timings,
                state: Mutex::new(RefreshState::default()),
                signals,
                stop: CancellationToken::new(),
                subscriptions: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<RefreshSignal> {
        self.inner.signals.subscribe()
    }
    pub fn timings(&self) -> &RefreshTimings { &self.inner.timings }
    pub fn affordance(&self) -> RefreshPhase {
        self.lock().affordance.unwrap_or(RefreshPhase::Idle)
    }
    pub fn flags(&self) -> RefreshSequenceFlags { self.lock().flags }
    pub fn is_update_mode(&self) -> bool { self.lock().update_mode }
    pub fn retry_attempt(&self) -> u32 { self.lock().retry_attempt }

    /// Subscribe to the bus and run until `shutdown` fires or
    /// [`stop`](Self::stop) is called.
    pub fn spawn(&self, bus: &EventBus, mut shutdown: broadcast::Receiver<()>) -> JoinHandle<()> {
        self.attach(bus);
        let this = self.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = shutdown.recv() => tracing::debug!("refresh coordinator shutting down"),
                _ = this.inner.stop.cancelled() => {}
            }
            this.stop();
        })
    }

    /// Register handlers for every transaction stream and for sync status.
    pub fn attach(&self, bus: &EventBus) {
        let mut subscriptions = Vec::with_capacity(5);
        for kind in [TxKind::Received, TxKind::Mined, TxKind::Broadcast, TxKind::Cancelled] {
            let weak = Arc::downgrade(&self.inner);
            subscriptions.push(Subscription::spawn(bus.subscribe_tx(kind), move |_event| {
                if let Some(this) = upgrade(&weak) {
                    this.handle_tx(kind);
                }
                async {}
            }));
        }
        let weak = Arc::downgrade(&self.inner);
        subscriptions.push(Subscription::spawn(bus.subscribe_sync_status(), move |status| {
            if let Some(this) = upgrade(&weak) {
                this.handle_sync_status(status);
            }
            async {}
        }));
        self.inner.subscriptions.lock().unwrap_or_else(|p| p.into_inner()).extend(subscriptions);
    }

    /// Cancel the running sequence and drop all subscriptions.
    pub fn stop(&self) {
        self.inner.stop.cancel();
        self.cancel_sequence(&mut self.lock());
        self.inner.subscriptions.lock().unwrap_or_else(|p| p.into_inner()).clear();
    }

    pub fn handle_tx(&self, kind: TxKind) {
        {
            let mut state = self.lock();
            if state.update_mode {
                state.flags.set(kind);
            }
        }
        self.emit(RefreshSignal::ReloadTransactions);
    }

    pub fn handle_sync_status(&self, status: SyncStatus) {
        tracing::debug!(?status, "refresh sync status");
        match status {
            SyncStatus::Idle => {}
            SyncStatus::Syncing => self.on_syncing(),
            SyncStatus::Synced => self.on_synced(),
            SyncStatus::Failed => self.on_failed(),
        }
    }

    fn on_syncing(&self) {
        let show = {
            let mut state = self.lock();
            let idle = state.affordance.unwrap_or(RefreshPhase::Idle) == RefreshPhase::Idle;
            if idle {
                state.affordance = Some(RefreshPhase::Loading);
            }
            idle
        };
        if show {
            self.emit(RefreshSignal::Affordance(RefreshPhase::Loading));
        }
    }

    fn on_synced(&self) {
        let (id, token) = {
            let mut state = self.lock();
            state.retry_attempt = 0;
            state.update_mode = true;
            self.cancel_sequence(&mut state);
            let id = state.next_sequence;
            state.next_sequence += 1;
            let token = self.inner.stop.child_token();
            state.sequence = Some((id, token.clone()));
            (id, token)
        };

        let this = self.clone();
        tokio::spawn(async move {
            if !pause(this.inner.timings.update_delay, &token).await {
                return;
            }
            let flags = {
                let state = this.lock();
                if !state.update_mode {
                    return;
                }
                state.flags
            };
            this.play(flags, &token, Some(id)).await;
        });
    }

    fn on_failed(&self) {
        let attempt = {
            let mut state = self.lock();
            self.cancel_sequence(&mut state);
            state.flags = RefreshSequenceFlags::default();
            state.update_mode = false;
            state.affordance = Some(RefreshPhase::Idle);
            state.retry_attempt = state.retry_attempt.saturating_add(1);
            state.retry_attempt
        };
        let after = self.backoff(attempt);
        tracing::warn!(
            attempt,
            after_ms = after.as_millis() as u64,
            "sync failed, scheduling retry"
        );

        self.emit(RefreshSignal::EndRefreshing);
        self.emit(RefreshSignal::Affordance(RefreshPhase::Idle));
        self.emit(RefreshSignal::RetrySync { attempt, after });
    }

    /// Delay before retry `attempt` (1-based): `retry_base * 2^(attempt-1)`, capped.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let timings = &self.inner.timings;
        let factor = 2u32.saturating_pow(attempt.saturating_sub(1));
        timings.retry_base.saturating_mul(factor).min(timings.retry_max)
    }

    /// Walk the phase timeline for `flags` without touching coordinator state.
    ///
    /// Nothing is emitted and the running sequence, if any, is unaffected.
    /// Returns the phases that would be shown, in order.
    pub async fn run_sequence(&self, flags: RefreshSequenceFlags) -> Vec<RefreshPhase> {
        let token = self.inner.stop.child_token();
        self.play(flags, &token, None).await.unwrap_or_default()
    }

    /// `sequence` is the id of the bus-driven sequence being played; `None`
    /// walks the timeline silently. Returns `None` when cancelled.
    async fn play(
        &self,
        flags: RefreshSequenceFlags,
        token: &CancellationToken,
        sequence: Option<u64>,
    ) -> Option<Vec<RefreshPhase>> {
        let timings = &self.inner.timings;
        let steps = [
            (RefreshPhase::Receiving, flags.received || flags.mined, timings.phase_delay),
            (RefreshPhase::Completing, flags.broadcast, timings.phase_delay),
            (RefreshPhase::Updating, flags.cancelled, timings.phase_delay),
            (RefreshPhase::Success, true, timings.success_delay),
        ];

        let mut visited = Vec::with_capacity(steps.len());
        for (phase, shown, delay) in steps {
            if !shown {
                continue;
            }
            if token.is_cancelled() {
                return None;
            }
            if sequence.is_some() {
                self.show(phase);
            }
            visited.push(phase);
            if !pause(delay, token).await {
                tracing::debug!(?phase, "refresh sequence cancelled");
                return None;
            }
        }

        if let Some(id) = sequence {
            self.complete(id);
        }
        Some(visited)
    }

    fn complete(&self, id: u64) {
        {
            let mut state = self.lock();
            if matches!(&state.sequence, Some((current, _)) if *current == id) {
                state.sequence = None;
            }
            state.flags = RefreshSequenceFlags::default();
            state.update_mode = false;
            state.affordance = Some(RefreshPhase::Idle);
        }
        self.emit(RefreshSignal::EndRefreshing);
        self.emit(RefreshSignal::Affordance(RefreshPhase::Idle));
    }

    fn show(&self, phase: RefreshPhase) {
        self.lock().affordance = Some(phase);
        self.emit(RefreshSignal::Affordance(phase));
    }

    fn cancel_sequence(&self, state: &mut RefreshState) {
        if let Some((id, token)) = state.sequence.take() {
            tracing::debug!(sequence = id, "cancelling refresh sequence");
            token.cancel();
        }
    }

    fn emit(&self, signal: RefreshSignal) {
        tracing::trace!(?signal, "refresh signal");
        let _ = self.inner.signals.send(signal);
    }

    fn lock(&self) -> MutexGuard<'_, RefreshState> {
        self.inner.state.lock().unwrap_or_else(|p| p.into_inner())
    }
}

fn upgrade(weak: &Weak<RefreshInner>) -> Option<RefreshCoordinator> {
    weak.upgrade().map(|inner| RefreshCoordinator { inner })
}

/// Sleep for `delay`; `false` if `token` fired first.
async fn pause(delay: Duration, token: &CancellationToken) -> bool {
    tokio::select! {
        biased;
        _ = token.cancelled() => false,
        _ = tokio::time::sleep(delay) => true,
    }
}
