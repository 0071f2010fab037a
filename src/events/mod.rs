//! Events - typed publish/subscribe, one stream per event kind
//!
//! | Stream | Payload | Published by |
//! |--------|---------|--------------|
//! | `received` | [`TxEvent`] | wallet callback: inbound transaction |
//! | `mined` | [`TxEvent`] | wallet callback: transaction mined |
//! | `broadcast` | [`TxEvent`] | wallet callback: transaction broadcast |
//! | `cancelled` | [`TxEvent`] | wallet callback: transaction cancelled |
//! | `sync_status` | [`SyncStatus`] | base node sync service |
//!
//! Receivers are plain `broadcast::Receiver`s. [`Subscription`] binds a
//! handler task to an owner: dropping it ends the subscription.

use std::future::Future;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::RecvError;

const CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxEvent {
    pub tx_id: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncStatus {
    Idle,
    Syncing,
    Synced,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxKind {
    Received,
    Mined,
    Broadcast,
    Cancelled,
}

#[derive(Clone)]
pub struct EventBus {
    received: broadcast::Sender<TxEvent>,
    mined: broadcast::Sender<TxEvent>,
    broadcast: broadcast::Sender<TxEvent>,
    cancelled: broadcast::Sender<TxEvent>,
    sync_status: broadcast::Sender<SyncStatus>,
}

impl Default for EventBus {
    fn default() -> Self { Self::new() }
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            received: broadcast::channel(CAPACITY).0,
            mined: broadcast::channel(CAPACITY).0,
            broadcast: broadcast::channel(CAPACITY).0,
            cancelled: broadcast::channel(CAPACITY).0,
            sync_status: broadcast::channel(CAPACITY).0,
        }
    }

    fn tx_sender(&self, kind: TxKind) -> &broadcast::Sender<TxEvent> {
        match kind {
            TxKind::Received => &self.received,
            TxKind::Mined => &self.mined,
            TxKind::Broadcast => &self.broadcast,
            TxKind::Cancelled => &self.cancelled,
        }
    }

    pub fn publish_tx(&self, kind: TxKind, event: TxEvent) {
        tracing::trace!(?kind, tx_id = event.tx_id, "tx event");
        let _ = self.tx_sender(kind).send(event);
    }

    pub fn publish_received(&self, event: TxEvent) { self.publish_tx(TxKind::Received, event) }
    pub fn publish_mined(&self, event: TxEvent) { self.publish_tx(TxKind::Mined, event) }
    pub fn publish_broadcast(&self, event: TxEvent) { self.publish_tx(TxKind::Broadcast, event) }
    pub fn publish_cancelled(&self, event: TxEvent) { self.publish_tx(TxKind::Cancelled, event) }

    pub fn publish_sync_status(&self, status: SyncStatus) {
        tracing::debug!(?status, "sync status");
        let _ = self.sync_status.send(status);
    }

    pub fn subscribe_tx(&self, kind: TxKind) -> broadcast::Receiver<TxEvent> {
        self.tx_sender(kind).subscribe()
    }
    pub fn subscribe_received(&self) -> broadcast::Receiver<TxEvent> { self.received.subscribe() }
    pub fn subscribe_mined(&self) -> broadcast::Receiver<TxEvent> { self.mined.subscribe() }
    pub fn subscribe_broadcast(&self) -> broadcast::Receiver<TxEvent> { self.broadcast.subscribe() }
    pub fn subscribe_cancelled(&self) -> broadcast::Receiver<TxEvent> { self.cancelled.subscribe() }
    pub fn subscribe_sync_status(&self) -> broadcast::Receiver<SyncStatus> {
        self.sync_status.subscribe()
    }
}

/// A handler task bound to one stream. Aborted on drop.
pub struct Subscription {
    handle: tokio::task::JoinHandle<()>,
}

impl Subscription {
    /// Run `handler` for every value on `rx` until the stream closes or the
    /// subscription is dropped. Lagged values are skipped.
    pub fn spawn<T, F, Fut>(mut rx: broadcast::Receiver<T>, mut handler: F) -> Self
    where
        T: Clone + Send + 'static,
        F: FnMut(T) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let handle = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(value) => handler(value).await,
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "subscriber lagged");
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        });
        Self { handle }
    }

    pub fn is_active(&self) -> bool { !self.handle.is_finished() }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
