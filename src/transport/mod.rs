//! Transport - relay readiness and the wallet connection gate
//!
//! The wallet may only start talking to the network once the anonymizing
//! relay has opened its local ports. [`Transport`] holds that state in a
//! `watch` channel; [`ConnectionGate`] turns it into a continuation.
//!
//! ```text
//! PortProbe ──mark_*()──▶ Transport (watch<TransportState>)
//!                              │
//!                              ▼
//!                        ConnectionGate
//!                          ├── on_transport_ready(cb)   one-shot callback
//!                          └── wait_ready().await       async form
//! ```

mod probe;

pub use probe::PortProbe;

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio_util::sync::CancellationToken;

use crate::error::{AuroraError, AuroraResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportState {
    Stopped,
    Connecting,
    PortsOpen,
    Disconnected,
}

/// Relay transport state, shared by cloning.
#[derive(Clone)]
pub struct Transport {
    state: Arc<watch::Sender<TransportState>>,
}

impl Default for Transport {
    fn default() -> Self { Self::new() }
}

impl Transport {
    pub fn new() -> Self {
        let (state, _) = watch::channel(TransportState::Stopped);
        Self { state: Arc::new(state) }
    }

    /// Transport with ports already open (no relay in use).
    pub fn ready() -> Self {
        let transport = Self::new();
        transport.mark_ports_open();
        transport
    }

    pub fn state(&self) -> TransportState { *self.state.borrow() }
    pub fn is_ready(&self) -> bool { self.state() == TransportState::PortsOpen }
    pub fn subscribe(&self) -> watch::Receiver<TransportState> { self.state.subscribe() }

    pub fn mark_connecting(&self) { self.set(TransportState::Connecting); }
    pub fn mark_ports_open(&self) { self.set(TransportState::PortsOpen); }
    pub fn mark_disconnected(&self) { self.set(TransportState::Disconnected); }

    fn set(&self, state: TransportState) {
        let previous = self.state.send_replace(state);
        if previous != state {
            tracing::debug!(from = ?previous, to = ?state, "transport state");
        }
    }
}

/// Handle to a pending readiness listener.
pub struct GateListener {
    token: Option<CancellationToken>,
}

impl GateListener {
    /// Deregister the listener if it has not fired yet.
    pub fn cancel(&self) {
        if let Some(token) = &self.token {
            token.cancel();
        }
    }

    /// True when the callback already ran synchronously.
    pub fn fired_immediately(&self) -> bool { self.token.is_none() }
}

/// Gates wallet start on relay readiness.
#[derive(Clone)]
pub struct ConnectionGate {
    transport: Transport,
    timeout: Option<Duration>,
}

impl ConnectionGate {
    pub fn new(transport: Transport) -> Self {
        Self { transport, timeout: None }
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn transport(&self) -> &Transport { &self.transport }

    /// Run `callback` once the relay ports are open.
    ///
    /// Runs synchronously when the transport is already ready. Otherwise a
    /// one-shot listener is registered and removed after it fires. There is
    /// no error path: if the ports never open, the callback never runs.
    pub fn on_transport_ready<F>(&self, callback: F) -> GateListener
    where
        F: FnOnce() + Send + 'static,
    {
        if self.transport.is_ready() {
            callback();
            return GateListener { token: None };
        }

        let mut rx = self.transport.subscribe();
        let token = CancellationToken::new();
        let cancelled = token.clone();
        tokio::spawn(async move {
            tokio::select! {
                biased;
                _ = cancelled.cancelled() => {}
                ready = rx.wait_for(|s| *s == TransportState::PortsOpen) => {
                    if ready.is_ok() {
                        callback();
                    }
                }
            }
        });
        GateListener { token: Some(token) }
    }

    /// Wait until the relay ports are open.
    ///
    /// Fails with `DisconnectedFromTor` when the relay reports a disconnect,
    /// and with `TransportTimeout` when a timeout is configured and elapses.
    pub async fn wait_ready(&self) -> AuroraResult<()> {
        let mut rx = self.transport.subscribe();
        let wait = async move {
            let state = rx
                .wait_for(|s| matches!(s, TransportState::PortsOpen | TransportState::Disconnected))
                .await
                .map_err(|_| AuroraError::DisconnectedFromTor)?;
            match *state {
                TransportState::PortsOpen => Ok(()),
                _ => Err(AuroraError::DisconnectedFromTor),
            }
        };

        match self.timeout {
            Some(limit) => tokio::time::timeout(limit, wait)
                .await
                .map_err(|_| AuroraError::TransportTimeout(limit))?,
            None => wait.await,
        }
    }
}
