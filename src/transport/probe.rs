//! PortProbe - polls the relay's local port and drives [`Transport`]

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::TcpStream;
use tokio::sync::broadcast;

use super::Transport;

pub struct PortProbe {
    transport: Transport,
    addr: SocketAddr,
    interval: Duration,
}

impl PortProbe {
    pub fn new(transport: Transport, addr: SocketAddr, interval: Duration) -> Self {
        Self { transport, addr, interval }
    }

    /// Probe `127.0.0.1:<port>`.
    pub fn localhost(transport: Transport, port: u16, interval: Duration) -> Self {
        Self::new(transport, SocketAddr::from(([127, 0, 0, 1], port)), interval)
    }

    /// Spawn the probe loop as a tokio task until shutdown fires.
    pub fn spawn(self, mut shutdown: broadcast::Receiver<()>) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            self.transport.mark_connecting();
            tracing::info!(addr = %self.addr, "waiting for relay ports");

            loop {
                self.probe_once().await;
                tokio::select! {
                    _ = shutdown.recv() => {
                        self.transport.mark_disconnected();
                        break;
                    }
                    _ = tokio::time::sleep(self.interval) => {}
                }
            }
        })
    }

    async fn probe_once(&self) {
        let open = matches!(
            tokio::time::timeout(self.interval, TcpStream::connect(self.addr)).await,
            Ok(Ok(_))
        );
        match (open, self.transport.is_ready()) {
            (true, false) => {
                tracing::info!(addr = %self.addr, "relay ports open");
                self.transport.mark_ports_open();
            }
            (false, true) => {
                tracing::warn!(addr = %self.addr, "relay ports closed");
                self.transport.mark_disconnected();
            }
            _ => {}
        }
    }
}
