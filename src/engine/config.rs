//! Engine Configuration - passed from higher layers

use std::path::PathBuf;
use std::time::Duration;

/// Network the wallet is bound to. Persisted as the `network` wallet value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Network {
    MainNet,
    NextNet,
    StageNet,
    #[default]
    Esmeralda,
    Igor,
    LocalNet,
}

impl Network {
    pub fn as_str(&self) -> &'static str {
        match self {
            Network::MainNet => "mainnet",
            Network::NextNet => "nextnet",
            Network::StageNet => "stagenet",
            Network::Esmeralda => "esmeralda",
            Network::Igor => "igor",
            Network::LocalNet => "localnet",
        }
    }

    pub fn from_str(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "mainnet" | "main" => Some(Network::MainNet),
            "nextnet" => Some(Network::NextNet),
            "stagenet" => Some(Network::StageNet),
            "esmeralda" | "testnet" => Some(Network::Esmeralda),
            "igor" => Some(Network::Igor),
            "localnet" | "local" => Some(Network::LocalNet),
            _ => None,
        }
    }
}

/// User-selected base node the wallet should sync against.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BaseNode {
    pub public_key_hex: String,
    pub address: String,
}

/// Delays driving the transaction refresh sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshTimings {
    /// Pause between `Synced` and the first phase
    pub update_delay: Duration,
    /// Hold time of receiving / completing / updating phases
    pub phase_delay: Duration,
    /// Hold time of the success phase
    pub success_delay: Duration,
    /// First retry delay after a failed sync
    pub retry_base: Duration,
    pub retry_max: Duration,
}

impl Default for RefreshTimings {
    fn default() -> Self {
        Self {
            update_delay: Duration::from_secs(2),
            phase_delay: Duration::from_millis(1250),
            success_delay: Duration::from_secs(1),
            retry_base: Duration::from_secs(5),
            retry_max: Duration::from_secs(60),
        }
    }
}

/// Engine configuration. Higher layers construct this.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub app: String,
    pub data_dir: Option<PathBuf>,
    pub network: Network,
    /// Local SOCKS port of the relay. `None` means no relay gating.
    pub tor_port: Option<u16>,
    pub probe_interval: Duration,
    /// `None` waits for the relay indefinitely.
    pub transport_timeout: Option<Duration>,
    pub minimum_wallet_version: String,
    pub custom_base_node: Option<BaseNode>,
    pub refresh: RefreshTimings,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            app: "aurora".into(),
            data_dir: None,
            network: Network::default(),
            tor_port: None,
            probe_interval: Duration::from_millis(500),
            transport_timeout: None,
            minimum_wallet_version: "0.1.0".into(),
            custom_base_node: None,
            refresh: RefreshTimings::default(),
        }
    }
}

impl EngineConfig {
    pub fn new(app: impl Into<String>) -> Self {
        Self { app: app.into(), ..Default::default() }
    }

    /// Build from `AURORA_*` environment variables on top of defaults.
    pub fn from_env(app: impl Into<String>) -> Self {
        let mut config = Self::new(app);
        let network = std::env::var("AURORA_NETWORK").ok().and_then(|v| Network::from_str(&v));
        if let Some(network) = network {
            config.network = network;
        }
        if let Some(port) = std::env::var("AURORA_TOR_PORT").ok().and_then(|v| v.parse().ok()) {
            config.tor_port = Some(port);
        }
        let timeout: Option<u64> =
            std::env::var("AURORA_TRANSPORT_TIMEOUT_SECS").ok().and_then(|v| v.parse().ok());
        if let Some(secs) = timeout {
            config.transport_timeout = Some(Duration::from_secs(secs));
        }
        config
    }

    pub fn with_data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(path.into());
        self
    }
    pub fn with_network(mut self, network: Network) -> Self { self.network = network; self }
    pub fn with_tor_port(mut self, port: u16) -> Self { self.tor_port = Some(port); self }
    pub fn with_probe_interval(mut self, interval: Duration) -> Self {
        self.probe_interval = interval;
        self
    }
    pub fn with_transport_timeout(mut self, timeout: Duration) -> Self {
        self.transport_timeout = Some(timeout);
        self
    }
    pub fn with_minimum_wallet_version(mut self, v: impl Into<String>) -> Self {
        self.minimum_wallet_version = v.into();
        self
    }
    pub fn with_base_node(mut self, node: BaseNode) -> Self {
        self.custom_base_node = Some(node);
        self
    }
    pub fn with_refresh(mut self, timings: RefreshTimings) -> Self { self.refresh = timings; self }

    /// Directory holding the wallet database.
    pub fn resolved_data_dir(&self) -> PathBuf {
        self.data_dir.clone().unwrap_or_else(|| {
            let root = std::env::var("AURORA_ROOT").map(PathBuf::from)
                .unwrap_or_else(|_| dirs::data_local_dir().unwrap_or_else(|| PathBuf::from(".")));
            root.join(&self.app)
        })
    }
}
