//! Keys of the wallet key/value store.

pub const NETWORK: &str = "network";
pub const VERSION: &str = "version";
pub const BASE_NODE_HEX: &str = "base_node_hex";
pub const BASE_NODE_ADDRESS: &str = "base_node_address";

/// File name of the wallet database inside the data directory.
pub const DB_FILE: &str = "wallet.json";
