//! Configuration
//!
//! Network table, env-file loading, API key resolution, and the runtime
//! knobs passed to the adapters. The env file is read into a map and never
//! exported into the process environment.

use anyhow::{Context, Result};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

/// Environment variable holding the index API key.
pub const API_KEY_VAR: &str = "ETHERSCAN_API_KEY";

/// Etherscan V2 multichain endpoint.
pub const ETHERSCAN_V2_BASE: &str = "https://api.etherscan.io/v2/api";

/// A supported network.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkConfig {
    pub key: &'static str,
    pub name: &'static str,
    pub chain_id: u64,
    pub rpc_url: &'static str,
    pub index_base_url: &'static str,
}

pub static NETWORKS: [NetworkConfig; 2] = [
    NetworkConfig {
        key: "sepolia",
        name: "Sepolia",
        chain_id: 11_155_111,
        rpc_url: "https://ethereum-sepolia-rpc.publicnode.com",
        index_base_url: ETHERSCAN_V2_BASE,
    },
    NetworkConfig {
        key: "ethmainnet",
        name: "Ethereum Mainnet",
        chain_id: 1,
        rpc_url: "https://ethereum-rpc.publicnode.com",
        index_base_url: ETHERSCAN_V2_BASE,
    },
];

/// Look up a network by key, case-insensitively.
pub fn network(key: &str) -> Result<&'static NetworkConfig> {
    NETWORKS
        .iter()
        .find(|n| n.key.eq_ignore_ascii_case(key.trim()))
        .ok_or_else(|| {
            let supported: Vec<&str> = NETWORKS.iter().map(|n| n.key).collect();
            anyhow::anyhow!(
                "Unsupported network \"{}\" (supported: {})",
                key,
                supported.join(", ")
            )
        })
}

/// Runtime knobs for the adapters and the scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScanConfig {
    /// Upper bound on every RPC and index request.
    pub request_timeout: Duration,
    pub rpc_max_in_flight: usize,
    pub index_max_in_flight: usize,
    /// Minimum spacing between index requests.
    pub index_min_interval: Duration,
    /// Wait before re-querying the index after a successful link.
    pub settle_delay: Duration,
    /// Contract analyses in flight at once.
    pub concurrency: usize,
    /// Overrides the network's RPC endpoint.
    pub rpc_url: Option<String>,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            request_timeout: Duration::from_secs(15),
            rpc_max_in_flight: 8,
            index_max_in_flight: 4,
            index_min_interval: Duration::from_millis(250),
            settle_delay: Duration::from_secs(2),
            concurrency: 1,
            rpc_url: None,
        }
    }
}

impl ScanConfig {
    /// RPC endpoint to use for `network`.
    pub fn rpc_url_for<'a>(&'a self, network: &'a NetworkConfig) -> &'a str {
        self.rpc_url.as_deref().unwrap_or(network.rpc_url)
    }
}

/// Load `KEY=VALUE` pairs from an env file. A missing file yields an empty map.
///
/// # Example file format:
/// ```text
/// # index credentials
/// export ETHERSCAN_API_KEY="ABC123"
/// ```
pub fn load_env_file(path: &Path) -> Result<HashMap<String, String>> {
    let entries = match dotenvy::from_path_iter(path) {
        Ok(entries) => entries,
        Err(e) if e.not_found() => return Ok(HashMap::new()),
        Err(e) => return Err(e).with_context(|| format!("Failed to read env file: {:?}", path)),
    };

    entries
        .map(|entry| entry.with_context(|| format!("Invalid entry in env file: {:?}", path)))
        .collect()
}

/// Resolve the index API key: the flag or `$ETHERSCAN_API_KEY` (both arrive
/// through clap), then the env file. Blank values count as absent.
pub fn resolve_api_key(explicit: Option<&str>, env_file: &HashMap<String, String>) -> Option<String> {
    explicit
        .map(str::to_string)
        .into_iter()
        .chain(env_file.get(API_KEY_VAR).cloned())
        .map(|k| k.trim().to_string())
        .find(|k| !k.is_empty())
}
