//! CLI implementation for deployscan
//!
//! Parses arguments, wires the adapters together, runs the scan and prints
//! the report to stdout. Logs go to stderr.

use crate::analysis::Analyzer;
use crate::config::{self, ScanConfig};
use crate::etherscan::EtherscanClient;
use crate::report::{render_json, render_text};
use crate::rpc::RpcClient;
use crate::scan::{scan, ScanRequest};
use crate::throttle::Throttle;
use crate::types::decode_hex;
use alloy_primitives::B256;
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Contract deployment scanner
#[derive(Parser, Debug)]
#[command(name = "deployscan")]
#[command(about = "Find the contracts a sender deployed and analyze their proxy setup")]
pub struct Cli {
    /// Network key (sepolia, ethmainnet)
    network: String,

    /// Hash of the first transaction to inspect (64 hex chars, with or without 0x prefix)
    start_hash: String,

    /// Maximum number of the sender's transactions to inspect
    #[arg(default_value_t = 1000)]
    limit: usize,

    /// Index API key (falls back to the env file)
    #[arg(long, env = "ETHERSCAN_API_KEY")]
    api_key: Option<String>,

    /// RPC endpoint overriding the network default
    #[arg(long)]
    rpc_url: Option<String>,

    /// Env file to read the API key from
    #[arg(long, default_value = ".env")]
    env_file: PathBuf,

    /// Contract analyses in flight at once
    #[arg(long, default_value_t = 1)]
    concurrency: usize,

    /// Timeout for every RPC and index request, in seconds
    #[arg(long, default_value_t = 15)]
    timeout_secs: u64,

    /// Wait after a successful proxy link before re-checking, in milliseconds
    #[arg(long, default_value_t = 2000)]
    settle_ms: u64,

    /// Print the report as JSON
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn scan_config(&self) -> ScanConfig {
        ScanConfig {
            request_timeout: Duration::from_secs(self.timeout_secs),
            settle_delay: Duration::from_millis(self.settle_ms),
            concurrency: self.concurrency.max(1),
            rpc_url: self.rpc_url.clone(),
            ..ScanConfig::default()
        }
    }
}

/// Parse a hex string into a 32-byte hash (B256).
fn parse_hash(s: &str) -> Result<B256> {
    let s = s.trim();
    let bytes = decode_hex(s).with_context(|| format!("Invalid hex hash: {}", s))?;
    if bytes.len() != 32 {
        anyhow::bail!("Hash must be 32 bytes (64 hex chars), got {} bytes", bytes.len());
    }
    Ok(B256::from_slice(&bytes))
}

/// Install the stderr log subscriber. `RUST_LOG` overrides the `info` default.
pub fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Run the scan described by the command line and print the report.
pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    let network = config::network(&cli.network)?;
    let start_hash = parse_hash(&cli.start_hash)?;
    let settings = cli.scan_config();

    let env_vars = config::load_env_file(&cli.env_file)?;
    let api_key = config::resolve_api_key(cli.api_key.as_deref(), &env_vars);
    if api_key.is_none() {
        warn!("No index API key provided; creation, ABI and linking lookups are skipped");
    }

    let rpc_url = settings.rpc_url_for(network).to_string();
    info!(network = network.name, rpc = %rpc_url, limit = cli.limit, "starting scan");
    info!(%start_hash, "start transaction");

    let rpc = RpcClient::new(
        rpc_url,
        settings.request_timeout,
        Throttle::unspaced(settings.rpc_max_in_flight),
    )?;
    let index = EtherscanClient::new(
        network.index_base_url.to_string(),
        network.chain_id,
        api_key,
        settings.request_timeout,
        Throttle::new(settings.index_max_in_flight, settings.index_min_interval),
    )?;
    let analyzer = Analyzer::new(rpc, index, settings.settle_delay);

    let request = ScanRequest {
        network: network.name.to_string(),
        start_hash,
        limit: cli.limit,
        concurrency: settings.concurrency,
    };

    // Handle Ctrl+C by dropping in-flight analyses
    let report = tokio::select! {
        result = scan(&analyzer, &request) => result?,
        _ = tokio::signal::ctrl_c() => {
            info!("Received Ctrl+C, abandoning scan");
            anyhow::bail!("Scan cancelled");
        }
    };

    if cli.json {
        println!("{}", render_json(&report)?);
    } else {
        print!("{}", render_text(&report));
    }
    Ok(())
}
