//! JSON-RPC client for Ethereum nodes
//!
//! Provides a typed interface to Ethereum JSON-RPC endpoints.
//! Handles hex string parsing and error handling.

use crate::ledger::Ledger;
use crate::throttle::Throttle;
use crate::types::{decode_hex, Receipt, Transaction};
use alloy_primitives::{Address, B256};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;

/// JSON-RPC client for Ethereum nodes.
pub struct RpcClient {
    client: reqwest::Client,
    url: String,
    throttle: Throttle,
}

impl RpcClient {
    /// Create a new RPC client with a per-request timeout.
    pub fn new(url: String, timeout: Duration, throttle: Throttle) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            url,
            throttle,
        })
    }

    /// Make a JSON-RPC call.
    async fn call(&self, method: &str, params: Value) -> Result<Value> {
        let request = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params
        });

        let _permit = self.throttle.acquire().await?;

        let response = self
            .client
            .post(&self.url)
            .json(&request)
            .send()
            .await
            .with_context(|| format!("Failed to send {} request", method))?;

        let json: Value = response
            .json()
            .await
            .with_context(|| format!("Failed to parse {} response", method))?;

        // Check for RPC error
        if let Some(error) = json.get("error") {
            anyhow::bail!("RPC error from {}: {}", method, error);
        }

        // Extract result
        json.get("result")
            .cloned()
            .with_context(|| format!("{} response missing 'result' field", method))
    }

    /// Get the code at an address at the latest block.
    ///
    /// Returns empty Vec for EOA addresses, contract bytecode for contracts.
    pub async fn get_code(&self, address: Address) -> Result<Vec<u8>> {
        let addr_str = format!("0x{:x}", address);
        let params = json!([addr_str, "latest"]);
        let result = self.call("eth_getCode", params).await?;

        let code_str = result
            .as_str()
            .context("Code response is not a string")?;

        decode_hex(code_str).context("Failed to decode code hex")
    }

    /// Get a raw storage word at the latest block.
    ///
    /// Short values are left-padded to 32 bytes; longer ones are rejected.
    pub async fn get_storage_at(&self, address: Address, slot: B256) -> Result<B256> {
        let addr_str = format!("0x{:x}", address);
        let slot_str = format!("0x{:x}", slot);
        let params = json!([addr_str, slot_str, "latest"]);
        let result = self.call("eth_getStorageAt", params).await?;

        let value_str = result
            .as_str()
            .context("Storage response is not a string")?;

        let bytes = decode_hex(value_str).context("Failed to decode storage hex")?;
        word_from_bytes(&bytes)
    }

    /// Get a transaction by hash.
    pub async fn get_transaction_by_hash(&self, tx_hash: B256) -> Result<Option<Transaction>> {
        let hash_str = format!("0x{:x}", tx_hash);
        let params = json!([hash_str]);
        let result = self.call("eth_getTransactionByHash", params).await?;
        if result.is_null() {
            return Ok(None);
        }
        serde_json::from_value(result)
            .map(Some)
            .context("Failed to deserialize transaction")
    }

    /// Get a transaction receipt by hash.
    pub async fn get_transaction_receipt(&self, tx_hash: B256) -> Result<Option<Receipt>> {
        let hash_str = format!("0x{:x}", tx_hash);
        let params = json!([hash_str]);
        let result = self.call("eth_getTransactionReceipt", params).await?;
        if result.is_null() {
            return Ok(None);
        }
        serde_json::from_value(result)
            .map(Some)
            .context("Failed to deserialize receipt")
    }

    /// Execute a read-only `eth_call` against the latest block.
    pub async fn eth_call(&self, to: Address, data: &[u8]) -> Result<Vec<u8>> {
        let params = json!([
            {
                "to": format!("0x{:x}", to),
                "data": format!("0x{}", hex::encode(data)),
            },
            "latest"
        ]);
        let result = self.call("eth_call", params).await?;

        let data_str = result
            .as_str()
            .context("Call response is not a string")?;

        decode_hex(data_str).context("Failed to decode call result hex")
    }
}

/// Left-pad a big-endian value of at most 32 bytes into a storage word.
fn word_from_bytes(bytes: &[u8]) -> Result<B256> {
    if bytes.len() > 32 {
        anyhow::bail!("Storage value too large (max 32 bytes), got {} bytes", bytes.len());
    }
    let mut word = [0u8; 32];
    word[32 - bytes.len()..].copy_from_slice(bytes);
    Ok(B256::from(word))
}

#[async_trait]
impl Ledger for RpcClient {
    async fn code_at(&self, address: Address) -> Result<Vec<u8>> {
        self.get_code(address).await
    }

    async fn storage_at(&self, address: Address, slot: B256) -> Result<B256> {
        self.get_storage_at(address, slot).await
    }

    async fn transaction(&self, hash: B256) -> Result<Option<Transaction>> {
        self.get_transaction_by_hash(hash).await
    }

    async fn receipt(&self, hash: B256) -> Result<Option<Receipt>> {
        self.get_transaction_receipt(hash).await
    }

    async fn call(&self, to: Address, data: Vec<u8>) -> Result<Vec<u8>> {
        self.eth_call(to, &data).await
    }
}
