//! Ledger access
//!
//! The read-only view of chain state the analyzer depends on. `RpcClient`
//! implements it over JSON-RPC; tests implement it in memory.

use crate::error::{SourceError, SourceResultExt};
use crate::types::{Receipt, Transaction};
use alloy_primitives::{keccak256, Address, B256};
use anyhow::Result;
use async_trait::async_trait;

/// Read-only access to on-chain state.
#[async_trait]
pub trait Ledger: Send + Sync {
    /// Deployed bytecode at `address` (empty for accounts without code).
    async fn code_at(&self, address: Address) -> Result<Vec<u8>>;

    /// Raw 32-byte storage value at `address` / `slot`.
    async fn storage_at(&self, address: Address, slot: B256) -> Result<B256>;

    /// Transaction by hash; `None` if the node does not know it.
    async fn transaction(&self, hash: B256) -> Result<Option<Transaction>>;

    /// Receipt by transaction hash; `None` if not yet mined or unknown.
    async fn receipt(&self, hash: B256) -> Result<Option<Receipt>>;

    /// Read-only call against the latest state, returning raw return data.
    async fn call(&self, to: Address, data: Vec<u8>) -> Result<Vec<u8>>;
}

/// 4-byte selector of a canonical function signature, e.g. `owner()`.
pub fn selector(signature: &str) -> [u8; 4] {
    let hash = keccak256(signature.as_bytes());
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Call a parameterless getter returning a single `address`.
///
/// Returns `Ok(None)` for the zero address. Reverts and transport failures
/// are `Unavailable`; short return data is `Malformed`.
pub async fn call_address_getter<L: Ledger + ?Sized>(
    ledger: &L,
    target: Address,
    signature: &'static str,
) -> Result<Option<Address>, SourceError> {
    let data = ledger
        .call(target, selector(signature).to_vec())
        .await
        .source_of(signature)?;

    if data.len() < 32 {
        return Err(SourceError::malformed(
            signature,
            format!("expected a 32-byte word, got {} bytes", data.len()),
        ));
    }

    let addr = Address::from_slice(&data[12..32]);
    Ok((addr != Address::ZERO).then_some(addr))
}
