//! Index service access
//!
//! The analyzer's view of a third-party chain indexer: creation lookups,
//! verified ABIs and source metadata, proxy linking, and per-account
//! transaction listings.

use crate::types::IndexedTransaction;
use alloy_json_abi::JsonAbi;
use alloy_primitives::{Address, B256};
use anyhow::Result;
use async_trait::async_trait;

/// Verification and proxy metadata the index holds for one contract.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SourceMetadata {
    /// Non-empty verified source is on file.
    pub verified: bool,
    /// The index itself flags the contract as a proxy.
    pub proxy_flag: bool,
    /// Implementation the index has resolved, if any.
    pub declared_implementation: Option<Address>,
    pub contract_name: Option<String>,
}

/// Answer to a proxy-linking request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkResult {
    pub success: bool,
    /// Service-side request identifier (a GUID for Etherscan).
    pub identifier: Option<String>,
    pub failure_detail: Option<String>,
}

impl LinkResult {
    pub fn accepted(identifier: impl Into<String>) -> Self {
        Self {
            success: true,
            identifier: Some(identifier.into()),
            failure_detail: None,
        }
    }

    pub fn rejected(detail: impl Into<String>) -> Self {
        Self {
            success: false,
            identifier: None,
            failure_detail: Some(detail.into()),
        }
    }
}

/// Remote index service.
#[async_trait]
pub trait IndexService: Send + Sync {
    /// Hash of the transaction that created `address`, if known.
    async fn creation_tx_hash(&self, address: Address) -> Result<Option<B256>>;

    /// Verified ABI of `address`, if the contract is verified.
    async fn contract_abi(&self, address: Address) -> Result<Option<JsonAbi>>;

    /// Source metadata of `address`.
    async fn source_metadata(&self, address: Address) -> Result<SourceMetadata>;

    /// Ask the index to link `proxy` to its implementation.
    async fn link_proxy(&self, proxy: Address, implementation: Option<Address>) -> Result<LinkResult>;

    /// Transactions sent by `sender` from `start_block` on, ascending.
    async fn transactions_from(&self, sender: Address, start_block: u64) -> Result<Vec<IndexedTransaction>>;
}
