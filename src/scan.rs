//! Scan driver
//!
//! Walks a window of one sender's transactions, starting at a given
//! transaction, and analyzes every contract the window deploys. Results keep
//! the listing's ascending order whatever the analysis concurrency.

use crate::analysis::{Analyzer, ContractAnalysis};
use crate::error::{Absorb, SourceResultExt};
use crate::evidence::non_zero;
use crate::index::IndexService;
use crate::ledger::Ledger;
use crate::types::IndexedTransaction;
use alloy_primitives::{Address, B256};
use anyhow::{anyhow, bail, Context, Result};
use futures::stream::{self, StreamExt};
use serde::Serialize;
use tracing::{info, warn};

/// What to scan.
#[derive(Debug, Clone)]
pub struct ScanRequest {
    /// Network display name, carried into the report.
    pub network: String,
    pub start_hash: B256,
    /// Maximum number of transactions to inspect, the start one included.
    pub limit: usize,
    /// Analyses in flight at once.
    pub concurrency: usize,
}

/// One contract creation found in the window.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CreatedContract {
    /// Deployed address; `None` if neither the index nor the receipt knows it.
    #[serde(serialize_with = "crate::types::serialize_checksummed_opt")]
    pub address: Option<Address>,
    #[serde(serialize_with = "crate::types::serialize_checksummed")]
    pub deployer: Address,
    pub tx_hash: B256,
    pub block: u64,
    pub analysis: ContractAnalysis,
}

/// Result of a scan.
#[derive(Debug, Clone, Serialize)]
pub struct ScanReport {
    pub network: String,
    #[serde(serialize_with = "crate::types::serialize_checksummed")]
    pub sender: Address,
    pub start_block: u64,
    /// Transactions inspected.
    pub scanned: usize,
    pub contracts: Vec<CreatedContract>,
}

/// Run a scan.
///
/// Errors are fatal: a missing start transaction, a start hash the index does
/// not list, or a failed listing. Individual analyses never fail.
pub async fn scan<L: Ledger, I: IndexService>(analyzer: &Analyzer<L, I>, request: &ScanRequest) -> Result<ScanReport> {
    let start = analyzer
        .ledger()
        .transaction(request.start_hash)
        .await
        .context("Failed to fetch starting transaction")?
        .ok_or_else(|| anyhow!("Starting transaction {} not found", request.start_hash))?;
    let start_block = start
        .block_number
        .ok_or_else(|| anyhow!("Starting transaction {} is still pending", request.start_hash))?;
    let sender = start.from;

    info!(%sender, start_block, "fetching transaction list");
    let transactions = analyzer
        .index()
        .transactions_from(sender, start_block)
        .await
        .context("Failed to list sender transactions")?;
    info!(count = transactions.len(), %sender, start_block, "transactions listed");

    let Some(position) = transactions.iter().position(|tx| tx.hash == request.start_hash) else {
        for (i, tx) in transactions.iter().take(3).enumerate() {
            warn!(index = i, hash = %tx.hash, "listed transaction");
        }
        bail!(
            "Starting transaction {} not found in the index listing for {}",
            request.start_hash,
            sender
        );
    };

    let end = position.saturating_add(request.limit).min(transactions.len());
    let window = &transactions[position..end];
    info!(scanned = window.len(), "investigating transactions in chronological order");

    let contracts = stream::iter(window.iter().filter(|tx| tx.is_contract_creation()))
        .map(|tx| inspect(analyzer, tx))
        .buffered(request.concurrency.max(1))
        .collect::<Vec<_>>()
        .await;

    info!(scanned = window.len(), created = contracts.len(), "scan complete");

    Ok(ScanReport {
        network: request.network.clone(),
        sender,
        start_block,
        scanned: window.len(),
        contracts,
    })
}

async fn inspect<L: Ledger, I: IndexService>(analyzer: &Analyzer<L, I>, tx: &IndexedTransaction) -> CreatedContract {
    let address = match tx.contract_address.and_then(non_zero) {
        Some(address) => Some(address),
        None => deployed_address(analyzer.ledger(), tx).await,
    };

    let analysis = match address {
        Some(address) => {
            info!(%address, tx = %tx.hash, "contract created");
            analyzer.analyze(address).await
        }
        None => {
            warn!(tx = %tx.hash, "contract created at unknown address");
            ContractAnalysis::default()
        }
    };

    CreatedContract {
        address,
        deployer: tx.from,
        tx_hash: tx.hash,
        block: tx.block_number,
        analysis,
    }
}

/// Deployed address from the creation receipt.
async fn deployed_address<L: Ledger>(ledger: &L, tx: &IndexedTransaction) -> Option<Address> {
    ledger
        .receipt(tx.hash)
        .await
        .source_of("transaction receipt")
        .absorb(tx.from)
        .flatten()
        .and_then(|receipt| receipt.contract_address)
        .and_then(non_zero)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockIndex, MockLedger};
    use alloy_primitives::address;
    use std::time::Duration;

    const SENDER: Address = address!("5e5e5e5e5e5e5e5e5e5e5e5e5e5e5e5e5e5e5e5e");
    const RECIPIENT: Address = address!("7777777777777777777777777777777777777777");
    const FIRST: Address = address!("000000000000000000000000000000000000c001");
    const SECOND: Address = address!("000000000000000000000000000000000000c002");
    const THIRD: Address = address!("000000000000000000000000000000000000c003");

    fn hash(n: u8) -> B256 {
        B256::repeat_byte(n)
    }

    fn listed(n: u8, block: u64, to: Option<Address>, contract_address: Option<Address>) -> IndexedTransaction {
        IndexedTransaction {
            hash: hash(n),
            from: SENDER,
            to,
            block_number: block,
            contract_address,
        }
    }

    /// Listing: an earlier call in the start block, then three creations.
    /// The second creation has a zero recipient and only a receipt address.
    fn fixture() -> (MockLedger, MockIndex) {
        let mut ledger = MockLedger::default();
        ledger.add_transaction(hash(1), SENDER, 11);
        ledger.add_receipt(hash(2), Some(SECOND));

        let mut index = MockIndex::default();
        index.push_transaction(listed(0, 11, Some(RECIPIENT), None));
        index.push_transaction(listed(1, 11, None, Some(FIRST)));
        index.push_transaction(listed(2, 12, Some(Address::ZERO), None));
        index.push_transaction(listed(3, 12, Some(RECIPIENT), None));
        index.push_transaction(listed(4, 13, None, Some(THIRD)));
        (ledger, index)
    }

    fn request(limit: usize, concurrency: usize) -> ScanRequest {
        ScanRequest {
            network: "Sepolia".to_string(),
            start_hash: hash(1),
            limit,
            concurrency,
        }
    }

    #[tokio::test]
    async fn test_scan_window_and_order() {
        let (ledger, index) = fixture();
        let analyzer = Analyzer::new(ledger, index, Duration::ZERO);

        let report = scan(&analyzer, &request(1000, 3)).await.unwrap();
        assert_eq!(report.sender, SENDER);
        assert_eq!(report.start_block, 11);
        assert_eq!(report.scanned, 4);

        let addresses: Vec<_> = report.contracts.iter().map(|c| c.address).collect();
        assert_eq!(addresses, vec![Some(FIRST), Some(SECOND), Some(THIRD)]);
        let blocks: Vec<_> = report.contracts.iter().map(|c| c.block).collect();
        assert_eq!(blocks, vec![11, 12, 13]);
        assert!(report.contracts.iter().all(|c| c.deployer == SENDER));
    }

    #[tokio::test]
    async fn test_scan_limit() {
        let (ledger, index) = fixture();
        let analyzer = Analyzer::new(ledger, index, Duration::ZERO);

        let report = scan(&analyzer, &request(2, 1)).await.unwrap();
        assert_eq!(report.scanned, 2);
        assert_eq!(report.contracts.len(), 2);
        assert_eq!(report.contracts[1].tx_hash, hash(2));
    }

    #[tokio::test]
    async fn test_unknown_address_gets_empty_analysis() {
        let mut ledger = MockLedger::default();
        ledger.add_transaction(hash(1), SENDER, 20);
        let mut index = MockIndex::default();
        index.push_transaction(listed(1, 20, None, None));
        let analyzer = Analyzer::new(ledger, index, Duration::ZERO);

        let report = scan(&analyzer, &request(10, 1)).await.unwrap();
        assert_eq!(report.contracts.len(), 1);
        assert_eq!(report.contracts[0].address, None);
        assert_eq!(report.contracts[0].analysis, ContractAnalysis::default());
    }

    #[tokio::test]
    async fn test_missing_start_transaction_is_fatal() {
        let analyzer = Analyzer::new(MockLedger::default(), MockIndex::default(), Duration::ZERO);
        let err = scan(&analyzer, &request(10, 1)).await.unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[tokio::test]
    async fn test_start_hash_absent_from_listing_is_fatal() {
        let mut ledger = MockLedger::default();
        ledger.add_transaction(hash(1), SENDER, 11);
        let mut index = MockIndex::default();
        index.push_transaction(listed(9, 11, None, Some(FIRST)));
        let analyzer = Analyzer::new(ledger, index, Duration::ZERO);

        let err = scan(&analyzer, &request(10, 1)).await.unwrap_err();
        assert!(err.to_string().contains("index listing"));
    }
}
