//! In-memory `Ledger` and `IndexService` used by the unit tests.

use crate::index::{IndexService, LinkResult, SourceMetadata};
use crate::ledger::{selector, Ledger};
use crate::types::{IndexedTransaction, Receipt, Transaction};
use alloy_json_abi::JsonAbi;
use alloy_primitives::{Address, B256, U256};
use anyhow::Result;
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

#[derive(Default)]
pub struct MockLedger {
    code: HashMap<Address, Vec<u8>>,
    storage: HashMap<(Address, B256), B256>,
    failing_slots: HashSet<B256>,
    calls: HashMap<(Address, [u8; 4]), Vec<u8>>,
    transactions: HashMap<B256, Transaction>,
    receipts: HashMap<B256, Receipt>,
    panic_on_call: bool,
    storage_reads: AtomicUsize,
}

impl MockLedger {
    pub fn set_code(&mut self, address: Address, code: Vec<u8>) {
        self.code.insert(address, code);
    }

    pub fn set_slot(&mut self, address: Address, slot: B256, value: Address) {
        self.storage.insert((address, slot), value.into_word());
    }

    pub fn fail_slot(&mut self, slot: B256) {
        self.failing_slots.insert(slot);
    }

    pub fn returns_raw(&mut self, target: Address, signature: &str, data: Vec<u8>) {
        self.calls.insert((target, selector(signature)), data);
    }

    pub fn returns_address(&mut self, target: Address, signature: &str, value: Address) {
        self.returns_raw(target, signature, value.into_word().to_vec());
    }

    pub fn returns_uint(&mut self, target: Address, signature: &str, value: U256) {
        self.returns_raw(target, signature, value.to_be_bytes::<32>().to_vec());
    }

    pub fn panic_on_call(&mut self) {
        self.panic_on_call = true;
    }

    pub fn add_transaction(&mut self, hash: B256, from: Address, block: u64) {
        self.transactions.insert(
            hash,
            Transaction {
                from,
                block_number: Some(block),
            },
        );
    }

    pub fn add_receipt(&mut self, hash: B256, contract_address: Option<Address>) {
        self.receipts.insert(
            hash,
            Receipt { contract_address },
        );
    }

    pub fn storage_reads(&self) -> usize {
        self.storage_reads.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Ledger for MockLedger {
    async fn code_at(&self, address: Address) -> Result<Vec<u8>> {
        Ok(self.code.get(&address).cloned().unwrap_or_default())
    }

    async fn storage_at(&self, address: Address, slot: B256) -> Result<B256> {
        self.storage_reads.fetch_add(1, Ordering::SeqCst);
        if self.failing_slots.contains(&slot) {
            anyhow::bail!("request timed out");
        }
        Ok(self.storage.get(&(address, slot)).copied().unwrap_or_default())
    }

    async fn transaction(&self, hash: B256) -> Result<Option<Transaction>> {
        Ok(self.transactions.get(&hash).cloned())
    }

    async fn receipt(&self, hash: B256) -> Result<Option<Receipt>> {
        Ok(self.receipts.get(&hash).cloned())
    }

    async fn call(&self, to: Address, data: Vec<u8>) -> Result<Vec<u8>> {
        if self.panic_on_call {
            panic!("mock ledger asked to call {to}");
        }
        let mut sel = [0u8; 4];
        sel.copy_from_slice(&data[..4]);
        match self.calls.get(&(to, sel)) {
            Some(ret) => Ok(ret.clone()),
            None => anyhow::bail!("execution reverted"),
        }
    }
}

pub struct MockIndex {
    metadata: HashMap<Address, SourceMetadata>,
    metadata_after_link: HashMap<Address, SourceMetadata>,
    failing_metadata: HashSet<Address>,
    abis: HashMap<Address, JsonAbi>,
    creations: HashMap<Address, B256>,
    transactions: Vec<IndexedTransaction>,
    link_response: LinkResult,
    failing_link: bool,
    link_requests: Mutex<Vec<(Address, Option<Address>)>>,
    linked: AtomicBool,
    creation_lookups: AtomicUsize,
    metadata_lookups: AtomicUsize,
}

impl Default for MockIndex {
    fn default() -> Self {
        Self {
            metadata: HashMap::new(),
            metadata_after_link: HashMap::new(),
            failing_metadata: HashSet::new(),
            abis: HashMap::new(),
            creations: HashMap::new(),
            transactions: Vec::new(),
            link_response: LinkResult::accepted("link-guid"),
            failing_link: false,
            link_requests: Mutex::new(Vec::new()),
            linked: AtomicBool::new(false),
            creation_lookups: AtomicUsize::new(0),
            metadata_lookups: AtomicUsize::new(0),
        }
    }
}

impl MockIndex {
    pub fn set_metadata(&mut self, address: Address, metadata: SourceMetadata) {
        self.metadata.insert(address, metadata);
    }

    /// Metadata served once a link request has been accepted.
    pub fn set_metadata_after_link(&mut self, address: Address, metadata: SourceMetadata) {
        self.metadata_after_link.insert(address, metadata);
    }

    pub fn fail_metadata(&mut self, address: Address) {
        self.failing_metadata.insert(address);
    }

    pub fn set_abi_json(&mut self, address: Address, abi_json: &str) {
        let abi: JsonAbi = serde_json::from_str(abi_json).unwrap();
        self.abis.insert(address, abi);
    }

    pub fn set_creation(&mut self, address: Address, hash: B256) {
        self.creations.insert(address, hash);
    }

    pub fn set_link_response(&mut self, response: LinkResult) {
        self.link_response = response;
    }

    /// Make `link_proxy` fail at the transport level.
    pub fn fail_link(&mut self) {
        self.failing_link = true;
    }

    pub fn push_transaction(&mut self, tx: IndexedTransaction) {
        self.transactions.push(tx);
    }

    pub fn link_requests(&self) -> Vec<(Address, Option<Address>)> {
        self.link_requests.lock().unwrap().clone()
    }

    pub fn creation_lookups(&self) -> usize {
        self.creation_lookups.load(Ordering::SeqCst)
    }

    pub fn metadata_lookups(&self) -> usize {
        self.metadata_lookups.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl IndexService for MockIndex {
    async fn creation_tx_hash(&self, address: Address) -> Result<Option<B256>> {
        self.creation_lookups.fetch_add(1, Ordering::SeqCst);
        Ok(self.creations.get(&address).copied())
    }

    async fn contract_abi(&self, address: Address) -> Result<Option<JsonAbi>> {
        Ok(self.abis.get(&address).cloned())
    }

    async fn source_metadata(&self, address: Address) -> Result<SourceMetadata> {
        self.metadata_lookups.fetch_add(1, Ordering::SeqCst);
        if self.failing_metadata.contains(&address) {
            anyhow::bail!("Max rate limit reached");
        }
        if self.linked.load(Ordering::SeqCst) {
            if let Some(meta) = self.metadata_after_link.get(&address) {
                return Ok(meta.clone());
            }
        }
        Ok(self.metadata.get(&address).cloned().unwrap_or_default())
    }

    async fn link_proxy(&self, proxy: Address, implementation: Option<Address>) -> Result<LinkResult> {
        self.link_requests.lock().unwrap().push((proxy, implementation));
        if self.failing_link {
            anyhow::bail!("connection reset by peer");
        }
        if self.link_response.success {
            self.linked.store(true, Ordering::SeqCst);
        }
        Ok(self.link_response.clone())
    }

    async fn transactions_from(&self, sender: Address, start_block: u64) -> Result<Vec<IndexedTransaction>> {
        Ok(self
            .transactions
            .iter()
            .filter(|tx| tx.from == sender && tx.block_number >= start_block)
            .cloned()
            .collect())
    }
}
