//! Contract analysis
//!
//! [`Analyzer`] runs the evidence pipeline for one address and merges the
//! results into a [`ContractAnalysis`]. The stages run in a fixed order and
//! each one may fail on its own without stopping the later ones:
//!
//! 1. minimal-proxy bytecode
//! 2. proxy storage slots (overwrite the bytecode implementation)
//! 3. index metadata (never overwrites an on-chain implementation)
//! 4. implementation name
//! 5. readable parameters, through the proxy with the implementation's ABI
//! 6. implementation creation hash
//! 7. `owner()` of the contract
//! 8. admin creation hash and `owner()` of the admin
//!
//! Proxies the index has not resolved on its own are then linked, with one
//! delayed metadata re-check when linking succeeds without a known
//! implementation.

use crate::bytecode;
use crate::cache::CreationCache;
use crate::error::{Absorb, AnalysisFault, SourceResultExt};
use crate::evidence::{non_zero, EvidenceRecord};
use crate::index::IndexService;
use crate::ledger::{call_address_getter, Ledger};
use crate::metadata;
use crate::params;
use crate::recheck::DelayedRecheck;
use crate::slots;
use alloy_primitives::{Address, B256};
use futures::FutureExt;
use serde::Serialize;
use std::any::Any;
use std::collections::BTreeMap;
use std::panic::AssertUnwindSafe;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Outcome of the proxy-linking side effect.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LinkingOutcome {
    pub attempted: bool,
    pub success: bool,
    pub identifier: Option<String>,
    pub detail: Option<String>,
}

/// Merged view of one deployed contract.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ContractAnalysis {
    pub verified: bool,
    pub is_proxy: bool,
    pub name: Option<String>,
    #[serde(serialize_with = "crate::types::serialize_checksummed_opt")]
    pub implementation: Option<Address>,
    pub implementation_name: Option<String>,
    pub implementation_hash: Option<B256>,
    #[serde(serialize_with = "crate::types::serialize_checksummed_opt")]
    pub beacon: Option<Address>,
    #[serde(serialize_with = "crate::types::serialize_checksummed_opt")]
    pub admin: Option<Address>,
    pub admin_hash: Option<B256>,
    #[serde(serialize_with = "crate::types::serialize_checksummed_opt")]
    pub admin_owner: Option<Address>,
    pub admin_owner_hash: Option<B256>,
    #[serde(serialize_with = "crate::types::serialize_checksummed_opt")]
    pub contract_owner: Option<Address>,
    pub contract_owner_hash: Option<B256>,
    pub implementation_declared_by_index: bool,
    pub params: BTreeMap<String, String>,
    pub linking: LinkingOutcome,
}

impl ContractAnalysis {
    /// Fold on-chain evidence in. Present fields overwrite earlier ones.
    fn merge_onchain(&mut self, record: &EvidenceRecord) {
        self.is_proxy |= record.is_proxy;
        if record.implementation.is_some() {
            self.implementation = record.implementation;
        }
        if record.admin.is_some() {
            self.admin = record.admin;
        }
        if record.beacon.is_some() {
            self.beacon = record.beacon;
        }
    }

    /// Fold index evidence in, keeping any implementation found on-chain.
    fn merge_index(&mut self, record: &EvidenceRecord) {
        self.verified = record.verified;
        if record.name.is_some() {
            self.name = record.name.clone();
        }
        self.is_proxy |= record.is_proxy;
        if self.implementation.is_none() {
            self.implementation = record.implementation;
        }
        self.implementation_declared_by_index = record.implementation_declared_by_index;
    }

    /// Proxy fields only on proxies, no zero addresses, and an
    /// implementation hash only next to an implementation.
    pub fn is_consistent(&self) -> bool {
        let proxy_fields = [self.implementation, self.admin, self.beacon];
        let any_set = proxy_fields.iter().any(Option::is_some);
        let no_zero = proxy_fields
            .iter()
            .chain([self.admin_owner, self.contract_owner].iter())
            .flatten()
            .all(|a| *a != Address::ZERO);
        no_zero && (self.is_proxy || !any_set) && (self.implementation.is_some() || self.implementation_hash.is_none())
    }
}

/// Evidence merger over a ledger and an index service.
pub struct Analyzer<L, I> {
    ledger: L,
    index: I,
    creations: CreationCache,
    settle_delay: Duration,
}

impl<L: Ledger, I: IndexService> Analyzer<L, I> {
    /// `settle_delay` is how long to wait after a successful link before
    /// asking the index again.
    pub fn new(ledger: L, index: I, settle_delay: Duration) -> Self {
        Self {
            ledger,
            index,
            creations: CreationCache::new(),
            settle_delay,
        }
    }

    pub fn ledger(&self) -> &L {
        &self.ledger
    }

    pub fn index(&self) -> &I {
        &self.index
    }

    pub fn creations(&self) -> &CreationCache {
        &self.creations
    }

    /// Analyze `target`.
    ///
    /// Never fails: source failures leave fields absent, and a panic in the
    /// pipeline is logged and whatever was merged before it is returned.
    pub async fn analyze(&self, target: Address) -> ContractAnalysis {
        let mut analysis = ContractAnalysis::default();

        let outcome = AssertUnwindSafe(self.run_stages(target, &mut analysis))
            .catch_unwind()
            .await;

        if let Err(panic) = outcome {
            let fault = AnalysisFault {
                address: target,
                reason: panic_reason(panic.as_ref()),
            };
            warn!(error = %fault, "returning partial analysis");
        }

        analysis
    }

    async fn run_stages(&self, target: Address, analysis: &mut ContractAnalysis) {
        debug!(%target, "analyzing contract");

        // 1. Bytecode
        let from_code = self
            .ledger
            .code_at(target)
            .await
            .source_of("bytecode")
            .absorb(target)
            .map(|code| bytecode::detect(&code))
            .unwrap_or_default();
        analysis.merge_onchain(&from_code);

        // 2. Storage slots
        let from_slots = slots::detect(&self.ledger, target).await;
        if from_code.implementation.is_some()
            && from_slots.implementation.is_some()
            && from_code.implementation != from_slots.implementation
        {
            debug!(%target, "bytecode and storage disagree on implementation, keeping storage");
        }
        analysis.merge_onchain(&from_slots);

        // 3. Index metadata
        let from_index = metadata::detect(&self.index, target).await;
        analysis.merge_index(&from_index);

        // 4. Implementation name
        if let Some(implementation) = analysis.implementation {
            analysis.implementation_name = metadata::fetch(&self.index, implementation)
                .await
                .absorb(target)
                .and_then(|m| m.contract_name)
                .filter(|n| !n.is_empty());
        }

        // 5. Parameters
        analysis.params = self.read_params(target, target).await;
        if let Some(implementation) = analysis.implementation.filter(|i| analysis.is_proxy && *i != target) {
            let through_proxy = self.read_params(implementation, target).await;
            analysis.params.extend(through_proxy);
        }

        // 6. Implementation creation
        if let Some(implementation) = analysis.implementation {
            analysis.implementation_hash = self.creation_hash(implementation).await;
        }

        // 7. Owner
        if let Some(owner) = self.owner_of(target).await {
            analysis.contract_owner = Some(owner);
            analysis.contract_owner_hash = self.creation_hash(owner).await;
        }

        // 8. Admin and its owner
        if let Some(admin) = analysis.admin {
            analysis.admin_hash = self.creation_hash(admin).await;
            if let Some(owner) = self.owner_of(admin).await {
                analysis.admin_owner = Some(owner);
                analysis.admin_owner_hash = self.creation_hash(owner).await;
            }
        }

        if analysis.is_proxy && !analysis.implementation_declared_by_index {
            self.link(target, analysis).await;
        }
    }

    /// Read the accessors declared in `abi_source`'s ABI against `call_target`.
    async fn read_params(&self, abi_source: Address, call_target: Address) -> BTreeMap<String, String> {
        let abi = self
            .index
            .contract_abi(abi_source)
            .await
            .source_of("contract ABI")
            .absorb(abi_source)
            .flatten();

        match abi {
            Some(abi) => params::discover(&self.ledger, call_target, &params::accessors(&abi)).await,
            None => BTreeMap::new(),
        }
    }

    /// Creation transaction hash of `address`, memoized across analyses.
    async fn creation_hash(&self, address: Address) -> Option<B256> {
        if let Some(hash) = self.creations.get(address) {
            return Some(hash);
        }

        let hash = self
            .index
            .creation_tx_hash(address)
            .await
            .source_of("contract creation")
            .absorb(address)
            .flatten()?;
        self.creations.insert(address, hash);
        Some(hash)
    }

    /// Non-zero result of `owner()` on `address`. Not being Ownable is not
    /// an error.
    async fn owner_of(&self, address: Address) -> Option<Address> {
        call_address_getter(&self.ledger, address, "owner()")
            .await
            .absorb(address)
            .flatten()
    }

    async fn link(&self, target: Address, analysis: &mut ContractAnalysis) {
        let hint = analysis.implementation;

        let result = match self.index.link_proxy(target, hint).await.source_of("proxy linking") {
            Ok(result) => result,
            Err(err) => {
                warn!(%target, error = %err, "proxy linking failed");
                analysis.linking = LinkingOutcome {
                    attempted: true,
                    success: false,
                    identifier: None,
                    detail: Some(err.to_string()),
                };
                return;
            }
        };

        if result.success {
            info!(%target, identifier = ?result.identifier, "proxy linking submitted");
        } else {
            info!(%target, detail = ?result.failure_detail, "proxy linking rejected");
        }

        analysis.linking = LinkingOutcome {
            attempted: true,
            success: result.success,
            identifier: result.identifier,
            detail: result.failure_detail,
        };

        if !analysis.linking.success || hint.is_some() {
            return;
        }

        let resolved = DelayedRecheck::after(self.settle_delay)
            .run(|| metadata::fetch(&self.index, target))
            .await
            .absorb(target)
            .and_then(|m| m.declared_implementation)
            .and_then(non_zero);

        if let Some(implementation) = resolved {
            debug!(%target, %implementation, "implementation resolved after linking");
            analysis.implementation = Some(implementation);
            analysis.implementation_hash = self.creation_hash(implementation).await;
        }
    }
}

fn panic_reason(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
