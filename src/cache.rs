//! Creation-hash cache
//!
//! In-memory memo of contract creation transaction hashes, shared by every
//! analysis in a scan so that a ProxyAdmin or owner deployed once is looked up
//! once.
//!
//! Strategy:
//! - A found creation hash is cached forever (creation is immutable)
//! - A miss is never cached (the index may catch up later)
//! - Entries are order-free: concurrent writers for one address store the same hash

use alloy_primitives::{Address, B256};
use std::collections::HashMap;
use std::sync::Mutex;

/// Cache for creation-hash lookups.
///
/// Maps contract addresses to the hash of the transaction that created them.
pub struct CreationCache {
    /// Map of address -> creation transaction hash
    cache: Mutex<HashMap<Address, B256>>,
}

impl CreationCache {
    /// Create a new empty cache.
    pub fn new() -> Self {
        Self {
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Look up a cached creation hash.
    ///
    /// Returns `None` if the address was never resolved.
    pub fn get(&self, addr: Address) -> Option<B256> {
        match self.cache.lock() {
            Ok(cache) => cache.get(&addr).copied(),
            Err(poisoned) => poisoned.into_inner().get(&addr).copied(),
        }
    }

    /// Record a resolved creation hash.
    pub fn insert(&self, addr: Address, hash: B256) {
        match self.cache.lock() {
            Ok(mut cache) => {
                cache.insert(addr, hash);
            }
            Err(poisoned) => {
                poisoned.into_inner().insert(addr, hash);
            }
        }
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        match self.cache.lock() {
            Ok(cache) => cache.len(),
            Err(poisoned) => poisoned.into_inner().len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for CreationCache {
    fn default() -> Self {
        Self::new()
    }
}
