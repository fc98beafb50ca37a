//! Proxy storage-slot detection
//!
//! Reads the five well-known proxy slots concurrently and folds them into an
//! [`EvidenceRecord`]:
//! - implementation: EIP-1967, else EIP-1822, else the legacy slot
//! - a reachable beacon's `implementation()` overrides all of those
//! - admin and beacon are taken as-is

use crate::error::{Absorb, SourceError, SourceResultExt};
use crate::evidence::{non_zero, EvidenceRecord};
use crate::ledger::{call_address_getter, Ledger};
use alloy_primitives::{b256, Address, B256};
use tracing::debug;

/// `keccak256("eip1967.proxy.admin") - 1`
pub const ADMIN_SLOT: B256 = b256!("b53127684a568b3173ae13b9f8a6016e243e63b6e8ee1178d6a717850b5d6103");

/// `keccak256("eip1967.proxy.implementation") - 1`
pub const EIP1967_IMPLEMENTATION_SLOT: B256 =
    b256!("360894a13ba1a3210667c828492db98dca3e2076cc3735a920a3ca505d382bbc");

/// `keccak256("eip1967.proxy.beacon") - 1`
pub const BEACON_SLOT: B256 = b256!("a3f0ad74e5423aebfd80d3ef4346578335a9a72aeaee59ff6cb3582b35133d50");

/// `keccak256("PROXIABLE")`, the UUPS slot.
pub const EIP1822_SLOT: B256 = b256!("c5f16f0fcc639fa48a6947836d9850f504798523bf8c9a3a87d5876cf622bcf7");

/// `keccak256("org.zeppelinos.proxy.implementation")`
pub const LEGACY_IMPLEMENTATION_SLOT: B256 =
    b256!("7050c9e0f4ca769c69bd3a8ef740bc37934f8e2c036e5a723fd8ee048ed3f8c3");

/// Normalized contents of the five slots. Each field is independent: a
/// failed read leaves only its own field empty.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlotReadings {
    pub admin: Option<Address>,
    pub eip1967: Option<Address>,
    pub beacon: Option<Address>,
    pub eip1822: Option<Address>,
    pub legacy: Option<Address>,
}

impl SlotReadings {
    /// Implementation by slot precedence. Slots are never mixed.
    pub fn implementation(&self) -> Option<Address> {
        self.eip1967.or(self.eip1822).or(self.legacy)
    }
}

/// Low 20 bytes of a storage word, or `None` for zero.
pub fn address_from_word(word: B256) -> Option<Address> {
    if word == B256::ZERO {
        return None;
    }
    non_zero(Address::from_word(word))
}

async fn read_slot<L: Ledger + ?Sized>(
    ledger: &L,
    target: Address,
    slot: B256,
    what: &'static str,
) -> Result<Option<Address>, SourceError> {
    let word = ledger.storage_at(target, slot).await.source_of(what)?;
    Ok(address_from_word(word))
}

/// Read all five slots concurrently; every read settles before returning.
pub async fn read_slots<L: Ledger + ?Sized>(ledger: &L, target: Address) -> SlotReadings {
    let (admin, eip1967, beacon, eip1822, legacy) = tokio::join!(
        read_slot(ledger, target, ADMIN_SLOT, "admin slot"),
        read_slot(ledger, target, EIP1967_IMPLEMENTATION_SLOT, "EIP-1967 implementation slot"),
        read_slot(ledger, target, BEACON_SLOT, "beacon slot"),
        read_slot(ledger, target, EIP1822_SLOT, "EIP-1822 slot"),
        read_slot(ledger, target, LEGACY_IMPLEMENTATION_SLOT, "legacy implementation slot"),
    );

    SlotReadings {
        admin: admin.absorb(target).flatten(),
        eip1967: eip1967.absorb(target).flatten(),
        beacon: beacon.absorb(target).flatten(),
        eip1822: eip1822.absorb(target).flatten(),
        legacy: legacy.absorb(target).flatten(),
    }
}

/// Storage-slot evidence for `target`, including the beacon lookup.
pub async fn detect<L: Ledger + ?Sized>(ledger: &L, target: Address) -> EvidenceRecord {
    let readings = read_slots(ledger, target).await;
    let mut record = EvidenceRecord::default();

    if let Some(admin) = readings.admin {
        record.set_admin(admin);
    }
    if let Some(implementation) = readings.implementation() {
        record.set_implementation(implementation);
    }
    if let Some(beacon) = readings.beacon {
        record.set_beacon(beacon);
        // A reachable beacon is authoritative over the direct slots
        match call_address_getter(ledger, beacon, "implementation()").await {
            Ok(Some(implementation)) => record.set_implementation(implementation),
            Ok(None) => debug!(%target, %beacon, "beacon reports no implementation"),
            Err(err) => debug!(%target, %beacon, error = %err, "beacon unreachable"),
        }
    }

    record
}
