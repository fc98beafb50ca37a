//! Evidence records
//!
//! Each extractor produces a sparse [`EvidenceRecord`]. An absent field means
//! the source had no opinion. Setting any proxy field through the setters
//! also raises `is_proxy`, and zero addresses are never stored.

use alloy_primitives::Address;

/// Partial view of a contract's identity and proxy role from one source.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EvidenceRecord {
    pub is_proxy: bool,
    pub implementation: Option<Address>,
    pub admin: Option<Address>,
    pub beacon: Option<Address>,
    pub verified: bool,
    pub name: Option<String>,
    /// The index service itself names the implementation.
    pub implementation_declared_by_index: bool,
}

/// `None` for the zero address.
pub fn non_zero(addr: Address) -> Option<Address> {
    (addr != Address::ZERO).then_some(addr)
}

impl EvidenceRecord {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn set_implementation(&mut self, addr: Address) {
        if let Some(addr) = non_zero(addr) {
            self.implementation = Some(addr);
            self.is_proxy = true;
        }
    }

    pub fn set_admin(&mut self, addr: Address) {
        if let Some(addr) = non_zero(addr) {
            self.admin = Some(addr);
            self.is_proxy = true;
        }
    }

    pub fn set_beacon(&mut self, addr: Address) {
        if let Some(addr) = non_zero(addr) {
            self.beacon = Some(addr);
            self.is_proxy = true;
        }
    }

    /// Proxy fields are present only on records flagged as proxies, and
    /// never hold the zero address.
    pub fn is_consistent(&self) -> bool {
        let fields = [self.implementation, self.admin, self.beacon];
        let any_set = fields.iter().any(Option::is_some);
        let no_zero = fields.iter().flatten().all(|a| *a != Address::ZERO);
        no_zero && (self.is_proxy || !any_set)
    }
}
