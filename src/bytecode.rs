//! Minimal-proxy (EIP-1167 clone) detection from deployed bytecode.

use crate::evidence::EvidenceRecord;
use alloy_primitives::Address;

/// `CALLDATASIZE RETURNDATASIZE ... PUSH20`, the fixed clone preamble.
pub const MINIMAL_PROXY_PREAMBLE: [u8; 10] = [0x36, 0x3d, 0x3d, 0x37, 0x3d, 0x3d, 0x3d, 0x36, 0x3d, 0x73];

/// Length of a complete clone runtime: preamble, address, 15-byte tail.
pub const MINIMAL_PROXY_LEN: usize = 45;

/// Implementation address embedded in a clone, if `code` is one.
pub fn minimal_proxy_target(code: &[u8]) -> Option<Address> {
    if code.len() < MINIMAL_PROXY_LEN || !code.starts_with(&MINIMAL_PROXY_PREAMBLE) {
        return None;
    }
    let start = MINIMAL_PROXY_PREAMBLE.len();
    Some(Address::from_slice(&code[start..start + 20]))
}

/// Evidence from bytecode alone. Empty code yields an empty record.
pub fn detect(code: &[u8]) -> EvidenceRecord {
    let mut record = EvidenceRecord::default();
    if let Some(target) = minimal_proxy_target(code) {
        record.set_implementation(target);
    }
    record
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    fn clone_code(target: Address) -> Vec<u8> {
        let mut code = MINIMAL_PROXY_PREAMBLE.to_vec();
        code.extend_from_slice(target.as_slice());
        code.extend_from_slice(&hex::decode("5af43d82803e903d91602b57fd5bf3").unwrap());
        code
    }

    #[test]
    fn test_clone_detected() {
        let target = address!("bebebebebebebebebebebebebebebebebebebebe");
        let code = clone_code(target);
        assert_eq!(code.len(), MINIMAL_PROXY_LEN);

        let record = detect(&code);
        assert!(record.is_proxy);
        assert_eq!(record.implementation, Some(target));
        assert_eq!(
            record.implementation.unwrap().to_checksum(None),
            "0xBEbeBeBEbeBebeBeBEBEbebEBeBeBebeBeBebebe"
        );
    }

    #[test]
    fn test_short_code_rejected() {
        let target = address!("bebebebebebebebebebebebebebebebebebebebe");
        let code = clone_code(target);
        for len in 0..MINIMAL_PROXY_LEN {
            assert!(detect(&code[..len]).is_empty(), "length {len}");
        }
    }

    #[test]
    fn test_other_code_rejected() {
        let mut code = clone_code(address!("bebebebebebebebebebebebebebebebebebebebe"));
        code[0] = 0x60;
        assert!(detect(&code).is_empty());

        // Ordinary solidity runtime prologue
        let runtime = hex::decode("6080604052348015600f57600080fd5b506004361060285760003560e01c8063").unwrap();
        assert!(detect(&runtime).is_empty());
    }

    #[test]
    fn test_longer_code_with_preamble_accepted() {
        let target = address!("1111111111111111111111111111111111111111");
        let mut code = clone_code(target);
        code.extend_from_slice(&[0u8; 8]);
        assert_eq!(detect(&code).implementation, Some(target));
    }
}
