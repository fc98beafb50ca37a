//! Index-metadata evidence: verification status, name, declared proxy info.

use crate::error::{SourceError, SourceResultExt};
use crate::evidence::{non_zero, EvidenceRecord};
use crate::index::{IndexService, SourceMetadata};
use alloy_primitives::Address;

/// Fetch source metadata for `target`.
pub async fn fetch<I: IndexService + ?Sized>(index: &I, target: Address) -> Result<SourceMetadata, SourceError> {
    index.source_metadata(target).await.source_of("source metadata")
}

/// Fold index metadata into evidence.
///
/// The implementation is taken only when the index both flags a proxy and
/// names a non-zero implementation; that is also the only case in which
/// `implementation_declared_by_index` is set.
pub fn evidence_from(metadata: &SourceMetadata) -> EvidenceRecord {
    let mut record = EvidenceRecord {
        verified: metadata.verified,
        name: metadata.contract_name.clone().filter(|n| !n.is_empty()),
        ..Default::default()
    };

    if metadata.proxy_flag {
        record.is_proxy = true;
        if let Some(implementation) = metadata.declared_implementation.and_then(non_zero) {
            record.set_implementation(implementation);
            record.implementation_declared_by_index = true;
        }
    }

    record
}

/// Index evidence for `target`; a failed fetch degrades to an empty record.
pub async fn detect<I: IndexService + ?Sized>(index: &I, target: Address) -> EvidenceRecord {
    match fetch(index, target).await {
        Ok(metadata) => evidence_from(&metadata),
        Err(err) => {
            tracing::debug!(%target, error = %err, "index metadata unavailable");
            EvidenceRecord::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockIndex;
    use alloy_primitives::address;

    const TARGET: Address = address!("1000000000000000000000000000000000000001");
    const IMPL: Address = address!("aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa");

    #[test]
    fn test_declared_proxy_with_implementation() {
        let record = evidence_from(&SourceMetadata {
            verified: true,
            proxy_flag: true,
            declared_implementation: Some(IMPL),
            contract_name: Some("ERC1967Proxy".to_string()),
        });
        assert!(record.is_proxy);
        assert!(record.verified);
        assert!(record.implementation_declared_by_index);
        assert_eq!(record.implementation, Some(IMPL));
        assert_eq!(record.name.as_deref(), Some("ERC1967Proxy"));
    }

    #[test]
    fn test_implementation_without_proxy_flag_ignored() {
        let record = evidence_from(&SourceMetadata {
            verified: true,
            proxy_flag: false,
            declared_implementation: Some(IMPL),
            contract_name: None,
        });
        assert!(!record.is_proxy);
        assert_eq!(record.implementation, None);
        assert!(!record.implementation_declared_by_index);
        assert!(record.is_consistent());
    }

    #[test]
    fn test_zero_implementation_not_declared() {
        let record = evidence_from(&SourceMetadata {
            verified: false,
            proxy_flag: true,
            declared_implementation: Some(Address::ZERO),
            contract_name: None,
        });
        assert!(record.is_proxy);
        assert_eq!(record.implementation, None);
        assert!(!record.implementation_declared_by_index);
    }

    #[tokio::test]
    async fn test_fetch_failure_degrades_to_empty() {
        let mut index = MockIndex::default();
        index.fail_metadata(TARGET);
        assert!(detect(&index, TARGET).await.is_empty());
    }
}
