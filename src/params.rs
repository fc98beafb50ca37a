//! Readable-parameter discovery
//!
//! Turns a verified ABI into a list of typed [`Accessor`] descriptors (every
//! parameterless `view`/`pure` function outside the exclusion list), calls
//! each against a target address, and renders the results as strings.

use crate::error::{SourceError, SourceResultExt};
use crate::ledger::Ledger;
use alloy_dyn_abi::{DynSolType, DynSolValue, Specifier};
use alloy_json_abi::{JsonAbi, StateMutability};
use alloy_primitives::{Address, Selector};
use futures::future::join_all;
use std::collections::BTreeMap;
use tracing::debug;

/// Accessors reported elsewhere in the analysis, never as parameters.
pub const EXCLUDED_ACCESSORS: [&str; 8] = [
    "name",
    "symbol",
    "decimals",
    "owner",
    "implementation",
    "admin",
    "getProxyAdmin",
    "getImplementation",
];

/// A parameterless read-only function and the shape of its return data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Accessor {
    pub name: String,
    pub selector: Selector,
    pub outputs: Vec<DynSolType>,
}

impl Accessor {
    /// Decode return data into a tuple of the declared outputs.
    pub fn decode(&self, data: &[u8]) -> Result<DynSolValue, SourceError> {
        DynSolType::Tuple(self.outputs.clone())
            .abi_decode_params(data)
            .map_err(|e| SourceError::malformed("accessor return data", e.to_string()))
    }
}

/// Accessors of `abi`, in ABI order.
///
/// Functions with no outputs, or with output types that cannot be resolved,
/// are left out.
pub fn accessors(abi: &JsonAbi) -> Vec<Accessor> {
    abi.functions()
        .filter(|f| f.inputs.is_empty())
        .filter(|f| matches!(f.state_mutability, StateMutability::View | StateMutability::Pure))
        .filter(|f| !EXCLUDED_ACCESSORS.contains(&f.name.as_str()))
        .filter(|f| !f.outputs.is_empty())
        .filter_map(|f| {
            let outputs = f
                .outputs
                .iter()
                .map(|p| p.resolve())
                .collect::<Result<Vec<_>, _>>();
            match outputs {
                Ok(outputs) => Some(Accessor {
                    name: f.name.clone(),
                    selector: f.selector(),
                    outputs,
                }),
                Err(e) => {
                    debug!(function = %f.name, error = %e, "skipping accessor with unresolvable outputs");
                    None
                }
            }
        })
        .collect()
}

/// Render a decoded value as a display string.
///
/// Integers are decimal, addresses checksummed, byte strings `0x`-hex, and
/// sequences (including multi-value returns) are joined with `", "`.
pub fn render(value: &DynSolValue) -> String {
    match value {
        DynSolValue::Bool(b) => b.to_string(),
        DynSolValue::Int(i, _) => i.to_string(),
        DynSolValue::Uint(u, _) => u.to_string(),
        DynSolValue::Address(a) => a.to_checksum(None),
        DynSolValue::String(s) => s.clone(),
        DynSolValue::Bytes(b) => format!("0x{}", hex::encode(b)),
        DynSolValue::FixedBytes(word, size) => format!("0x{}", hex::encode(&word[..*size])),
        DynSolValue::Function(f) => format!("0x{}", hex::encode(f.as_slice())),
        DynSolValue::Array(items) | DynSolValue::FixedArray(items) | DynSolValue::Tuple(items) => {
            items.iter().map(render).collect::<Vec<_>>().join(", ")
        }
        #[allow(unreachable_patterns)]
        other => format!("{:?}", other),
    }
}

async fn read<L: Ledger + ?Sized>(ledger: &L, target: Address, accessor: &Accessor) -> Result<String, SourceError> {
    let data = ledger
        .call(target, accessor.selector.to_vec())
        .await
        .source_of("accessor call")?;
    let value = accessor.decode(&data)?;
    Ok(render(&value))
}

/// Call every accessor against `target`. Failing accessors are skipped.
pub async fn discover<L: Ledger + ?Sized>(
    ledger: &L,
    target: Address,
    accessors: &[Accessor],
) -> BTreeMap<String, String> {
    let results = join_all(accessors.iter().map(|accessor| read(ledger, target, accessor))).await;

    let mut params = BTreeMap::new();
    for (accessor, result) in accessors.iter().zip(results) {
        match result {
            Ok(value) => {
                params.insert(accessor.name.clone(), value);
            }
            Err(err) => debug!(%target, accessor = %accessor.name, error = %err, "accessor skipped"),
        }
    }
    params
}
