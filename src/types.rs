//! Wire types
//!
//! Type definitions for transactions and receipts returned from Ethereum
//! JSON-RPC endpoints, and for transaction listings returned by the index API.

use alloy_primitives::{Address, B256};
use serde::{Deserialize, Deserializer, Serializer};

/// Ethereum transaction as returned by `eth_getTransactionByHash`, reduced to
/// the fields the scanner needs to locate a sender's history.
#[derive(Debug, Clone, Deserialize)]
pub struct Transaction {
    /// Sender address (hex string in JSON)
    #[serde(rename = "from", deserialize_with = "deserialize_hex_address")]
    pub from: Address,

    /// Block number (None while pending)
    #[serde(rename = "blockNumber", default, deserialize_with = "deserialize_hex_u64_opt")]
    pub block_number: Option<u64>,
}

/// Transaction receipt, reduced to the fields the scanner needs.
#[derive(Debug, Clone, Deserialize)]
pub struct Receipt {
    /// Address of the deployed contract, only set for creations
    #[serde(rename = "contractAddress", default, deserialize_with = "deserialize_hex_address_opt")]
    pub contract_address: Option<Address>,
}

/// One entry of the index service's per-account transaction listing.
///
/// Numbers are decimal strings here, unlike JSON-RPC. Creations carry an
/// empty `to` and, usually, the deployed `contractAddress`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IndexedTransaction {
    #[serde(rename = "hash", deserialize_with = "deserialize_hex_b256")]
    pub hash: B256,

    #[serde(rename = "from", deserialize_with = "deserialize_hex_address")]
    pub from: Address,

    #[serde(rename = "to", default, deserialize_with = "deserialize_hex_address_opt")]
    pub to: Option<Address>,

    #[serde(rename = "blockNumber", deserialize_with = "deserialize_dec_u64")]
    pub block_number: u64,

    #[serde(rename = "contractAddress", default, deserialize_with = "deserialize_hex_address_opt")]
    pub contract_address: Option<Address>,
}

impl IndexedTransaction {
    /// A creation has no recipient, or the zero address as recipient.
    pub fn is_contract_creation(&self) -> bool {
        self.to.map_or(true, |to| to == Address::ZERO)
    }
}

// Hex deserialization helpers

/// Pad an odd-length hex string with a leading zero.
/// This handles cases where RPC returns hex strings without leading zeros.
pub(crate) fn pad_hex_string(s: &str) -> String {
    if s.is_empty() {
        return s.to_string();
    }
    if s.len() % 2 == 1 {
        format!("0{}", s)
    } else {
        s.to_string()
    }
}

/// Decode a `0x`-prefixed (or bare) hex string into bytes.
pub(crate) fn decode_hex(s: &str) -> Result<Vec<u8>, hex::FromHexError> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    if s.is_empty() {
        return Ok(Vec::new());
    }
    hex::decode(pad_hex_string(s))
}

/// Deserialize an optional hex string to u64.
fn deserialize_hex_u64_opt<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let s = Option::<String>::deserialize(deserializer)?;
    match s {
        Some(s) => {
            let s = s.strip_prefix("0x").unwrap_or(&s);
            if s.is_empty() {
                return Ok(None);
            }
            u64::from_str_radix(s, 16)
                .map(Some)
                .map_err(serde::de::Error::custom)
        }
        None => Ok(None),
    }
}

/// Deserialize a decimal string (or bare number) to u64.
fn deserialize_dec_u64<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Number {
        Text(String),
        Int(u64),
    }

    match Number::deserialize(deserializer)? {
        Number::Int(n) => Ok(n),
        Number::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

/// Deserialize a hex string to B256.
fn deserialize_hex_b256<'de, D>(deserializer: D) -> Result<B256, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    let bytes = decode_hex(&s).map_err(serde::de::Error::custom)?;
    if bytes.len() != 32 {
        return Err(serde::de::Error::custom(format!(
            "Expected 32 bytes for hash, got {}",
            bytes.len()
        )));
    }
    Ok(B256::from_slice(&bytes))
}

/// Deserialize a hex string to Address.
fn deserialize_hex_address<'de, D>(deserializer: D) -> Result<Address, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    let bytes = decode_hex(&s).map_err(serde::de::Error::custom)?;
    if bytes.len() != 20 {
        return Err(serde::de::Error::custom(format!(
            "Expected 20 bytes for address, got {}",
            bytes.len()
        )));
    }
    Ok(Address::from_slice(&bytes))
}

/// Deserialize an optional hex string to Address.
///
/// Both `null` and `""` map to `None`.
fn deserialize_hex_address_opt<'de, D>(deserializer: D) -> Result<Option<Address>, D::Error>
where
    D: Deserializer<'de>,
{
    let s = Option::<String>::deserialize(deserializer)?;
    match s {
        Some(s) => {
            let bytes = decode_hex(&s).map_err(serde::de::Error::custom)?;
            if bytes.is_empty() {
                return Ok(None);
            }
            if bytes.len() != 20 {
                return Err(serde::de::Error::custom(format!(
                    "Expected 20 bytes for address, got {}",
                    bytes.len()
                )));
            }
            Ok(Some(Address::from_slice(&bytes)))
        }
        None => Ok(None),
    }
}

/// Serialize an address in EIP-55 checksum form.
pub(crate) fn serialize_checksummed<S>(address: &Address, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&address.to_checksum(None))
}

/// Serialize an optional address in EIP-55 checksum form, `null` when absent.
pub(crate) fn serialize_checksummed_opt<S>(address: &Option<Address>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match address {
        Some(address) => serializer.serialize_some(&address.to_checksum(None)),
        None => serializer.serialize_none(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_primitives::address;

    #[test]
    fn test_rpc_transaction_creation() {
        let json = r#"{
            "hash": "0x5c504ed432cb51138bcf09aa5e8a410dd4a1e204ef84bfed1be16dfba1b22060",
            "from": "0xa7d9ddbe1f17865597fbd27ec712455208b6b76d",
            "to": null,
            "blockNumber": "0x5daf3b",
            "value": "0x0"
        }"#;
        let tx: Transaction = serde_json::from_str(json).unwrap();
        assert_eq!(tx.block_number, Some(0x5daf3b));
        assert_eq!(tx.from, address!("a7d9ddbe1f17865597fbd27ec712455208b6b76d"));
    }

    #[test]
    fn test_rpc_transaction_pending() {
        let json = r#"{
            "hash": "0x5c504ed432cb51138bcf09aa5e8a410dd4a1e204ef84bfed1be16dfba1b22060",
            "from": "0xa7d9ddbe1f17865597fbd27ec712455208b6b76d",
            "to": "0xdac17f958d2ee523a2206206994597c13d831ec7",
            "blockNumber": null
        }"#;
        let tx: Transaction = serde_json::from_str(json).unwrap();
        assert_eq!(tx.block_number, None);
    }

    #[test]
    fn test_receipt_contract_address() {
        let json = r#"{"status": "0x1", "contractAddress": "0xdac17f958d2ee523a2206206994597c13d831ec7"}"#;
        let receipt: Receipt = serde_json::from_str(json).unwrap();
        assert_eq!(
            receipt.contract_address,
            Some(address!("dac17f958d2ee523a2206206994597c13d831ec7"))
        );
    }

    #[test]
    fn test_indexed_transaction_listing_entry() {
        let json = r#"{
            "blockNumber": "14923678",
            "hash": "0x5c504ed432cb51138bcf09aa5e8a410dd4a1e204ef84bfed1be16dfba1b22060",
            "from": "0xa7d9ddbe1f17865597fbd27ec712455208b6b76d",
            "to": "",
            "contractAddress": "0xdac17f958d2ee523a2206206994597c13d831ec7",
            "isError": "0"
        }"#;
        let tx: IndexedTransaction = serde_json::from_str(json).unwrap();
        assert_eq!(tx.block_number, 14923678);
        assert!(tx.is_contract_creation());
        assert!(tx.contract_address.is_some());
    }

    #[test]
    fn test_zero_recipient_is_creation() {
        let json = r#"{
            "blockNumber": "1",
            "hash": "0x5c504ed432cb51138bcf09aa5e8a410dd4a1e204ef84bfed1be16dfba1b22060",
            "from": "0xa7d9ddbe1f17865597fbd27ec712455208b6b76d",
            "to": "0x0000000000000000000000000000000000000000",
            "contractAddress": ""
        }"#;
        let tx: IndexedTransaction = serde_json::from_str(json).unwrap();
        assert!(tx.is_contract_creation());
        assert_eq!(tx.contract_address, None);
    }

    #[test]
    fn test_pad_hex_string() {
        assert_eq!(pad_hex_string("abc"), "0abc");
        assert_eq!(pad_hex_string("ab"), "ab");
        assert_eq!(decode_hex("0x1").unwrap(), vec![0x01]);
        assert!(decode_hex("0x").unwrap().is_empty());
    }
}
