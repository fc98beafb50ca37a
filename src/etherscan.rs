//! Etherscan V2 index client
//!
//! Implements [`IndexService`] over the Etherscan V2 HTTP API. The chain is
//! selected with `chainid` on every request; the API key travels in the query
//! string. Without a key, only unauthenticated endpoints are queried.

use crate::index::{IndexService, LinkResult, SourceMetadata};
use crate::throttle::Throttle;
use crate::types::IndexedTransaction;
use alloy_json_abi::JsonAbi;
use alloy_primitives::{Address, B256};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

const NO_API_KEY: &str = "No API Key provided";

/// Response envelope shared by every Etherscan endpoint.
#[derive(Debug, Deserialize)]
struct Envelope {
    #[serde(default)]
    status: String,
    #[serde(default)]
    message: String,
    #[serde(default)]
    result: Value,
}

impl Envelope {
    fn is_ok(&self) -> bool {
        self.status == "1"
    }

    /// Human-readable failure text: `result` when it is a string, else `message`.
    fn detail(&self) -> String {
        match self.result.as_str() {
            Some(text) if !text.is_empty() => text.to_string(),
            _ => self.message.clone(),
        }
    }

    /// Status "0" answers that mean "nothing on file" rather than an error.
    fn is_not_found(&self) -> bool {
        let detail = self.detail().to_ascii_lowercase();
        let message = self.message.to_ascii_lowercase();
        detail.contains("not verified")
            || detail.contains("no transactions found")
            || message.contains("no data found")
            || message.contains("no records found")
    }

    fn into_result(self, action: &str) -> Result<Value> {
        if !self.is_ok() {
            anyhow::bail!("Etherscan {} failed: {} ({})", action, self.message, self.detail());
        }
        Ok(self.result)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreationEntry {
    tx_hash: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct SourceEntry {
    source_code: String,
    contract_name: String,
    proxy: String,
    implementation: String,
}

/// Etherscan V2 client bound to one chain.
pub struct EtherscanClient {
    client: reqwest::Client,
    base_url: String,
    chain_id: u64,
    api_key: Option<String>,
    throttle: Throttle,
}

impl EtherscanClient {
    pub fn new(
        base_url: String,
        chain_id: u64,
        api_key: Option<String>,
        timeout: Duration,
        throttle: Throttle,
    ) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self {
            client,
            base_url,
            chain_id,
            api_key,
            throttle,
        })
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Routing parameters that must be in the query string of every request.
    fn routing(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("chainid", self.chain_id.to_string())];
        if let Some(key) = &self.api_key {
            params.push(("apikey", key.clone()));
        }
        params
    }

    async fn get(&self, params: &[(&'static str, String)]) -> Result<Envelope> {
        let _permit = self.throttle.acquire().await?;
        let response = self
            .client
            .get(&self.base_url)
            .query(&self.routing())
            .query(params)
            .send()
            .await
            .context("Failed to send Etherscan request")?;
        parse_body(response).await
    }

    async fn post_form(&self, form: &[(&'static str, String)]) -> Result<Envelope> {
        let _permit = self.throttle.acquire().await?;
        let response = self
            .client
            .post(&self.base_url)
            .query(&self.routing())
            .form(form)
            .send()
            .await
            .context("Failed to send Etherscan request")?;
        parse_body(response).await
    }
}

/// Parse an Etherscan body, tolerating a JSON document wrapped in a string.
async fn parse_body(response: reqwest::Response) -> Result<Envelope> {
    let status = response.status();
    let text = response
        .text()
        .await
        .context("Failed to read Etherscan response")?;
    if !status.is_success() {
        anyhow::bail!("Etherscan HTTP {}: {}", status, text);
    }
    parse_envelope(&text)
}

fn parse_envelope(text: &str) -> Result<Envelope> {
    let value: Value = serde_json::from_str(text).context("Etherscan response is not JSON")?;
    let value = match value {
        Value::String(inner) => {
            serde_json::from_str(&inner).context("Etherscan response is not JSON")?
        }
        other => other,
    };
    serde_json::from_value(value).context("Unexpected Etherscan response shape")
}

fn parse_address_field(raw: &str) -> Option<Address> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    match raw.parse::<Address>() {
        Ok(addr) => Some(addr),
        Err(e) => {
            debug!(value = raw, error = %e, "ignoring unparseable address from index");
            None
        }
    }
}

fn parse_creation(result: Value) -> Result<Option<B256>> {
    let entries: Vec<CreationEntry> =
        serde_json::from_value(result).context("Malformed getcontractcreation result")?;
    match entries.first() {
        Some(entry) => entry
            .tx_hash
            .parse::<B256>()
            .map(Some)
            .context("Malformed creation transaction hash"),
        None => Ok(None),
    }
}

fn parse_abi(result: Value) -> Result<JsonAbi> {
    let text = result.as_str().context("getabi result is not a string")?;
    serde_json::from_str(text).context("Malformed ABI JSON")
}

fn parse_source(result: Value) -> Result<SourceMetadata> {
    let entries: Vec<SourceEntry> =
        serde_json::from_value(result).context("Malformed getsourcecode result")?;
    let entry = entries.into_iter().next().unwrap_or_default();
    Ok(SourceMetadata {
        verified: !entry.source_code.is_empty(),
        proxy_flag: entry.proxy == "1",
        declared_implementation: parse_address_field(&entry.implementation),
        contract_name: Some(entry.contract_name).filter(|name| !name.is_empty()),
    })
}

fn parse_link(envelope: Envelope) -> LinkResult {
    if envelope.is_ok() {
        match envelope.result.as_str() {
            Some(guid) => LinkResult::accepted(guid),
            None => LinkResult {
                success: true,
                identifier: None,
                failure_detail: None,
            },
        }
    } else {
        LinkResult::rejected(envelope.detail())
    }
}

fn parse_txlist(envelope: Envelope) -> Result<Vec<IndexedTransaction>> {
    if !envelope.is_ok() && envelope.is_not_found() {
        return Ok(Vec::new());
    }
    let result = envelope.into_result("txlist")?;
    serde_json::from_value(result).context("Malformed txlist result")
}

#[async_trait]
impl IndexService for EtherscanClient {
    async fn creation_tx_hash(&self, address: Address) -> Result<Option<B256>> {
        if !self.has_api_key() {
            return Ok(None);
        }
        let envelope = self
            .get(&[
                ("module", "contract".to_string()),
                ("action", "getcontractcreation".to_string()),
                ("contractaddresses", format!("0x{:x}", address)),
            ])
            .await?;
        if !envelope.is_ok() && envelope.is_not_found() {
            return Ok(None);
        }
        parse_creation(envelope.into_result("getcontractcreation")?)
    }

    async fn contract_abi(&self, address: Address) -> Result<Option<JsonAbi>> {
        if !self.has_api_key() {
            return Ok(None);
        }
        let envelope = self
            .get(&[
                ("module", "contract".to_string()),
                ("action", "getabi".to_string()),
                ("address", format!("0x{:x}", address)),
            ])
            .await?;
        if !envelope.is_ok() && envelope.is_not_found() {
            return Ok(None);
        }
        parse_abi(envelope.into_result("getabi")?).map(Some)
    }

    async fn source_metadata(&self, address: Address) -> Result<SourceMetadata> {
        let envelope = self
            .get(&[
                ("module", "contract".to_string()),
                ("action", "getsourcecode".to_string()),
                ("address", format!("0x{:x}", address)),
            ])
            .await?;
        parse_source(envelope.into_result("getsourcecode")?)
    }

    async fn link_proxy(&self, proxy: Address, implementation: Option<Address>) -> Result<LinkResult> {
        if !self.has_api_key() {
            return Ok(LinkResult::rejected(NO_API_KEY));
        }
        let mut form = vec![
            ("module", "contract".to_string()),
            ("action", "verifyproxycontract".to_string()),
            ("address", format!("0x{:x}", proxy)),
        ];
        if let Some(implementation) = implementation {
            form.push(("expectedimplementation", format!("0x{:x}", implementation)));
        }
        let envelope = self.post_form(&form).await?;
        Ok(parse_link(envelope))
    }

    async fn transactions_from(&self, sender: Address, start_block: u64) -> Result<Vec<IndexedTransaction>> {
        let envelope = self
            .get(&[
                ("module", "account".to_string()),
                ("action", "txlist".to_string()),
                ("address", format!("0x{:x}", sender)),
                ("startblock", start_block.to_string()),
                ("sort", "asc".to_string()),
            ])
            .await?;
        parse_txlist(envelope)
    }
}
