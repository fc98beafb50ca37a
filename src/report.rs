//! Scan report rendering (plain text summary or pretty JSON).

use crate::analysis::ContractAnalysis;
use crate::scan::{CreatedContract, ScanReport};
use anyhow::{Context, Result};
use std::fmt::Write;

const RULE: &str = "====================================================";

/// Display name of an analyzed contract.
///
/// Proxies with a named implementation read `Impl (Proxy: Name)`.
pub fn display_name(analysis: &ContractAnalysis) -> String {
    if analysis.is_proxy {
        match (&analysis.implementation_name, &analysis.name) {
            (Some(implementation), name) => {
                format!("{} (Proxy: {})", implementation, name.as_deref().unwrap_or("Unknown"))
            }
            (None, Some(name)) => name.clone(),
            (None, None) => "Unknown Proxy".to_string(),
        }
    } else {
        analysis.name.clone().unwrap_or_else(|| "Unknown Contract".to_string())
    }
}

/// Render the report as a human-readable summary.
pub fn render_text(report: &ScanReport) -> String {
    let mut out = String::new();
    // Writing to a String cannot fail
    let _ = write_text(&mut out, report);
    out
}

fn write_text(out: &mut String, report: &ScanReport) -> std::fmt::Result {
    writeln!(out, "--- Scan on {} ---", report.network)?;
    writeln!(out, "Sender: {}", report.sender)?;
    writeln!(out, "Start Block: {}", report.start_block)?;
    writeln!(out, "Scanned {} transactions from sender.", report.scanned)?;

    if report.contracts.is_empty() {
        writeln!(out)?;
        writeln!(out, "No contract creations found in the scanned range.")?;
        return Ok(());
    }

    writeln!(out)?;
    writeln!(out, "{}", RULE)?;
    writeln!(out, "           CREATED CONTRACTS SUMMARY")?;
    writeln!(out, "{}", RULE)?;

    for (i, contract) in report.contracts.iter().enumerate() {
        write_contract(out, i + 1, contract)?;
    }
    Ok(())
}

fn write_contract(out: &mut String, position: usize, contract: &CreatedContract) -> std::fmt::Result {
    let a = &contract.analysis;

    writeln!(out, "{}. Name: {}", position, display_name(a))?;
    match contract.address {
        Some(address) => writeln!(out, "   Address: {}", address)?,
        None => writeln!(out, "   Address: Manual retrieval required")?,
    }
    writeln!(out, "   Deployer: {}", contract.deployer)?;
    writeln!(
        out,
        "   Verification: {}",
        if a.verified { "Verified" } else { "Not Verified" }
    )?;
    writeln!(out, "   Proxy: {}", if a.is_proxy { "Yes" } else { "No" })?;

    if let Some(owner) = a.contract_owner {
        writeln!(out, "   Contract Owner: {}", owner)?;
        if let Some(hash) = a.contract_owner_hash {
            writeln!(out, "   Contract Owner Hash: {}", hash)?;
        }
    }
    if let Some(implementation) = a.implementation {
        writeln!(out, "   Implementation: {}", implementation)?;
        if let Some(name) = &a.implementation_name {
            writeln!(out, "   Implementation Name: {}", name)?;
        }
        if let Some(hash) = a.implementation_hash {
            writeln!(out, "   Implementation Hash: {}", hash)?;
        }
    }
    if let Some(beacon) = a.beacon {
        writeln!(out, "   Beacon: {}", beacon)?;
    }
    if let Some(admin) = a.admin {
        writeln!(out, "   Proxy Admin: {}", admin)?;
        if let Some(hash) = a.admin_hash {
            writeln!(out, "   Proxy Admin Hash: {}", hash)?;
        }
        if let Some(owner) = a.admin_owner {
            writeln!(out, "   Proxy Admin Owner: {}", owner)?;
            if let Some(hash) = a.admin_owner_hash {
                writeln!(out, "   Proxy Admin Owner Hash: {}", hash)?;
            }
        }
    }
    if a.linking.attempted {
        if a.linking.success {
            writeln!(out, "   Index Linking: Success (Linked)")?;
        } else {
            writeln!(
                out,
                "   Index Linking: Failed ({})",
                a.linking.detail.as_deref().unwrap_or("no detail")
            )?;
        }
    }
    if !a.params.is_empty() {
        writeln!(out, "   Current Parameters:")?;
        for (key, value) in &a.params {
            writeln!(out, "     - {}: {}", key, value)?;
        }
    }
    writeln!(out, "   Created at Block: {}", contract.block)?;
    writeln!(out, "   Transaction: {}", contract.tx_hash)?;
    writeln!(out)
}

/// Render the report as pretty JSON.
pub fn render_json(report: &ScanReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("Failed to serialize scan report")
}
