//! deployscan - contract deployment scanner
//!
//! Finds the contract creations of one sender and analyzes each deployed
//! contract from three evidence sources: minimal-proxy bytecode, the standard
//! proxy storage slots, and an index service's verification metadata.

pub mod cli;
pub mod config;
pub mod error;
pub mod types;

// Adapters
pub mod etherscan;
pub mod index;
pub mod ledger;
pub mod rpc;
pub mod throttle;

// Analysis
pub mod analysis;
pub mod bytecode;
pub mod cache;
pub mod evidence;
pub mod metadata;
pub mod params;
pub mod recheck;
pub mod slots;

pub mod report;
pub mod scan;

#[cfg(test)]
mod mock;

// Re-export the main types for convenience
pub use analysis::{Analyzer, ContractAnalysis, LinkingOutcome};
pub use evidence::EvidenceRecord;
pub use index::{IndexService, LinkResult, SourceMetadata};
pub use ledger::Ledger;
pub use scan::{scan, CreatedContract, ScanReport, ScanRequest};
