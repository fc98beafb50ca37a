//! Evidence-source error taxonomy
//!
//! Every extractor sub-step returns `Result<T, SourceError>`. A failed source
//! never aborts an analysis: the caller decides, via [`Absorb::absorb`], to
//! log the failure and continue with the field left absent.

use alloy_primitives::Address;
use thiserror::Error;
use tracing::debug;

/// Failure of a single evidence source (one slot read, one index call, one
/// contract call).
#[derive(Debug, Error)]
pub enum SourceError {
    /// The source failed or timed out.
    #[error("{what} unavailable: {reason}")]
    Unavailable { what: &'static str, reason: String },

    /// The source answered with data that cannot be normalized.
    #[error("{what} returned malformed data: {reason}")]
    Malformed { what: &'static str, reason: String },
}

impl SourceError {
    pub fn malformed(what: &'static str, reason: impl Into<String>) -> Self {
        SourceError::Malformed {
            what,
            reason: reason.into(),
        }
    }
}

/// Unexpected failure of the orchestration itself.
#[derive(Debug, Error)]
#[error("analysis of {address} aborted: {reason}")]
pub struct AnalysisFault {
    pub address: Address,
    pub reason: String,
}

/// Map adapter errors into [`SourceError::Unavailable`].
pub trait SourceResultExt<T> {
    fn source_of(self, what: &'static str) -> Result<T, SourceError>;
}

impl<T> SourceResultExt<T> for anyhow::Result<T> {
    fn source_of(self, what: &'static str) -> Result<T, SourceError> {
        // `{:#}` keeps the whole context chain on one line
        self.map_err(|e| SourceError::Unavailable {
            what,
            reason: format!("{:#}", e),
        })
    }
}

/// Explicit absorption of a source failure.
pub trait Absorb<T> {
    /// Log the failure at debug level and yield `None`.
    fn absorb(self, target: Address) -> Option<T>;
}

impl<T> Absorb<T> for Result<T, SourceError> {
    fn absorb(self, target: Address) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(err) => {
                debug!(%target, error = %err, "evidence source absorbed");
                None
            }
        }
    }
}
