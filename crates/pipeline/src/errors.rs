//! Top-level error type for the affipress domain.
//!
//! [`PipelineError`] covers every condition a run can report. How each one is
//! treated differs:
//!
//! | Variant | Effect |
//! |---------|--------|
//! | `Config` | fatal, raised before any ledger mutation |
//! | `Validation` | one row skipped with a warning; the run continues |
//! | `InventoryExhausted` | fatal only under [`crate::ShortfallPolicy::Strict`] |
//! | `QualityGateRejected` | non-fatal; the keyword is given up |
//! | `ExternalServiceUnavailable` | never fatal; triggers the deterministic fallback |
//! | `Ledger` | fatal; the store could not be read or written |
//!
//! A throttle skip is deliberately absent: it is an outcome, not an error
//! (see [`crate::throttle`]).

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::LedgerKind;

/// Errors produced by domain operations and by adapters at the port boundary.
#[derive(Debug, Error, Clone, PartialEq, Serialize, Deserialize)]
pub enum PipelineError {
    /// A required configuration key is missing or has an invalid value.
    ///
    /// Produced at load time; a run never starts with an invalid config.
    #[error("Configuration error: {message}")]
    Config {
        /// Every problem found, joined for display.
        message: String,
    },

    /// A ledger row could not be parsed into a typed record.
    #[error("Invalid {ledger} row at line {line}: {message}")]
    Validation {
        ledger: LedgerKind,
        line: usize,
        message: String,
    },

    /// Fewer pending keywords exist than the caller strictly requires, even
    /// after a refill attempt.
    #[error("Keyword inventory exhausted: requested {requested}, available {available}")]
    InventoryExhausted { requested: usize, available: usize },

    /// A draft failed the quality gate.
    #[error("Quality gate rejected draft for '{keyword}': {}", reasons.join("; "))]
    QualityGateRejected {
        keyword: String,
        /// Every failing check, first failure first.
        reasons: Vec<String>,
    },

    /// The text-generation backend or an analytics source could not be used.
    #[error("External service '{service}' unavailable: {detail}")]
    ExternalServiceUnavailable { service: String, detail: String },

    /// A ledger or article store could not be read or written.
    #[error("Ledger error ({ledger}): {message}")]
    Ledger { ledger: String, message: String },
}

impl PipelineError {
    /// Builds a [`PipelineError::Config`] from a single message.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Builds a [`PipelineError::Ledger`].
    pub fn ledger(ledger: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Ledger {
            ledger: ledger.into(),
            message: message.into(),
        }
    }

    /// Builds a [`PipelineError::ExternalServiceUnavailable`].
    pub fn unavailable(service: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::ExternalServiceUnavailable {
            service: service.into(),
            detail: detail.into(),
        }
    }

    /// Returns `true` if the error must abort the whole run.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Config { .. } | Self::Ledger { .. } | Self::InventoryExhausted { .. }
        )
    }
}
