//! The module contains the errors the engine can return.
//!
//! Data-integrity failures ([`UnknownCurrency`], [`UnknownParticipant`],
//! [`ImbalancedLedger`]) always reach the caller. Rate-source failures are a
//! separate type, [`RateSourceError`], which never leaves the
//! [`CurrencyNormalizer`]: it falls back to a cached or embedded table instead.
//!
//!  [`UnknownCurrency`]: EngineError::UnknownCurrency
//!  [`UnknownParticipant`]: EngineError::UnknownParticipant
//!  [`ImbalancedLedger`]: EngineError::ImbalancedLedger
//!  [`CurrencyNormalizer`]: crate::CurrencyNormalizer
use thiserror::Error;

use crate::MoneyCents;

/// Engine custom errors.
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("Unknown currency: {0}")]
    UnknownCurrency(String),
    #[error("Invalid currency code: \"{0}\"")]
    InvalidCurrency(String),
    #[error("Invalid exchange rate for {0}")]
    InvalidRate(String),
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),
    #[error("\"{0}\" is not a member of the group")]
    UnknownParticipant(String),
    #[error("\"{0}\" appears more than once in the roster")]
    DuplicateMember(String),
    #[error("Invalid expense: {0}")]
    InvalidExpense(String),
    #[error("Ledger does not balance: {residual} left unmatched")]
    ImbalancedLedger { residual: MoneyCents },
    #[error("Export failed: {0}")]
    Export(String),
}

impl PartialEq for EngineError {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::UnknownCurrency(a), Self::UnknownCurrency(b)) => a == b,
            (Self::InvalidCurrency(a), Self::InvalidCurrency(b)) => a == b,
            (Self::InvalidRate(a), Self::InvalidRate(b)) => a == b,
            (Self::InvalidAmount(a), Self::InvalidAmount(b)) => a == b,
            (Self::UnknownParticipant(a), Self::UnknownParticipant(b)) => a == b,
            (Self::DuplicateMember(a), Self::DuplicateMember(b)) => a == b,
            (Self::InvalidExpense(a), Self::InvalidExpense(b)) => a == b,
            (
                Self::ImbalancedLedger { residual: a },
                Self::ImbalancedLedger { residual: b },
            ) => a == b,
            (Self::Export(a), Self::Export(b)) => a == b,
            _ => false,
        }
    }
}

/// Failures of the remote exchange-rate source.
///
/// Only the normalizer sees these; they are logged and resolved through the
/// fallback chain (cached table, then the embedded table).
#[derive(Error, Debug)]
pub enum RateSourceError {
    #[error("rate source request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("rate source answered with status {0}")]
    Status(u16),
    #[error("rate source returned a malformed table: {0}")]
    Malformed(String),
}
