//! Settlement error types

use thiserror::Error;

use crate::core_types::AssetId;
use crate::ledger::LedgerError;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SettlementError {
    #[error("No ledger registered for asset {0}")]
    UnknownAsset(AssetId),

    /// Prepare phase rejected `leg`; nothing moved
    #[error("Leg {leg} rejected: {source}")]
    Rejected { leg: usize, source: LedgerError },

    /// `leg` failed while committing; earlier legs were reversed
    #[error("Leg {leg} failed, settlement rolled back: {source}")]
    RolledBack { leg: usize, source: LedgerError },

    /// Reversing `leg` failed; the settlement is stuck in COMPENSATING
    #[error("Compensation of leg {leg} failed: {source}")]
    CompensationFailed { leg: usize, source: LedgerError },
}

impl SettlementError {
    /// Index of the leg the error refers to, if any
    pub fn leg(&self) -> Option<usize> {
        match self {
            SettlementError::UnknownAsset(_) => None,
            SettlementError::Rejected { leg, .. }
            | SettlementError::RolledBack { leg, .. }
            | SettlementError::CompensationFailed { leg, .. } => Some(*leg),
        }
    }

    /// Underlying ledger error, if any
    pub fn ledger_error(&self) -> Option<LedgerError> {
        match self {
            SettlementError::UnknownAsset(_) => None,
            SettlementError::Rejected { source, .. }
            | SettlementError::RolledBack { source, .. }
            | SettlementError::CompensationFailed { source, .. } => Some(*source),
        }
    }

    pub fn code(&self) -> &'static str {
        match self {
            SettlementError::UnknownAsset(_) => "UNKNOWN_ASSET",
            SettlementError::Rejected { .. } => "SETTLEMENT_REJECTED",
            SettlementError::RolledBack { .. } => "SETTLEMENT_ROLLED_BACK",
            SettlementError::CompensationFailed { .. } => "COMPENSATION_FAILED",
        }
    }
}
