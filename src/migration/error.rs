//! Migration Error Types

use thiserror::Error;

use crate::core_types::{Amount, AssetId};
use crate::ledger::LedgerError;

/// Errors surfaced by [`MigrationCore`](super::MigrationCore) operations.
///
/// Every error aborts the whole call with no balance change. Ledger errors
/// pass through unchanged in [`MigrationError::Ledger`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MigrationError {
    // === Validation Errors ===
    #[error("Amount must be greater than zero")]
    InvalidAmount,

    #[error("Asset reference must not be the zero address")]
    InvalidAssetReference,

    #[error("New owner must not be the zero address")]
    InvalidOwner,

    #[error("Core account must not be the zero address")]
    InvalidCoreAccount,

    // === Access Errors ===
    #[error("Caller is not the owner")]
    NotOwner,

    // === Balance Errors ===
    #[error("Nothing to withdraw: core balance is zero")]
    EmptyBalance,

    #[error("Insufficient reserve: {reserve} available, {requested} requested")]
    InsufficientReserve { reserve: Amount, requested: Amount },

    #[error("No ledger registered for asset {0}")]
    UnknownAsset(AssetId),

    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// A settlement could not undo its applied legs. Funds are in-flight
    /// and need manual reconciliation.
    #[error("Settlement compensation failed: {0}")]
    CompensationFailed(LedgerError),
}

impl MigrationError {
    /// Get the error code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            MigrationError::InvalidAmount => "INVALID_AMOUNT",
            MigrationError::InvalidAssetReference => "INVALID_ASSET_REFERENCE",
            MigrationError::InvalidOwner => "INVALID_OWNER",
            MigrationError::InvalidCoreAccount => "INVALID_CORE_ACCOUNT",
            MigrationError::NotOwner => "NOT_OWNER",
            MigrationError::EmptyBalance => "EMPTY_BALANCE",
            MigrationError::InsufficientReserve { .. } => "INSUFFICIENT_RESERVE",
            MigrationError::UnknownAsset(_) => "UNKNOWN_ASSET",
            MigrationError::Ledger(e) => e.code(),
            MigrationError::CompensationFailed(_) => "COMPENSATION_FAILED",
        }
    }
}
