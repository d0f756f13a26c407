//! Ledger error types

use thiserror::Error;

/// Errors raised by an [`AssetLedger`](super::AssetLedger).
///
/// These propagate unchanged through the migration core.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerError {
    #[error("Insufficient allowance")]
    InsufficientAllowance,

    #[error("Insufficient balance")]
    InsufficientBalance,

    #[error("Amount would cause overflow")]
    Overflow,
}

impl LedgerError {
    /// Get the error code for API responses
    pub fn code(&self) -> &'static str {
        match self {
            LedgerError::InsufficientAllowance => "INSUFFICIENT_ALLOWANCE",
            LedgerError::InsufficientBalance => "INSUFFICIENT_BALANCE",
            LedgerError::Overflow => "OVERFLOW",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            LedgerError::InsufficientAllowance.code(),
            "INSUFFICIENT_ALLOWANCE"
        );
        assert_eq!(
            LedgerError::InsufficientBalance.code(),
            "INSUFFICIENT_BALANCE"
        );
        assert_eq!(LedgerError::Overflow.code(), "OVERFLOW");
    }

    #[test]
    fn test_display() {
        assert_eq!(
            LedgerError::InsufficientBalance.to_string(),
            "Insufficient balance"
        );
    }
}
