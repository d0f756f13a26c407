//! Asset Ledger capability
//!
//! The migration core never owns balances itself. Every balance it reads or
//! moves lives in an external per-asset ledger reached through the
//! [`AssetLedger`] trait.
//!
//! # Contract
//!
//! ```text
//! balance_of(holder)                      -> Amount
//! allowance(owner, spender)               -> Amount
//! transfer(from, to, amount)              -> InsufficientBalance | Overflow
//! approve(owner, spender, amount)         -> sets allowance
//! transfer_from(spender, owner, to, amt)  -> InsufficientAllowance | InsufficientBalance | Overflow
//! ```
//!
//! Every mutating call is all-or-nothing: a call that returns `Err` has
//! changed nothing.

pub mod error;
pub mod memory;
pub mod registry;

pub use error::LedgerError;
pub use memory::InMemoryLedger;
pub use registry::LedgerRegistry;

use crate::core_types::{Address, Amount, AssetId};

/// Balance/transfer/allowance capability for one fungible asset.
///
/// Callers identify themselves explicitly (`from`, `owner`, `spender`);
/// authenticating those identities is the caller's job, not the ledger's.
pub trait AssetLedger: Send {
    /// Address of the asset this ledger tracks
    fn asset_id(&self) -> AssetId;

    /// Current balance of `holder`
    fn balance_of(&self, holder: &Address) -> Amount;

    /// Remaining amount `spender` may move out of `owner`'s balance
    fn allowance(&self, owner: &Address, spender: &Address) -> Amount;

    /// Move `amount` from `from` to `to`.
    ///
    /// # Errors
    /// - `InsufficientBalance` if `from` holds less than `amount`
    /// - `Overflow` if crediting `to` would overflow
    fn transfer(&mut self, from: &Address, to: &Address, amount: Amount)
    -> Result<(), LedgerError>;

    /// Set the allowance `owner` grants `spender` (replaces, does not add)
    fn approve(
        &mut self,
        owner: &Address,
        spender: &Address,
        amount: Amount,
    ) -> Result<(), LedgerError>;

    /// Move `amount` from `owner` to `to` on behalf of `spender`.
    ///
    /// # Errors
    /// - `InsufficientAllowance` if `spender`'s allowance from `owner` < amount
    ///   (checked first)
    /// - `InsufficientBalance` if `owner` holds less than `amount`
    /// - `Overflow` if crediting `to` would overflow
    fn transfer_from(
        &mut self,
        spender: &Address,
        owner: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), LedgerError>;

    /// Give back allowance consumed by a `transfer_from` that is being
    /// compensated. Only the settlement rollback path calls this.
    fn restore_allowance(
        &mut self,
        owner: &Address,
        spender: &Address,
        amount: Amount,
    ) -> Result<(), LedgerError>;
}
