//! In-memory Asset Ledger
//!
//! Reference [`AssetLedger`] used by the provisioning binary and by tests.
//! Balances and allowances live in `FxHashMap`s; every mutation validates
//! first and writes second, so a failed call leaves the maps untouched.

use rustc_hash::FxHashMap;
use tracing::debug;

use super::{AssetLedger, LedgerError};
use crate::core_types::{Address, Amount, AssetId};

/// Single-asset balance store with ERC-20 style allowances.
///
/// # Invariants:
/// - sum of balances == total_supply
/// - no balance or allowance ever underflows (checked arithmetic)
#[derive(Debug, Clone)]
pub struct InMemoryLedger {
    asset_id: AssetId,
    symbol: String,
    total_supply: Amount,
    balances: FxHashMap<Address, Amount>,
    allowances: FxHashMap<(Address, Address), Amount>,
}

impl InMemoryLedger {
    pub fn new(asset_id: AssetId, symbol: impl Into<String>) -> Self {
        Self {
            asset_id,
            symbol: symbol.into(),
            total_supply: 0,
            balances: FxHashMap::default(),
            allowances: FxHashMap::default(),
        }
    }

    #[inline(always)]
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    #[inline(always)]
    pub fn total_supply(&self) -> Amount {
        self.total_supply
    }

    /// Number of accounts with a non-zero balance
    pub fn holder_count(&self) -> usize {
        self.balances.values().filter(|b| **b > 0).count()
    }

    /// Create `amount` new units for `to`.
    ///
    /// Provisioning only (genesis balances, fixtures). The migration core
    /// never mints.
    pub fn mint(&mut self, to: &Address, amount: Amount) -> Result<(), LedgerError> {
        let new_supply = self
            .total_supply
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;
        let new_balance = self
            .balance_of(to)
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;

        self.total_supply = new_supply;
        self.balances.insert(*to, new_balance);
        Ok(())
    }

    /// Move funds once both sides have been validated.
    fn settle(&mut self, from: &Address, to: &Address, amount: Amount) -> Result<(), LedgerError> {
        let from_balance = self.balance_of(from);
        if from_balance < amount {
            return Err(LedgerError::InsufficientBalance);
        }
        if from == to {
            return Ok(());
        }
        let to_balance = self
            .balance_of(to)
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;

        self.balances.insert(*from, from_balance - amount);
        self.balances.insert(*to, to_balance);
        Ok(())
    }
}

impl AssetLedger for InMemoryLedger {
    fn asset_id(&self) -> AssetId {
        self.asset_id
    }

    fn balance_of(&self, holder: &Address) -> Amount {
        self.balances.get(holder).copied().unwrap_or(0)
    }

    fn allowance(&self, owner: &Address, spender: &Address) -> Amount {
        self.allowances
            .get(&(*owner, *spender))
            .copied()
            .unwrap_or(0)
    }

    fn transfer(
        &mut self,
        from: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        self.settle(from, to, amount)?;
        debug!(asset = %self.symbol, %from, %to, amount, "ledger transfer");
        Ok(())
    }

    fn approve(
        &mut self,
        owner: &Address,
        spender: &Address,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        self.allowances.insert((*owner, *spender), amount);
        debug!(asset = %self.symbol, %owner, %spender, amount, "ledger approve");
        Ok(())
    }

    fn transfer_from(
        &mut self,
        spender: &Address,
        owner: &Address,
        to: &Address,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        let allowance = self.allowance(owner, spender);
        if allowance < amount {
            return Err(LedgerError::InsufficientAllowance);
        }

        self.settle(owner, to, amount)?;
        self.allowances
            .insert((*owner, *spender), allowance - amount);

        debug!(
            asset = %self.symbol,
            %spender,
            %owner,
            %to,
            amount,
            "ledger transfer_from"
        );
        Ok(())
    }

    fn restore_allowance(
        &mut self,
        owner: &Address,
        spender: &Address,
        amount: Amount,
    ) -> Result<(), LedgerError> {
        let restored = self
            .allowance(owner, spender)
            .checked_add(amount)
            .ok_or(LedgerError::Overflow)?;
        self.allowances.insert((*owner, *spender), restored);
        Ok(())
    }
}
