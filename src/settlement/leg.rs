//! Settlement legs
//!
//! A leg is one ledger movement between the settling account (the
//! migration core) and a counterparty. Each leg knows how to validate
//! itself against a projection of live balances, how to apply itself, and
//! how to undo itself once applied.

use rustc_hash::FxHashMap;
use serde::Serialize;

use super::error::SettlementError;
use crate::core_types::{Address, Amount, AssetId};
use crate::ledger::{AssetLedger, LedgerError, LedgerRegistry};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Leg {
    /// Pull `amount` from `owner` into the settling account, spending the
    /// allowance `owner` granted it
    Pull {
        asset: AssetId,
        owner: Address,
        amount: Amount,
    },

    /// Push `amount` from the settling account's own balance to `to`
    Push {
        asset: AssetId,
        to: Address,
        amount: Amount,
    },
}

impl Leg {
    #[inline]
    pub fn asset(&self) -> AssetId {
        match self {
            Leg::Pull { asset, .. } | Leg::Push { asset, .. } => *asset,
        }
    }

    #[inline]
    pub fn amount(&self) -> Amount {
        match self {
            Leg::Pull { amount, .. } | Leg::Push { amount, .. } => *amount,
        }
    }

    /// The account on the other side of the settling account
    #[inline]
    pub fn counterparty(&self) -> Address {
        match self {
            Leg::Pull { owner, .. } => *owner,
            Leg::Push { to, .. } => *to,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Leg::Pull { .. } => "pull",
            Leg::Push { .. } => "push",
        }
    }

    pub(super) fn apply(
        &self,
        ledger: &mut dyn AssetLedger,
        account: &Address,
    ) -> Result<(), LedgerError> {
        match self {
            Leg::Pull { owner, amount, .. } => {
                ledger.transfer_from(account, owner, account, *amount)
            }
            Leg::Push { to, amount, .. } => ledger.transfer(account, to, *amount),
        }
    }

    /// Reverse an applied leg.
    ///
    /// Runs with the authority of the settlement boundary: a pushed leg is
    /// taken back from its recipient without an allowance.
    pub(super) fn compensate(
        &self,
        ledger: &mut dyn AssetLedger,
        account: &Address,
    ) -> Result<(), LedgerError> {
        match self {
            Leg::Pull { owner, amount, .. } => {
                ledger.transfer(account, owner, *amount)?;
                ledger.restore_allowance(owner, account, *amount)
            }
            Leg::Push { to, amount, .. } => ledger.transfer(to, account, *amount),
        }
    }
}

/// Projected balances and allowances while legs are validated in sequence.
///
/// Each entry is loaded from the live ledger on first touch and then
/// evolves with the legs validated so far, so legs that touch the same
/// account are validated against each other's effects.
pub(super) struct Projection<'a> {
    ledgers: &'a LedgerRegistry,
    account: Address,
    balances: FxHashMap<(AssetId, Address), Amount>,
    allowances: FxHashMap<(AssetId, Address), Amount>,
}

impl<'a> Projection<'a> {
    pub(super) fn new(ledgers: &'a LedgerRegistry, account: Address) -> Self {
        Self {
            ledgers,
            account,
            balances: FxHashMap::default(),
            allowances: FxHashMap::default(),
        }
    }

    fn ledger(&self, asset: &AssetId) -> Result<&'a dyn AssetLedger, SettlementError> {
        self.ledgers
            .get(asset)
            .ok_or(SettlementError::UnknownAsset(*asset))
    }

    fn balance(&mut self, asset: AssetId, holder: Address) -> Result<&mut Amount, SettlementError> {
        let live = self.ledger(&asset)?.balance_of(&holder);
        Ok(self.balances.entry((asset, holder)).or_insert(live))
    }

    fn allowance(&mut self, asset: AssetId, owner: Address) -> Result<&mut Amount, SettlementError> {
        let live = self.ledger(&asset)?.allowance(&owner, &self.account);
        Ok(self.allowances.entry((asset, owner)).or_insert(live))
    }

    /// Validate `leg` and fold its effect into the projection.
    ///
    /// Check order mirrors the ledger: allowance, then debit, then credit.
    pub(super) fn admit(&mut self, leg: &Leg) -> Result<Result<(), LedgerError>, SettlementError> {
        let asset = leg.asset();
        let amount = leg.amount();
        let account = self.account;

        let (from, to) = match *leg {
            Leg::Pull { owner, .. } => {
                let allowance = self.allowance(asset, owner)?;
                if *allowance < amount {
                    return Ok(Err(LedgerError::InsufficientAllowance));
                }
                *allowance -= amount;
                (owner, account)
            }
            Leg::Push { to, .. } => (account, to),
        };

        let from_balance = self.balance(asset, from)?;
        if *from_balance < amount {
            return Ok(Err(LedgerError::InsufficientBalance));
        }
        if from == to {
            return Ok(Ok(()));
        }
        *from_balance -= amount;

        let to_balance = self.balance(asset, to)?;
        match to_balance.checked_add(amount) {
            Some(credited) => {
                *to_balance = credited;
                Ok(Ok(()))
            }
            None => Ok(Err(LedgerError::Overflow)),
        }
    }
}
