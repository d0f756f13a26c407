//! Settlement - all-or-nothing execution of several ledger movements
//!
//! Independent asset ledgers offer no transaction spanning more than one
//! call. A settlement provides that boundary explicitly with a two-phase
//! protocol driven by a small FSM.
//!
//! # State Machine
//!
//! ```text
//! INIT → PREPARED → COMMITTING → COMMITTED
//!   ↓                   ↓
//! FAILED          COMPENSATING → ROLLED_BACK
//! ```
//!
//! # Safety Invariants
//!
//! 1. **Prepare-Before-Move**: every leg is validated against live balances
//!    (projected through the earlier legs) before the first one is applied
//! 2. **Ordered Commit**: legs are applied in the order given
//! 3. **Reverse Compensation**: a commit-time failure undoes the applied
//!    legs in reverse order, restoring balances and consumed allowances
//! 4. **Exclusive Access**: `execute` holds `&mut LedgerRegistry`, so no
//!    other movement interleaves with an in-flight settlement

pub mod error;
pub mod leg;
pub mod state;

pub use error::SettlementError;
pub use leg::Leg;
pub use state::SettlementState;

use std::fmt;
use std::str::FromStr;

use serde::{Serialize, Serializer};
use tracing::{debug, error, info, warn};

use crate::core_types::Address;
use crate::ledger::LedgerRegistry;
use leg::Projection;

/// Unique settlement identifier (ULID)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SettlementId(ulid::Ulid);

impl SettlementId {
    pub fn new() -> Self {
        Self(ulid::Ulid::new())
    }
}

impl Default for SettlementId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SettlementId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SettlementId {
    type Err = ulid::DecodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self(ulid::Ulid::from_string(s)?))
    }
}

impl Serialize for SettlementId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// Outcome of a committed settlement
#[derive(Debug, Clone, Serialize)]
pub struct SettlementReceipt {
    pub id: SettlementId,
    pub state: SettlementState,
    pub legs: Vec<Leg>,
}

/// A set of legs executed atomically on behalf of `account`
pub struct Settlement {
    id: SettlementId,
    account: Address,
    legs: Vec<Leg>,
    state: SettlementState,
}

impl Settlement {
    pub fn new(account: Address, legs: Vec<Leg>) -> Self {
        Self {
            id: SettlementId::new(),
            account,
            legs,
            state: SettlementState::Init,
        }
    }

    #[inline]
    pub fn id(&self) -> SettlementId {
        self.id
    }

    #[inline]
    pub fn state(&self) -> SettlementState {
        self.state
    }

    /// Run the settlement to a terminal state.
    ///
    /// On `Err`, every ledger is as it was before the call, except for
    /// `CompensationFailed`, which leaves the settlement in COMPENSATING
    /// and is logged at error level.
    pub fn execute(
        mut self,
        ledgers: &mut LedgerRegistry,
    ) -> Result<SettlementReceipt, SettlementError> {
        self.prepare(ledgers)?;
        self.commit(ledgers)?;

        Ok(SettlementReceipt {
            id: self.id,
            state: self.state,
            legs: self.legs,
        })
    }

    fn transition(&mut self, to: SettlementState) {
        debug!(settlement = %self.id, from = %self.state, to = %to, "Settlement state");
        self.state = to;
    }

    fn prepare(&mut self, ledgers: &LedgerRegistry) -> Result<(), SettlementError> {
        let mut projection = Projection::new(ledgers, self.account);
        let mut rejection = None;

        for (idx, leg) in self.legs.iter().enumerate() {
            match projection.admit(leg) {
                Ok(Ok(())) => {}
                Ok(Err(source)) => {
                    debug!(
                        settlement = %self.id,
                        leg = idx,
                        kind = leg.as_str(),
                        asset = %leg.asset(),
                        amount = leg.amount(),
                        error = %source,
                        "Leg rejected in prepare"
                    );
                    rejection = Some(SettlementError::Rejected { leg: idx, source });
                    break;
                }
                Err(e) => {
                    rejection = Some(e);
                    break;
                }
            }
        }

        if let Some(err) = rejection {
            self.transition(SettlementState::Failed);
            return Err(err);
        }

        self.transition(SettlementState::Prepared);
        Ok(())
    }

    fn commit(&mut self, ledgers: &mut LedgerRegistry) -> Result<(), SettlementError> {
        self.transition(SettlementState::Committing);

        for idx in 0..self.legs.len() {
            let leg = self.legs[idx];
            let result = match ledgers.get_mut(&leg.asset()) {
                Some(ledger) => leg.apply(ledger, &self.account),
                None => {
                    let cause = SettlementError::UnknownAsset(leg.asset());
                    return self.abort(ledgers, idx, cause);
                }
            };

            match result {
                Ok(()) => debug!(
                    settlement = %self.id,
                    leg = idx,
                    kind = leg.as_str(),
                    asset = %leg.asset(),
                    counterparty = %leg.counterparty(),
                    amount = leg.amount(),
                    "Leg applied"
                ),
                Err(source) => {
                    warn!(
                        settlement = %self.id,
                        leg = idx,
                        error = %source,
                        "Leg failed after prepare, compensating"
                    );
                    let cause = SettlementError::RolledBack { leg: idx, source };
                    return self.abort(ledgers, idx, cause);
                }
            }
        }

        self.transition(SettlementState::Committed);
        Ok(())
    }

    /// Undo legs `0..failed` in reverse and surface `cause`.
    fn abort(
        &mut self,
        ledgers: &mut LedgerRegistry,
        failed: usize,
        cause: SettlementError,
    ) -> Result<(), SettlementError> {
        self.transition(SettlementState::Compensating);

        for idx in (0..failed).rev() {
            let leg = self.legs[idx];
            let result = match ledgers.get_mut(&leg.asset()) {
                Some(ledger) => leg.compensate(ledger, &self.account),
                None => {
                    error!(
                        settlement = %self.id,
                        leg = idx,
                        "Ledger vanished during compensation"
                    );
                    return Err(SettlementError::UnknownAsset(leg.asset()));
                }
            };
            if let Err(source) = result {
                error!(
                    settlement = %self.id,
                    leg = idx,
                    error = %source,
                    "CRITICAL: compensation failed, funds in-flight"
                );
                return Err(SettlementError::CompensationFailed { leg: idx, source });
            }
        }

        self.transition(SettlementState::RolledBack);
        info!(settlement = %self.id, "Settlement rolled back");
        Err(cause)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_types::{Amount, AssetId};
    use crate::ledger::{AssetLedger, InMemoryLedger, LedgerError};

    const SRC: AssetId = Address::from_low_u64(0x5);
    const DST: AssetId = Address::from_low_u64(0x7);
    const CORE: Address = Address::from_low_u64(0xC0DE);
    const USER: Address = Address::from_low_u64(1);

    /// Ledger whose `transfer` can be switched to fail after prepare passed
    struct FlakyLedger {
        inner: InMemoryLedger,
        fail_transfer: bool,
    }

    impl AssetLedger for FlakyLedger {
        fn asset_id(&self) -> AssetId {
            self.inner.asset_id()
        }
        fn balance_of(&self, holder: &Address) -> Amount {
            self.inner.balance_of(holder)
        }
        fn allowance(&self, owner: &Address, spender: &Address) -> Amount {
            self.inner.allowance(owner, spender)
        }
        fn transfer(&mut self, from: &Address, to: &Address, amount: Amount) -> Result<(), LedgerError> {
            if self.fail_transfer {
                return Err(LedgerError::InsufficientBalance);
            }
            self.inner.transfer(from, to, amount)
        }
        fn approve(&mut self, owner: &Address, spender: &Address, amount: Amount) -> Result<(), LedgerError> {
            self.inner.approve(owner, spender, amount)
        }
        fn transfer_from(
            &mut self,
            spender: &Address,
            owner: &Address,
            to: &Address,
            amount: Amount,
        ) -> Result<(), LedgerError> {
            self.inner.transfer_from(spender, owner, to, amount)
        }
        fn restore_allowance(
            &mut self,
            owner: &Address,
            spender: &Address,
            amount: Amount,
        ) -> Result<(), LedgerError> {
            self.inner.restore_allowance(owner, spender, amount)
        }
    }

    fn source_ledger() -> InMemoryLedger {
        let mut src = InMemoryLedger::new(SRC, "OLD");
        src.mint(&USER, 1_000).unwrap();
        src.approve(&USER, &CORE, 500).unwrap();
        src
    }

    fn target_ledger(reserve: Amount) -> InMemoryLedger {
        let mut dst = InMemoryLedger::new(DST, "NEW");
        dst.mint(&CORE, reserve).unwrap();
        dst
    }

    fn swap_legs(amount: Amount) -> Vec<Leg> {
        vec![
            Leg::Pull {
                asset: SRC,
                owner: USER,
                amount,
            },
            Leg::Push {
                asset: DST,
                to: USER,
                amount,
            },
        ]
    }

    #[test]
    fn test_commit_applies_all_legs() {
        let mut ledgers = LedgerRegistry::new()
            .with_ledger(source_ledger())
            .with_ledger(target_ledger(800));

        let receipt = Settlement::new(CORE, swap_legs(300))
            .execute(&mut ledgers)
            .unwrap();

        assert_eq!(receipt.state, SettlementState::Committed);
        assert_eq!(receipt.legs.len(), 2);
        assert_eq!(ledgers.balance_of(&SRC, &USER), Some(700));
        assert_eq!(ledgers.balance_of(&SRC, &CORE), Some(300));
        assert_eq!(ledgers.balance_of(&DST, &USER), Some(300));
        assert_eq!(ledgers.balance_of(&DST, &CORE), Some(500));
    }

    #[test]
    fn test_prepare_rejects_before_moving_anything() {
        let mut ledgers = LedgerRegistry::new()
            .with_ledger(source_ledger())
            .with_ledger(target_ledger(100));

        let err = Settlement::new(CORE, swap_legs(300))
            .execute(&mut ledgers)
            .unwrap_err();

        assert_eq!(
            err,
            SettlementError::Rejected {
                leg: 1,
                source: LedgerError::InsufficientBalance
            }
        );
        assert_eq!(ledgers.balance_of(&SRC, &USER), Some(1_000));
        assert_eq!(ledgers.balance_of(&SRC, &CORE), Some(0));
        assert_eq!(ledgers.get(&SRC).unwrap().allowance(&USER, &CORE), 500);
        assert_eq!(ledgers.balance_of(&DST, &CORE), Some(100));
    }

    #[test]
    fn test_commit_failure_rolls_back_applied_legs() {
        let mut ledgers = LedgerRegistry::new()
            .with_ledger(source_ledger())
            .with_ledger(FlakyLedger {
                inner: target_ledger(800),
                fail_transfer: true,
            });

        let err = Settlement::new(CORE, swap_legs(300))
            .execute(&mut ledgers)
            .unwrap_err();

        assert_eq!(
            err,
            SettlementError::RolledBack {
                leg: 1,
                source: LedgerError::InsufficientBalance
            }
        );
        // Pull leg reversed: balance and allowance as before
        assert_eq!(ledgers.balance_of(&SRC, &USER), Some(1_000));
        assert_eq!(ledgers.balance_of(&SRC, &CORE), Some(0));
        assert_eq!(ledgers.get(&SRC).unwrap().allowance(&USER, &CORE), 500);
        assert_eq!(ledgers.balance_of(&DST, &USER), Some(0));
        assert_eq!(ledgers.balance_of(&DST, &CORE), Some(800));
    }

    #[test]
    fn test_unknown_asset_fails_in_prepare() {
        let mut ledgers = LedgerRegistry::new().with_ledger(source_ledger());

        let err = Settlement::new(CORE, swap_legs(10))
            .execute(&mut ledgers)
            .unwrap_err();

        assert_eq!(err, SettlementError::UnknownAsset(DST));
        assert_eq!(ledgers.balance_of(&SRC, &USER), Some(1_000));
    }

    #[test]
    fn test_settlement_ids_are_unique() {
        let a = Settlement::new(CORE, vec![]);
        let b = Settlement::new(CORE, vec![]);
        assert_ne!(a.id(), b.id());
        assert_eq!(a.state(), SettlementState::Init);

        let parsed: SettlementId = a.id().to_string().parse().unwrap();
        assert_eq!(parsed, a.id());
    }
}
