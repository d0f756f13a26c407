//! Migration Core
//!
//! Exchanges a legacy (source) asset for a replacement (target) asset at a
//! fixed 1:1 rate out of a reserve of target units held in the core's own
//! ledger account.
//!
//! # Read-through accounting
//! The core stores no balances. The reserve is whatever the target ledger
//! reports for the core account at the moment of the call, so funding via
//! [`MigrationCore::deposit`] and a plain ledger transfer to the core
//! account are equivalent.
//!
//! # Access
//! `withdraw` and `transfer_ownership` are gated on a single owner identity;
//! everything else is open to any caller.

use tracing::{info, warn};

use super::error::MigrationError;
use super::events::MigrationEvent;
use crate::core_types::{Address, Amount, AssetId};
use crate::ledger::{AssetLedger, LedgerError, LedgerRegistry};
use crate::settlement::{Leg, Settlement, SettlementError};

/// Index of the target push leg inside a conversion settlement
const CONVERT_CREDIT_LEG: usize = 1;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationCore {
    owner: Address,
    account: Address,
    source_asset: AssetId,
    target_asset: AssetId,
}

impl MigrationCore {
    /// Deploy a core.
    ///
    /// `deployer` becomes the owner; `account` is the ledger account the core
    /// holds custody in (the same address on every ledger).
    ///
    /// # Errors
    /// - `InvalidAssetReference` if either asset is the zero address
    /// - `InvalidCoreAccount` if `account` is the zero address
    /// - `InvalidOwner` if `deployer` is the zero address
    pub fn new(
        deployer: Address,
        account: Address,
        source_asset: AssetId,
        target_asset: AssetId,
    ) -> Result<Self, MigrationError> {
        if source_asset.is_zero() || target_asset.is_zero() {
            return Err(MigrationError::InvalidAssetReference);
        }
        if account.is_zero() {
            return Err(MigrationError::InvalidCoreAccount);
        }
        if deployer.is_zero() {
            return Err(MigrationError::InvalidOwner);
        }

        info!(
            owner = %deployer,
            account = %account,
            source = %source_asset,
            target = %target_asset,
            "Migration core deployed"
        );

        Ok(Self {
            owner: deployer,
            account,
            source_asset,
            target_asset,
        })
    }

    /// Event recorded at deployment (ownership assigned from the zero address)
    pub fn deployment_event(&self) -> MigrationEvent {
        MigrationEvent::OwnershipTransferred {
            previous: Address::ZERO,
            new: self.owner,
        }
    }

    #[inline]
    pub fn owner(&self) -> Address {
        self.owner
    }

    #[inline]
    pub fn account(&self) -> Address {
        self.account
    }

    #[inline]
    pub fn source_asset(&self) -> AssetId {
        self.source_asset
    }

    #[inline]
    pub fn target_asset(&self) -> AssetId {
        self.target_asset
    }

    #[inline]
    pub fn is_owner(&self, who: &Address) -> bool {
        self.owner == *who
    }

    fn only_owner(&self, caller: &Address) -> Result<(), MigrationError> {
        if self.is_owner(caller) {
            Ok(())
        } else {
            Err(MigrationError::NotOwner)
        }
    }

    fn ledger<'a>(
        ledgers: &'a LedgerRegistry,
        asset: &AssetId,
    ) -> Result<&'a dyn AssetLedger, MigrationError> {
        ledgers
            .get(asset)
            .ok_or(MigrationError::UnknownAsset(*asset))
    }

    fn ledger_mut<'a>(
        ledgers: &'a mut LedgerRegistry,
        asset: &AssetId,
    ) -> Result<&'a mut (dyn AssetLedger + 'static), MigrationError> {
        ledgers
            .get_mut(asset)
            .ok_or(MigrationError::UnknownAsset(*asset))
    }

    /// Target units currently held by the core, read live from the ledger
    pub fn reserve(&self, ledgers: &LedgerRegistry) -> Result<Amount, MigrationError> {
        self.balance_of(ledgers, &self.target_asset)
    }

    /// Core account balance of any registered asset
    pub fn balance_of(
        &self,
        ledgers: &LedgerRegistry,
        asset: &AssetId,
    ) -> Result<Amount, MigrationError> {
        Ok(Self::ledger(ledgers, asset)?.balance_of(&self.account))
    }

    /// Fund the reserve with `amount` target units pulled from `caller`.
    ///
    /// `caller` must have approved the core account for at least `amount`
    /// on the target ledger.
    pub fn deposit(
        &self,
        ledgers: &mut LedgerRegistry,
        caller: &Address,
        amount: Amount,
    ) -> Result<MigrationEvent, MigrationError> {
        self.try_deposit(ledgers, caller, amount)
            .inspect_err(|e| warn!(%caller, amount, error = %e, "Deposit rejected"))
    }

    fn try_deposit(
        &self,
        ledgers: &mut LedgerRegistry,
        caller: &Address,
        amount: Amount,
    ) -> Result<MigrationEvent, MigrationError> {
        if amount == 0 {
            return Err(MigrationError::InvalidAmount);
        }

        let target = Self::ledger_mut(ledgers, &self.target_asset)?;
        target.transfer_from(&self.account, caller, &self.account, amount)?;
        let reserve_after = target.balance_of(&self.account);

        info!(%caller, amount, reserve = reserve_after, "Deposit committed");
        Ok(MigrationEvent::Deposited {
            from: *caller,
            amount,
            reserve_after,
        })
    }

    /// Sweep the core's whole balance of `asset` to the owner.
    ///
    /// Works for any registered asset, not just the target, so tokens sent
    /// to the core by mistake can be recovered.
    pub fn withdraw(
        &self,
        ledgers: &mut LedgerRegistry,
        caller: &Address,
        asset: &AssetId,
    ) -> Result<MigrationEvent, MigrationError> {
        self.try_withdraw(ledgers, caller, asset)
            .inspect_err(|e| warn!(%caller, %asset, error = %e, "Withdraw rejected"))
    }

    fn try_withdraw(
        &self,
        ledgers: &mut LedgerRegistry,
        caller: &Address,
        asset: &AssetId,
    ) -> Result<MigrationEvent, MigrationError> {
        self.only_owner(caller)?;
        if asset.is_zero() {
            return Err(MigrationError::InvalidAssetReference);
        }

        let ledger = Self::ledger_mut(ledgers, asset)?;
        let balance = ledger.balance_of(&self.account);
        if balance == 0 {
            return Err(MigrationError::EmptyBalance);
        }
        ledger.transfer(&self.account, &self.owner, balance)?;

        info!(%asset, to = %self.owner, amount = balance, "Withdraw committed");
        Ok(MigrationEvent::Withdrawn {
            asset: *asset,
            to: self.owner,
            amount: balance,
        })
    }

    /// Exchange `amount` source units from `caller` for `amount` target
    /// units from the reserve.
    ///
    /// Checks, in order: amount, caller's source allowance, caller's source
    /// balance, reserve. Both legs settle or neither does.
    pub fn convert(
        &self,
        ledgers: &mut LedgerRegistry,
        caller: &Address,
        amount: Amount,
    ) -> Result<MigrationEvent, MigrationError> {
        self.try_convert(ledgers, caller, amount)
            .inspect_err(|e| warn!(%caller, amount, error = %e, "Convert rejected"))
    }

    fn try_convert(
        &self,
        ledgers: &mut LedgerRegistry,
        caller: &Address,
        amount: Amount,
    ) -> Result<MigrationEvent, MigrationError> {
        if amount == 0 {
            return Err(MigrationError::InvalidAmount);
        }

        let legs = vec![
            Leg::Pull {
                asset: self.source_asset,
                owner: *caller,
                amount,
            },
            Leg::Push {
                asset: self.target_asset,
                to: *caller,
                amount,
            },
        ];

        let receipt = match Settlement::new(self.account, legs).execute(ledgers) {
            Ok(receipt) => receipt,
            Err(e) => return Err(self.conversion_error(ledgers, amount, e)),
        };
        let reserve_after = self.reserve(ledgers)?;

        info!(
            %caller,
            amount,
            reserve = reserve_after,
            settlement = %receipt.id,
            "Convert committed"
        );
        Ok(MigrationEvent::Converted {
            account: *caller,
            amount,
            reserve_after,
            settlement: receipt.id,
        })
    }

    /// Map a failed conversion settlement onto the core's error taxonomy.
    ///
    /// A shortfall on the credit leg is the reserve running dry; everything
    /// else is the ledger's own error.
    fn conversion_error(
        &self,
        ledgers: &LedgerRegistry,
        requested: Amount,
        err: SettlementError,
    ) -> MigrationError {
        match err {
            SettlementError::Rejected {
                leg: CONVERT_CREDIT_LEG,
                source: LedgerError::InsufficientBalance,
            } => MigrationError::InsufficientReserve {
                reserve: self.reserve(ledgers).unwrap_or(0),
                requested,
            },
            SettlementError::Rejected { source, .. } | SettlementError::RolledBack { source, .. } => {
                MigrationError::Ledger(source)
            }
            SettlementError::CompensationFailed { source, .. } => {
                MigrationError::CompensationFailed(source)
            }
            SettlementError::UnknownAsset(asset) => MigrationError::UnknownAsset(asset),
        }
    }

    /// Hand ownership to `new_owner`.
    ///
    /// The zero address and the core's own account are refused: a core that
    /// owns itself could only ever sweep balances back into itself.
    pub fn transfer_ownership(
        &mut self,
        caller: &Address,
        new_owner: &Address,
    ) -> Result<MigrationEvent, MigrationError> {
        self.only_owner(caller)
            .and_then(|()| {
                if new_owner.is_zero() || *new_owner == self.account {
                    Err(MigrationError::InvalidOwner)
                } else {
                    Ok(())
                }
            })
            .inspect_err(|e| warn!(%caller, %new_owner, error = %e, "Ownership transfer rejected"))?;

        let previous = std::mem::replace(&mut self.owner, *new_owner);
        info!(%previous, new = %new_owner, "Ownership transferred");
        Ok(MigrationEvent::OwnershipTransferred {
            previous,
            new: *new_owner,
        })
    }
}
