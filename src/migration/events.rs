use serde::Serialize;

use crate::core_types::{Address, Amount, AssetId};
use crate::settlement::SettlementId;

/// Event emitted by every committed core operation
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum MigrationEvent {
    OwnershipTransferred {
        previous: Address,
        new: Address,
    },

    Deposited {
        from: Address,
        amount: Amount,
        reserve_after: Amount,
    },

    Converted {
        account: Address,
        amount: Amount,
        reserve_after: Amount,
        settlement: SettlementId,
    },

    Withdrawn {
        asset: AssetId,
        to: Address,
        amount: Amount,
    },
}

impl MigrationEvent {
    pub fn name(&self) -> &'static str {
        match self {
            MigrationEvent::OwnershipTransferred { .. } => "ownership_transferred",
            MigrationEvent::Deposited { .. } => "deposited",
            MigrationEvent::Converted { .. } => "converted",
            MigrationEvent::Withdrawn { .. } => "withdrawn",
        }
    }
}
