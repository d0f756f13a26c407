//! Provisioning: in-memory ledgers from genesis balances plus a deployed
//! core, as described by [`MigrationConfig`].

use thiserror::Error;
use tracing::info;

use crate::config::{AssetConfig, MigrationConfig};
use crate::core_types::AssetId;
use crate::ledger::{InMemoryLedger, LedgerError, LedgerRegistry};
use crate::migration::{MigrationCore, MigrationError};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DeployError {
    #[error("Genesis mint failed for {symbol}: {source}")]
    Genesis {
        symbol: String,
        source: LedgerError,
    },

    #[error("Source and target share asset id {0}")]
    SameAsset(AssetId),

    #[error(transparent)]
    Migration(#[from] MigrationError),
}

pub struct Deployment {
    pub core: MigrationCore,
    pub ledgers: LedgerRegistry,
}

fn provision_ledger(asset: &AssetConfig) -> Result<InMemoryLedger, DeployError> {
    let mut ledger = InMemoryLedger::new(asset.id, asset.symbol.clone());
    for entry in &asset.genesis {
        ledger
            .mint(&entry.holder, entry.amount)
            .map_err(|source| DeployError::Genesis {
                symbol: asset.symbol.clone(),
                source,
            })?;
    }
    info!(
        asset = %asset.id,
        symbol = ledger.symbol(),
        holders = ledger.holder_count(),
        supply = ledger.total_supply(),
        "Ledger provisioned"
    );
    Ok(ledger)
}

/// Build both ledgers and deploy the core against them.
///
/// The deployer stays owner; handing over to `operator` is left to the
/// caller so the transfer goes through the normal ownership path.
///
/// Source and target must be distinct: the registry holds one ledger per
/// asset id.
pub fn deploy(config: &MigrationConfig) -> Result<Deployment, DeployError> {
    if config.source.id == config.target.id {
        return Err(DeployError::SameAsset(config.source.id));
    }

    let core = MigrationCore::new(
        config.deployer,
        config.core_account,
        config.source.id,
        config.target.id,
    )?;

    let ledgers = LedgerRegistry::new()
        .with_ledger(provision_ledger(&config.source)?)
        .with_ledger(provision_ledger(&config.target)?);

    Ok(Deployment { core, ledgers })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GenesisBalance;
    use crate::core_types::Address;

    fn asset(id: u64, symbol: &str, genesis: Vec<GenesisBalance>) -> AssetConfig {
        AssetConfig {
            id: Address::from_low_u64(id),
            symbol: symbol.to_string(),
            genesis,
        }
    }

    fn config(source_genesis: Vec<GenesisBalance>) -> MigrationConfig {
        MigrationConfig {
            deployer: Address::from_low_u64(0xAD),
            core_account: Address::from_low_u64(0xC0DE),
            source: asset(0x501, "OLD", source_genesis),
            target: asset(
                0x702,
                "NEW",
                vec![GenesisBalance {
                    holder: Address::from_low_u64(0xAD),
                    amount: 1_000,
                }],
            ),
            operator: None,
        }
    }

    #[test]
    fn test_deploy_provisions_genesis() {
        let holder = Address::from_low_u64(1);
        let d = deploy(&config(vec![GenesisBalance {
            holder,
            amount: 500,
        }]))
        .unwrap();

        assert_eq!(d.core.owner(), Address::from_low_u64(0xAD));
        assert_eq!(d.ledgers.len(), 2);
        assert_eq!(
            d.ledgers.balance_of(&Address::from_low_u64(0x501), &holder),
            Some(500)
        );
        assert_eq!(d.core.reserve(&d.ledgers).unwrap(), 0);
    }

    #[test]
    fn test_deploy_genesis_overflow() {
        let holder = Address::from_low_u64(1);
        let genesis = vec![
            GenesisBalance {
                holder,
                amount: u64::MAX,
            },
            GenesisBalance { holder, amount: 1 },
        ];
        assert!(matches!(
            deploy(&config(genesis)),
            Err(DeployError::Genesis {
                source: LedgerError::Overflow,
                ..
            })
        ));
    }

    #[test]
    fn test_deploy_rejects_shared_asset_id() {
        let holder = Address::from_low_u64(1);
        let mut cfg = config(vec![GenesisBalance {
            holder,
            amount: 500,
        }]);
        cfg.target.id = cfg.source.id;

        assert_eq!(
            deploy(&cfg).err(),
            Some(DeployError::SameAsset(Address::from_low_u64(0x501)))
        );
    }

    #[test]
    fn test_deploy_rejects_null_core() {
        let mut cfg = config(vec![]);
        cfg.core_account = Address::ZERO;
        assert_eq!(
            deploy(&cfg).err(),
            Some(DeployError::Migration(MigrationError::InvalidCoreAccount))
        );
    }
}
