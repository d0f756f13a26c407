//! Token Migration - provisioning and scenario runner
//!
//! ```text
//! ┌──────────┐    ┌──────────┐    ┌───────────┐    ┌──────────┐
//! │  Config  │───▶│  Deploy  │───▶│  Service  │───▶│ Summary  │
//! │  (YAML)  │    │(ledgers) │    │ (replay)  │    │  (JSON)  │
//! └──────────┘    └──────────┘    └───────────┘    └──────────┘
//! ```
//!
//! Usage: `token_migration [--env dev] [--scenario scenarios/migrate.yaml]`

use anyhow::Context;
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use token_migration::config::AppConfig;
use token_migration::core_types::{Address, Amount, AssetId};
use token_migration::deploy::deploy;
use token_migration::migration::MigrationEvent;
use token_migration::scenario::{Scenario, ScenarioAssets, StepOutcome};
use token_migration::service::{MigrationHandle, MigrationService};

fn get_arg(names: &[&str]) -> Option<String> {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if names.contains(&args[i].as_str()) && i + 1 < args.len() {
            return Some(args[i + 1].clone());
        }
    }
    None
}

fn get_env() -> String {
    get_arg(&["--env", "-e"]).unwrap_or_else(|| "dev".to_string())
}

fn get_scenario() -> Option<String> {
    get_arg(&["--scenario", "-s"])
}

#[derive(Serialize)]
struct HolderBalance {
    holder: Address,
    balance: Amount,
}

#[derive(Serialize)]
struct AssetSummary {
    id: AssetId,
    symbol: String,
    core_balance: Amount,
    holders: Vec<HolderBalance>,
}

#[derive(Serialize)]
struct Summary {
    version: &'static str,
    env: String,
    finished_at: DateTime<Utc>,
    core_account: Address,
    owner: Address,
    reserve: Amount,
    assets: Vec<AssetSummary>,
    steps: Vec<StepOutcome>,
    events: Vec<MigrationEvent>,
}

async fn asset_summary(
    handle: &MigrationHandle,
    id: AssetId,
    symbol: &str,
    core_account: Address,
    holders: &[Address],
) -> anyhow::Result<AssetSummary> {
    let mut balances = Vec::with_capacity(holders.len());
    for holder in holders {
        balances.push(HolderBalance {
            holder: *holder,
            balance: handle.balance_of(id, *holder).await?,
        });
    }
    Ok(AssetSummary {
        id,
        symbol: symbol.to_string(),
        core_balance: handle.balance_of(id, core_account).await?,
        holders: balances,
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = get_env();
    let app_config =
        AppConfig::load(&env).with_context(|| format!("loading config for env '{}'", env))?;
    let _log_guard = token_migration::logging::init_logging(&app_config);

    info!(
        version = env!("GIT_HASH"),
        env = %env,
        "Starting token migration"
    );

    let migration = &app_config.migration;
    let deployment = deploy(migration).context("deploying migration core")?;
    let core_account = deployment.core.account();
    let (handle, service_task) = MigrationService::spawn(
        deployment.core,
        deployment.ledgers,
        app_config.service.queue_size,
    );

    if let Some(operator) = migration.operator {
        handle
            .transfer_ownership(migration.deployer, operator)
            .await
            .context("handing ownership to operator")?;
    }

    let mut holders: Vec<Address> = migration
        .source
        .genesis
        .iter()
        .chain(&migration.target.genesis)
        .map(|g| g.holder)
        .collect();

    let steps = match get_scenario() {
        Some(path) => {
            let scenario = Scenario::from_file(&path)?;
            holders.extend(scenario.callers());
            let assets = ScenarioAssets {
                source: migration.source.id,
                target: migration.target.id,
                core_account,
            };
            scenario.run(&handle, &assets).await?
        }
        None => Vec::new(),
    };

    holders.sort();
    holders.dedup();
    holders.retain(|h| *h != core_account);

    let mut assets = Vec::with_capacity(2);
    for asset in [&migration.source, &migration.target] {
        assets.push(asset_summary(&handle, asset.id, &asset.symbol, core_account, &holders).await?);
    }

    let summary = Summary {
        version: env!("GIT_HASH"),
        env,
        finished_at: Utc::now(),
        core_account,
        owner: handle.owner().await?,
        reserve: handle.reserve().await?,
        assets,
        steps,
        events: handle.events().await?,
    };

    drop(handle);
    service_task.await.context("migration service task panicked")?;

    println!("{}", serde_json::to_string_pretty(&summary)?);
    info!("Token migration finished");
    Ok(())
}
