//! Scenario replay
//!
//! A scenario is a YAML list of steps, each naming a caller and one
//! operation, replayed in order against a running [`MigrationHandle`]:
//!
//! ```yaml
//! name: basic migration
//! steps:
//!   - caller: "0x...01"
//!     op: approve
//!     asset: source
//!     amount: 500
//!   - caller: "0x...01"
//!     op: convert
//!     amount: 500
//!   - caller: "0x...01"
//!     op: convert
//!     amount: 1
//!     expect_error: INSUFFICIENT_RESERVE
//! ```
//!
//! Assets are referred to as `source`, `target`, or an explicit address.
//! `approve` always grants the allowance to the core account.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::core_types::{Address, Amount, AssetId};
use crate::migration::MigrationEvent;
use crate::service::{MigrationHandle, ServiceError};

#[derive(Error, Debug)]
pub enum ScenarioError {
    #[error("Failed to read scenario {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to parse scenario yaml: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Step {step} ({op}) failed: {source}")]
    StepFailed {
        step: usize,
        op: &'static str,
        source: ServiceError,
    },

    #[error("Step {step} ({op}) expected {expected}, got {actual}")]
    UnexpectedOutcome {
        step: usize,
        op: &'static str,
        expected: String,
        actual: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetRole {
    Source,
    Target,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum AssetRef {
    Role(AssetRole),
    Id(Address),
}

impl AssetRef {
    pub fn resolve(&self, assets: &ScenarioAssets) -> AssetId {
        match self {
            AssetRef::Role(AssetRole::Source) => assets.source,
            AssetRef::Role(AssetRole::Target) => assets.target,
            AssetRef::Id(id) => *id,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Op {
    Approve { asset: AssetRef, amount: Amount },
    Transfer { asset: AssetRef, to: Address, amount: Amount },
    Deposit { amount: Amount },
    Convert { amount: Amount },
    Withdraw { asset: AssetRef },
    TransferOwnership { new_owner: Address },
}

impl Op {
    pub fn name(&self) -> &'static str {
        match self {
            Op::Approve { .. } => "approve",
            Op::Transfer { .. } => "transfer",
            Op::Deposit { .. } => "deposit",
            Op::Convert { .. } => "convert",
            Op::Withdraw { .. } => "withdraw",
            Op::TransferOwnership { .. } => "transfer_ownership",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Step {
    pub caller: Address,
    #[serde(flatten)]
    pub op: Op,
    /// Error code the step must fail with
    #[serde(default)]
    pub expect_error: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    #[serde(default)]
    pub name: Option<String>,
    pub steps: Vec<Step>,
}

/// Asset identities and core account the scenario runs against
#[derive(Debug, Clone, Copy)]
pub struct ScenarioAssets {
    pub source: AssetId,
    pub target: AssetId,
    pub core_account: Address,
}

#[derive(Debug, Clone, Serialize)]
pub struct StepOutcome {
    pub step: usize,
    pub caller: Address,
    pub op: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<MigrationEvent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'static str>,
}

impl Scenario {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ScenarioError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ScenarioError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ScenarioError> {
        Ok(serde_yaml::from_str(content)?)
    }

    /// Every caller named in the scenario, first appearance order
    pub fn callers(&self) -> Vec<Address> {
        let mut seen = Vec::new();
        for step in &self.steps {
            if !seen.contains(&step.caller) {
                seen.push(step.caller);
            }
        }
        seen
    }

    /// Replay every step in order, stopping at the first step whose
    /// outcome does not match its expectation.
    pub async fn run(
        &self,
        handle: &MigrationHandle,
        assets: &ScenarioAssets,
    ) -> Result<Vec<StepOutcome>, ScenarioError> {
        info!(
            name = self.name.as_deref().unwrap_or("unnamed"),
            steps = self.steps.len(),
            "Replaying scenario"
        );

        let mut outcomes = Vec::with_capacity(self.steps.len());
        for (idx, step) in self.steps.iter().enumerate() {
            let result = execute(handle, assets, step).await;
            outcomes.push(check(idx, step, result)?);
        }
        Ok(outcomes)
    }
}

async fn execute(
    handle: &MigrationHandle,
    assets: &ScenarioAssets,
    step: &Step,
) -> Result<Option<MigrationEvent>, ServiceError> {
    let caller = step.caller;
    match step.op {
        Op::Approve { asset, amount } => handle
            .approve(asset.resolve(assets), caller, assets.core_account, amount)
            .await
            .map(|()| None),
        Op::Transfer { asset, to, amount } => handle
            .transfer(asset.resolve(assets), caller, to, amount)
            .await
            .map(|()| None),
        Op::Deposit { amount } => handle.deposit(caller, amount).await.map(Some),
        Op::Convert { amount } => handle.convert(caller, amount).await.map(Some),
        Op::Withdraw { asset } => handle
            .withdraw(caller, asset.resolve(assets))
            .await
            .map(Some),
        Op::TransferOwnership { new_owner } => handle
            .transfer_ownership(caller, new_owner)
            .await
            .map(Some),
    }
}

fn check(
    idx: usize,
    step: &Step,
    result: Result<Option<MigrationEvent>, ServiceError>,
) -> Result<StepOutcome, ScenarioError> {
    let op = step.op.name();
    let mut outcome = StepOutcome {
        step: idx,
        caller: step.caller,
        op,
        event: None,
        error: None,
    };

    match (result, step.expect_error.as_deref()) {
        (Ok(event), None) => {
            outcome.event = event;
            Ok(outcome)
        }
        (Ok(_), Some(expected)) => Err(ScenarioError::UnexpectedOutcome {
            step: idx,
            op,
            expected: expected.to_string(),
            actual: "success".to_string(),
        }),
        (Err(e), Some(expected)) if e.code() == expected => {
            info!(step = idx, op, code = e.code(), "Step failed as expected");
            outcome.error = Some(e.code());
            Ok(outcome)
        }
        (Err(e), Some(expected)) => Err(ScenarioError::UnexpectedOutcome {
            step: idx,
            op,
            expected: expected.to_string(),
            actual: e.code().to_string(),
        }),
        (Err(source), None) => {
            warn!(step = idx, op, error = %source, "Scenario step failed");
            Err(ScenarioError::StepFailed {
                step: idx,
                op,
                source,
            })
        }
    }
}
