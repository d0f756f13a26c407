use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::core_types::{Address, Amount};

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Failed to parse config yaml: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AppConfig {
    pub log_level: String,
    pub log_dir: String,
    pub log_file: String,
    pub use_json: bool,
    pub rotation: String,
    pub migration: MigrationConfig,
    #[serde(default)]
    pub service: ServiceConfig,
}

/// Deployment parameters for the migration core
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct MigrationConfig {
    /// Identity that deploys the core and becomes its first owner
    pub deployer: Address,
    /// Ledger account holding the core's custody balances
    pub core_account: Address,
    pub source: AssetConfig,
    pub target: AssetConfig,
    /// Ownership is handed to this identity right after deployment
    #[serde(default)]
    pub operator: Option<Address>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AssetConfig {
    pub id: Address,
    pub symbol: String,
    /// Balances minted when the in-memory ledger is provisioned
    #[serde(default)]
    pub genesis: Vec<GenesisBalance>,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy)]
pub struct GenesisBalance {
    pub holder: Address,
    pub amount: Amount,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ServiceConfig {
    pub queue_size: usize,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self { queue_size: 1024 }
    }
}

impl AppConfig {
    pub fn load(env: &str) -> Result<Self, ConfigError> {
        Self::from_file(format!("config/{}.yaml", env))
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_yaml(&content)
    }

    pub fn from_yaml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configs the core would refuse at deployment anyway, before
    /// any ledger is provisioned
    pub fn validate(&self) -> Result<(), ConfigError> {
        let m = &self.migration;
        if m.deployer.is_zero() {
            return Err(ConfigError::Invalid("migration.deployer is the zero address".into()));
        }
        if m.core_account.is_zero() {
            return Err(ConfigError::Invalid(
                "migration.core_account is the zero address".into(),
            ));
        }
        if m.source.id.is_zero() || m.target.id.is_zero() {
            return Err(ConfigError::Invalid("asset id is the zero address".into()));
        }
        if m.source.id == m.target.id {
            return Err(ConfigError::Invalid(
                "source and target must be different assets".into(),
            ));
        }
        if m.operator.is_some_and(|op| op.is_zero()) {
            return Err(ConfigError::Invalid("migration.operator is the zero address".into()));
        }
        if self.service.queue_size == 0 {
            return Err(ConfigError::Invalid("service.queue_size must be > 0".into()));
        }
        Ok(())
    }
}
