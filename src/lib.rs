//! Token Migration - 1:1 exchange of a legacy asset for its replacement
//!
//! Holders hand in source-asset units and receive the same number of
//! target-asset units from a reserve the operator funds. The core keeps no
//! balances of its own; every amount is read from, and moved through,
//! external per-asset ledgers.
//!
//! # Modules
//!
//! - [`core_types`] - Address, AssetId, Amount
//! - [`ledger`] - Asset ledger capability, in-memory ledger, registry
//! - [`settlement`] - All-or-nothing multi-leg ledger movements
//! - [`migration`] - The migration core (deposit/convert/withdraw/ownership)
//! - [`service`] - Single-writer tokio front end
//! - [`deploy`] - Ledger provisioning and core deployment
//! - [`scenario`] - YAML step replay
//! - [`config`] / [`logging`] - Ambient configuration and tracing setup

// Core types - must be first!
pub mod core_types;

pub mod ledger;
pub mod migration;
pub mod settlement;

pub mod config;
pub mod deploy;
pub mod logging;
pub mod scenario;
pub mod service;

// Convenient re-exports at crate root
pub use core_types::{Address, Amount, AssetId};
pub use ledger::{AssetLedger, InMemoryLedger, LedgerError, LedgerRegistry};
pub use migration::{MigrationCore, MigrationError, MigrationEvent};
pub use service::{MigrationHandle, MigrationService, ServiceError};
pub use settlement::{Leg, Settlement, SettlementError, SettlementId, SettlementState};
