//! Token Migration
//!
//! One-directional, 1:1 exchange of a legacy asset for its replacement.
//! Holders convert source units into target units drawn from a reserve the
//! operator funds; the operator can sweep any balance the core holds.
//!
//! ```text
//! deposit(amount)   caller --target--> core
//! convert(amount)   caller --source--> core, core --target--> caller
//! withdraw(asset)   core   --asset---> owner   (full balance)
//! ```

pub mod error;
pub mod events;
pub mod migrator;

pub use error::MigrationError;
pub use events::MigrationEvent;
pub use migrator::MigrationCore;
