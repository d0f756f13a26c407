//! Ledger registry
//!
//! Resolves an [`AssetId`] to the ledger that tracks it. The migration core
//! only ever holds asset references; the registry is how it reaches the
//! actual balances (source, target, or any asset sent to it by mistake).

use rustc_hash::FxHashMap;

use super::AssetLedger;
use crate::core_types::{Address, Amount, AssetId};

#[derive(Default)]
pub struct LedgerRegistry {
    ledgers: FxHashMap<AssetId, Box<dyn AssetLedger>>,
}

impl LedgerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a ledger under its own `asset_id()`.
    ///
    /// Returns the ledger previously registered for that asset, if any.
    pub fn register(&mut self, ledger: Box<dyn AssetLedger>) -> Option<Box<dyn AssetLedger>> {
        self.ledgers.insert(ledger.asset_id(), ledger)
    }

    /// Builder-style [`register`](Self::register)
    pub fn with_ledger(mut self, ledger: impl AssetLedger + 'static) -> Self {
        self.register(Box::new(ledger));
        self
    }

    #[inline]
    pub fn contains(&self, asset: &AssetId) -> bool {
        self.ledgers.contains_key(asset)
    }

    pub fn get(&self, asset: &AssetId) -> Option<&dyn AssetLedger> {
        self.ledgers.get(asset).map(|l| &**l)
    }

    pub fn get_mut(&mut self, asset: &AssetId) -> Option<&mut (dyn AssetLedger + 'static)> {
        self.ledgers.get_mut(asset).map(|l| &mut **l)
    }

    /// Live balance of `holder` in `asset`; `None` if the asset is unknown
    pub fn balance_of(&self, asset: &AssetId, holder: &Address) -> Option<Amount> {
        self.get(asset).map(|l| l.balance_of(holder))
    }

    pub fn len(&self) -> usize {
        self.ledgers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ledgers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ledger::InMemoryLedger;

    #[test]
    fn test_register_and_lookup() {
        let asset = Address::from_low_u64(0x5);
        let holder = Address::from_low_u64(1);

        let mut ledger = InMemoryLedger::new(asset, "SRC");
        ledger.mint(&holder, 42).unwrap();

        let registry = LedgerRegistry::new().with_ledger(ledger);
        assert_eq!(registry.len(), 1);
        assert!(registry.contains(&asset));
        assert_eq!(registry.balance_of(&asset, &holder), Some(42));
        assert_eq!(
            registry.balance_of(&Address::from_low_u64(0x6), &holder),
            None
        );
    }

    #[test]
    fn test_register_replaces_previous() {
        let asset = Address::from_low_u64(0x5);
        let mut registry = LedgerRegistry::new();

        assert!(
            registry
                .register(Box::new(InMemoryLedger::new(asset, "A")))
                .is_none()
        );
        assert!(
            registry
                .register(Box::new(InMemoryLedger::new(asset, "B")))
                .is_some()
        );
        assert_eq!(registry.len(), 1);
    }
}
