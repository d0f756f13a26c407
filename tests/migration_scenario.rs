use token_migration::core_types::{Address, Amount, AssetId};
use token_migration::ledger::{AssetLedger, InMemoryLedger, LedgerError, LedgerRegistry};
use token_migration::migration::{MigrationCore, MigrationError, MigrationEvent};

const SOURCE: AssetId = Address::from_low_u64(0x501);
const TARGET: AssetId = Address::from_low_u64(0x702);
const CORE: Address = Address::from_low_u64(0xC0DE);
const OWNER: Address = Address::from_low_u64(0xAD);
const USER1: Address = Address::from_low_u64(1);
const USER2: Address = Address::from_low_u64(2);

const SOURCE_SUPPLY: Amount = 10_000_000;
const TARGET_SUPPLY: Amount = 10_000_000;

/// Source supply split between two users, target supply held by the owner
fn setup() -> (MigrationCore, LedgerRegistry) {
    let mut source = InMemoryLedger::new(SOURCE, "OLD");
    source.mint(&USER1, 4_000_000).unwrap();
    source.mint(&USER2, 6_000_000).unwrap();

    let mut target = InMemoryLedger::new(TARGET, "NEW");
    target.mint(&OWNER, TARGET_SUPPLY).unwrap();

    let core = MigrationCore::new(OWNER, CORE, SOURCE, TARGET).unwrap();
    let ledgers = LedgerRegistry::new().with_ledger(source).with_ledger(target);
    (core, ledgers)
}

fn balance(ledgers: &LedgerRegistry, asset: AssetId, holder: Address) -> Amount {
    ledgers.balance_of(&asset, &holder).unwrap()
}

fn approve(ledgers: &mut LedgerRegistry, asset: AssetId, owner: Address, amount: Amount) {
    ledgers
        .get_mut(&asset)
        .unwrap()
        .approve(&owner, &CORE, amount)
        .unwrap();
}

fn total(ledgers: &LedgerRegistry, asset: AssetId) -> Amount {
    [USER1, USER2, OWNER, CORE]
        .iter()
        .map(|h| balance(ledgers, asset, *h))
        .sum()
}

#[test]
fn fund_convert_sweep_end_to_end() {
    let (core, mut ledgers) = setup();

    // Owner funds the reserve
    approve(&mut ledgers, TARGET, OWNER, 1_000);
    core.deposit(&mut ledgers, &OWNER, 1_000).unwrap();
    assert_eq!(core.reserve(&ledgers).unwrap(), 1_000);

    // A holder converts half of it
    approve(&mut ledgers, SOURCE, USER2, 500);
    let event = core.convert(&mut ledgers, &USER2, 500).unwrap();
    assert!(matches!(
        event,
        MigrationEvent::Converted {
            account: USER2,
            amount: 500,
            reserve_after: 500,
            ..
        }
    ));
    assert_eq!(balance(&ledgers, SOURCE, USER2), 6_000_000 - 500);
    assert_eq!(balance(&ledgers, TARGET, USER2), 500);
    assert_eq!(balance(&ledgers, SOURCE, CORE), 500);
    assert_eq!(core.reserve(&ledgers).unwrap(), 500);

    // Owner sweeps what is left
    core.withdraw(&mut ledgers, &OWNER, &TARGET).unwrap();
    assert_eq!(core.reserve(&ledgers).unwrap(), 0);
    assert_eq!(balance(&ledgers, TARGET, OWNER), TARGET_SUPPLY - 500);

    // Nothing left to convert against
    approve(&mut ledgers, SOURCE, USER2, 1);
    assert_eq!(
        core.convert(&mut ledgers, &USER2, 1),
        Err(MigrationError::InsufficientReserve {
            reserve: 0,
            requested: 1
        })
    );

    // Supplies are conserved throughout
    assert_eq!(total(&ledgers, SOURCE), SOURCE_SUPPLY);
    assert_eq!(total(&ledgers, TARGET), TARGET_SUPPLY);
}

#[test]
fn failed_operations_leave_balances_untouched() {
    let (core, mut ledgers) = setup();
    approve(&mut ledgers, TARGET, OWNER, 2_000);
    core.deposit(&mut ledgers, &OWNER, 2_000).unwrap();

    let snapshot = |l: &LedgerRegistry| {
        [SOURCE, TARGET]
            .iter()
            .flat_map(|a| [USER1, USER2, OWNER, CORE].map(|h| balance(l, *a, h)))
            .collect::<Vec<_>>()
    };
    let before = snapshot(&ledgers);

    // Zero amounts
    assert_eq!(
        core.deposit(&mut ledgers, &USER1, 0),
        Err(MigrationError::InvalidAmount)
    );
    assert_eq!(
        core.convert(&mut ledgers, &USER1, 0),
        Err(MigrationError::InvalidAmount)
    );

    // No allowance granted
    assert_eq!(
        core.convert(&mut ledgers, &USER1, 10),
        Err(MigrationError::Ledger(LedgerError::InsufficientAllowance))
    );

    // Reserve too small
    approve(&mut ledgers, SOURCE, USER1, 5_000);
    assert!(matches!(
        core.convert(&mut ledgers, &USER1, 5_000),
        Err(MigrationError::InsufficientReserve {
            reserve: 2_000,
            requested: 5_000
        })
    ));

    // Non-owner sweep
    assert_eq!(
        core.withdraw(&mut ledgers, &USER1, &TARGET),
        Err(MigrationError::NotOwner)
    );

    assert_eq!(snapshot(&ledgers), before);
    // The rejected conversion did not consume allowance
    assert_eq!(
        ledgers.get(&SOURCE).unwrap().allowance(&USER1, &CORE),
        5_000
    );
}

#[test]
fn many_holders_drain_reserve_exactly() {
    let (core, mut ledgers) = setup();
    approve(&mut ledgers, TARGET, OWNER, 10_000);
    core.deposit(&mut ledgers, &OWNER, 10_000).unwrap();

    approve(&mut ledgers, SOURCE, USER1, 4_000_000);
    approve(&mut ledgers, SOURCE, USER2, 6_000_000);

    let mut converted = 0;
    for round in 0..20 {
        let user = if round % 2 == 0 { USER1 } else { USER2 };
        if core.convert(&mut ledgers, &user, 750).is_ok() {
            converted += 750;
        }
    }

    // 13 * 750 = 9_750, the 14th would need 10_500
    assert_eq!(converted, 9_750);
    assert_eq!(core.reserve(&ledgers).unwrap(), 250);
    assert_eq!(balance(&ledgers, SOURCE, CORE), 9_750);
    assert_eq!(
        balance(&ledgers, TARGET, USER1) + balance(&ledgers, TARGET, USER2),
        9_750
    );
}
