//! End-to-end integration tests for the Harbor ledger.
//!
//! These tests exercise the full public surface the way a host would
//! drive it: token construction, transfers and approvals with fees,
//! guardian registration, the complete recovery lifecycle with its
//! payout, and state survival across the snapshot and storage
//! boundaries.
//!
//! Each test stands alone with its own ledger (and, where needed, its
//! own temporary database). No shared state, no test ordering
//! dependencies, no flaky failures.

use harbor_ledger::config::{TokenConfig, GUARDIAN_REWARD, RECOVERY_COST};
use harbor_ledger::harbor::{HarborLedger, SharedLedger};
use harbor_ledger::ledger::OperationKind;
use harbor_ledger::recovery::coordinator::RecoveryStatus;
use harbor_ledger::recovery::registry::Guardian;
use harbor_ledger::snapshot::Snapshot;
use harbor_ledger::storage::LedgerDb;
use harbor_ledger::{LedgerError, RecoveryError};

// ---------------------------------------------------------------------------
// Test Helpers
// ---------------------------------------------------------------------------

const OWNER: &str = "hbr:owner";
const ALICE: &str = "hbr:alice";
const BOB: &str = "hbr:bob";
const CAROL: &str = "hbr:carol";
const N1: &str = "hbr:node-1";
const N2: &str = "hbr:node-2";
const N3: &str = "hbr:node-3";
const KEY: &str = "rk-alice";

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env(),
        )
        .with_test_writer()
        .try_init();
}

/// A ledger with supply 1000, fee 1, and fees flowing back to the owner.
fn ledger() -> HarborLedger {
    init_tracing();
    HarborLedger::new(TokenConfig::dev(OWNER))
}

fn guardians() -> [Guardian; 3] {
    [
        Guardian {
            condition: 0,
            node_id: N1.into(),
        },
        Guardian {
            condition: 0,
            node_id: N2.into(),
        },
        Guardian {
            condition: 1,
            node_id: N3.into(),
        },
    ]
}

/// Registers the three guardian nodes and one user bound to them.
fn with_recovery_setup(ledger: &mut HarborLedger) {
    ledger.register_node(N1, "pk-node-1");
    ledger.register_node(N2, "pk-node-2");
    ledger.register_node(N3, "pk-node-3");
    ledger.register_user(ALICE, KEY, guardians());
}

fn assert_conservation(ledger: &HarborLedger) {
    let held: u64 = ledger
        .get_holders(0, usize::MAX)
        .iter()
        .map(|(_, amount)| amount)
        .sum();
    assert_eq!(held, ledger.total_supply());
}

// ---------------------------------------------------------------------------
// 1. Token Lifecycle
// ---------------------------------------------------------------------------

#[test]
fn token_lifecycle_with_fees() {
    let mut ledger = ledger();
    assert_eq!(ledger.name(), "Harbor Token");
    assert_eq!(ledger.symbol(), "HBR");
    assert_eq!(ledger.total_supply(), 1_000);
    assert_eq!(ledger.balance_of(OWNER), 1_000);

    // Owner funds Alice; the fee flows back to the owner, so the net
    // cost is exactly the value.
    ledger.transfer(OWNER, ALICE, 100).unwrap();
    assert_eq!(ledger.balance_of(OWNER), 900);
    assert_eq!(ledger.balance_of(ALICE), 100);

    // Alice approves Bob for 50; the stored allowance covers the future
    // transfer fee, and the approve fee is charged up front.
    ledger.approve(ALICE, BOB, 50).unwrap();
    assert_eq!(ledger.balance_of(ALICE), 99);
    assert_eq!(ledger.allowance(ALICE, BOB), 51);

    // Bob spends the whole approval moving 50 to Carol.
    ledger.transfer_from(BOB, ALICE, CAROL, 50).unwrap();
    assert_eq!(ledger.balance_of(ALICE), 48);
    assert_eq!(ledger.balance_of(CAROL), 50);
    assert_eq!(ledger.allowance(ALICE, BOB), 0);

    assert_conservation(&ledger);

    // The log saw it all: genesis, transfer, approve, transferFrom.
    assert_eq!(ledger.history_size(), 4);
    let kinds: Vec<OperationKind> = ledger
        .get_transactions(0, 10)
        .into_iter()
        .map(|r| r.kind)
        .collect();
    assert_eq!(
        kinds,
        vec![
            OperationKind::Mint,
            OperationKind::Transfer,
            OperationKind::Approve,
            OperationKind::TransferFrom,
        ]
    );
}

#[test]
fn supply_changes_through_mint_and_burn() {
    let mut ledger = ledger();

    ledger.mint(OWNER, ALICE, 250).unwrap();
    assert_eq!(ledger.total_supply(), 1_250);
    assert_eq!(ledger.balance_of(ALICE), 250);

    ledger.burn(ALICE, 200).unwrap();
    assert_eq!(ledger.total_supply(), 1_050);
    assert_eq!(ledger.balance_of(ALICE), 50);
    assert_conservation(&ledger);

    // Mint stays owner-gated after a handover.
    ledger.set_owner(OWNER, ALICE).unwrap();
    assert!(matches!(
        ledger.mint(OWNER, OWNER, 1),
        Err(LedgerError::Unauthorized { .. })
    ));
    ledger.mint(ALICE, BOB, 1).unwrap();
}

#[test]
fn failed_operations_leave_no_trace() {
    let mut ledger = ledger();
    ledger.transfer(OWNER, ALICE, 10).unwrap();
    let history_before = ledger.history_size();

    // Overdraft: 10 + fee 1 > 10.
    assert!(ledger.transfer(ALICE, BOB, 10).is_err());
    // No allowance at all.
    assert!(ledger.transfer_from(BOB, ALICE, CAROL, 5).is_err());
    // Not the owner.
    assert!(ledger.set_fee(ALICE, 0).is_err());

    assert_eq!(ledger.history_size(), history_before);
    assert_eq!(ledger.balance_of(ALICE), 10);
    assert_conservation(&ledger);
}

#[test]
fn fee_redirection_to_treasury() {
    let mut ledger = ledger();
    ledger.set_fee_recipient(OWNER, "hbr:treasury").unwrap();

    ledger.transfer(OWNER, ALICE, 100).unwrap();
    assert_eq!(ledger.balance_of(OWNER), 899);
    assert_eq!(ledger.balance_of("hbr:treasury"), 1);
    assert_conservation(&ledger);
}

// ---------------------------------------------------------------------------
// 2. Recovery Lifecycle
// ---------------------------------------------------------------------------

#[test]
fn full_recovery_lifecycle() {
    let mut ledger = ledger();
    with_recovery_setup(&mut ledger);
    ledger.transfer(OWNER, ALICE, 100).unwrap();

    // Node registration is visible and idempotent.
    assert_eq!(ledger.get_node_list().len(), 3);
    ledger.register_node(N1, "pk-node-1-rotated");
    assert_eq!(ledger.get_node_list().len(), 3);
    assert_eq!(ledger.get_node(N1).unwrap().public_key, "pk-node-1-rotated");

    // Alice loses access and starts recovery from her funded identity.
    ledger.start_recovery(ALICE, KEY).unwrap();
    assert_eq!(
        ledger.get_recovery(KEY).unwrap().status,
        RecoveryStatus::Requested
    );

    // First attestation: no payout yet.
    let status = ledger.finish_recovery(N1, KEY, "share-1").unwrap();
    assert_eq!(status, RecoveryStatus::Requested);
    assert_eq!(ledger.balance_of(ALICE), 100);

    // Second attestation reaches the 2-of-3 quorum. All three
    // guardians are paid, including N2 which never attested.
    let status = ledger.finish_recovery(N3, KEY, "share-3").unwrap();
    assert_eq!(status, RecoveryStatus::Completed);
    assert_eq!(ledger.balance_of(ALICE), 100 - RECOVERY_COST);
    assert_eq!(ledger.balance_of(N1), GUARDIAN_REWARD);
    assert_eq!(ledger.balance_of(N2), GUARDIAN_REWARD);
    assert_eq!(ledger.balance_of(N3), GUARDIAN_REWARD);
    assert_conservation(&ledger);

    // The payouts are ordinary, queryable history.
    let rewards: Vec<_> = ledger
        .get_transactions(0, 100)
        .into_iter()
        .filter(|r| r.kind == OperationKind::Reward)
        .collect();
    assert_eq!(rewards.len(), 3);
    assert!(rewards.iter().all(|r| r.fee == 0 && r.from == ALICE));
    assert_eq!(ledger.get_transaction_count_for(N2), 1);

    // A straggler attestation after completion is ignored, not paid.
    let status = ledger.finish_recovery(N2, KEY, "share-2").unwrap();
    assert_eq!(status, RecoveryStatus::Completed);
    assert_eq!(ledger.balance_of(ALICE), 100 - RECOVERY_COST);
}

#[test]
fn recovery_can_run_repeatedly() {
    let mut ledger = ledger();
    with_recovery_setup(&mut ledger);
    ledger.transfer(OWNER, ALICE, 100).unwrap();

    for cycle in 1..=3u32 {
        ledger.start_recovery(ALICE, KEY).unwrap();
        ledger.finish_recovery(N1, KEY, "s1").unwrap();
        ledger.finish_recovery(N2, KEY, "s2").unwrap();
        assert_eq!(ledger.get_recovery(KEY).unwrap().completions, cycle);
    }

    assert_eq!(
        ledger.balance_of(ALICE),
        100 - 3 * RECOVERY_COST
    );
    assert_eq!(ledger.balance_of(N3), 3 * GUARDIAN_REWARD);
    assert_conservation(&ledger);
}

#[test]
fn recovery_rejects_impostors_and_strangers() {
    let mut ledger = ledger();
    with_recovery_setup(&mut ledger);
    ledger.transfer(OWNER, ALICE, 100).unwrap();

    // Only the owning identity may start.
    assert!(matches!(
        ledger.start_recovery(BOB, KEY),
        Err(RecoveryError::Ledger(LedgerError::Unauthorized { .. }))
    ));

    // Unknown recovery keys fail loudly.
    assert!(matches!(
        ledger.start_recovery(ALICE, "rk-nobody"),
        Err(RecoveryError::UnknownUser { .. })
    ));

    // Non-guardians cannot attest.
    ledger.start_recovery(ALICE, KEY).unwrap();
    assert!(matches!(
        ledger.finish_recovery(BOB, KEY, "fake"),
        Err(RecoveryError::UnknownGuardian { .. })
    ));
    assert_eq!(ledger.get_recovery(KEY).unwrap().confirmations(), 0);
}

#[test]
fn broke_user_cannot_start_and_cannot_complete() {
    let mut ledger = ledger();
    with_recovery_setup(&mut ledger);

    // Alice holds nothing: starting is refused outright.
    assert!(matches!(
        ledger.start_recovery(ALICE, KEY),
        Err(RecoveryError::Ledger(LedgerError::InsufficientBalance { .. }))
    ));

    // Fund just enough to start, then drain below the payout cost.
    ledger.transfer(OWNER, ALICE, RECOVERY_COST).unwrap();
    ledger.start_recovery(ALICE, KEY).unwrap();
    ledger.finish_recovery(N1, KEY, "s1").unwrap();
    ledger.transfer(ALICE, BOB, 1).unwrap(); // costs 1 + fee 1

    // The quorum-reaching attestation fails whole; nothing is paid and
    // the first confirmation survives untouched.
    assert!(matches!(
        ledger.finish_recovery(N2, KEY, "s2"),
        Err(RecoveryError::Ledger(LedgerError::InsufficientBalance { .. }))
    ));
    let recovery = ledger.get_recovery(KEY).unwrap();
    assert_eq!(recovery.status, RecoveryStatus::Requested);
    assert_eq!(recovery.confirmations(), 1);
    assert_eq!(ledger.balance_of(N1), 0);
    assert_conservation(&ledger);
}

// ---------------------------------------------------------------------------
// 3. Snapshot & Storage Boundaries
// ---------------------------------------------------------------------------

#[test]
fn recovery_survives_snapshot_boundary() {
    let mut ledger = ledger();
    with_recovery_setup(&mut ledger);
    ledger.transfer(OWNER, ALICE, 100).unwrap();
    ledger.start_recovery(ALICE, KEY).unwrap();
    ledger.finish_recovery(N1, KEY, "share-1").unwrap();

    // Host saves mid-recovery, restores, and the cycle completes.
    let bytes = Snapshot::capture(&ledger).to_bytes().unwrap();
    let mut restored = Snapshot::from_bytes(&bytes).unwrap().restore().unwrap();
    assert_eq!(restored, ledger);

    let status = restored.finish_recovery(N2, KEY, "share-2").unwrap();
    assert_eq!(status, RecoveryStatus::Completed);
    assert_eq!(restored.balance_of(ALICE), 100 - RECOVERY_COST);
    assert_conservation(&restored);
}

#[test]
fn ledger_survives_database_reopen() -> anyhow::Result<()> {
    init_tracing();
    let dir = tempfile::tempdir()?;

    let history_size;
    {
        let mut ledger = HarborLedger::new(TokenConfig::dev(OWNER));
        with_recovery_setup(&mut ledger);
        ledger.transfer(OWNER, ALICE, 100)?;
        ledger.approve(ALICE, BOB, 25)?;
        history_size = ledger.history_size();

        let db = LedgerDb::open(dir.path())?;
        db.save(&ledger)?;
    }

    let db = LedgerDb::open(dir.path())?;
    let mut loaded = db.load()?.expect("saved ledger should load");
    assert_eq!(loaded.history_size(), history_size);
    assert_eq!(loaded.balance_of(ALICE), 99);
    assert_eq!(loaded.allowance(ALICE, BOB), 26);
    assert_conservation(&loaded);

    // The loaded ledger is fully operational, recovery included.
    loaded.start_recovery(ALICE, KEY)?;
    loaded.finish_recovery(N1, KEY, "s1")?;
    loaded.finish_recovery(N3, KEY, "s3")?;
    assert_eq!(
        loaded.get_recovery(KEY).unwrap().status,
        RecoveryStatus::Completed
    );
    Ok(())
}

// ---------------------------------------------------------------------------
// 4. Concurrency
// ---------------------------------------------------------------------------

#[test]
fn shared_ledger_keeps_invariants_under_contention() {
    use std::thread;

    let mut ledger = ledger();
    with_recovery_setup(&mut ledger);
    for i in 0..4 {
        ledger.transfer(OWNER, &format!("hbr:worker-{i}"), 50).unwrap();
    }
    ledger.transfer(OWNER, ALICE, 100).unwrap();
    let shared = SharedLedger::new(ledger);

    let mut handles = Vec::new();
    // Transfer workers hammering the balance book.
    for i in 0..4 {
        let shared = shared.clone();
        handles.push(thread::spawn(move || {
            let from = format!("hbr:worker-{i}");
            for _ in 0..10 {
                shared.lock().transfer(&from, BOB, 1).unwrap();
            }
        }));
    }
    // A recovery running in parallel with the transfers.
    {
        let shared = shared.clone();
        handles.push(thread::spawn(move || {
            shared.lock().start_recovery(ALICE, KEY).unwrap();
            shared.lock().finish_recovery(N1, KEY, "s1").unwrap();
            shared.lock().finish_recovery(N2, KEY, "s2").unwrap();
        }));
    }
    for handle in handles {
        handle.join().unwrap();
    }

    let ledger = shared.lock();
    assert_eq!(ledger.balance_of(BOB), 40);
    assert_eq!(ledger.balance_of(ALICE), 100 - RECOVERY_COST);
    assert_eq!(
        ledger.get_recovery(KEY).unwrap().status,
        RecoveryStatus::Completed
    );
    assert_eq!(ledger.total_supply(), 1_000);
    assert_conservation(&ledger);
}
