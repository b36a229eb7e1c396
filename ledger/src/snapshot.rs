//! # Snapshot
//!
//! An order-stable, flat representation of the full ledger state for
//! the host's save/restore boundary. The live state lives in hash
//! maps, whose iteration order varies run to run; the snapshot sorts
//! every map into key order at capture time, so capturing the same
//! logical state twice produces byte-identical encodings.
//!
//! The host-reported resource balance is deliberately not captured: it
//! describes the hosting environment, not the ledger, and is stale the
//! moment it is written down.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::harbor::HarborLedger;
use crate::ledger::store::TokenMetadata;
use crate::ledger::{LedgerError, LedgerStore, TxRecord};
use crate::ledger::allowances::AllowanceBook;
use crate::ledger::balances::BalanceBook;
use crate::ledger::log::TransactionLog;
use crate::recovery::coordinator::{RecoveryCoordinator, RecoveryRecord};
use crate::recovery::registry::{Node, NodeRegistry, UserRecord, UserRegistry};

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors produced while encoding, decoding, or restoring a snapshot.
#[derive(Debug, Error)]
pub enum SnapshotError {
    /// The snapshot could not be encoded to bytes.
    #[error("snapshot encoding failed: {0}")]
    Encode(String),

    /// The bytes did not decode to a snapshot.
    #[error("snapshot decoding failed: {0}")]
    Decode(String),

    /// The decoded snapshot violates a ledger invariant. Only reachable
    /// with bytes that did not come from [`Snapshot::capture`].
    #[error("snapshot state is inconsistent: {0}")]
    Inconsistent(#[from] LedgerError),
}

// ---------------------------------------------------------------------------
// Snapshot
// ---------------------------------------------------------------------------

/// The full ledger state, flattened and sorted.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    metadata: TokenMetadata,
    /// `(identity, amount)`, sorted by identity.
    balances: Vec<(String, u64)>,
    /// `(owner, spender, amount)`, sorted by owner then spender.
    allowances: Vec<(String, String, u64)>,
    /// The complete transaction history in sequence order.
    log: Vec<TxRecord>,
    /// Guardian nodes, sorted by identity.
    nodes: Vec<Node>,
    /// User records, sorted by recovery key.
    users: Vec<UserRecord>,
    /// `(recovery_key, record)`, sorted by key.
    recoveries: Vec<(String, RecoveryRecord)>,
}

impl Snapshot {
    /// Captures the ledger's current state. Pure read; the ledger is
    /// untouched.
    pub fn capture(ledger: &HarborLedger) -> Self {
        let store = ledger.store();

        let mut balances: Vec<(String, u64)> = store
            .balances()
            .iter()
            .map(|(id, amount)| (id.clone(), *amount))
            .collect();
        balances.sort_by(|a, b| a.0.cmp(&b.0));

        let mut allowances: Vec<(String, String, u64)> = store
            .allowances()
            .iter()
            .map(|(owner, spender, amount)| (owner.clone(), spender.clone(), amount))
            .collect();
        allowances.sort_by(|a, b| (&a.0, &a.1).cmp(&(&b.0, &b.1)));

        let mut nodes: Vec<Node> = ledger.nodes().iter().cloned().collect();
        nodes.sort_by(|a, b| a.id.cmp(&b.id));

        let mut users: Vec<UserRecord> = ledger.users().iter().cloned().collect();
        users.sort_by(|a, b| a.recovery_key.cmp(&b.recovery_key));

        let mut recoveries: Vec<(String, RecoveryRecord)> = ledger
            .coordinator()
            .iter()
            .map(|(key, record)| (key.clone(), record.clone()))
            .collect();
        recoveries.sort_by(|a, b| a.0.cmp(&b.0));

        Self {
            metadata: store.metadata(),
            balances,
            allowances,
            log: store.get_transactions(0, usize::MAX),
            nodes,
            users,
            recoveries,
        }
    }

    /// Rebuilds a live ledger from the snapshot. The host-reported
    /// resource balance starts unset.
    ///
    /// # Errors
    ///
    /// Returns [`SnapshotError::Inconsistent`] if the balances cannot be
    /// re-admitted — only possible for hand-crafted snapshots whose
    /// entries overflow.
    pub fn restore(self) -> Result<HarborLedger, SnapshotError> {
        let mut balances = BalanceBook::new();
        for (id, amount) in &self.balances {
            balances.credit(id, *amount)?;
        }

        let mut allowances = AllowanceBook::new();
        for (owner, spender, amount) in &self.allowances {
            allowances.set(owner, spender, *amount);
        }

        // Append in sequence order; the log reassigns the indices it
        // originally assigned.
        let mut log = TransactionLog::new();
        for record in self.log {
            log.append(record);
        }

        let mut nodes = NodeRegistry::new();
        for node in &self.nodes {
            nodes.register(&node.id, &node.public_key);
        }

        let mut users = UserRegistry::new();
        for user in self.users {
            users.register(user);
        }

        let mut coordinator = RecoveryCoordinator::new();
        for (key, record) in self.recoveries {
            coordinator.insert(key, record);
        }

        let store = LedgerStore::from_parts(self.metadata, balances, allowances, log);
        Ok(HarborLedger::from_parts(store, nodes, users, coordinator))
    }

    /// Encodes the snapshot to bytes.
    pub fn to_bytes(&self) -> Result<Vec<u8>, SnapshotError> {
        bincode::serialize(self).map_err(|e| SnapshotError::Encode(e.to_string()))
    }

    /// Decodes a snapshot from bytes.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, SnapshotError> {
        bincode::deserialize(bytes).map_err(|e| SnapshotError::Decode(e.to_string()))
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
