//! # LedgerDb — Persistent Storage
//!
//! Durable persistence for the full ledger state, built on sled's
//! embedded key-value store. All on-disk data flows through this
//! module.
//!
//! ## Tree Layout
//!
//! sled organizes data into named "trees", each an independent B+ tree
//! with its own keyspace:
//!
//! | Tree         | Key                          | Value                     |
//! |--------------|------------------------------|---------------------------|
//! | `balances`   | identity (UTF-8)             | amount (8B BE)            |
//! | `allowances` | `owner \0 spender` (UTF-8)   | amount (8B BE)            |
//! | `log`        | sequence index (8B BE)       | `bincode(TxRecord)`       |
//! | `nodes`      | node id (UTF-8)              | `bincode(Node)`           |
//! | `users`      | recovery key (UTF-8)         | `bincode(UserRecord)`     |
//! | `recoveries` | recovery key (UTF-8)         | `bincode(RecoveryRecord)` |
//! | `metadata`   | key (UTF-8)                  | `bincode(TokenMetadata)`  |
//!
//! Log indices are stored as big-endian u64 so that sled's
//! lexicographic ordering matches numeric ordering, which makes the
//! load path a plain in-order scan.
//!
//! Identities may not contain NUL; the composite allowance key relies
//! on it as the separator.
//!
//! ## Save Model
//!
//! `save` is whole-state: it clears every tree, rewrites the current
//! state with one batch per tree, and flushes. The ledger's maps are
//! small relative to the log, and the log itself is append-only, so
//! the rewrite is dominated by data that never changes shape — simple
//! beats clever here. `load` rebuilds the live ledger or returns
//! `None` for a fresh database.

use sled::{Batch, Db, Tree};
use std::path::Path;
use tracing::info;

use crate::harbor::HarborLedger;
use crate::ledger::allowances::AllowanceBook;
use crate::ledger::balances::BalanceBook;
use crate::ledger::log::TransactionLog;
use crate::ledger::store::TokenMetadata;
use crate::ledger::{LedgerError, LedgerStore, TxRecord};
use crate::recovery::coordinator::{RecoveryCoordinator, RecoveryRecord};
use crate::recovery::registry::{Node, NodeRegistry, UserRecord, UserRegistry};

// ---------------------------------------------------------------------------
// Error Type
// ---------------------------------------------------------------------------

/// Errors that can occur during database operations.
#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("sled error: {0}")]
    Sled(#[from] sled::Error),

    #[error("serialization error: {0}")]
    Serialization(String),

    /// A loaded state violates a ledger invariant. Only reachable when
    /// the database was written by something other than [`LedgerDb::save`].
    #[error("stored state is inconsistent: {0}")]
    Inconsistent(#[from] LedgerError),
}

pub type DbResult<T> = Result<T, DbError>;

/// Well-known key in the `metadata` tree for the token parameters. Its
/// presence marks the database as initialized.
const META_TOKEN: &[u8] = b"token_metadata";

/// Separator for the composite `owner \0 spender` allowance key.
const ALLOWANCE_SEP: u8 = 0;

// ---------------------------------------------------------------------------
// LedgerDb
// ---------------------------------------------------------------------------

/// Persistent storage for one ledger.
///
/// Wraps a sled `Db` instance and exposes whole-state save and load.
/// All serialization uses bincode for compactness and speed.
///
/// # Thread Safety
///
/// sled is inherently thread-safe, but `save` is not atomic across
/// trees — serialize calls to it the same way ledger operations are
/// serialized, behind the shared mutex.
#[derive(Debug, Clone)]
pub struct LedgerDb {
    db: Db,
    balances: Tree,
    allowances: Tree,
    log: Tree,
    nodes: Tree,
    users: Tree,
    recoveries: Tree,
    metadata: Tree,
}

impl LedgerDb {
    /// Open or create a database at the given filesystem path.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let db = sled::open(path)?;
        Self::from_db(db)
    }

    /// Create a temporary database that is cleaned up automatically on
    /// drop. Ideal for tests.
    pub fn open_temporary() -> DbResult<Self> {
        let config = sled::Config::new().temporary(true);
        let db = config.open()?;
        Self::from_db(db)
    }

    fn from_db(db: Db) -> DbResult<Self> {
        let balances = db.open_tree("balances")?;
        let allowances = db.open_tree("allowances")?;
        let log = db.open_tree("log")?;
        let nodes = db.open_tree("nodes")?;
        let users = db.open_tree("users")?;
        let recoveries = db.open_tree("recoveries")?;
        let metadata = db.open_tree("metadata")?;

        Ok(Self {
            db,
            balances,
            allowances,
            log,
            nodes,
            users,
            recoveries,
            metadata,
        })
    }

    /// Returns `true` if the database holds a saved ledger.
    pub fn is_initialized(&self) -> DbResult<bool> {
        Ok(self.metadata.get(META_TOKEN)?.is_some())
    }

    // -- Save ----------------------------------------------------------------

    /// Persist the full ledger state, replacing whatever was saved
    /// before, and flush to disk.
    pub fn save(&self, ledger: &HarborLedger) -> DbResult<()> {
        let store = ledger.store();

        let mut balance_batch = Batch::default();
        for (id, amount) in store.balances().iter() {
            balance_batch.insert(id.as_bytes(), &amount.to_be_bytes());
        }
        self.balances.clear()?;
        self.balances.apply_batch(balance_batch)?;

        let mut allowance_batch = Batch::default();
        for (owner, spender, amount) in store.allowances().iter() {
            allowance_batch.insert(allowance_key(owner, spender), &amount.to_be_bytes());
        }
        self.allowances.clear()?;
        self.allowances.apply_batch(allowance_batch)?;

        let mut log_batch = Batch::default();
        for record in store.log().iter() {
            let bytes = encode(record)?;
            log_batch.insert(&record.index.to_be_bytes(), bytes);
        }
        self.log.clear()?;
        self.log.apply_batch(log_batch)?;

        let mut node_batch = Batch::default();
        for node in ledger.nodes().iter() {
            node_batch.insert(node.id.as_bytes(), encode(node)?);
        }
        self.nodes.clear()?;
        self.nodes.apply_batch(node_batch)?;

        let mut user_batch = Batch::default();
        for user in ledger.users().iter() {
            user_batch.insert(user.recovery_key.as_bytes(), encode(user)?);
        }
        self.users.clear()?;
        self.users.apply_batch(user_batch)?;

        let mut recovery_batch = Batch::default();
        for (key, record) in ledger.coordinator().iter() {
            recovery_batch.insert(key.as_bytes(), encode(record)?);
        }
        self.recoveries.clear()?;
        self.recoveries.apply_batch(recovery_batch)?;

        self.metadata.insert(META_TOKEN, encode(&store.metadata())?)?;

        self.db.flush()?;
        info!(records = store.history_size(), "ledger state saved");
        Ok(())
    }

    // -- Load ----------------------------------------------------------------

    /// Rebuild the ledger from disk. Returns `None` if nothing was ever
    /// saved here.
    pub fn load(&self) -> DbResult<Option<HarborLedger>> {
        let metadata: TokenMetadata = match self.metadata.get(META_TOKEN)? {
            Some(bytes) => decode(&bytes)?,
            None => return Ok(None),
        };

        let mut balances = BalanceBook::new();
        for entry in self.balances.iter() {
            let (key, value) = entry?;
            balances.credit(&utf8_key(&key)?, be_u64(&value)?)?;
        }

        let mut allowances = AllowanceBook::new();
        for entry in self.allowances.iter() {
            let (key, value) = entry?;
            let (owner, spender) = split_allowance_key(&key)?;
            allowances.set(&owner, &spender, be_u64(&value)?);
        }

        // Keys are big-endian indices, so the scan is in sequence order
        // and append reassigns the same indices.
        let mut log = TransactionLog::new();
        for entry in self.log.iter() {
            let (_key, value) = entry?;
            let record: TxRecord = decode(&value)?;
            log.append(record);
        }

        let mut nodes = NodeRegistry::new();
        for entry in self.nodes.iter() {
            let (_key, value) = entry?;
            let node: Node = decode(&value)?;
            nodes.register(&node.id, &node.public_key);
        }

        let mut users = UserRegistry::new();
        for entry in self.users.iter() {
            let (_key, value) = entry?;
            let user: UserRecord = decode(&value)?;
            users.register(user);
        }

        let mut coordinator = RecoveryCoordinator::new();
        for entry in self.recoveries.iter() {
            let (key, value) = entry?;
            let record: RecoveryRecord = decode(&value)?;
            coordinator.insert(utf8_key(&key)?, record);
        }

        let store = LedgerStore::from_parts(metadata, balances, allowances, log);
        info!(records = store.history_size(), "ledger state loaded");
        Ok(Some(HarborLedger::from_parts(
            store,
            nodes,
            users,
            coordinator,
        )))
    }

    /// Force a flush of all pending writes to disk.
    pub fn flush(&self) -> DbResult<()> {
        self.db.flush()?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Codec Helpers
// ---------------------------------------------------------------------------

fn encode<T: serde::Serialize>(value: &T) -> DbResult<Vec<u8>> {
    bincode::serialize(value).map_err(|e| DbError::Serialization(e.to_string()))
}

fn decode<T: serde::de::DeserializeOwned>(bytes: &[u8]) -> DbResult<T> {
    bincode::deserialize(bytes).map_err(|e| DbError::Serialization(e.to_string()))
}

fn utf8_key(bytes: &[u8]) -> DbResult<String> {
    String::from_utf8(bytes.to_vec())
        .map_err(|_| DbError::Serialization("non-UTF-8 key".to_string()))
}

fn be_u64(bytes: &[u8]) -> DbResult<u64> {
    let array: [u8; 8] = bytes
        .try_into()
        .map_err(|_| DbError::Serialization("invalid amount bytes".to_string()))?;
    Ok(u64::from_be_bytes(array))
}

fn allowance_key(owner: &str, spender: &str) -> Vec<u8> {
    let mut key = Vec::with_capacity(owner.len() + 1 + spender.len());
    key.extend_from_slice(owner.as_bytes());
    key.push(ALLOWANCE_SEP);
    key.extend_from_slice(spender.as_bytes());
    key
}

fn split_allowance_key(key: &[u8]) -> DbResult<(String, String)> {
    let sep = key
        .iter()
        .position(|&b| b == ALLOWANCE_SEP)
        .ok_or_else(|| DbError::Serialization("malformed allowance key".to_string()))?;
    Ok((utf8_key(&key[..sep])?, utf8_key(&key[sep + 1..])?))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
