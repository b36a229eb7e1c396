//! Core type definitions for ledger transaction records.
//!
//! These types form the vocabulary of every entry in the transaction
//! log. Records are immutable once appended — the log never rewrites
//! history, and neither should you.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

// ---------------------------------------------------------------------------
// OperationKind
// ---------------------------------------------------------------------------

/// Discriminant for the ledger operation a record represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OperationKind {
    /// New tokens created by the owner. `from` is the burn address.
    Mint,
    /// Tokens destroyed by their holder. `to` is the burn address.
    Burn,
    /// Direct value transfer between two identities.
    Transfer,
    /// Delegated transfer executed by an approved spender.
    TransferFrom,
    /// Spending approval granted by an owner to a spender.
    Approve,
    /// Guardian payout executed by the recovery coordinator on quorum.
    Reward,
}

impl fmt::Display for OperationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Mint => write!(f, "Mint"),
            Self::Burn => write!(f, "Burn"),
            Self::Transfer => write!(f, "Transfer"),
            Self::TransferFrom => write!(f, "TransferFrom"),
            Self::Approve => write!(f, "Approve"),
            Self::Reward => write!(f, "Reward"),
        }
    }
}

// ---------------------------------------------------------------------------
// TxStatus
// ---------------------------------------------------------------------------

/// Lifecycle state of a logged record.
///
/// Failed operations never reach the log, so every appended record is
/// `Succeeded` today. The enum exists so the wire format has room for
/// a rollback status if one is ever introduced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TxStatus {
    /// The operation executed and its state changes are committed.
    Succeeded,
}

impl fmt::Display for TxStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Succeeded => write!(f, "Succeeded"),
        }
    }
}

// ---------------------------------------------------------------------------
// TxRecord
// ---------------------------------------------------------------------------

/// An immutable entry in the transaction log.
///
/// The sequence `index` equals the record's position in the log and is
/// assigned at append time. Index 0 is always the synthetic genesis
/// mint covering the initial supply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TxRecord {
    /// The principal that initiated the operation. `None` for records
    /// the ledger creates on its own behalf (genesis, guardian rewards).
    pub caller: Option<String>,
    /// What the operation did.
    pub kind: OperationKind,
    /// Position in the log, assigned at append time.
    pub index: u64,
    /// Source identity. The burn address for mints.
    pub from: String,
    /// Destination identity. The burn address for burns; the spender
    /// for approvals.
    pub to: String,
    /// Principal amount moved (or approved), fee excluded.
    pub amount: u64,
    /// Fee charged on top of `amount` and credited to the fee recipient.
    pub fee: u64,
    /// Wall-clock time the record was appended.
    pub timestamp: DateTime<Utc>,
    /// Always `Succeeded` once appended.
    pub status: TxStatus,
}

impl TxRecord {
    /// Returns `true` if `id` took part in this record as its caller,
    /// source, or destination.
    pub fn involves(&self, id: &str) -> bool {
        self.caller.as_deref() == Some(id) || self.from == id || self.to == id
    }
}
