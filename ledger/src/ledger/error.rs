//! Error taxonomy for ledger operations.
//!
//! Every mutating operation either fully succeeds (new state plus a new
//! log entry) or fully fails with one of these values and no observable
//! state change. None of them abort the process.

use thiserror::Error;

/// Errors produced by ledger operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LedgerError {
    /// A debit (including the fee) exceeds the available funds.
    #[error("insufficient balance: available {available}, requested {requested}")]
    InsufficientBalance {
        /// Funds available to the debited party.
        available: u64,
        /// Amount the operation needed, fee included.
        requested: u64,
    },

    /// The spender's approved amount is too low for a transferFrom.
    #[error("insufficient allowance: approved {approved}, requested {requested}")]
    InsufficientAllowance {
        /// Currently approved amount for (owner, spender).
        approved: u64,
        /// Amount the operation needed, fee included.
        requested: u64,
    },

    /// The caller is not the configured owner for an owner-only action.
    #[error("unauthorized: {caller} is not the ledger owner")]
    Unauthorized {
        /// The offending principal.
        caller: String,
    },

    /// An index-based read went past the end of the transaction log.
    #[error("index {index} out of range: log has {len} records")]
    OutOfRange {
        /// The requested sequence index.
        index: u64,
        /// Current log length.
        len: u64,
    },

    /// Checked arithmetic overflowed. Either the supply is approaching
    /// `u64::MAX` or someone is probing the edges.
    #[error("arithmetic overflow: {0} + {1} exceeds u64::MAX")]
    Overflow(u64, u64),
}
