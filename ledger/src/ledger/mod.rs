//! # Ledger Module — Balances, Allowances, and the Transaction Log
//!
//! This is where money lives in Harbor. The [`store::LedgerStore`] owns
//! the balance book, the allowance book, and the append-only transaction
//! log, and exposes the token operations that mutate all three together.
//!
//! The split mirrors the data, not the API:
//!
//! - [`balances`] — identity → amount, absent-means-zero.
//! - [`allowances`] — owner → spender → amount, absent-means-zero at
//!   both levels.
//! - [`record`] — the immutable transaction record vocabulary.
//! - [`log`] — the append-only history with sequence-indexed reads.
//! - [`store`] — the operations: transfer, transferFrom, approve, mint,
//!   burn, plus the internal payout primitive the recovery coordinator
//!   uses.
//!
//! Nothing in this module knows about recovery. The coordinator calls
//! down into the store; the store never calls up.

pub mod allowances;
pub mod balances;
pub mod error;
pub mod log;
pub mod record;
pub mod store;

pub use error::LedgerError;
pub use record::{OperationKind, TxRecord, TxStatus};
pub use store::LedgerStore;
