// Copyright (c) 2026 Harbor Maintainers. MIT License.
// See LICENSE for details.

//! # Harbor Ledger — Core Library
//!
//! A fungible-token ledger welded to a threshold social-recovery protocol.
//! Guardian nodes hold shares of a user's secret; when a user loses access,
//! each guardian attests possession of its share on the ledger, and once
//! 2 of 3 attestations land the ledger pays every guardian a reward out of
//! the user's balance. Balances, allowances, the transaction log, and the
//! recovery state machine all share one mutable state object and move
//! together — either a call commits everything or it commits nothing.
//!
//! ## Architecture
//!
//! The crate is split into modules that mirror the moving parts:
//!
//! - **config** — Construction parameters and protocol constants.
//! - **ledger** — Balance book, allowance book, append-only transaction
//!   log, and the token operations that tie them together.
//! - **recovery** — Node/user registries and the per-user recovery
//!   state machine that triggers guardian payouts on quorum.
//! - **harbor** — The public operation surface. One facade, one caller
//!   principal per call, one serialization boundary.
//! - **snapshot** — Order-stable flat representation of the live maps,
//!   for carrying state across the host's save/restore boundary.
//! - **storage** — Durable persistence of snapshots via sled.
//!
//! ## Design Philosophy
//!
//! 1. Callers are opaque, pre-authenticated principals — identity is the
//!    host's problem, accounting is ours.
//! 2. Arithmetic never wraps: every debit is checked before any state
//!    moves, and a failed check leaves the ledger untouched.
//! 3. Absent means zero. The maps never store a zero balance or a zero
//!    allowance, at any level.
//! 4. If it touches money, it has tests. Plural.

pub mod config;
pub mod harbor;
pub mod ledger;
pub mod recovery;
pub mod snapshot;
pub mod storage;

pub use harbor::{HarborLedger, SharedLedger};
pub use ledger::error::LedgerError;
pub use recovery::coordinator::RecoveryError;
