//! # Recovery Module — Guardians, Users, and the Attestation Quorum
//!
//! Harbor's social recovery scheme: a user splits their secret across
//! three guardian nodes at registration time (off-ledger), and when
//! access is lost each guardian attests on the ledger that it still
//! holds its share. Two of three attestations complete the recovery,
//! and the ledger pays every guardian one token out of the user's
//! balance — the one guardian that never showed up stored the share
//! all the same.
//!
//! - [`registry`] — who the guardian nodes are and which three of them
//!   each user picked.
//! - [`coordinator`] — the per-user Idle → Requested → Completed state
//!   machine and the payout it triggers on quorum.
//!
//! The coordinator is the only code outside the ledger module that
//! moves funds, and it does so through the store's guarded payout
//! primitive — never by poking balances directly.

pub mod coordinator;
pub mod registry;

pub use coordinator::{RecoveryCoordinator, RecoveryError, RecoveryRecord, RecoveryStatus};
pub use registry::{Guardian, Node, NodeRegistry, UserRecord, UserRegistry};
