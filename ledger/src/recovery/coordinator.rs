//! # Recovery Coordinator
//!
//! The per-user recovery state machine. Each registered user owns one
//! [`RecoveryRecord`], keyed by their recovery key and reused across
//! recovery cycles:
//!
//! ```text
//!        start                 2-of-3 confirmed
//! Idle ────────► Requested ───────────────────► Completed
//!                  ▲  │                             │
//!                  │  └── start (restart, resets) ──┘
//! ```
//!
//! `start` resets all attestation slots, so every cycle begins from a
//! clean sheet — a stale confirmation from a previous cycle never
//! counts toward a new quorum.
//!
//! On the transition to Completed the coordinator pays each of the
//! three guardians one token out of the user's balance, through the
//! ledger's guarded payout primitive. The payout feasibility is checked
//! *before* any attestation slot is touched: a finish call that would
//! reach quorum against an underfunded user fails whole, leaving the
//! record exactly as it was.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::{GUARDIAN_COUNT, GUARDIAN_REWARD, RECOVERY_COST, RECOVERY_QUORUM};
use crate::ledger::{LedgerError, LedgerStore};

use super::registry::UserRecord;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Errors produced by recovery operations.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RecoveryError {
    /// A ledger-level failure, most commonly an underfunded payout.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// No user is registered under the given recovery key.
    #[error("no user registered under recovery key {recovery_key}")]
    UnknownUser {
        /// The key that failed to resolve.
        recovery_key: String,
    },

    /// The finishing caller matches none of the user's three guardians.
    #[error("{caller} is not a guardian for this recovery")]
    UnknownGuardian {
        /// The offending principal.
        caller: String,
    },
}

// ---------------------------------------------------------------------------
// Types
// ---------------------------------------------------------------------------

/// Lifecycle state of a recovery record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RecoveryStatus {
    /// No recovery in flight. The state every record is created in.
    Idle,
    /// The owning identity has requested recovery; guardians may attest.
    Requested,
    /// Quorum reached, guardians paid. A new cycle may be started.
    Completed,
}

impl RecoveryStatus {
    /// Numeric wire code: Idle = 0, Requested = 1, Completed = 2.
    pub fn code(&self) -> u8 {
        match self {
            Self::Idle => 0,
            Self::Requested => 1,
            Self::Completed => 2,
        }
    }
}

/// One guardian's attestation slot within a recovery record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuardianSlot {
    /// Proof text the guardian submitted. Opaque to the ledger.
    pub proof: String,
    /// Whether this guardian has confirmed during the current cycle.
    pub confirmed: bool,
}

impl GuardianSlot {
    fn reset(&mut self) {
        self.proof.clear();
        self.confirmed = false;
    }
}

/// The per-user recovery state, keyed by the same recovery key as the
/// user record and reused across cycles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveryRecord {
    /// The identity whose balance funds the guardian rewards.
    pub uid: String,
    /// Current lifecycle state.
    pub status: RecoveryStatus,
    /// Number of cycles that have reached quorum over this record's
    /// lifetime.
    pub completions: u32,
    /// One attestation slot per configured guardian, in the same order
    /// as the user record's guardian array.
    pub slots: [GuardianSlot; GUARDIAN_COUNT],
}

impl RecoveryRecord {
    /// A fresh Idle record for `uid`.
    pub fn idle(uid: &str) -> Self {
        Self {
            uid: uid.to_string(),
            status: RecoveryStatus::Idle,
            completions: 0,
            slots: Default::default(),
        }
    }

    /// Number of slots confirmed in the current cycle.
    pub fn confirmations(&self) -> usize {
        self.slots.iter().filter(|s| s.confirmed).count()
    }
}

// ---------------------------------------------------------------------------
// RecoveryCoordinator
// ---------------------------------------------------------------------------

/// Owns every recovery record and drives the state machine.
///
/// The coordinator holds no reference to the ledger; the store is
/// passed into the operations that need it, which keeps the borrow
/// boundaries honest and makes the payout coupling explicit at every
/// call site.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RecoveryCoordinator {
    recoveries: HashMap<String, RecoveryRecord>,
}

impl RecoveryCoordinator {
    /// Creates an empty coordinator.
    pub fn new() -> Self {
        Self {
            recoveries: HashMap::new(),
        }
    }

    /// Creates (or replaces) the Idle record paired with a user
    /// registration. Replacement discards any in-flight cycle, matching
    /// the registry's replace-on-conflict policy.
    pub fn create_idle(&mut self, uid: &str, recovery_key: &str) {
        self.recoveries
            .insert(recovery_key.to_string(), RecoveryRecord::idle(uid));
    }

    /// Looks up the recovery record for a key.
    pub fn get(&self, recovery_key: &str) -> Option<&RecoveryRecord> {
        self.recoveries.get(recovery_key)
    }

    /// Begins a new recovery cycle.
    ///
    /// Only the owning identity may start one, and the user must hold
    /// at least [`RECOVERY_COST`] so the eventual payout can succeed.
    /// Valid from any state — restarting a Requested cycle simply
    /// resets it. All attestation slots are cleared.
    pub fn start(
        &mut self,
        caller: &str,
        recovery_key: &str,
        store: &LedgerStore,
    ) -> Result<(), RecoveryError> {
        let record =
            self.recoveries
                .get_mut(recovery_key)
                .ok_or_else(|| RecoveryError::UnknownUser {
                    recovery_key: recovery_key.to_string(),
                })?;
        if caller != record.uid {
            return Err(LedgerError::Unauthorized {
                caller: caller.to_string(),
            }
            .into());
        }
        let available = store.balance_of(&record.uid);
        if available < RECOVERY_COST {
            return Err(LedgerError::InsufficientBalance {
                available,
                requested: RECOVERY_COST,
            }
            .into());
        }

        record.status = RecoveryStatus::Requested;
        for slot in record.slots.iter_mut() {
            slot.reset();
        }
        debug!(key = recovery_key, uid = %record.uid, "recovery started");
        Ok(())
    }

    /// Records a guardian attestation, completing the cycle on quorum.
    ///
    /// A no-op unless the record is Requested — late or early
    /// attestations are silently ignored, not errors. The caller is
    /// matched against all three configured guardians and every
    /// matching slot is updated in one call (a degenerate configuration
    /// with duplicate guardian identities confirms multiple slots at
    /// once; that is the configured user's choice, not a bug).
    ///
    /// On reaching [`RECOVERY_QUORUM`] confirmations the record
    /// transitions to Completed, the completion counter increments, and
    /// each of the three guardians is paid [`GUARDIAN_REWARD`] from the
    /// user's balance — including guardians that never confirmed. If
    /// the user cannot cover the full payout the call fails before any
    /// slot is touched.
    ///
    /// Returns the record's status after the call.
    pub fn finish(
        &mut self,
        caller: &str,
        recovery_key: &str,
        proof: &str,
        user: &UserRecord,
        store: &mut LedgerStore,
    ) -> Result<RecoveryStatus, RecoveryError> {
        let record =
            self.recoveries
                .get_mut(recovery_key)
                .ok_or_else(|| RecoveryError::UnknownUser {
                    recovery_key: recovery_key.to_string(),
                })?;
        if record.status != RecoveryStatus::Requested {
            debug!(key = recovery_key, status = ?record.status, "attestation ignored");
            return Ok(record.status);
        }

        let matches: Vec<usize> = user
            .guardians
            .iter()
            .enumerate()
            .filter(|(_, g)| g.node_id == caller)
            .map(|(i, _)| i)
            .collect();
        if matches.is_empty() {
            return Err(RecoveryError::UnknownGuardian {
                caller: caller.to_string(),
            });
        }

        // Decide the outcome before mutating anything, so an
        // underfunded payout rejects the whole call cleanly.
        let confirmed_after = record
            .slots
            .iter()
            .enumerate()
            .filter(|(i, slot)| slot.confirmed || matches.contains(i))
            .count();
        let reaches_quorum = confirmed_after >= RECOVERY_QUORUM;
        if reaches_quorum {
            let available = store.balance_of(&record.uid);
            if available < RECOVERY_COST {
                return Err(LedgerError::InsufficientBalance {
                    available,
                    requested: RECOVERY_COST,
                }
                .into());
            }
        }

        for &i in &matches {
            record.slots[i].proof = proof.to_string();
            record.slots[i].confirmed = true;
        }

        if reaches_quorum {
            record.completions += 1;
            record.status = RecoveryStatus::Completed;
            for guardian in &user.guardians {
                // Cannot fail: the full cost was checked above and the
                // debits of this loop are what the check covered.
                store.reward(&record.uid, &guardian.node_id, GUARDIAN_REWARD)?;
            }
            info!(
                key = recovery_key,
                uid = %record.uid,
                cycle = record.completions,
                "recovery completed, guardians rewarded"
            );
        }

        Ok(record.status)
    }

    /// Number of recovery records.
    pub fn len(&self) -> usize {
        self.recoveries.len()
    }

    /// Returns `true` if no record exists yet.
    pub fn is_empty(&self) -> bool {
        self.recoveries.is_empty()
    }

    /// Iterates over all `(recovery_key, record)` pairs in map order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &RecoveryRecord)> {
        self.recoveries.iter()
    }

    /// Reinstates a restored record under its key. Snapshot restore
    /// only.
    pub(crate) fn insert(&mut self, recovery_key: String, record: RecoveryRecord) {
        self.recoveries.insert(recovery_key, record);
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
