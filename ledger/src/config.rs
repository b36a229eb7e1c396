//! # Ledger Configuration & Constants
//!
//! Every protocol constant lives here. If you're hardcoding a number
//! somewhere else, you're doing it wrong and you owe the team coffee.
//!
//! [`TokenConfig`] carries the parameters fixed at ledger construction.
//! Owner, fee, and fee recipient start from these values but can be
//! changed later through the owner-gated setters on the ledger itself.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Canonical Identities
// ---------------------------------------------------------------------------

/// The blackhole identity. Mint records use it as their `from`, burn
/// records as their `to`. Nothing can ever spend from this account
/// because no caller principal resolves to it.
pub const BURN_ADDRESS: &str = "hbr:0000000000000000000000000000000000000000";

// ---------------------------------------------------------------------------
// Recovery Parameters
// ---------------------------------------------------------------------------

/// Number of guardians configured per user. The recovery record carries
/// exactly this many attestation slots.
pub const GUARDIAN_COUNT: usize = 3;

/// Confirmations required to complete a recovery cycle. 2-of-3: one
/// guardian can be offline or hostile without locking the user out.
pub const RECOVERY_QUORUM: usize = 2;

/// Reward paid to each guardian when a recovery completes, in smallest
/// token units. All three guardians are rewarded on quorum, including
/// the one that never confirmed — availability is not a precondition
/// for having stored the share.
pub const GUARDIAN_REWARD: u64 = 1;

/// Total debit from the recovering user on quorum.
pub const RECOVERY_COST: u64 = GUARDIAN_COUNT as u64 * GUARDIAN_REWARD;

// ---------------------------------------------------------------------------
// TokenConfig
// ---------------------------------------------------------------------------

/// Parameters fixed at ledger construction.
///
/// The initial supply is minted in full to `owner` and logged as the
/// synthetic genesis record at index 0.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenConfig {
    /// Human-readable token name (e.g., "Harbor Token").
    pub name: String,
    /// Trading symbol / ticker (e.g., "HBR").
    pub symbol: String,
    /// Display decimal places. The ledger itself only ever sees integer
    /// amounts in the smallest unit.
    pub decimals: u8,
    /// Total supply minted to the owner at genesis.
    pub initial_supply: u64,
    /// The administrative identity: sole principal allowed to mint and
    /// to change owner, fee, and fee recipient.
    pub owner: String,
    /// Flat fee charged on transfer, transferFrom, and approve, credited
    /// to the fee recipient (initially the owner).
    pub fee: u64,
}

impl TokenConfig {
    /// A small default configuration for tests and examples.
    pub fn dev(owner: &str) -> Self {
        Self {
            name: "Harbor Token".to_string(),
            symbol: "HBR".to_string(),
            decimals: 8,
            initial_supply: 1_000,
            owner: owner.to_string(),
            fee: 1,
        }
    }
}
