//! # Harbor Facade
//!
//! The single public operation surface. Every call takes the caller's
//! identity as its first argument — the host authenticates, Harbor
//! accounts. The facade owns all four state components (ledger store,
//! node registry, user registry, recovery coordinator) and is the only
//! place they meet, so a cross-component operation like `finish_recovery`
//! observes and mutates them under one `&mut self`.
//!
//! ## Concurrency
//!
//! [`HarborLedger`] itself is plain single-threaded state. Hosts that
//! serve concurrent callers wrap it in [`SharedLedger`], which
//! serializes every operation behind one mutex — the whole surface is
//! read-modify-write over shared maps, so finer locking buys nothing
//! and costs the atomicity argument.

use std::sync::Arc;

use parking_lot::{Mutex, MutexGuard};

use crate::config::TokenConfig;
use crate::ledger::store::{TokenInfo, TokenMetadata};
use crate::ledger::{LedgerError, LedgerStore, TxRecord};
use crate::recovery::coordinator::{RecoveryCoordinator, RecoveryError, RecoveryRecord, RecoveryStatus};
use crate::recovery::registry::{Guardian, Node, NodeRegistry, UserRecord, UserRegistry};

// ---------------------------------------------------------------------------
// HarborLedger
// ---------------------------------------------------------------------------

/// The complete ledger: token state, guardian registries, and recovery
/// state machine, behind one operation surface.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HarborLedger {
    store: LedgerStore,
    nodes: NodeRegistry,
    users: UserRegistry,
    coordinator: RecoveryCoordinator,
    /// Host-reported resource balance, surfaced through `get_token_info`
    /// and nothing else. Not part of ledger state; excluded from
    /// snapshots.
    host_balance: Option<u64>,
}

impl HarborLedger {
    /// Creates a fresh ledger from its construction parameters. The
    /// registries start empty; the genesis mint is logged at index 0.
    pub fn new(config: TokenConfig) -> Self {
        Self {
            store: LedgerStore::new(config),
            nodes: NodeRegistry::new(),
            users: UserRegistry::new(),
            coordinator: RecoveryCoordinator::new(),
            host_balance: None,
        }
    }

    // -- Token operations ----------------------------------------------------

    /// Moves `value` from the caller to `to`, charging the fee on top.
    /// Returns the sequence index of the logged record.
    pub fn transfer(&mut self, caller: &str, to: &str, value: u64) -> Result<u64, LedgerError> {
        self.store.transfer(caller, to, value)
    }

    /// Moves `value` from `from` to `to` against the caller's allowance.
    pub fn transfer_from(
        &mut self,
        caller: &str,
        from: &str,
        to: &str,
        value: u64,
    ) -> Result<u64, LedgerError> {
        self.store.transfer_from(caller, from, to, value)
    }

    /// Approves `spender` to move up to `value` (plus the fee) out of
    /// the caller's balance.
    pub fn approve(&mut self, caller: &str, spender: &str, value: u64) -> Result<u64, LedgerError> {
        self.store.approve(caller, spender, value)
    }

    /// Creates `amount` new tokens in `to`'s balance. Owner only.
    pub fn mint(&mut self, caller: &str, to: &str, amount: u64) -> Result<u64, LedgerError> {
        self.store.mint(caller, to, amount)
    }

    /// Destroys `amount` tokens from the caller's balance.
    pub fn burn(&mut self, caller: &str, amount: u64) -> Result<u64, LedgerError> {
        self.store.burn(caller, amount)
    }

    // -- Administration ------------------------------------------------------

    /// Transfers administrative control. Owner only.
    pub fn set_owner(&mut self, caller: &str, new_owner: &str) -> Result<(), LedgerError> {
        self.store.set_owner(caller, new_owner)
    }

    /// Changes the flat operation fee. Owner only.
    pub fn set_fee(&mut self, caller: &str, fee: u64) -> Result<(), LedgerError> {
        self.store.set_fee(caller, fee)
    }

    /// Redirects future fees. Owner only.
    pub fn set_fee_recipient(&mut self, caller: &str, recipient: &str) -> Result<(), LedgerError> {
        self.store.set_fee_recipient(caller, recipient)
    }

    /// Records the host's resource balance for `get_token_info`. The
    /// host calls this; ledger operations never touch it.
    pub fn set_host_balance(&mut self, balance: Option<u64>) {
        self.host_balance = balance;
    }

    // -- Recovery operations -------------------------------------------------

    /// Registers (or re-keys) a guardian node under the caller's own
    /// identity.
    pub fn register_node(&mut self, caller: &str, public_key: &str) {
        self.nodes.register(caller, public_key);
    }

    /// Registers a user with their recovery key and three chosen
    /// guardians, and creates the paired Idle recovery record.
    /// Re-registering a key replaces both records wholesale.
    pub fn register_user(
        &mut self,
        caller: &str,
        recovery_key: &str,
        guardians: [Guardian; crate::config::GUARDIAN_COUNT],
    ) {
        self.users.register(UserRecord {
            uid: caller.to_string(),
            recovery_key: recovery_key.to_string(),
            guardians,
        });
        self.coordinator.create_idle(caller, recovery_key);
    }

    /// Starts (or restarts) a recovery cycle for the caller's own
    /// record. Requires the caller to hold the full payout cost.
    pub fn start_recovery(&mut self, caller: &str, recovery_key: &str) -> Result<(), RecoveryError> {
        self.coordinator.start(caller, recovery_key, &self.store)
    }

    /// Records a guardian attestation for a pending recovery. On the
    /// second confirmation the cycle completes and all three guardians
    /// are paid from the user's balance. Returns the recovery status
    /// after the call.
    pub fn finish_recovery(
        &mut self,
        caller: &str,
        recovery_key: &str,
        proof: &str,
    ) -> Result<RecoveryStatus, RecoveryError> {
        let user = self
            .users
            .get(recovery_key)
            .ok_or_else(|| RecoveryError::UnknownUser {
                recovery_key: recovery_key.to_string(),
            })?;
        self.coordinator
            .finish(caller, recovery_key, proof, user, &mut self.store)
    }

    // -- Token reads ---------------------------------------------------------

    /// Token name.
    pub fn name(&self) -> &str {
        self.store.name()
    }

    /// Ticker symbol.
    pub fn symbol(&self) -> &str {
        self.store.symbol()
    }

    /// Display decimal places.
    pub fn decimals(&self) -> u8 {
        self.store.decimals()
    }

    /// Current total supply.
    pub fn total_supply(&self) -> u64 {
        self.store.total_supply()
    }

    /// Current flat fee.
    pub fn get_fee(&self) -> u64 {
        self.store.fee()
    }

    /// Balance for an identity. Absent means zero.
    pub fn balance_of(&self, id: &str) -> u64 {
        self.store.balance_of(id)
    }

    /// Approved amount for `(owner, spender)`.
    pub fn allowance(&self, owner: &str, spender: &str) -> u64 {
        self.store.allowance(owner, spender)
    }

    /// The token's metadata view.
    pub fn get_metadata(&self) -> TokenMetadata {
        self.store.metadata()
    }

    /// Metadata plus holder count, history size, and the host-reported
    /// resource balance.
    pub fn get_token_info(&self) -> TokenInfo {
        self.store.token_info(self.host_balance)
    }

    /// Holders sorted by balance descending, paginated.
    pub fn get_holders(&self, start: usize, limit: usize) -> Vec<(String, u64)> {
        self.store.holders(start, limit)
    }

    /// Number of owners with at least one live approval.
    pub fn get_allowance_count(&self) -> usize {
        self.store.allowance_count()
    }

    /// All approvals granted by `owner`.
    pub fn get_approvals_for(&self, owner: &str) -> Vec<(String, u64)> {
        self.store.approvals_for(owner)
    }

    // -- History reads -------------------------------------------------------

    /// Length of the transaction log.
    pub fn history_size(&self) -> u64 {
        self.store.history_size()
    }

    /// Point lookup in the transaction log.
    pub fn get_transaction(&self, index: u64) -> Result<TxRecord, LedgerError> {
        self.store.get_transaction(index).cloned()
    }

    /// At most `limit` records starting at sequence index `start`.
    pub fn get_transactions(&self, start: u64, limit: usize) -> Vec<TxRecord> {
        self.store.get_transactions(start, limit)
    }

    /// Number of records involving `id`.
    pub fn get_transaction_count_for(&self, id: &str) -> u64 {
        self.store.transaction_count_for(id)
    }

    /// At most `limit` records involving `id`, starting at the
    /// `start`-th match.
    pub fn get_transactions_for(&self, id: &str, start: usize, limit: usize) -> Vec<TxRecord> {
        self.store.transactions_for(id, start, limit)
    }

    // -- Recovery reads ------------------------------------------------------

    /// All registered guardian nodes. Order is unspecified.
    pub fn get_node_list(&self) -> Vec<Node> {
        self.nodes.list()
    }

    /// Looks up a guardian node by identity.
    pub fn get_node(&self, id: &str) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Looks up a registered user by recovery key.
    pub fn get_user(&self, recovery_key: &str) -> Option<&UserRecord> {
        self.users.get(recovery_key)
    }

    /// Looks up a recovery record by recovery key.
    pub fn get_recovery(&self, recovery_key: &str) -> Option<&RecoveryRecord> {
        self.coordinator.get(recovery_key)
    }

    // -- Snapshot access (crate-internal) ------------------------------------

    pub(crate) fn store(&self) -> &LedgerStore {
        &self.store
    }

    pub(crate) fn nodes(&self) -> &NodeRegistry {
        &self.nodes
    }

    pub(crate) fn users(&self) -> &UserRegistry {
        &self.users
    }

    pub(crate) fn coordinator(&self) -> &RecoveryCoordinator {
        &self.coordinator
    }

    /// Rebuilds a facade from restored components. The host balance is
    /// transient and starts unset.
    pub(crate) fn from_parts(
        store: LedgerStore,
        nodes: NodeRegistry,
        users: UserRegistry,
        coordinator: RecoveryCoordinator,
    ) -> Self {
        Self {
            store,
            nodes,
            users,
            coordinator,
            host_balance: None,
        }
    }
}

// ---------------------------------------------------------------------------
// SharedLedger
// ---------------------------------------------------------------------------

/// A clonable, thread-safe handle to one [`HarborLedger`].
///
/// Every operation runs under the same mutex, which is the whole
/// concurrency model: calls observe and produce consistent states in
/// some serial order, and nothing else is promised.
#[derive(Clone, Debug)]
pub struct SharedLedger {
    inner: Arc<Mutex<HarborLedger>>,
}

impl SharedLedger {
    /// Wraps a ledger for shared use.
    pub fn new(ledger: HarborLedger) -> Self {
        Self {
            inner: Arc::new(Mutex::new(ledger)),
        }
    }

    /// Locks the ledger for a sequence of calls. Keep the guard short;
    /// every other caller is waiting on it.
    pub fn lock(&self) -> MutexGuard<'_, HarborLedger> {
        self.inner.lock()
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
