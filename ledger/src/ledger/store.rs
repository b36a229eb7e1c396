//! # Ledger Store
//!
//! The token operations: transfer, transferFrom, approve, mint, burn,
//! the owner-gated configuration setters, and every read the public
//! surface exposes. The store owns the balance book, the allowance
//! book, and the transaction log, and is the only code that mutates
//! them.
//!
//! ## Atomicity
//!
//! Every operation validates all of its constraints before touching any
//! state. Once the first mutation happens, the remaining mutations
//! cannot fail: debits precede credits, so a credit can never overflow
//! while `sum(balances) == total_supply` holds, and the log append is
//! infallible. A failed call therefore leaves the store byte-identical
//! to its state before the call, and a successful call appends exactly
//! one record.
//!
//! ## Fees
//!
//! A flat `fee` is charged on transfer, transferFrom, and approve, and
//! credited to the fee recipient. When the fee recipient is the paying
//! party the charge nets out to zero — the debit and credit still both
//! happen, so the logged record is identical either way.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{TokenConfig, BURN_ADDRESS};

use super::allowances::AllowanceBook;
use super::balances::BalanceBook;
use super::error::LedgerError;
use super::log::TransactionLog;
use super::record::{OperationKind, TxRecord, TxStatus};

// ---------------------------------------------------------------------------
// Metadata Views
// ---------------------------------------------------------------------------

/// The token's descriptive and administrative parameters.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenMetadata {
    /// Human-readable token name.
    pub name: String,
    /// Ticker symbol.
    pub symbol: String,
    /// Display decimal places.
    pub decimals: u8,
    /// Current total supply in smallest units.
    pub total_supply: u64,
    /// The administrative identity.
    pub owner: String,
    /// Identity credited with operation fees.
    pub fee_recipient: String,
    /// Flat fee charged on transfer, transferFrom, and approve.
    pub fee: u64,
}

/// Metadata plus ledger statistics, for `getTokenInfo`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenInfo {
    /// The token's metadata.
    pub metadata: TokenMetadata,
    /// Number of identities with a strictly positive balance.
    pub holder_count: usize,
    /// Length of the transaction log.
    pub history_size: u64,
    /// Resource balance of the hosting environment, if the host chose
    /// to report one. Resource accounting itself is the host's concern.
    pub host_balance: Option<u64>,
}

// ---------------------------------------------------------------------------
// LedgerStore
// ---------------------------------------------------------------------------

/// Balances, allowances, supply, and history for one token.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LedgerStore {
    name: String,
    symbol: String,
    decimals: u8,
    total_supply: u64,
    owner: String,
    fee_recipient: String,
    fee: u64,
    balances: BalanceBook,
    allowances: AllowanceBook,
    log: TransactionLog,
}

impl LedgerStore {
    /// Creates a ledger from its construction parameters.
    ///
    /// The initial supply is credited to the owner in full and logged
    /// as the synthetic genesis mint at index 0. The fee recipient
    /// starts as the owner.
    pub fn new(config: TokenConfig) -> Self {
        let mut balances = BalanceBook::new();
        // Genesis credit into an empty book cannot overflow.
        let _ = balances.credit(&config.owner, config.initial_supply);

        let mut log = TransactionLog::new();
        log.append(TxRecord {
            caller: None,
            kind: OperationKind::Mint,
            index: 0,
            from: BURN_ADDRESS.to_string(),
            to: config.owner.clone(),
            amount: config.initial_supply,
            fee: 0,
            timestamp: Utc::now(),
            status: TxStatus::Succeeded,
        });

        info!(
            symbol = %config.symbol,
            supply = config.initial_supply,
            owner = %config.owner,
            "ledger created"
        );

        Self {
            name: config.name,
            symbol: config.symbol,
            decimals: config.decimals,
            total_supply: config.initial_supply,
            fee_recipient: config.owner.clone(),
            owner: config.owner,
            fee: config.fee,
            balances,
            allowances: AllowanceBook::new(),
            log,
        }
    }

    // -- Mutating operations ------------------------------------------------

    /// Moves `value` from the caller to `to`, charging the fee on top.
    ///
    /// Requires `balance(caller) >= value + fee`. Returns the sequence
    /// index of the appended record.
    pub fn transfer(&mut self, caller: &str, to: &str, value: u64) -> Result<u64, LedgerError> {
        let total = value
            .checked_add(self.fee)
            .ok_or(LedgerError::Overflow(value, self.fee))?;
        let available = self.balances.balance_of(caller);
        if available < total {
            return Err(LedgerError::InsufficientBalance {
                available,
                requested: total,
            });
        }

        let fee_recipient = self.fee_recipient.clone();
        self.balances.debit(caller, total)?;
        self.balances.credit(&fee_recipient, self.fee)?;
        self.balances.credit(to, value)?;

        debug!(caller, to, value, fee = self.fee, "transfer");
        Ok(self.append(Some(caller), OperationKind::Transfer, caller, to, value))
    }

    /// Moves `value` from `from` to `to` on behalf of an approved
    /// spender, charging the fee to `from` and consuming `value + fee`
    /// of the spender's allowance.
    ///
    /// The balance constraint is checked before the allowance one, so a
    /// broke owner reports `InsufficientBalance` even when the
    /// allowance is also short.
    pub fn transfer_from(
        &mut self,
        caller: &str,
        from: &str,
        to: &str,
        value: u64,
    ) -> Result<u64, LedgerError> {
        let total = value
            .checked_add(self.fee)
            .ok_or(LedgerError::Overflow(value, self.fee))?;

        let available = self.balances.balance_of(from);
        if available < total {
            return Err(LedgerError::InsufficientBalance {
                available,
                requested: total,
            });
        }
        let approved = self.allowances.get(from, caller);
        if approved < total {
            return Err(LedgerError::InsufficientAllowance {
                approved,
                requested: total,
            });
        }

        let fee_recipient = self.fee_recipient.clone();
        self.balances.debit(from, total)?;
        self.balances.credit(&fee_recipient, self.fee)?;
        self.balances.credit(to, value)?;
        self.allowances.consume(from, caller, total)?;

        debug!(caller, from, to, value, fee = self.fee, "transfer_from");
        Ok(self.append(Some(caller), OperationKind::TransferFrom, from, to, value))
    }

    /// Grants `spender` the right to move `value + fee` out of the
    /// caller's balance, overwriting any prior approval.
    ///
    /// The stored amount is `value + fee` so the spender can cover the
    /// transferFrom fee out of the approval. A `value` of zero deletes
    /// the entry instead of storing zero. The caller pays the approve
    /// fee up front, which requires `balance(caller) >= fee`.
    pub fn approve(&mut self, caller: &str, spender: &str, value: u64) -> Result<u64, LedgerError> {
        let stored = value
            .checked_add(self.fee)
            .ok_or(LedgerError::Overflow(value, self.fee))?;
        let available = self.balances.balance_of(caller);
        if available < self.fee {
            return Err(LedgerError::InsufficientBalance {
                available,
                requested: self.fee,
            });
        }

        let fee_recipient = self.fee_recipient.clone();
        self.balances.debit(caller, self.fee)?;
        self.balances.credit(&fee_recipient, self.fee)?;
        if value == 0 {
            self.allowances.set(caller, spender, 0);
        } else {
            self.allowances.set(caller, spender, stored);
        }

        debug!(caller, spender, stored, "approve");
        Ok(self.append(Some(caller), OperationKind::Approve, caller, spender, stored))
    }

    /// Creates `amount` new tokens in `to`'s balance. Owner only.
    pub fn mint(&mut self, caller: &str, to: &str, amount: u64) -> Result<u64, LedgerError> {
        self.require_owner(caller)?;
        let new_supply = self
            .total_supply
            .checked_add(amount)
            .ok_or(LedgerError::Overflow(self.total_supply, amount))?;

        self.balances.credit(to, amount)?;
        self.total_supply = new_supply;

        info!(to, amount, supply = self.total_supply, "mint");
        Ok(self.append(Some(caller), OperationKind::Mint, BURN_ADDRESS, to, amount))
    }

    /// Destroys `amount` tokens from the caller's balance.
    pub fn burn(&mut self, caller: &str, amount: u64) -> Result<u64, LedgerError> {
        let available = self.balances.balance_of(caller);
        if available < amount {
            return Err(LedgerError::InsufficientBalance {
                available,
                requested: amount,
            });
        }

        self.balances.debit(caller, amount)?;
        // Conservation guarantees amount <= total_supply here.
        self.total_supply -= amount;

        info!(caller, amount, supply = self.total_supply, "burn");
        Ok(self.append(Some(caller), OperationKind::Burn, caller, BURN_ADDRESS, amount))
    }

    /// Fee-less internal transfer used by the recovery coordinator's
    /// guardian payouts, logged as a `Reward` record.
    pub(crate) fn reward(&mut self, from: &str, to: &str, amount: u64) -> Result<u64, LedgerError> {
        let available = self.balances.balance_of(from);
        if available < amount {
            return Err(LedgerError::InsufficientBalance {
                available,
                requested: amount,
            });
        }

        self.balances.debit(from, amount)?;
        self.balances.credit(to, amount)?;

        debug!(from, to, amount, "guardian reward");
        Ok(self.append(None, OperationKind::Reward, from, to, amount))
    }

    // -- Owner-gated configuration ------------------------------------------

    /// Transfers administrative control to a new owner. Owner only.
    pub fn set_owner(&mut self, caller: &str, new_owner: &str) -> Result<(), LedgerError> {
        self.require_owner(caller)?;
        info!(old = %self.owner, new = new_owner, "owner changed");
        self.owner = new_owner.to_string();
        Ok(())
    }

    /// Changes the flat operation fee. Owner only.
    pub fn set_fee(&mut self, caller: &str, fee: u64) -> Result<(), LedgerError> {
        self.require_owner(caller)?;
        info!(old = self.fee, new = fee, "fee changed");
        self.fee = fee;
        Ok(())
    }

    /// Redirects future fees to a new recipient. Owner only.
    pub fn set_fee_recipient(&mut self, caller: &str, recipient: &str) -> Result<(), LedgerError> {
        self.require_owner(caller)?;
        info!(old = %self.fee_recipient, new = recipient, "fee recipient changed");
        self.fee_recipient = recipient.to_string();
        Ok(())
    }

    // -- Reads ---------------------------------------------------------------

    /// Token name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Ticker symbol.
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// Display decimal places.
    pub fn decimals(&self) -> u8 {
        self.decimals
    }

    /// Current total supply.
    pub fn total_supply(&self) -> u64 {
        self.total_supply
    }

    /// Current flat fee.
    pub fn fee(&self) -> u64 {
        self.fee
    }

    /// The administrative identity.
    pub fn owner(&self) -> &str {
        &self.owner
    }

    /// Identity credited with fees.
    pub fn fee_recipient(&self) -> &str {
        &self.fee_recipient
    }

    /// Balance for an identity. Absent means zero.
    pub fn balance_of(&self, id: &str) -> u64 {
        self.balances.balance_of(id)
    }

    /// Approved amount for `(owner, spender)`.
    pub fn allowance(&self, owner: &str, spender: &str) -> u64 {
        self.allowances.get(owner, spender)
    }

    /// Number of owners with at least one live approval.
    pub fn allowance_count(&self) -> usize {
        self.allowances.owner_count()
    }

    /// All approvals granted by `owner`.
    pub fn approvals_for(&self, owner: &str) -> Vec<(String, u64)> {
        self.allowances.approvals_for(owner)
    }

    /// Holders sorted by balance descending, paginated.
    pub fn holders(&self, start: usize, limit: usize) -> Vec<(String, u64)> {
        self.balances.holders(start, limit)
    }

    /// The token's metadata view.
    pub fn metadata(&self) -> TokenMetadata {
        TokenMetadata {
            name: self.name.clone(),
            symbol: self.symbol.clone(),
            decimals: self.decimals,
            total_supply: self.total_supply,
            owner: self.owner.clone(),
            fee_recipient: self.fee_recipient.clone(),
            fee: self.fee,
        }
    }

    /// Metadata plus holder count and history size.
    pub fn token_info(&self, host_balance: Option<u64>) -> TokenInfo {
        TokenInfo {
            metadata: self.metadata(),
            holder_count: self.balances.holder_count(),
            history_size: self.log.len(),
            host_balance,
        }
    }

    /// Length of the transaction log.
    pub fn history_size(&self) -> u64 {
        self.log.len()
    }

    /// Point lookup in the transaction log.
    pub fn get_transaction(&self, index: u64) -> Result<&TxRecord, LedgerError> {
        self.log.get(index)
    }

    /// At most `limit` records starting at sequence index `start`.
    pub fn get_transactions(&self, start: u64, limit: usize) -> Vec<TxRecord> {
        self.log.range(start, limit).cloned().collect()
    }

    /// Number of records involving `id`.
    pub fn transaction_count_for(&self, id: &str) -> u64 {
        self.log.participant_count(id)
    }

    /// At most `limit` records involving `id`, starting at the
    /// `start`-th match.
    pub fn transactions_for(&self, id: &str, start: usize, limit: usize) -> Vec<TxRecord> {
        self.log.filter_by_participant(id, start, limit)
    }

    // -- Internals -----------------------------------------------------------

    fn require_owner(&self, caller: &str) -> Result<(), LedgerError> {
        if caller != self.owner {
            warn!(caller, owner = %self.owner, "owner-only call rejected");
            return Err(LedgerError::Unauthorized {
                caller: caller.to_string(),
            });
        }
        Ok(())
    }

    fn append(
        &mut self,
        caller: Option<&str>,
        kind: OperationKind,
        from: &str,
        to: &str,
        amount: u64,
    ) -> u64 {
        let fee = match kind {
            OperationKind::Mint | OperationKind::Burn | OperationKind::Reward => 0,
            _ => self.fee,
        };
        self.log.append(TxRecord {
            caller: caller.map(str::to_string),
            kind,
            index: 0, // assigned by the log
            from: from.to_string(),
            to: to.to_string(),
            amount,
            fee,
            timestamp: Utc::now(),
            status: TxStatus::Succeeded,
        })
    }

    // -- Snapshot access (crate-internal) ------------------------------------

    pub(crate) fn balances(&self) -> &BalanceBook {
        &self.balances
    }

    pub(crate) fn allowances(&self) -> &AllowanceBook {
        &self.allowances
    }

    pub(crate) fn log(&self) -> &TransactionLog {
        &self.log
    }

    /// Rebuilds a store from snapshot parts. Only the persistence
    /// adapter calls this; it trusts the snapshot to satisfy the
    /// conservation invariant because it was captured under it.
    pub(crate) fn from_parts(
        metadata: TokenMetadata,
        balances: BalanceBook,
        allowances: AllowanceBook,
        log: TransactionLog,
    ) -> Self {
        Self {
            name: metadata.name,
            symbol: metadata.symbol,
            decimals: metadata.decimals,
            total_supply: metadata.total_supply,
            owner: metadata.owner,
            fee_recipient: metadata.fee_recipient,
            fee: metadata.fee,
            balances,
            allowances,
            log,
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
