//! # Balance Book
//!
//! Identity → amount, with the absent-means-zero rule enforced at the
//! map itself: a key is present if and only if its amount is strictly
//! positive. Debiting an account to zero removes the entry; crediting
//! zero inserts nothing. This keeps `sum(values) == total_supply`
//! checkable by a plain fold and keeps holder counts honest.
//!
//! The book does arithmetic, not policy. Fees, authorization, and
//! logging live in [`super::store`].

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::error::LedgerError;

/// The complete set of token balances, keyed by identity.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BalanceBook {
    balances: HashMap<String, u64>,
}

impl BalanceBook {
    /// Creates an empty book.
    pub fn new() -> Self {
        Self {
            balances: HashMap::new(),
        }
    }

    /// Returns the balance for an identity. Absent means zero.
    pub fn balance_of(&self, id: &str) -> u64 {
        self.balances.get(id).copied().unwrap_or(0)
    }

    /// Adds funds to an identity.
    ///
    /// Crediting zero is a no-op and does not create an entry.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::Overflow`] if the credit would exceed
    /// `u64::MAX`. Under the conservation invariant this cannot happen
    /// for funds already inside the supply, but mint paths can reach it.
    pub fn credit(&mut self, id: &str, amount: u64) -> Result<u64, LedgerError> {
        if amount == 0 {
            return Ok(self.balance_of(id));
        }
        let current = self.balance_of(id);
        let updated = current
            .checked_add(amount)
            .ok_or(LedgerError::Overflow(current, amount))?;
        self.balances.insert(id.to_string(), updated);
        Ok(updated)
    }

    /// Removes funds from an identity, deleting the entry when it
    /// reaches zero.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InsufficientBalance`] if the debit exceeds
    /// the available funds. The book is untouched on failure.
    pub fn debit(&mut self, id: &str, amount: u64) -> Result<u64, LedgerError> {
        let current = self.balance_of(id);
        if current < amount {
            return Err(LedgerError::InsufficientBalance {
                available: current,
                requested: amount,
            });
        }
        let remaining = current - amount;
        if remaining == 0 {
            self.balances.remove(id);
        } else {
            self.balances.insert(id.to_string(), remaining);
        }
        Ok(remaining)
    }

    /// Number of identities with a strictly positive balance.
    pub fn holder_count(&self) -> usize {
        self.balances.len()
    }

    /// Holders sorted by balance descending, paginated.
    ///
    /// Ties keep map iteration order, which is unspecified — callers
    /// must not rely on tie order.
    pub fn holders(&self, start: usize, limit: usize) -> Vec<(String, u64)> {
        let mut all: Vec<(String, u64)> = self
            .balances
            .iter()
            .map(|(id, amount)| (id.clone(), *amount))
            .collect();
        all.sort_by(|a, b| b.1.cmp(&a.1));
        all.into_iter().skip(start).take(limit).collect()
    }

    /// Sum of all balances. Checked against `total_supply` by the
    /// conservation tests; the sum cannot overflow while conservation
    /// holds because every unit was admitted through a checked mint.
    pub fn total(&self) -> u64 {
        self.balances.values().sum()
    }

    /// Iterates over all `(identity, amount)` entries in map order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &u64)> {
        self.balances.iter()
    }
}
