//! # Allowance Book
//!
//! Owner → spender → approved amount. The same absent-means-zero rule
//! as the balance book, applied at both levels: an owner with no live
//! approvals has no entry at all, and consuming an allowance down to
//! zero removes first the spender entry and then, if it was the last
//! one, the owner entry.
//!
//! Approvals use overwrite semantics — a second `approve` replaces the
//! stored amount, it never accumulates.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::error::LedgerError;

/// The complete set of spending approvals.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AllowanceBook {
    allowances: HashMap<String, HashMap<String, u64>>,
}

impl AllowanceBook {
    /// Creates an empty book.
    pub fn new() -> Self {
        Self {
            allowances: HashMap::new(),
        }
    }

    /// Returns the approved amount for `(owner, spender)`. Absent at
    /// either level means zero.
    pub fn get(&self, owner: &str, spender: &str) -> u64 {
        self.allowances
            .get(owner)
            .and_then(|spenders| spenders.get(spender))
            .copied()
            .unwrap_or(0)
    }

    /// Stores an approval, overwriting any prior amount. An amount of
    /// zero deletes the entry instead.
    pub fn set(&mut self, owner: &str, spender: &str, amount: u64) {
        if amount == 0 {
            self.remove(owner, spender);
            return;
        }
        self.allowances
            .entry(owner.to_string())
            .or_default()
            .insert(spender.to_string(), amount);
    }

    /// Decrements an approval after a spend, removing the entry when it
    /// reaches zero.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::InsufficientAllowance`] if the spend
    /// exceeds the approved amount. The book is untouched on failure.
    pub fn consume(&mut self, owner: &str, spender: &str, amount: u64) -> Result<u64, LedgerError> {
        let approved = self.get(owner, spender);
        if approved < amount {
            return Err(LedgerError::InsufficientAllowance {
                approved,
                requested: amount,
            });
        }
        let remaining = approved - amount;
        if remaining == 0 {
            self.remove(owner, spender);
        } else {
            self.allowances
                .entry(owner.to_string())
                .or_default()
                .insert(spender.to_string(), remaining);
        }
        Ok(remaining)
    }

    /// Number of owners with at least one live approval.
    pub fn owner_count(&self) -> usize {
        self.allowances.len()
    }

    /// All live approvals granted by `owner`, as `(spender, amount)`
    /// pairs. Order is unspecified.
    pub fn approvals_for(&self, owner: &str) -> Vec<(String, u64)> {
        self.allowances
            .get(owner)
            .map(|spenders| {
                spenders
                    .iter()
                    .map(|(spender, amount)| (spender.clone(), *amount))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Iterates over all `(owner, spender, amount)` triples in map order.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &String, u64)> {
        self.allowances.iter().flat_map(|(owner, spenders)| {
            spenders
                .iter()
                .map(move |(spender, amount)| (owner, spender, *amount))
        })
    }

    fn remove(&mut self, owner: &str, spender: &str) {
        if let Some(spenders) = self.allowances.get_mut(owner) {
            spenders.remove(spender);
            if spenders.is_empty() {
                self.allowances.remove(owner);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn absent_at_either_level_means_zero() {
        let book = AllowanceBook::new();
        assert_eq!(book.get("hbr:alice", "hbr:bob"), 0);
        assert_eq!(book.owner_count(), 0);
    }

    #[test]
    fn set_overwrites_never_accumulates() {
        let mut book = AllowanceBook::new();
        book.set("hbr:alice", "hbr:bob", 50);
        book.set("hbr:alice", "hbr:bob", 20);
        assert_eq!(book.get("hbr:alice", "hbr:bob"), 20);
    }

    #[test]
    fn set_zero_deletes_entry() {
        let mut book = AllowanceBook::new();
        book.set("hbr:alice", "hbr:bob", 50);
        book.set("hbr:alice", "hbr:bob", 0);

        assert_eq!(book.get("hbr:alice", "hbr:bob"), 0);
        assert_eq!(book.owner_count(), 0, "empty owner entry must be removed");
    }

    #[test]
    fn consume_partial_leaves_remainder() {
        let mut book = AllowanceBook::new();
        book.set("hbr:alice", "hbr:bob", 50);

        let remaining = book.consume("hbr:alice", "hbr:bob", 30).unwrap();
        assert_eq!(remaining, 20);
        assert_eq!(book.get("hbr:alice", "hbr:bob"), 20);
    }

    #[test]
    fn consume_to_zero_removes_both_levels() {
        let mut book = AllowanceBook::new();
        book.set("hbr:alice", "hbr:bob", 50);
        book.consume("hbr:alice", "hbr:bob", 50).unwrap();

        assert_eq!(book.get("hbr:alice", "hbr:bob"), 0);
        assert_eq!(book.owner_count(), 0);
        assert!(book.approvals_for("hbr:alice").is_empty());
    }

    #[test]
    fn consume_beyond_approval_rejected() {
        let mut book = AllowanceBook::new();
        book.set("hbr:alice", "hbr:bob", 10);

        let err = book.consume("hbr:alice", "hbr:bob", 11).unwrap_err();
        assert_eq!(
            err,
            LedgerError::InsufficientAllowance {
                approved: 10,
                requested: 11
            }
        );
        assert_eq!(book.get("hbr:alice", "hbr:bob"), 10);
    }

    #[test]
    fn independent_spenders_per_owner() {
        let mut book = AllowanceBook::new();
        book.set("hbr:alice", "hbr:bob", 10);
        book.set("hbr:alice", "hbr:carol", 20);

        let mut approvals = book.approvals_for("hbr:alice");
        approvals.sort();
        assert_eq!(
            approvals,
            vec![
                ("hbr:bob".to_string(), 10),
                ("hbr:carol".to_string(), 20)
            ]
        );
        assert_eq!(book.owner_count(), 1);
    }

    #[test]
    fn removing_one_spender_keeps_owner_entry() {
        let mut book = AllowanceBook::new();
        book.set("hbr:alice", "hbr:bob", 10);
        book.set("hbr:alice", "hbr:carol", 20);
        book.consume("hbr:alice", "hbr:bob", 10).unwrap();

        assert_eq!(book.owner_count(), 1);
        assert_eq!(book.get("hbr:alice", "hbr:carol"), 20);
    }
}
