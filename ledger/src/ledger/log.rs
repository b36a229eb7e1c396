//! # Transaction Log
//!
//! Append-only, immutable history of every ledger-affecting operation.
//! Records are indexed by a monotonically increasing sequence number
//! that equals their position in the log — append assigns the index,
//! nothing ever mutates or removes an entry afterwards.
//!
//! Range reads are clipped, not errored: asking for records past the
//! end yields an empty sequence. Only the point lookup [`TransactionLog::get`]
//! treats an out-of-bounds index as an error, because a caller naming a
//! specific index expected it to exist.

use serde::{Deserialize, Serialize};

use super::error::LedgerError;
use super::record::TxRecord;

/// The append-only transaction history.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransactionLog {
    records: Vec<TxRecord>,
}

impl TransactionLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self {
            records: Vec::new(),
        }
    }

    /// Number of records appended so far. Non-decreasing for the life
    /// of the ledger.
    pub fn len(&self) -> u64 {
        self.records.len() as u64
    }

    /// Returns `true` if nothing has been logged yet. Only true before
    /// the genesis record lands.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Appends a record, assigning it the next sequence index.
    ///
    /// The `index` field of the argument is overwritten — the log is
    /// the sole authority on sequence numbers. Returns the assigned
    /// index. O(1) amortized.
    pub fn append(&mut self, mut record: TxRecord) -> u64 {
        let index = self.len();
        record.index = index;
        self.records.push(record);
        index
    }

    /// Point lookup by sequence index.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError::OutOfRange`] when `index >= len()`.
    pub fn get(&self, index: u64) -> Result<&TxRecord, LedgerError> {
        self.records
            .get(index as usize)
            .ok_or(LedgerError::OutOfRange {
                index,
                len: self.len(),
            })
    }

    /// Lazy, finite, restartable sequence of at most `limit` records
    /// starting at `start`, clipped to the current length. A `start`
    /// past the end yields an empty iterator, not an error.
    pub fn range(&self, start: u64, limit: usize) -> impl Iterator<Item = &TxRecord> {
        self.records
            .iter()
            .skip(start.min(self.len()) as usize)
            .take(limit)
    }

    /// The `limit` records involving `id`, beginning at the `start`-th
    /// match.
    ///
    /// This is a linear scan over the whole log in sequence order, not
    /// an indexed lookup — O(len) per call. An identity participates in
    /// a record when it is the logged caller, the source, or the
    /// destination.
    pub fn filter_by_participant(&self, id: &str, start: usize, limit: usize) -> Vec<TxRecord> {
        self.records
            .iter()
            .filter(|r| r.involves(id))
            .skip(start)
            .take(limit)
            .cloned()
            .collect()
    }

    /// Total number of records involving `id`. Linear scan.
    pub fn participant_count(&self, id: &str) -> u64 {
        self.records.iter().filter(|r| r.involves(id)).count() as u64
    }

    /// Iterates over the full history in sequence order.
    pub fn iter(&self) -> impl Iterator<Item = &TxRecord> {
        self.records.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::super::record::{OperationKind, TxStatus};
    use super::*;
    use chrono::Utc;

    fn record(from: &str, to: &str) -> TxRecord {
        TxRecord {
            caller: Some(from.to_string()),
            kind: OperationKind::Transfer,
            index: u64::MAX, // overwritten by append
            from: from.to_string(),
            to: to.to_string(),
            amount: 5,
            fee: 0,
            timestamp: Utc::now(),
            status: TxStatus::Succeeded,
        }
    }

    #[test]
    fn append_assigns_sequential_indices() {
        let mut log = TransactionLog::new();
        assert_eq!(log.append(record("hbr:a", "hbr:b")), 0);
        assert_eq!(log.append(record("hbr:b", "hbr:c")), 1);
        assert_eq!(log.append(record("hbr:c", "hbr:a")), 2);
        assert_eq!(log.len(), 3);

        // The stored index matches the position, whatever the caller
        // put in the field.
        assert_eq!(log.get(1).unwrap().index, 1);
    }

    #[test]
    fn get_past_end_is_out_of_range() {
        let mut log = TransactionLog::new();
        log.append(record("hbr:a", "hbr:b"));

        let err = log.get(1).unwrap_err();
        assert_eq!(err, LedgerError::OutOfRange { index: 1, len: 1 });
    }

    #[test]
    fn records_are_immutable_across_reads() {
        let mut log = TransactionLog::new();
        log.append(record("hbr:a", "hbr:b"));
        log.append(record("hbr:b", "hbr:c"));

        let first = log.get(0).unwrap().clone();
        log.append(record("hbr:c", "hbr:a"));
        assert_eq!(log.get(0).unwrap(), &first);
    }

    #[test]
    fn range_clips_to_length() {
        let mut log = TransactionLog::new();
        for _ in 0..5 {
            log.append(record("hbr:a", "hbr:b"));
        }

        assert_eq!(log.range(0, 3).count(), 3);
        assert_eq!(log.range(3, 10).count(), 2);
        assert_eq!(log.range(5, 10).count(), 0, "start at len is empty");
        assert_eq!(log.range(99, 10).count(), 0, "start past len is empty");
    }

    #[test]
    fn range_is_restartable() {
        let mut log = TransactionLog::new();
        for _ in 0..4 {
            log.append(record("hbr:a", "hbr:b"));
        }

        let first: Vec<u64> = log.range(1, 2).map(|r| r.index).collect();
        let second: Vec<u64> = log.range(1, 2).map(|r| r.index).collect();
        assert_eq!(first, vec![1, 2]);
        assert_eq!(first, second);
    }

    #[test]
    fn participant_filter_scans_in_order() {
        let mut log = TransactionLog::new();
        log.append(record("hbr:a", "hbr:b")); // 0: involves a, b
        log.append(record("hbr:c", "hbr:d")); // 1
        log.append(record("hbr:b", "hbr:c")); // 2: involves b
        log.append(record("hbr:d", "hbr:b")); // 3: involves b

        let all = log.filter_by_participant("hbr:b", 0, 10);
        assert_eq!(
            all.iter().map(|r| r.index).collect::<Vec<_>>(),
            vec![0, 2, 3]
        );

        // start counts matches, not log positions.
        let tail = log.filter_by_participant("hbr:b", 1, 1);
        assert_eq!(tail.len(), 1);
        assert_eq!(tail[0].index, 2);

        assert_eq!(log.participant_count("hbr:b"), 3);
        assert_eq!(log.participant_count("hbr:z"), 0);
    }
}
