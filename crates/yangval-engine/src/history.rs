//! Bounded record of committed transactions

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::Serialize;
use yangval_core_types::TransactionId;

/// One successful commit
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommitRecord {
    pub txn_id: TransactionId,
    pub committed_at: DateTime<Utc>,
    /// SHA-256 of the committed tree's canonical JSON
    pub digest: String,
    /// Instance paths the transaction changed
    pub touched: Vec<String>,
}

/// Most recent commits, oldest first
#[derive(Debug, Clone, Default)]
pub struct CommitHistory {
    records: VecDeque<CommitRecord>,
    limit: usize,
}

impl CommitHistory {
    pub fn new(limit: usize) -> Self {
        Self {
            records: VecDeque::with_capacity(limit),
            limit,
        }
    }

    /// Append a record, evicting the oldest beyond the limit
    pub fn push(&mut self, record: CommitRecord) {
        self.records.push_back(record);
        while self.records.len() > self.limit {
            self.records.pop_front();
        }
    }

    pub fn latest(&self) -> Option<&CommitRecord> {
        self.records.back()
    }

    pub fn iter(&self) -> impl Iterator<Item = &CommitRecord> {
        self.records.iter()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
