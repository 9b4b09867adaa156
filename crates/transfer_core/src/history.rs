//! Bounded log of completed transfers.

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shared::domain::{ConnectionCode, Direction};

use crate::registry::Session;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferRecord {
    pub direction: Direction,
    pub display_name: String,
    pub total_bytes: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection_code: Option<ConnectionCode>,
    pub completed_at: DateTime<Utc>,
}

/// Keeps the most recent `capacity` completions; older entries are evicted.
#[derive(Debug)]
pub struct TransferHistory {
    records: VecDeque<TransferRecord>,
    capacity: usize,
}

impl TransferHistory {
    pub fn new(capacity: usize) -> Self {
        Self {
            records: VecDeque::with_capacity(capacity.min(64)),
            capacity,
        }
    }

    pub fn record_completed(&mut self, session: &Session) {
        if self.capacity == 0 {
            return;
        }
        while self.records.len() >= self.capacity {
            self.records.pop_front();
        }
        self.records.push_back(TransferRecord {
            direction: session.direction,
            display_name: session.display_name.clone(),
            total_bytes: session.total_bytes,
            connection_code: session.connection_code.clone(),
            completed_at: Utc::now(),
        });
    }

    /// Newest first.
    pub fn snapshot(&self) -> Vec<TransferRecord> {
        self.records.iter().rev().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{SessionPatch, SessionRegistry};
    use shared::domain::SessionId;

    fn completed_session(registry: &mut SessionRegistry, name: &str) -> Session {
        registry
            .upsert(
                &SessionId::new(name),
                SessionPatch {
                    display_name: Some(name.into()),
                    total_bytes: Some(100),
                    ..SessionPatch::default()
                },
            )
            .clone()
    }

    #[test]
    fn capacity_evicts_oldest_records() {
        let mut registry = SessionRegistry::default();
        let mut history = TransferHistory::new(2);

        for name in ["one", "two", "three"] {
            let session = completed_session(&mut registry, name);
            history.record_completed(&session);
        }

        let names: Vec<String> = history
            .snapshot()
            .into_iter()
            .map(|r| r.display_name)
            .collect();
        assert_eq!(names, vec!["three", "two"]);
    }

    #[test]
    fn zero_capacity_records_nothing() {
        let mut registry = SessionRegistry::default();
        let mut history = TransferHistory::new(0);
        let session = completed_session(&mut registry, "ignored");
        history.record_completed(&session);
        assert!(history.is_empty());
    }
}
