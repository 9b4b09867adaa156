//! In-memory session table and the structural merge that keeps it
//! consistent under partial event payloads.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use shared::{
    domain::{ConnectionCode, Direction, SessionId, TransferPhase},
    protocol::OfferDetails,
};

/// One tracked transfer, send or receive.
///
/// `display_name` may start out as a placeholder until the engine reports
/// the real name. `error` is tracked independently of `phase` because the
/// two can arrive on different channels in either order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub direction: Direction,
    pub display_name: String,
    pub transferred_bytes: u64,
    pub total_bytes: u64,
    pub percentage: u8,
    pub phase: TransferPhase,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection_code: Option<ConnectionCode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip)]
    seq: u64,
}

impl Session {
    fn blank(id: SessionId, direction: Direction, seq: u64) -> Self {
        Self {
            id,
            direction,
            display_name: String::new(),
            transferred_bytes: 0,
            total_bytes: 0,
            percentage: 0,
            phase: TransferPhase::Preparing,
            connection_code: None,
            error: None,
            seq,
        }
    }

    pub fn is_failed(&self) -> bool {
        self.phase == TransferPhase::Failed || self.error.is_some()
    }

    fn apply(&mut self, patch: SessionPatch) {
        if let Some(display_name) = patch.display_name {
            self.display_name = display_name;
        }
        if let Some(transferred_bytes) = patch.transferred_bytes {
            self.transferred_bytes = transferred_bytes;
        }
        if let Some(total_bytes) = patch.total_bytes {
            self.total_bytes = total_bytes;
        }
        if let Some(percentage) = patch.percentage {
            self.percentage = percentage.min(100);
        }
        if let Some(phase) = patch.phase {
            self.phase = phase;
        }
        if let Some(connection_code) = patch.connection_code {
            self.connection_code = Some(connection_code);
        }
        if let Some(error) = patch.error {
            self.error = Some(error);
        }
    }
}

/// Field-level patch. `None` preserves the existing value, so events that
/// carry partial information never clobber fields they do not mention.
#[derive(Debug, Clone, Default)]
pub struct SessionPatch {
    pub direction: Option<Direction>,
    pub display_name: Option<String>,
    pub transferred_bytes: Option<u64>,
    pub total_bytes: Option<u64>,
    pub percentage: Option<u8>,
    pub phase: Option<TransferPhase>,
    pub connection_code: Option<ConnectionCode>,
    pub error: Option<String>,
}

impl SessionPatch {
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            phase: Some(TransferPhase::Failed),
            error: Some(error.into()),
            ..Self::default()
        }
    }
}

/// A receive-side offer awaiting the user's accept/deny decision. Distinct
/// from a Session: acceptance makes the engine start emitting session
/// events under the same id, it never converts this record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingOffer {
    pub id: SessionId,
    pub file_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
}

impl From<OfferDetails> for PendingOffer {
    fn from(details: OfferDetails) -> Self {
        Self {
            id: details.id,
            file_name: details.file_name,
            file_size: details.file_size,
        }
    }
}

/// The session table. One record per id; all mutation goes through
/// `upsert`/`remove` so the merge rules hold everywhere.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    sessions: HashMap<SessionId, Session>,
    next_seq: u64,
}

impl SessionRegistry {
    pub fn get(&self, id: &SessionId) -> Option<&Session> {
        self.sessions.get(id)
    }

    pub fn contains(&self, id: &SessionId) -> bool {
        self.sessions.contains_key(id)
    }

    /// Merge `patch` into the session for `id`, creating a zeroed record
    /// first when none exists. Never errors.
    pub fn upsert(&mut self, id: &SessionId, patch: SessionPatch) -> &Session {
        let seq = &mut self.next_seq;
        let session = self.sessions.entry(id.clone()).or_insert_with(|| {
            let direction = patch.direction.unwrap_or(Direction::Send);
            let blank = Session::blank(id.clone(), direction, *seq);
            *seq += 1;
            blank
        });
        session.apply(patch);
        session
    }

    /// No-op when the id is unknown (e.g. a scheduled removal racing an
    /// explicit dismiss).
    pub fn remove(&mut self, id: &SessionId) -> Option<Session> {
        self.sessions.remove(id)
    }

    /// Immutable clone of every session, newest first.
    pub fn snapshot(&self) -> Vec<Session> {
        let mut sessions: Vec<Session> = self.sessions.values().cloned().collect();
        sessions.sort_by(|a, b| b.seq.cmp(&a.seq));
        sessions
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
