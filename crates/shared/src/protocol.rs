use serde::{Deserialize, Serialize};

use crate::domain::{ConnectionCode, SessionId, TransferPhase};

/// Progress payload shared by the send and receive progress channels.
///
/// Every field is authoritative for the event it arrives in; `total` may be
/// zero while the engine has not yet sized the payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressBody {
    pub id: SessionId,
    pub file_name: String,
    pub transferred: u64,
    pub total: u64,
    pub percentage: u8,
    /// Phase hint from the engine (waiting for a peer, packaging a folder).
    /// Absent once bytes are actually moving.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub phase: Option<TransferPhase>,
}

/// A transfer-level failure reported for a known (or about-to-be-known) id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureBody {
    pub id: SessionId,
    pub file_name: String,
    pub error: String,
}

/// The result of a successful offer lookup on the receive side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OfferDetails {
    pub id: SessionId,
    pub file_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file_size: Option<u64>,
}

/// Asynchronous notifications emitted by the transfer engine.
///
/// Delivery is ordered within one variant kind and unordered across kinds;
/// consumers must treat the payloads as field-level patches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "snake_case")]
pub enum EngineEvent {
    ConnectionCodeAssigned {
        session_id: SessionId,
        code: ConnectionCode,
    },
    ConnectionCodeFailed {
        session_id: SessionId,
        message: String,
    },
    SendProgress(ProgressBody),
    SendFailed(FailureBody),
    ReceiveProgress(ProgressBody),
    ReceiveFailed(FailureBody),
    OfferReceived(OfferDetails),
}

impl EngineEvent {
    /// The session id this event is about.
    pub fn session_id(&self) -> &SessionId {
        match self {
            EngineEvent::ConnectionCodeAssigned { session_id, .. }
            | EngineEvent::ConnectionCodeFailed { session_id, .. } => session_id,
            EngineEvent::SendProgress(body) | EngineEvent::ReceiveProgress(body) => &body.id,
            EngineEvent::SendFailed(body) | EngineEvent::ReceiveFailed(body) => &body.id,
            EngineEvent::OfferReceived(details) => &details.id,
        }
    }
}
