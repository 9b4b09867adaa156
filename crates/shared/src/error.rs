use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure taxonomy at the engine boundary.
///
/// `Mailbox` failures happen before any transfer-level session exists
/// (connection code negotiation); `Transfer` failures belong to an active
/// session; `Command` failures are synchronous rejections of a direct
/// engine call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Mailbox,
    Transfer,
    Command,
}

#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[error("{kind:?} failure: {message}")]
pub struct EngineFailure {
    pub kind: FailureKind,
    pub message: String,
}

impl EngineFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn mailbox(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Mailbox, message)
    }

    pub fn transfer(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Transfer, message)
    }

    pub fn command(message: impl Into<String>) -> Self {
        Self::new(FailureKind::Command, message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constructors_set_the_kind() {
        assert_eq!(EngineFailure::mailbox("m").kind, FailureKind::Mailbox);
        assert_eq!(EngineFailure::transfer("t").kind, FailureKind::Transfer);
        assert_eq!(EngineFailure::command("c").kind, FailureKind::Command);
    }

    #[test]
    fn display_includes_kind_and_message() {
        let failure = EngineFailure::transfer("peer went away");
        assert_eq!(failure.to_string(), "Transfer failure: peer went away");
    }
}
