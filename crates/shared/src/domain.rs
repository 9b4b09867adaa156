use serde::{Deserialize, Serialize};

macro_rules! opaque_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

opaque_id!(SessionId);
opaque_id!(ConnectionCode);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Send,
    Receive,
}

/// Lifecycle phase reported for a session. `Sending`/`Receiving` are the
/// active-transfer phases for the respective direction; the other variants
/// are shared between both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransferPhase {
    Preparing,
    Waiting,
    Packaging,
    Sending,
    Receiving,
    Completed,
    Failed,
}

impl TransferPhase {
    /// The active-transfer phase for a direction.
    pub fn active(direction: Direction) -> Self {
        match direction {
            Direction::Send => TransferPhase::Sending,
            Direction::Receive => TransferPhase::Receiving,
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, TransferPhase::Completed | TransferPhase::Failed)
    }
}
