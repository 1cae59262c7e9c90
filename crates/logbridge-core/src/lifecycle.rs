//! Bridge lifecycle state machine

use serde::{Deserialize, Serialize};

/// Lifecycle of a bridge instance
///
/// State transitions:
/// ```text
/// Active → Stopping → Stopped
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifecycleState {
    /// Consumer thread running; both dispatch paths accept messages
    #[default]
    Active,
    /// Queue closed; consumer draining or discarding what remains
    Stopping,
    /// Consumer joined; only synchronous delivery remains available
    Stopped,
}

impl LifecycleState {
    /// Check if this state can transition to the target state
    pub fn can_transition_to(&self, target: LifecycleState) -> bool {
        use LifecycleState::*;
        matches!((self, target), (Active, Stopping) | (Stopping, Stopped))
    }

    /// Check if the async path accepts new messages in this state
    pub fn accepts_async(&self) -> bool {
        matches!(self, LifecycleState::Active)
    }

    /// Check if this is the terminal state
    pub fn is_terminal(&self) -> bool {
        matches!(self, LifecycleState::Stopped)
    }

    /// Encode as the single byte stored in the bridge's atomic
    pub fn as_u8(&self) -> u8 {
        match self {
            LifecycleState::Active => 0,
            LifecycleState::Stopping => 1,
            LifecycleState::Stopped => 2,
        }
    }

    /// Decode a byte produced by [`LifecycleState::as_u8`]
    pub fn from_u8(value: u8) -> Self {
        match value {
            0 => LifecycleState::Active,
            1 => LifecycleState::Stopping,
            _ => LifecycleState::Stopped,
        }
    }
}

impl std::fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LifecycleState::Active => write!(f, "Active"),
            LifecycleState::Stopping => write!(f, "Stopping"),
            LifecycleState::Stopped => write!(f, "Stopped"),
        }
    }
}
