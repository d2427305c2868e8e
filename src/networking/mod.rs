//! Presence networking
//!
//! The venue core never owns a transport. It talks to the shared presence
//! channel through the [`PresenceSync`] contract and ships an in-process
//! implementation for simulations and tests.

pub mod local;
pub mod presence;

pub use local::LocalPresenceHub;
pub use presence::{AvatarSet, PresenceSubscription, PresenceSync, PresenceUpdate};

// Error types
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Clone, Error)]
pub enum PresenceError {
    #[error("Presence channel closed")]
    ChannelClosed,

    #[error("Avatar not known to presence: {id}")]
    UnknownAvatar { id: Uuid },

    #[error("Transport error: {reason}")]
    Transport { reason: String },

    #[error("{reason}")]
    Other { reason: String },
}

pub type PresenceResult<T> = Result<T, PresenceError>;

impl From<std::io::Error> for PresenceError {
    fn from(err: std::io::Error) -> Self {
        PresenceError::Transport { reason: err.to_string() }
    }
}
