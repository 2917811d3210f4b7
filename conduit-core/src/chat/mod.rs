//! Signed chat handling for a proxied connection.
//!
//! Packets come in through [`SessionChatHandler`], chat messages are run past
//! the [`ChatEventPipeline`] and their outcomes leave through the per-player
//! [`ChatQueue`], in the order the client sent them.

pub mod event;
pub mod queue;
pub mod session_handler;

use std::fmt;

use conduit_protocol::packets::game::ServerboundChatPacket;
use thiserror::Error;

pub use event::{ChatEventPipeline, ChatResult, PlayerChatEvent};
pub use queue::ChatQueue;
pub use session_handler::SessionChatHandler;

/// An error that ends the processing of a single chat message.
#[derive(Error, Debug)]
pub enum ChatError {
    /// The event pipeline failed to produce a result.
    #[error("Chat event pipeline failed: {0}")]
    Pipeline(String),
    /// The task computing the outcome panicked or was aborted.
    #[error("Chat task did not complete: {0}")]
    Aborted(String),
}

/// What happens to one queued chat entry.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ChatOutcome {
    /// Forward this packet to the backend.
    Allow(ServerboundChatPacket),
    /// Forward nothing.
    Cancel,
}

/// A policy decision the signed chat protocol cannot honour.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChatViolation {
    /// A signed message was cancelled.
    InvalidCancellation,
    /// The text of a signed message was changed.
    InvalidChange,
}

impl fmt::Display for ChatViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::InvalidCancellation => "cancelled a signed chat message",
            Self::InvalidChange => "changed the content of a signed chat message",
        })
    }
}

/// The connection layer the chat subsystem talks back to.
pub trait ConnectionSink: Send + Sync {
    /// Writes a packet to the backend server.
    fn forward(&self, packet: ServerboundChatPacket);

    /// Disconnects the player with `reason`.
    fn disconnect(&self, reason: &str);

    /// Called when a policy tried something signed chat does not allow. The
    /// message in question has already been dropped.
    fn report_violation(&self, violation: ChatViolation) {
        let _ = violation;
    }
}
