//! The chat event fired for every player message.

use futures::future::BoxFuture;
use uuid::Uuid;

use super::ChatError;

/// A chat message offered to event listeners.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlayerChatEvent {
    /// Account id of the sender.
    pub sender: Uuid,
    /// Name of the sender.
    pub username: String,
    /// The message as the client sent it.
    pub message: String,
    /// Whether the message is signed, in which case it can be neither
    /// cancelled nor changed.
    pub signed: bool,
}

/// The verdict of the event listeners.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatResult {
    allowed: bool,
    message: Option<String>,
}

impl ChatResult {
    /// Let the message through unchanged.
    #[must_use]
    pub const fn allowed() -> Self {
        Self {
            allowed: true,
            message: None,
        }
    }

    /// Drop the message.
    #[must_use]
    pub const fn denied() -> Self {
        Self {
            allowed: false,
            message: None,
        }
    }

    /// Let the message through with `message` as its text.
    #[must_use]
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            allowed: true,
            message: Some(message.into()),
        }
    }

    /// Whether the message may be sent at all.
    #[must_use]
    pub const fn is_allowed(&self) -> bool {
        self.allowed
    }

    /// The replacement text, if any.
    #[must_use]
    pub fn replacement(&self) -> Option<&str> {
        self.message.as_deref()
    }
}

/// Where chat events are dispatched to listeners.
///
/// `fire` is called when the packet arrives; the returned future may resolve
/// at any later point, on any thread.
pub trait ChatEventPipeline: Send + Sync {
    /// Dispatches `event` and resolves to the listeners' verdict.
    fn fire(&self, event: PlayerChatEvent) -> BoxFuture<'static, Result<ChatResult, ChatError>>;
}
