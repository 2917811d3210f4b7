//! Chat state for a proxied player.
//!
//! Groups the fields related to secure chat: the verified chat session and
//! the queue that orders chat outcomes towards the backend.

use std::sync::Arc;

use arc_swap::ArcSwapOption;

use super::chat_session::ChatSession;
use crate::chat::{ChatQueue, ConnectionSink};

/// All chat-related state for a player.
///
/// The session is swapped as a whole, never edited, so readers on other
/// threads see either the old session or the new one.
pub struct ChatState {
    /// The verified chat session, if the player has announced one.
    chat_session: ArcSwapOption<ChatSession>,
    /// Orders chat outcomes for delivery.
    queue: ChatQueue,
}

impl ChatState {
    /// Creates empty chat state delivering to `sink`.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime.
    #[must_use]
    pub fn new(owner: impl Into<String>, sink: Arc<dyn ConnectionSink>) -> Self {
        Self {
            chat_session: ArcSwapOption::empty(),
            queue: ChatQueue::new(owner, sink),
        }
    }

    /// The current chat session.
    #[must_use]
    pub fn chat_session(&self) -> Option<Arc<ChatSession>> {
        self.chat_session.load_full()
    }

    /// Replaces the chat session with a newly verified one.
    pub fn set_chat_session(&self, session: ChatSession) {
        self.chat_session.store(Some(Arc::new(session)));
    }

    /// Drops the chat session.
    pub fn clear_chat_session(&self) {
        self.chat_session.store(None);
    }

    /// The ordered chat queue.
    #[must_use]
    pub const fn queue(&self) -> &ChatQueue {
        &self.queue
    }

    /// Tears the chat state down when the connection closes.
    pub fn close(&self) {
        self.clear_chat_session();
        self.queue.close();
    }
}
