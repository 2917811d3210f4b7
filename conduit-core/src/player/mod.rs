//! The player side of a proxied connection, as far as chat is concerned.

pub mod chat_session;
pub mod chat_state;

use std::fmt;
use std::sync::Arc;

use uuid::Uuid;

pub use chat_session::{ChatSession, KeyRevision, SessionError};
pub use chat_state::ChatState;

use crate::chat::ConnectionSink;

/// A connected player.
pub struct ChatPlayer {
    /// The account id established at login. Never changes.
    pub account_id: Uuid,
    /// The account name.
    pub username: String,
    /// Secure chat state.
    pub chat: ChatState,
    connection: Arc<dyn ConnectionSink>,
}

impl ChatPlayer {
    /// Creates a player whose chat goes out through `connection`.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime.
    #[must_use]
    pub fn new(
        account_id: Uuid,
        username: impl Into<String>,
        connection: Arc<dyn ConnectionSink>,
    ) -> Self {
        let username = username.into();
        Self {
            account_id,
            chat: ChatState::new(username.clone(), connection.clone()),
            username,
            connection,
        }
    }

    /// The connection this player's packets leave through.
    #[must_use]
    pub fn connection(&self) -> &Arc<dyn ConnectionSink> {
        &self.connection
    }

    /// Disconnects the player.
    pub fn disconnect(&self, reason: &str) {
        log::info!("Disconnecting {self}: {reason}");
        self.connection.disconnect(reason);
    }

    /// Called by the connection layer once the connection is gone.
    pub fn close(&self) {
        self.chat.close();
    }
}

impl fmt::Display for ChatPlayer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.username, self.account_id)
    }
}
