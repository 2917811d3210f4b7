//! Proxy-wide state shared by every connection.

use std::sync::Arc;

use conduit_crypto::PublicKeyDirectory;
use tokio_util::sync::CancellationToken;

use crate::chat::{ChatEventPipeline, SessionChatHandler};
use crate::config::SecureChatConfig;
use crate::player::ChatPlayer;

/// The main proxy struct.
pub struct Proxy {
    /// The cancellation token for graceful shutdown.
    pub cancel_token: CancellationToken,
    /// The authentication service's trusted keys, fetched once at startup.
    pub keys: Arc<PublicKeyDirectory>,
    /// Secure chat settings.
    pub secure_chat: Arc<SecureChatConfig>,
}

impl Proxy {
    /// Creates the proxy state.
    #[must_use]
    pub fn new(
        keys: PublicKeyDirectory,
        secure_chat: SecureChatConfig,
        cancel_token: CancellationToken,
    ) -> Self {
        Self {
            cancel_token,
            keys: Arc::new(keys),
            secure_chat: Arc::new(secure_chat),
        }
    }

    /// A chat handler for a newly connected `player`, sharing this proxy's
    /// keys and settings.
    #[must_use]
    pub fn chat_handler(
        &self,
        player: Arc<ChatPlayer>,
        pipeline: Arc<dyn ChatEventPipeline>,
    ) -> SessionChatHandler {
        SessionChatHandler::new(
            player,
            pipeline,
            self.keys.clone(),
            self.secure_chat.clone(),
        )
    }
}
