//! Chat handling for clients using session-based signed chat.

use std::io::Cursor;
use std::sync::Arc;

use conduit_crypto::PublicKeyDirectory;
use conduit_protocol::ProtocolVersion;
use conduit_protocol::packets::game::{
    ChatPacketKind, PreviousMessageAck, SChatSessionUpdate, SPlayerChat, ServerboundChatPacket,
};

use super::{
    ChatError, ChatEventPipeline, ChatOutcome, ChatResult, ChatViolation, PlayerChatEvent,
};
use crate::config::{SecureChatConfig, UnverifiedSessionPolicy};
use crate::player::{ChatPlayer, ChatSession, chat_session::epoch_millis};

/// Disconnect reason for players whose chat session does not verify.
pub const INVALID_SESSION_REASON: &str =
    "Invalid signature for profile public key. Try restarting your game.";

/// Handles the chat packets of one player.
pub struct SessionChatHandler {
    player: Arc<ChatPlayer>,
    pipeline: Arc<dyn ChatEventPipeline>,
    keys: Arc<PublicKeyDirectory>,
    config: Arc<SecureChatConfig>,
}

impl SessionChatHandler {
    /// Creates a handler for `player`.
    #[must_use]
    pub fn new(
        player: Arc<ChatPlayer>,
        pipeline: Arc<dyn ChatEventPipeline>,
        keys: Arc<PublicKeyDirectory>,
        config: Arc<SecureChatConfig>,
    ) -> Self {
        Self {
            player,
            pipeline,
            keys,
            config,
        }
    }

    /// Decodes a packet body routed here by the framing layer and handles it.
    ///
    /// A body that does not decode is logged and dropped without touching
    /// the session or the queue.
    pub fn handle_encoded(
        &self,
        kind: ChatPacketKind,
        body: &[u8],
        version: ProtocolVersion,
    ) -> bool {
        match ServerboundChatPacket::read(kind, &mut Cursor::new(body), version) {
            Ok(packet) => self.handle(packet),
            Err(err) => {
                log::warn!("{} sent a malformed {kind:?} packet: {err}", self.player);
                true
            }
        }
    }

    /// Handles one packet. Returns `true` when the packet was consumed and
    /// must not be passed on as-is, which is the case for every chat packet:
    /// messages and acknowledgements reach the backend through the chat queue.
    pub fn handle(&self, packet: ServerboundChatPacket) -> bool {
        match packet {
            ServerboundChatPacket::ChatSessionUpdate(packet) => {
                self.handle_session_establish(&packet)
            }
            ServerboundChatPacket::PlayerChat(packet) => {
                self.handle_player_chat(packet);
                true
            }
            ServerboundChatPacket::ChatAck(packet) => {
                self.player.chat.queue().handle_acknowledgement(packet.offset);
                true
            }
        }
    }

    /// Verifies a chat session and attaches it to the player.
    ///
    /// Always returns `true`: the backend never sees the session packet,
    /// whether or not it verified.
    pub fn handle_session_establish(&self, packet: &SChatSessionUpdate) -> bool {
        let now = self.config.enforce_expiry.then(epoch_millis);
        match ChatSession::verify(packet, self.player.account_id, &self.keys, now) {
            Ok(session) => {
                log::debug!(
                    "{} established chat session {} ({:?})",
                    self.player,
                    session.session_id(),
                    session.revision()
                );
                self.player.chat.set_chat_session(session);
            }
            Err(err) => {
                self.player.chat.clear_chat_session();
                log::warn!(
                    "{} tried to initialize a chat session with unverified details: {err}",
                    self.player
                );
                if self.config.unverified_sessions == UnverifiedSessionPolicy::Kick {
                    self.player.disconnect(INVALID_SESSION_REASON);
                }
            }
        }
        true
    }

    /// Fires the chat event for `packet` and queues its outcome.
    pub fn handle_player_chat(&self, packet: SPlayerChat) {
        if packet.is_signed() {
            let Some(session) = self.player.chat.chat_session() else {
                log::warn!(
                    "{} sent a signed chat message without a verified chat session, dropping it",
                    self.player
                );
                return;
            };
            if self.config.enforce_expiry && session.is_expired(epoch_millis()) {
                log::warn!(
                    "{} sent a signed chat message with a chat session that expired at {}, dropping it",
                    self.player,
                    session.expires_at()
                );
                return;
            }
        }

        let event_future = self.pipeline.fire(PlayerChatEvent {
            sender: self.player.account_id,
            username: self.player.username.clone(),
            message: packet.message.clone(),
            signed: packet.is_signed(),
        });

        let player = self.player.clone();
        let timestamp = packet.timestamp;
        let previous_messages = packet.previous_messages.clone();
        self.player
            .chat
            .queue()
            .submit(Some(timestamp), previous_messages, move |window| {
                async move {
                    let result = event_future.await?;
                    Ok::<_, ChatError>(resolve(&player, packet, &result, window))
                }
            });
    }
}

/// Decides what reaches the backend for `packet` given the listeners' verdict.
fn resolve(
    player: &ChatPlayer,
    packet: SPlayerChat,
    result: &ChatResult,
    window: Vec<PreviousMessageAck>,
) -> ChatOutcome {
    if !result.is_allowed() {
        if packet.is_signed() {
            report(player, ChatViolation::InvalidCancellation);
        }
        return ChatOutcome::Cancel;
    }

    match result.replacement() {
        Some(replacement) if replacement != packet.message => {
            if packet.is_signed() {
                report(player, ChatViolation::InvalidChange);
                return ChatOutcome::Cancel;
            }
            ChatOutcome::Allow(ServerboundChatPacket::PlayerChat(
                packet.rewritten(replacement.to_owned(), window),
            ))
        }
        _ => ChatOutcome::Allow(ServerboundChatPacket::PlayerChat(
            packet.with_previous_messages(window),
        )),
    }
}

fn report(player: &ChatPlayer, violation: ChatViolation) {
    log::error!(
        "A plugin {violation} from {player}. This is not possible since 1.19.1, the message was dropped."
    );
    player.connection().report_violation(violation);
}
