//! Play-state packets involved in signed chat.

mod s_chat_ack;
mod s_chat_session_update;
mod s_player_chat;

use std::io::{Cursor, Result, Write};

use conduit_utils::DecodeError;

pub use s_chat_ack::SChatAck;
pub use s_chat_session_update::{
    MAX_KEY_SIGNATURE_LENGTH, MAX_PUBLIC_KEY_LENGTH, SChatSessionUpdate,
};
pub use s_player_chat::{
    FilterMask, MAX_MESSAGE_LENGTH, MESSAGE_SIGNATURE_SIZE, MessageSignature, PreviousMessageAck,
    SPlayerChat,
};

use crate::{EncodedPacket, ProtocolVersion, ServerPacket};

/// Which chat packet the framing layer routed to us.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChatPacketKind {
    /// [`SChatSessionUpdate`].
    ChatSessionUpdate,
    /// [`SPlayerChat`].
    PlayerChat,
    /// [`SChatAck`].
    ChatAck,
}

/// Every serverbound packet the chat subsystem handles.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ServerboundChatPacket {
    /// A new chat session.
    ChatSessionUpdate(SChatSessionUpdate),
    /// A chat message.
    PlayerChat(SPlayerChat),
    /// A message acknowledgement.
    ChatAck(SChatAck),
}

impl ServerboundChatPacket {
    /// Decodes the body of a packet of the given kind.
    pub fn read(
        kind: ChatPacketKind,
        data: &mut Cursor<&[u8]>,
        version: ProtocolVersion,
    ) -> std::result::Result<Self, DecodeError> {
        Ok(match kind {
            ChatPacketKind::ChatSessionUpdate => {
                Self::ChatSessionUpdate(SChatSessionUpdate::read_packet(data, version)?)
            }
            ChatPacketKind::PlayerChat => Self::PlayerChat(SPlayerChat::read_packet(data, version)?),
            ChatPacketKind::ChatAck => Self::ChatAck(SChatAck::read_packet(data, version)?),
        })
    }

    /// The kind of this packet.
    #[must_use]
    pub const fn kind(&self) -> ChatPacketKind {
        match self {
            Self::ChatSessionUpdate(_) => ChatPacketKind::ChatSessionUpdate,
            Self::PlayerChat(_) => ChatPacketKind::PlayerChat,
            Self::ChatAck(_) => ChatPacketKind::ChatAck,
        }
    }
}

impl EncodedPacket for ServerboundChatPacket {
    fn write_packet(&self, writer: &mut impl Write, version: ProtocolVersion) -> Result<()> {
        match self {
            Self::ChatSessionUpdate(packet) => packet.write_packet(writer, version),
            Self::PlayerChat(packet) => packet.write_packet(writer, version),
            Self::ChatAck(packet) => packet.write_packet(writer, version),
        }
    }
}
