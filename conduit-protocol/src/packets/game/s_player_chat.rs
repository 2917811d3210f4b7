//! Signed player chat message.
//!
//! Decoded from the client, handed to the chat pipeline and re-encoded towards
//! the backend (possibly with a new acknowledgement window or rewritten text).

use std::fmt;
use std::io::{self, Cursor, Result, Write};
use std::num::NonZeroU32;

use conduit_utils::{
    OpaqueTag, VarInt,
    serial::{
        DecodeError, ReadFrom, WriteTo, read_fixed, read_len, read_string, remaining, write_string,
    },
};
use uuid::Uuid;

use crate::{EncodedPacket, ProtocolVersion, ServerPacket};

/// Longest chat message in codepoints.
pub const MAX_MESSAGE_LENGTH: usize = 256;
/// Size of every message signature in bytes.
pub const MESSAGE_SIGNATURE_SIZE: usize = 256;

/// A 256 byte message signature.
#[derive(Clone, PartialEq, Eq)]
pub struct MessageSignature(Box<[u8; MESSAGE_SIGNATURE_SIZE]>);

impl MessageSignature {
    /// Wraps raw signature bytes.
    #[must_use]
    pub fn new(bytes: [u8; MESSAGE_SIGNATURE_SIZE]) -> Self {
        Self(Box::new(bytes))
    }

    /// The raw signature bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8; MESSAGE_SIGNATURE_SIZE] {
        &self.0
    }

    fn read(data: &mut Cursor<&[u8]>, field: &'static str) -> std::result::Result<Self, DecodeError> {
        Ok(Self::new(read_fixed(data, field)?))
    }
}

impl WriteTo for MessageSignature {
    fn write(&self, writer: &mut impl Write) -> Result<()> {
        writer.write_all(&self.0[..])
    }
}

impl fmt::Debug for MessageSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "MessageSignature({})", hex::encode(&self.0[..]))
    }
}

/// One entry of the previous-message window a client acknowledges.
///
/// Id `0` on the wire means the signature follows inline; any other id points
/// back into the session's message history and carries no signature.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PreviousMessageAck {
    /// The acknowledged signature, sent in full.
    Full(MessageSignature),
    /// A back-reference to a message the receiver has already cached.
    Reference(NonZeroU32),
}

impl PreviousMessageAck {
    /// The wire id: `0` for an inline signature, the reference otherwise.
    #[must_use]
    pub const fn message_id(&self) -> u32 {
        match self {
            Self::Full(_) => 0,
            Self::Reference(id) => id.get(),
        }
    }

    /// The inline signature, present exactly when [`Self::message_id`] is `0`.
    #[must_use]
    pub const fn signature(&self) -> Option<&MessageSignature> {
        match self {
            Self::Full(signature) => Some(signature),
            Self::Reference(_) => None,
        }
    }
}

impl ReadFrom for PreviousMessageAck {
    fn read(data: &mut Cursor<&[u8]>) -> std::result::Result<Self, DecodeError> {
        let VarInt(id) = VarInt::read(data)?;
        let id = u32::try_from(id).map_err(|_| DecodeError::InvalidValue {
            field: "previous message id",
            reason: format!("negative id {id}"),
        })?;
        Ok(match NonZeroU32::new(id) {
            None => Self::Full(MessageSignature::read(data, "previous message signature")?),
            Some(id) => Self::Reference(id),
        })
    }
}

impl WriteTo for PreviousMessageAck {
    fn write(&self, writer: &mut impl Write) -> Result<()> {
        wire_int(self.message_id(), "previous message id")?.write(writer)?;
        if let Self::Full(signature) = self {
            signature.write(writer)?;
        }
        Ok(())
    }
}

/// Narrows a non-negative value to the `VarInt` it is sent as. Values the
/// decoder would read back as negative are refused.
fn wire_int(value: u32, field: &str) -> Result<VarInt> {
    i32::try_from(value).map(VarInt).map_err(|_| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("{field} {value} does not fit in a VarInt"),
        )
    })
}

/// How the sender's server filtered the message.
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum FilterMask {
    /// Nothing filtered.
    #[default]
    PassThrough,
    /// The whole message is filtered.
    FullyFiltered,
    /// Characters whose bit is set are filtered. Words are little-endian bit
    /// order, bit `i` of word `w` is character `64 * w + i`.
    PartiallyFiltered(Vec<u64>),
}

impl FilterMask {
    /// The ordinal sent on the wire.
    #[must_use]
    pub const fn ordinal(&self) -> i32 {
        match self {
            Self::PassThrough => 0,
            Self::FullyFiltered => 1,
            Self::PartiallyFiltered(_) => 2,
        }
    }
}

impl ReadFrom for FilterMask {
    fn read(data: &mut Cursor<&[u8]>) -> std::result::Result<Self, DecodeError> {
        match VarInt::read(data)?.0 {
            0 => Ok(Self::PassThrough),
            1 => Ok(Self::FullyFiltered),
            2 => {
                let words = read_len(data, "filter mask")?;
                if words > remaining(data) / 8 {
                    return Err(DecodeError::Incomplete("filter mask"));
                }
                let mut mask = Vec::with_capacity(words);
                for _ in 0..words {
                    mask.push(u64::read(data)?);
                }
                Ok(Self::PartiallyFiltered(mask))
            }
            ordinal => Err(DecodeError::InvalidOrdinal {
                field: "filter type",
                ordinal,
            }),
        }
    }
}

impl WriteTo for FilterMask {
    fn write(&self, writer: &mut impl Write) -> Result<()> {
        VarInt(self.ordinal()).write(writer)?;
        if let Self::PartiallyFiltered(mask) = self {
            VarInt(mask.len() as i32).write(writer)?;
            for word in mask {
                word.write(writer)?;
            }
        }
        Ok(())
    }
}

/// A chat message as the client submitted it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SPlayerChat {
    /// Account id of the sender.
    pub sender_id: Uuid,
    /// Per-sender sequence number, at most `i32::MAX` on the wire.
    pub index: u32,
    /// Signature over the message, absent for unsigned chat.
    pub signature: Option<MessageSignature>,
    /// The message text.
    pub message: String,
    /// Epoch milliseconds the client stamped the message with.
    pub timestamp: i64,
    /// Salt mixed into the signed body.
    pub salt: i64,
    /// The window of earlier messages the sender has seen.
    pub previous_messages: Vec<PreviousMessageAck>,
    /// Replacement text shown instead of `message` when present.
    pub unsigned_content: Option<String>,
    /// Filtering the sender's server applied.
    pub filter: FilterMask,
    /// Chat type registry id.
    pub chat_type: i32,
    /// Display name of the sender.
    pub sender_name: OpaqueTag,
    /// Display name of the target, for directed chat types.
    pub target_name: Option<OpaqueTag>,
}

impl SPlayerChat {
    /// Whether the message carries a signature.
    #[must_use]
    pub const fn is_signed(&self) -> bool {
        self.signature.is_some()
    }

    /// The same message with a different acknowledgement window.
    #[must_use]
    pub fn with_previous_messages(self, previous_messages: Vec<PreviousMessageAck>) -> Self {
        Self {
            previous_messages,
            ..self
        }
    }

    /// A new unsigned message carrying `message`, keeping the sender, index,
    /// timestamp and display names of this one.
    #[must_use]
    pub fn rewritten(&self, message: String, previous_messages: Vec<PreviousMessageAck>) -> Self {
        Self {
            sender_id: self.sender_id,
            index: self.index,
            signature: None,
            message,
            timestamp: self.timestamp,
            salt: 0,
            previous_messages,
            unsigned_content: None,
            filter: FilterMask::PassThrough,
            chat_type: self.chat_type,
            sender_name: self.sender_name.clone(),
            target_name: self.target_name.clone(),
        }
    }
}

impl ServerPacket for SPlayerChat {
    fn read_packet(
        data: &mut Cursor<&[u8]>,
        version: ProtocolVersion,
    ) -> std::result::Result<Self, DecodeError> {
        let sender_id = Uuid::read(data)?;
        let VarInt(index) = VarInt::read(data)?;
        let index = u32::try_from(index).map_err(|_| DecodeError::InvalidValue {
            field: "message index",
            reason: format!("negative index {index}"),
        })?;

        let signature = if bool::read(data)? {
            Some(MessageSignature::read(data, "message signature")?)
        } else {
            None
        };

        let message = read_string(data, MAX_MESSAGE_LENGTH, "message")?;
        let timestamp = i64::read(data)?;
        let salt = i64::read(data)?;

        let count = read_len(data, "previous messages")?;
        // every entry takes at least one byte
        if count > remaining(data) {
            return Err(DecodeError::Incomplete("previous messages"));
        }
        let mut previous_messages = Vec::with_capacity(count);
        for _ in 0..count {
            previous_messages.push(PreviousMessageAck::read(data)?);
        }

        let unsigned_content = if bool::read(data)? {
            Some(read_string(data, MAX_MESSAGE_LENGTH, "unsigned content")?)
        } else {
            None
        };

        let filter = FilterMask::read(data)?;
        let VarInt(chat_type) = VarInt::read(data)?;

        let layout = version.tag_layout();
        let sender_name = OpaqueTag::read(data, layout)?;
        let target_name = if bool::read(data)? {
            Some(OpaqueTag::read(data, layout)?)
        } else {
            None
        };

        Ok(Self {
            sender_id,
            index,
            signature,
            message,
            timestamp,
            salt,
            previous_messages,
            unsigned_content,
            filter,
            chat_type,
            sender_name,
            target_name,
        })
    }
}

impl EncodedPacket for SPlayerChat {
    fn write_packet(&self, writer: &mut impl Write, version: ProtocolVersion) -> Result<()> {
        self.sender_id.write(writer)?;
        wire_int(self.index, "message index")?.write(writer)?;

        self.signature.is_some().write(writer)?;
        if let Some(signature) = &self.signature {
            signature.write(writer)?;
        }

        write_string(&self.message, writer)?;
        self.timestamp.write(writer)?;
        self.salt.write(writer)?;

        VarInt(self.previous_messages.len() as i32).write(writer)?;
        for previous in &self.previous_messages {
            previous.write(writer)?;
        }

        self.unsigned_content.is_some().write(writer)?;
        if let Some(content) = &self.unsigned_content {
            write_string(content, writer)?;
        }

        self.filter.write(writer)?;
        VarInt(self.chat_type).write(writer)?;

        let layout = version.tag_layout();
        self.sender_name.write(writer, layout)?;
        self.target_name.is_some().write(writer)?;
        if let Some(target) = &self.target_name {
            target.write(writer, layout)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VERSION: ProtocolVersion = ProtocolVersion::MINECRAFT_1_20_3;

    fn unsigned_hi() -> SPlayerChat {
        SPlayerChat {
            sender_id: Uuid::from_u128(0xAAAA),
            index: 0,
            signature: None,
            message: "hi".to_owned(),
            timestamp: 1000,
            salt: 7,
            previous_messages: vec![],
            unsigned_content: None,
            filter: FilterMask::PassThrough,
            chat_type: 0,
            sender_name: OpaqueTag::string("Steve"),
            target_name: None,
        }
    }

    fn encode(packet: &SPlayerChat) -> Vec<u8> {
        let mut buf = Vec::new();
        packet.write_packet(&mut buf, VERSION).unwrap();
        buf
    }

    fn decode(bytes: &[u8]) -> std::result::Result<SPlayerChat, DecodeError> {
        SPlayerChat::read_packet(&mut Cursor::new(bytes), VERSION)
    }

    #[test]
    fn minimal_unsigned_layout() {
        let buf = encode(&unsigned_hi());
        let mut expected = Vec::new();
        expected.extend_from_slice(Uuid::from_u128(0xAAAA).as_bytes());
        expected.push(0); // index
        expected.push(0); // no signature
        expected.extend_from_slice(&[2, b'h', b'i']);
        expected.extend_from_slice(&1000i64.to_be_bytes());
        expected.extend_from_slice(&7i64.to_be_bytes());
        expected.push(0); // no previous messages
        expected.push(0); // no unsigned content
        expected.push(0); // pass through
        expected.push(0); // chat type
        expected.extend_from_slice(OpaqueTag::string("Steve").as_bytes());
        expected.push(0); // no target
        assert_eq!(buf, expected);
    }

    #[test]
    fn fully_populated_message_survives_the_wire() {
        let packet = SPlayerChat {
            index: 300,
            signature: Some(MessageSignature::new([9; 256])),
            previous_messages: vec![
                PreviousMessageAck::Full(MessageSignature::new([1; 256])),
                PreviousMessageAck::Reference(NonZeroU32::new(4).unwrap()),
                PreviousMessageAck::Reference(NonZeroU32::new(200).unwrap()),
            ],
            unsigned_content: Some("h*".to_owned()),
            filter: FilterMask::PartiallyFiltered(vec![0b10, u64::MAX]),
            chat_type: 3,
            target_name: Some(OpaqueTag::string("Alex")),
            ..unsigned_hi()
        };
        let buf = encode(&packet);
        let mut cursor = Cursor::new(&buf[..]);
        let decoded = SPlayerChat::read_packet(&mut cursor, VERSION).unwrap();
        assert_eq!(decoded, packet);
        assert_eq!(cursor.position() as usize, buf.len());
    }

    #[test]
    fn ack_signature_present_only_for_id_zero() {
        let packet = SPlayerChat {
            previous_messages: vec![
                PreviousMessageAck::Reference(NonZeroU32::new(1).unwrap()),
                PreviousMessageAck::Full(MessageSignature::new([3; 256])),
            ],
            ..unsigned_hi()
        };
        let decoded = decode(&encode(&packet)).unwrap();
        for ack in &decoded.previous_messages {
            assert_eq!(ack.signature().is_some(), ack.message_id() == 0);
        }
    }

    #[test]
    fn message_over_256_codepoints_is_rejected() {
        let packet = SPlayerChat {
            message: "é".repeat(257),
            ..unsigned_hi()
        };
        assert!(matches!(
            decode(&encode(&packet)),
            Err(DecodeError::LengthExceeded {
                field: "message",
                max: MAX_MESSAGE_LENGTH,
                actual: 257
            })
        ));
    }

    #[test]
    fn message_of_exactly_256_codepoints_is_accepted() {
        let packet = SPlayerChat {
            message: "€".repeat(256),
            ..unsigned_hi()
        };
        assert_eq!(decode(&encode(&packet)).unwrap(), packet);
    }

    #[test]
    fn unknown_filter_type_is_rejected() {
        let mut buf = encode(&unsigned_hi());
        // filter type sits right before chat type and the sender tag
        let tag_len = OpaqueTag::string("Steve").as_bytes().len();
        let filter_at = buf.len() - 1 - tag_len - 2;
        buf[filter_at] = 3;
        assert!(matches!(
            decode(&buf),
            Err(DecodeError::InvalidOrdinal {
                field: "filter type",
                ordinal: 3
            })
        ));
    }

    #[test]
    fn signature_flag_without_payload_is_incomplete() {
        let mut buf = Vec::new();
        Uuid::nil().write(&mut buf).unwrap();
        VarInt(0).write(&mut buf).unwrap();
        true.write(&mut buf).unwrap();
        buf.extend_from_slice(&[0u8; 100]);
        assert!(matches!(
            decode(&buf),
            Err(DecodeError::Incomplete("message signature"))
        ));
    }

    #[test]
    fn rewritten_message_drops_the_signature() {
        let signed = SPlayerChat {
            signature: Some(MessageSignature::new([5; 256])),
            salt: 99,
            ..unsigned_hi()
        };
        let acks = vec![PreviousMessageAck::Reference(NonZeroU32::new(2).unwrap())];
        let rewritten = signed.rewritten("bye".to_owned(), acks.clone());
        assert!(!rewritten.is_signed());
        assert_eq!(rewritten.message, "bye");
        assert_eq!(rewritten.timestamp, signed.timestamp);
        assert_eq!(rewritten.previous_messages, acks);
        assert_eq!(rewritten.sender_name, signed.sender_name);
    }

    #[test]
    fn named_tags_for_older_versions() {
        let packet = SPlayerChat {
            target_name: Some(OpaqueTag::string("Alex")),
            ..unsigned_hi()
        };
        let old = ProtocolVersion::MINECRAFT_1_19_3;
        let mut buf = Vec::new();
        packet.write_packet(&mut buf, old).unwrap();

        // string tag, empty root name, "Steve"
        let steve = [8u8, 0, 0, 0, 5, b'S', b't', b'e', b'v', b'e'];
        assert!(buf.windows(steve.len()).any(|w| w == steve));

        let mut cursor = Cursor::new(&buf[..]);
        let decoded = SPlayerChat::read_packet(&mut cursor, old).unwrap();
        assert_eq!(decoded, packet);
        assert_eq!(cursor.position() as usize, buf.len());
    }

    #[test]
    fn tags_follow_the_version_they_are_written_for() {
        let mut buf = Vec::new();
        unsigned_hi()
            .write_packet(&mut buf, ProtocolVersion::MINECRAFT_1_19_3)
            .unwrap();
        let decoded =
            SPlayerChat::read_packet(&mut Cursor::new(&buf[..]), ProtocolVersion::MINECRAFT_1_19_3)
                .unwrap();
        assert_eq!(encode(&decoded), encode(&unsigned_hi()));
    }

    #[test]
    fn largest_wire_index_survives() {
        let packet = SPlayerChat {
            index: i32::MAX as u32,
            previous_messages: vec![PreviousMessageAck::Reference(
                NonZeroU32::new(i32::MAX as u32).unwrap(),
            )],
            ..unsigned_hi()
        };
        assert_eq!(decode(&encode(&packet)).unwrap(), packet);
    }

    #[test]
    fn index_beyond_the_wire_range_is_not_encoded() {
        let packet = SPlayerChat {
            index: 3_000_000_000,
            ..unsigned_hi()
        };
        let err = packet.write_packet(&mut Vec::new(), VERSION).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);

        let packet = SPlayerChat {
            previous_messages: vec![PreviousMessageAck::Reference(
                NonZeroU32::new(i32::MAX as u32 + 1).unwrap(),
            )],
            ..unsigned_hi()
        };
        let err = packet.write_packet(&mut Vec::new(), VERSION).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }
}
