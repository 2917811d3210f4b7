//! Serverbound chat session update - the client announces the key it will sign chat with.

use std::fmt;
use std::io::{Cursor, Result, Write};

use conduit_utils::serial::{DecodeError, ReadFrom, WriteTo, read_byte_array, write_byte_array};
use uuid::Uuid;

use crate::{EncodedPacket, ProtocolVersion, ServerPacket};

/// Largest encoded public key accepted, in bytes.
pub const MAX_PUBLIC_KEY_LENGTH: usize = 512;
/// Largest key signature accepted, in bytes.
pub const MAX_KEY_SIGNATURE_LENGTH: usize = 4096;

/// Sent once per session, before any signed chat. Carries the player's public
/// key together with the signature the authentication service put on it.
#[derive(Clone, PartialEq, Eq)]
pub struct SChatSessionUpdate {
    /// Random id the client picked for this chat session.
    pub session_id: Uuid,
    /// When the key stops being valid, in epoch milliseconds.
    pub expires_at: i64,
    /// The X.509 encoded public key.
    pub public_key: Vec<u8>,
    /// Signature by a player-certificate key over the account id, expiry and key.
    pub key_signature: Vec<u8>,
}

impl ServerPacket for SChatSessionUpdate {
    fn read_packet(
        data: &mut Cursor<&[u8]>,
        _version: ProtocolVersion,
    ) -> std::result::Result<Self, DecodeError> {
        Ok(Self {
            session_id: Uuid::read(data)?,
            expires_at: i64::read(data)?,
            public_key: read_byte_array(data, MAX_PUBLIC_KEY_LENGTH, "public key")?,
            key_signature: read_byte_array(data, MAX_KEY_SIGNATURE_LENGTH, "key signature")?,
        })
    }
}

impl EncodedPacket for SChatSessionUpdate {
    fn write_packet(&self, writer: &mut impl Write, _version: ProtocolVersion) -> Result<()> {
        self.session_id.write(writer)?;
        self.expires_at.write(writer)?;
        write_byte_array(&self.public_key, writer)?;
        write_byte_array(&self.key_signature, writer)
    }
}

impl fmt::Debug for SChatSessionUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SChatSessionUpdate")
            .field("session_id", &self.session_id)
            .field("expires_at", &self.expires_at)
            .field("public_key", &hex::encode(&self.public_key))
            .field("key_signature", &hex::encode(&self.key_signature))
            .finish()
    }
}
