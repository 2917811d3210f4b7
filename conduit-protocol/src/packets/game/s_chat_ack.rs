//! Serverbound chat acknowledgement - tells the server how many messages the client has seen.

use std::io::{Cursor, Result, Write};

use conduit_utils::{
    VarInt,
    serial::{DecodeError, ReadFrom, WriteTo},
};

use crate::{EncodedPacket, ProtocolVersion, ServerPacket};

/// Acknowledges `offset` messages received since the last acknowledgement.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SChatAck {
    /// Number of newly seen messages.
    pub offset: i32,
}

impl ServerPacket for SChatAck {
    fn read_packet(
        data: &mut Cursor<&[u8]>,
        _version: ProtocolVersion,
    ) -> std::result::Result<Self, DecodeError> {
        let VarInt(offset) = VarInt::read(data)?;
        if offset < 0 {
            return Err(DecodeError::InvalidValue {
                field: "acknowledgement offset",
                reason: format!("negative offset {offset}"),
            });
        }
        Ok(Self { offset })
    }
}

impl EncodedPacket for SChatAck {
    fn write_packet(&self, writer: &mut impl Write, _version: ProtocolVersion) -> Result<()> {
        VarInt(self.offset).write(writer)
    }
}
