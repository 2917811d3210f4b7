//! Traits implemented by every packet this crate knows about.

use std::io::{self, Cursor, Write};

use conduit_utils::DecodeError;

use crate::ProtocolVersion;

/// A packet the client sends to the proxy.
pub trait ServerPacket: Sized {
    /// Decodes the packet body from the cursor.
    fn read_packet(data: &mut Cursor<&[u8]>, version: ProtocolVersion)
    -> Result<Self, DecodeError>;
}

/// A packet the proxy can put back on the wire.
pub trait EncodedPacket {
    /// Encodes the packet body.
    fn write_packet(&self, writer: &mut impl Write, version: ProtocolVersion) -> io::Result<()>;
}
