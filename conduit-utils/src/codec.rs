//! Variable-length integer encoding.

use std::io::{self, Cursor, Write};

use crate::serial::{DecodeError, ReadFrom, WriteTo, read_fixed};

/// A 32-bit integer encoded in 1 to 5 bytes, seven bits per byte, least
/// significant group first. Negative values always take the full five bytes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct VarInt(pub i32);

impl VarInt {
    /// The largest number of bytes a `VarInt` may occupy.
    pub const MAX_SIZE: usize = 5;

    /// Returns how many bytes this value takes on the wire.
    #[must_use]
    pub const fn written_size(self) -> usize {
        match self.0 as u32 {
            0..=0x7F => 1,
            0x80..=0x3FFF => 2,
            0x4000..=0x001F_FFFF => 3,
            0x0020_0000..=0x0FFF_FFFF => 4,
            _ => 5,
        }
    }
}

impl From<i32> for VarInt {
    fn from(value: i32) -> Self {
        Self(value)
    }
}

impl ReadFrom for VarInt {
    fn read(data: &mut Cursor<&[u8]>) -> Result<Self, DecodeError> {
        let mut value: u32 = 0;
        for i in 0..Self::MAX_SIZE {
            let [byte] = read_fixed::<1>(data, "varint")?;
            value |= u32::from(byte & 0x7F) << (i * 7);
            if byte & 0x80 == 0 {
                return Ok(Self(value as i32));
            }
        }
        Err(DecodeError::Malformed("varint longer than 5 bytes"))
    }
}

impl WriteTo for VarInt {
    fn write(&self, writer: &mut impl Write) -> io::Result<()> {
        let mut value = self.0 as u32;
        let mut buf = [0u8; Self::MAX_SIZE];
        let mut len = 0;
        loop {
            let byte = (value & 0x7F) as u8;
            value >>= 7;
            if value == 0 {
                buf[len] = byte;
                len += 1;
                break;
            }
            buf[len] = byte | 0x80;
            len += 1;
        }
        writer.write_all(&buf[..len])
    }
}
