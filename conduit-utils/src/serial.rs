//! Reading and writing of protocol primitives.
//!
//! Fixed-width integers are big-endian. Length-prefixed fields are read with an
//! explicit upper bound that is checked before anything is allocated.

use std::io::{self, Cursor, Read, Write};

use thiserror::Error;
use uuid::Uuid;

use crate::codec::VarInt;

/// An error raised while decoding a packet from the wire.
///
/// Any of these rejects the single packet being decoded; they never indicate a
/// broken connection on their own.
#[derive(Error, Debug)]
pub enum DecodeError {
    /// The buffer ended before the field was complete.
    #[error("buffer ended while reading {0}")]
    Incomplete(&'static str),
    /// A length-prefixed field declared more than it is allowed to carry.
    #[error("{field} is {actual} long, the maximum is {max}")]
    LengthExceeded {
        /// The field being read.
        field: &'static str,
        /// The maximum length allowed for the field.
        max: usize,
        /// The length the sender declared or produced.
        actual: usize,
    },
    /// An enum ordinal outside of the known range.
    #[error("{field} has no variant with ordinal {ordinal}")]
    InvalidOrdinal {
        /// The field being read.
        field: &'static str,
        /// The ordinal that was read.
        ordinal: i32,
    },
    /// A value that is structurally valid but not allowed in this position.
    #[error("invalid {field}: {reason}")]
    InvalidValue {
        /// The field being read.
        field: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
    /// Bytes that do not form the expected structure.
    #[error("malformed {0}")]
    Malformed(&'static str),
    /// Any other I/O failure from the underlying reader.
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl DecodeError {
    /// Maps an I/O error from a fixed-size read into [`DecodeError::Incomplete`].
    #[must_use]
    pub fn from_read(err: io::Error, field: &'static str) -> Self {
        if err.kind() == io::ErrorKind::UnexpectedEof {
            Self::Incomplete(field)
        } else {
            Self::Io(err)
        }
    }
}

/// A value that can be read from a byte cursor.
pub trait ReadFrom: Sized {
    /// Reads the value, advancing the cursor past it.
    fn read(data: &mut Cursor<&[u8]>) -> Result<Self, DecodeError>;
}

/// A value that can be written to the wire.
pub trait WriteTo {
    /// Writes the value in its wire form.
    fn write(&self, writer: &mut impl Write) -> io::Result<()>;
}

/// Returns how many bytes are left unread in the cursor.
#[must_use]
pub fn remaining(data: &Cursor<&[u8]>) -> usize {
    let len = data.get_ref().len() as u64;
    len.saturating_sub(data.position()) as usize
}

/// Reads exactly `N` bytes.
pub fn read_fixed<const N: usize>(
    data: &mut Cursor<&[u8]>,
    field: &'static str,
) -> Result<[u8; N], DecodeError> {
    let mut buf = [0u8; N];
    data.read_exact(&mut buf)
        .map_err(|e| DecodeError::from_read(e, field))?;
    Ok(buf)
}

/// Reads a non-negative `VarInt` count or length.
pub fn read_len(data: &mut Cursor<&[u8]>, field: &'static str) -> Result<usize, DecodeError> {
    let VarInt(len) = VarInt::read(data)?;
    usize::try_from(len).map_err(|_| DecodeError::InvalidValue {
        field,
        reason: format!("negative length {len}"),
    })
}

/// Reads a `VarInt` length-prefixed byte array of at most `max` bytes.
pub fn read_byte_array(
    data: &mut Cursor<&[u8]>,
    max: usize,
    field: &'static str,
) -> Result<Vec<u8>, DecodeError> {
    let len = read_len(data, field)?;
    if len > max {
        return Err(DecodeError::LengthExceeded {
            field,
            max,
            actual: len,
        });
    }
    if len > remaining(data) {
        return Err(DecodeError::Incomplete(field));
    }
    let mut buf = vec![0u8; len];
    data.read_exact(&mut buf)
        .map_err(|e| DecodeError::from_read(e, field))?;
    Ok(buf)
}

/// Writes a `VarInt` length-prefixed byte array.
pub fn write_byte_array(bytes: &[u8], writer: &mut impl Write) -> io::Result<()> {
    VarInt(bytes.len() as i32).write(writer)?;
    writer.write_all(bytes)
}

/// Reads a `VarInt` length-prefixed UTF-8 string of at most `max_chars` codepoints.
///
/// The byte length is checked against `max_chars * 4` before reading, the
/// codepoint count after decoding.
pub fn read_string(
    data: &mut Cursor<&[u8]>,
    max_chars: usize,
    field: &'static str,
) -> Result<String, DecodeError> {
    let bytes = read_byte_array(data, max_chars * 4, field)?;
    let text = String::from_utf8(bytes).map_err(|_| DecodeError::Malformed(field))?;
    let chars = text.chars().count();
    if chars > max_chars {
        return Err(DecodeError::LengthExceeded {
            field,
            max: max_chars,
            actual: chars,
        });
    }
    Ok(text)
}

/// Writes a `VarInt` length-prefixed UTF-8 string.
pub fn write_string(text: &str, writer: &mut impl Write) -> io::Result<()> {
    write_byte_array(text.as_bytes(), writer)
}

impl ReadFrom for bool {
    fn read(data: &mut Cursor<&[u8]>) -> Result<Self, DecodeError> {
        match read_fixed::<1>(data, "boolean")?[0] {
            0 => Ok(false),
            1 => Ok(true),
            other => Err(DecodeError::InvalidValue {
                field: "boolean",
                reason: format!("byte {other:#04x}"),
            }),
        }
    }
}

impl WriteTo for bool {
    fn write(&self, writer: &mut impl Write) -> io::Result<()> {
        writer.write_all(&[u8::from(*self)])
    }
}

impl ReadFrom for i64 {
    fn read(data: &mut Cursor<&[u8]>) -> Result<Self, DecodeError> {
        Ok(Self::from_be_bytes(read_fixed(data, "long")?))
    }
}

impl WriteTo for i64 {
    fn write(&self, writer: &mut impl Write) -> io::Result<()> {
        writer.write_all(&self.to_be_bytes())
    }
}

impl ReadFrom for u64 {
    fn read(data: &mut Cursor<&[u8]>) -> Result<Self, DecodeError> {
        Ok(Self::from_be_bytes(read_fixed(data, "long")?))
    }
}

impl WriteTo for u64 {
    fn write(&self, writer: &mut impl Write) -> io::Result<()> {
        writer.write_all(&self.to_be_bytes())
    }
}

impl ReadFrom for Uuid {
    fn read(data: &mut Cursor<&[u8]>) -> Result<Self, DecodeError> {
        Ok(Self::from_bytes(read_fixed(data, "uuid")?))
    }
}

impl WriteTo for Uuid {
    fn write(&self, writer: &mut impl Write) -> io::Result<()> {
        writer.write_all(self.as_bytes())
    }
}
