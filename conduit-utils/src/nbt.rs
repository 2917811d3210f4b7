//! Display-name tags.
//!
//! The proxy never interprets display-name tags. It parses them with `simdnbt`
//! so a malformed or over-nested tag rejects the packet, then keeps the tag in
//! its nameless network form and re-encodes it in the layout of whichever
//! version it is written for.

use std::fmt;
use std::io::{self, Cursor, Write};

use simdnbt::owned::{self, NbtTag};

use crate::serial::{DecodeError, read_fixed, remaining};

const TAG_END: u8 = 0;

/// How the root of a tag is laid out on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TagLayout {
    /// Type byte followed by a root name and the payload (before 1.20.2).
    Named,
    /// Type byte followed directly by the payload (1.20.2 and later).
    Nameless,
}

/// A complete NBT tag, held as its nameless network encoding.
#[derive(Clone, PartialEq, Eq)]
pub struct OpaqueTag(Vec<u8>);

impl OpaqueTag {
    /// Encodes a parsed tag.
    #[must_use]
    pub fn from_tag(tag: &NbtTag) -> Self {
        let mut bytes = Vec::new();
        tag.write(&mut bytes);
        Self(bytes)
    }

    /// A string tag, the usual shape of a plain display name.
    #[must_use]
    pub fn string(text: &str) -> Self {
        Self::from_tag(&NbtTag::String(text.into()))
    }

    /// The nameless encoding of the tag, type byte included.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    /// Reads one tag in the given layout.
    pub fn read(data: &mut Cursor<&[u8]>, layout: TagLayout) -> Result<Self, DecodeError> {
        match layout {
            TagLayout::Nameless => read_nameless(data),
            TagLayout::Named => read_named(data),
        }
    }

    /// Writes the tag in the given layout. Named roots get an empty name.
    pub fn write(&self, writer: &mut impl Write, layout: TagLayout) -> io::Result<()> {
        match (layout, self.0.split_first()) {
            (TagLayout::Named, Some((&tag_type, payload))) if tag_type != TAG_END => {
                writer.write_all(&[tag_type, 0, 0])?;
                writer.write_all(payload)
            }
            _ => writer.write_all(&self.0),
        }
    }
}

impl Default for OpaqueTag {
    fn default() -> Self {
        Self(vec![TAG_END])
    }
}

impl fmt::Debug for OpaqueTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OpaqueTag({})", hex::encode(&self.0))
    }
}

fn invalid(err: &impl fmt::Display) -> DecodeError {
    DecodeError::InvalidValue {
        field: "nbt tag",
        reason: err.to_string(),
    }
}

fn read_nameless(data: &mut Cursor<&[u8]>) -> Result<OpaqueTag, DecodeError> {
    let start = data.position() as usize;
    if data.get_ref().get(start) == Some(&TAG_END) {
        data.set_position(data.position() + 1);
        return Ok(OpaqueTag::default());
    }
    if remaining(data) == 0 {
        return Err(DecodeError::Incomplete("nbt tag type"));
    }
    owned::read_tag(data).map_err(|e| invalid(&simdnbt::Error::from(e)))?;
    let end = data.position() as usize;
    Ok(OpaqueTag(data.get_ref()[start..end].to_vec()))
}

fn read_named(data: &mut Cursor<&[u8]>) -> Result<OpaqueTag, DecodeError> {
    let [tag_type] = read_fixed::<1>(data, "nbt tag type")?;
    if tag_type == TAG_END {
        return Ok(OpaqueTag::default());
    }
    let name_len = u16::from_be_bytes(read_fixed(data, "nbt root name")?);
    if usize::from(name_len) > remaining(data) {
        return Err(DecodeError::Incomplete("nbt root name"));
    }
    data.set_position(data.position() + u64::from(name_len));

    // Splice the type byte onto the payload so it parses as a nameless tag.
    let payload_start = data.position() as usize;
    let mut nameless = Vec::with_capacity(1 + remaining(data));
    nameless.push(tag_type);
    nameless.extend_from_slice(&data.get_ref()[payload_start..]);

    let mut spliced = Cursor::new(&nameless[..]);
    owned::read_tag(&mut spliced).map_err(|e| invalid(&simdnbt::Error::from(e)))?;
    let consumed = spliced.position() as usize;
    nameless.truncate(consumed);
    data.set_position((payload_start + consumed - 1) as u64);
    Ok(OpaqueTag(nameless))
}

#[cfg(test)]
mod tests {
    use super::*;

    const TAG_INT: u8 = 3;
    const TAG_STRING: u8 = 8;
    const TAG_LIST: u8 = 9;
    const TAG_COMPOUND: u8 = 10;

    fn compound_with_text(named: bool) -> Vec<u8> {
        let mut bytes = vec![TAG_COMPOUND];
        if named {
            bytes.extend_from_slice(&[0, 4]);
            bytes.extend_from_slice(b"root");
        }
        // "text": "Steve"
        bytes.push(TAG_STRING);
        bytes.extend_from_slice(&[0, 4]);
        bytes.extend_from_slice(b"text");
        bytes.extend_from_slice(&[0, 5]);
        bytes.extend_from_slice(b"Steve");
        // "extra": [1, 2] as a list of ints
        bytes.push(TAG_LIST);
        bytes.extend_from_slice(&[0, 5]);
        bytes.extend_from_slice(b"extra");
        bytes.push(TAG_INT);
        bytes.extend_from_slice(&2i32.to_be_bytes());
        bytes.extend_from_slice(&1i32.to_be_bytes());
        bytes.extend_from_slice(&2i32.to_be_bytes());
        bytes.push(TAG_END);
        bytes
    }

    fn written(tag: &OpaqueTag, layout: TagLayout) -> Vec<u8> {
        let mut out = Vec::new();
        tag.write(&mut out, layout).unwrap();
        out
    }

    #[test]
    fn nameless_compound_stops_at_its_end() {
        let mut bytes = compound_with_text(false);
        let tag_len = bytes.len();
        bytes.push(0xAB);

        let mut cursor = Cursor::new(&bytes[..]);
        let tag = OpaqueTag::read(&mut cursor, TagLayout::Nameless).unwrap();
        assert_eq!(tag.as_bytes(), &bytes[..tag_len]);
        assert_eq!(cursor.position() as usize, tag_len);
    }

    #[test]
    fn named_root_drops_the_root_name() {
        let mut bytes = compound_with_text(true);
        let tag_len = bytes.len();
        bytes.push(0xAB);

        let mut cursor = Cursor::new(&bytes[..]);
        let tag = OpaqueTag::read(&mut cursor, TagLayout::Named).unwrap();
        assert_eq!(tag.as_bytes(), &compound_with_text(false)[..]);
        assert_eq!(cursor.position() as usize, tag_len);
    }

    #[test]
    fn layout_is_converted_on_write() {
        let nameless = compound_with_text(false);
        let tag = OpaqueTag::read(&mut Cursor::new(&nameless[..]), TagLayout::Nameless).unwrap();

        let named = written(&tag, TagLayout::Named);
        assert_eq!(&named[..3], &[TAG_COMPOUND, 0, 0]);
        assert_eq!(&named[3..], &nameless[1..]);
        assert_eq!(OpaqueTag::read(&mut Cursor::new(&named[..]), TagLayout::Named).unwrap(), tag);
        assert_eq!(written(&tag, TagLayout::Nameless), nameless);
    }

    #[test]
    fn string_tag_reads_back_in_both_layouts() {
        let tag = OpaqueTag::string("Alex");
        assert_eq!(tag.as_bytes(), &[TAG_STRING, 0, 4, b'A', b'l', b'e', b'x']);
        for layout in [TagLayout::Named, TagLayout::Nameless] {
            let bytes = written(&tag, layout);
            assert_eq!(OpaqueTag::read(&mut Cursor::new(&bytes[..]), layout).unwrap(), tag);
        }
    }

    #[test]
    fn end_tag_is_an_empty_tag() {
        for layout in [TagLayout::Named, TagLayout::Nameless] {
            let mut cursor = Cursor::new(&[TAG_END, 0xAB][..]);
            assert_eq!(OpaqueTag::read(&mut cursor, layout).unwrap(), OpaqueTag::default());
            assert_eq!(cursor.position(), 1);
            assert_eq!(written(&OpaqueTag::default(), layout), [TAG_END]);
        }
    }

    #[test]
    fn truncated_compound_is_rejected() {
        let bytes = compound_with_text(false);
        let mut cursor = Cursor::new(&bytes[..bytes.len() - 3]);
        assert!(OpaqueTag::read(&mut cursor, TagLayout::Nameless).is_err());

        let named = compound_with_text(true);
        let mut cursor = Cursor::new(&named[..4]);
        assert!(matches!(
            OpaqueTag::read(&mut cursor, TagLayout::Named),
            Err(DecodeError::Incomplete("nbt root name"))
        ));
    }

    #[test]
    fn unknown_tag_type_is_rejected() {
        let bytes = [13u8, 0, 0];
        let mut cursor = Cursor::new(&bytes[..]);
        assert!(OpaqueTag::read(&mut cursor, TagLayout::Nameless).is_err());
    }

    #[test]
    fn excessive_nesting_is_rejected() {
        let mut bytes = vec![TAG_LIST];
        for _ in 0..600 {
            bytes.push(TAG_LIST);
            bytes.extend_from_slice(&1i32.to_be_bytes());
        }
        bytes.push(TAG_END);
        bytes.extend_from_slice(&0i32.to_be_bytes());
        let mut cursor = Cursor::new(&bytes[..]);
        assert!(OpaqueTag::read(&mut cursor, TagLayout::Nameless).is_err());
    }
}
