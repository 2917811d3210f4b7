//! Protocol version tags.

use std::fmt;

use conduit_utils::TagLayout;

/// A Minecraft protocol version number as sent in the handshake.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ProtocolVersion(pub i32);

impl ProtocolVersion {
    /// 1.19.3, the first version with session-based signed chat.
    pub const MINECRAFT_1_19_3: Self = Self(761);
    /// 1.20.2, the first version with nameless network NBT.
    pub const MINECRAFT_1_20_2: Self = Self(764);
    /// 1.20.3, where chat components switched from JSON to NBT.
    pub const MINECRAFT_1_20_3: Self = Self(765);
    /// 1.21.
    pub const MINECRAFT_1_21: Self = Self(767);

    /// How NBT roots are laid out for this version.
    #[must_use]
    pub fn tag_layout(self) -> TagLayout {
        if self >= Self::MINECRAFT_1_20_2 {
            TagLayout::Nameless
        } else {
            TagLayout::Named
        }
    }
}

impl fmt::Display for ProtocolVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "protocol {}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nbt_layout_switches_at_1_20_2() {
        assert_eq!(ProtocolVersion::MINECRAFT_1_19_3.tag_layout(), TagLayout::Named);
        assert_eq!(ProtocolVersion(763).tag_layout(), TagLayout::Named);
        assert_eq!(ProtocolVersion::MINECRAFT_1_20_2.tag_layout(), TagLayout::Nameless);
        assert_eq!(ProtocolVersion::MINECRAFT_1_21.tag_layout(), TagLayout::Nameless);
    }
}
