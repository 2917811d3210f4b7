//! Wire codec for the signed-chat packets the proxy intercepts.
//!
//! Packet framing and id routing live in the connection layer; this crate only
//! reads and writes packet bodies.

pub mod packet_traits;
pub mod packets;
pub mod version;

pub use packet_traits::{EncodedPacket, ServerPacket};
pub use version::ProtocolVersion;
