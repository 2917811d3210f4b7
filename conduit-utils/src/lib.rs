//! Wire primitives shared by the conduit crates.

pub mod codec;
pub mod locks;
pub mod nbt;
pub mod serial;

pub use codec::VarInt;
pub use nbt::{OpaqueTag, TagLayout};
pub use serial::{DecodeError, ReadFrom, WriteTo};
