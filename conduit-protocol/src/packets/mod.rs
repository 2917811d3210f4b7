//! Packet definitions, grouped by connection state.

pub mod game;
