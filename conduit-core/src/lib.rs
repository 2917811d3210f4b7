//! # Conduit Core
//!
//! The secure chat subsystem of the conduit proxy: session verification,
//! chat event dispatch and ordered delivery of chat outcomes to the backend.

pub mod chat;
pub mod config;
pub mod player;
pub mod proxy;

pub use chat::{
    ChatError, ChatEventPipeline, ChatOutcome, ChatQueue, ChatResult, ChatViolation,
    ConnectionSink, PlayerChatEvent, SessionChatHandler,
};
pub use config::{ConfigError, ProxyConfig, SecureChatConfig, UnverifiedSessionPolicy};
pub use player::{ChatPlayer, ChatSession, ChatState, KeyRevision, SessionError};
pub use proxy::Proxy;
