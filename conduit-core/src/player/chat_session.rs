//! Verified chat sessions.
//!
//! A [`ChatSession`] can only be obtained through [`ChatSession::verify`], so
//! holding one means the key was certified by a trusted authority.

use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

use conduit_crypto::{PublicKeyDirectory, VerificationError, verify_session_key};
use conduit_protocol::packets::game::SChatSessionUpdate;
use thiserror::Error;
use uuid::Uuid;

/// Which signing scheme a player key was certified under. Only
/// account-bound keys are accepted.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum KeyRevision {
    /// Keys certified for one account id (1.19.1 and later).
    LinkedV2,
}

/// Why a chat session was not established.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum SessionError {
    /// The key had already expired when the session was announced.
    #[error("Chat session key expired at {expires_at}")]
    Expired {
        /// The expiry carried by the session, in epoch milliseconds.
        expires_at: i64,
    },
    /// The certificate signature did not check out.
    #[error(transparent)]
    Verification(#[from] VerificationError),
}

/// A player's verified chat identity.
#[derive(Clone, PartialEq, Eq)]
pub struct ChatSession {
    session_id: Uuid,
    expires_at: i64,
    public_key: Vec<u8>,
    key_signature: Vec<u8>,
    revision: KeyRevision,
}

impl ChatSession {
    /// Verifies `packet` for `account_id` and builds the session from it.
    ///
    /// `now` is the current time in epoch milliseconds; `None` skips the
    /// expiry check.
    pub fn verify(
        packet: &SChatSessionUpdate,
        account_id: Uuid,
        directory: &PublicKeyDirectory,
        now: Option<i64>,
    ) -> Result<Self, SessionError> {
        if now.is_some_and(|now| packet.expires_at < now) {
            return Err(SessionError::Expired {
                expires_at: packet.expires_at,
            });
        }

        verify_session_key(
            directory,
            account_id,
            packet.expires_at,
            &packet.public_key,
            &packet.key_signature,
        )?;

        Ok(Self {
            session_id: packet.session_id,
            expires_at: packet.expires_at,
            public_key: packet.public_key.clone(),
            key_signature: packet.key_signature.clone(),
            revision: KeyRevision::LinkedV2,
        })
    }

    /// The id the client picked for this session.
    #[must_use]
    pub const fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// Key expiry in epoch milliseconds.
    #[must_use]
    pub const fn expires_at(&self) -> i64 {
        self.expires_at
    }

    /// The player's encoded public key.
    #[must_use]
    pub fn public_key(&self) -> &[u8] {
        &self.public_key
    }

    /// The authority's signature over the key.
    #[must_use]
    pub fn key_signature(&self) -> &[u8] {
        &self.key_signature
    }

    /// The scheme the key was verified under.
    #[must_use]
    pub const fn revision(&self) -> KeyRevision {
        self.revision
    }

    /// Whether the key has expired at `now` (epoch milliseconds).
    #[must_use]
    pub const fn is_expired(&self, now: i64) -> bool {
        self.expires_at < now
    }
}

impl fmt::Debug for ChatSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatSession")
            .field("session_id", &self.session_id)
            .field("expires_at", &self.expires_at)
            .field("revision", &self.revision)
            .finish_non_exhaustive()
    }
}

/// Milliseconds since the Unix epoch.
#[must_use]
pub fn epoch_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |elapsed| elapsed.as_millis() as i64)
}
