//! SHA-1 with RSA signature checks against a trust root.

use std::fmt;

use rsa::{Pkcs1v15Sign, RsaPublicKey};
use sha1::{Digest, Sha1};
use thiserror::Error;
use uuid::Uuid;

use crate::PublicKeyDirectory;

/// Which set of directory keys a signature is checked against.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TrustRoot {
    /// Keys signing profile properties.
    ProfileProperty,
    /// Keys signing player chat session certificates.
    PlayerCertificate,
}

impl fmt::Display for TrustRoot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ProfileProperty => "profile property",
            Self::PlayerCertificate => "player certificate",
        })
    }
}

/// Why a signature was not accepted.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum VerificationError {
    /// The trust root has no keys, so nothing could be checked.
    #[error("No {0} keys are available, verification is impossible")]
    TrustRootUnavailable(TrustRoot),
    /// Every key of the trust root rejected the signature.
    #[error("Signature did not match any of {keys_tried} {root} keys")]
    SignatureMismatch {
        /// The trust root checked.
        root: TrustRoot,
        /// How many keys were tried.
        keys_tried: usize,
    },
    /// The signature could not even be decoded.
    #[error("Malformed signature: {0}")]
    MalformedSignature(String),
}

/// Accepts `signature` over `data` if any key in `keys` verifies it.
pub fn verify_sha1_rsa(
    root: TrustRoot,
    keys: &[RsaPublicKey],
    data: &[u8],
    signature: &[u8],
) -> Result<(), VerificationError> {
    if keys.is_empty() {
        return Err(VerificationError::TrustRootUnavailable(root));
    }
    let hashed = Sha1::digest(data);
    if keys
        .iter()
        .any(|key| key.verify(Pkcs1v15Sign::new::<Sha1>(), &hashed, signature).is_ok())
    {
        Ok(())
    } else {
        Err(VerificationError::SignatureMismatch {
            root,
            keys_tried: keys.len(),
        })
    }
}

/// The bytes a chat session certificate signs: the account id as two
/// big-endian halves, the expiry, then the raw key. No prefixes or separators.
#[must_use]
pub fn session_signing_payload(account_id: Uuid, expires_at: i64, public_key: &[u8]) -> Vec<u8> {
    let (most, least) = account_id.as_u64_pair();
    let mut payload = Vec::with_capacity(24 + public_key.len());
    payload.extend_from_slice(&most.to_be_bytes());
    payload.extend_from_slice(&least.to_be_bytes());
    payload.extend_from_slice(&expires_at.to_be_bytes());
    payload.extend_from_slice(public_key);
    payload
}

/// Checks that `key_signature` certifies `public_key` for `account_id` until `expires_at`.
pub fn verify_session_key(
    directory: &PublicKeyDirectory,
    account_id: Uuid,
    expires_at: i64,
    public_key: &[u8],
    key_signature: &[u8],
) -> Result<(), VerificationError> {
    let payload = session_signing_payload(account_id, expires_at, public_key);
    directory.verify_player_certificate(&payload, key_signature)
}
