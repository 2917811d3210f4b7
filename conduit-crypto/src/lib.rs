//! Trust roots and signature verification for signed chat.

pub mod key_directory;
pub mod verify;

pub use key_directory::{DEFAULT_KEY_DIRECTORY_URL, KeyDirectoryError, PublicKeyDirectory};
pub use verify::{TrustRoot, VerificationError, verify_session_key};
