//! Proxy configuration.
//!
//! Loaded from a JSON5 file at startup. A default file is written when none
//! exists yet.

use std::{fs, io, path::Path};

use conduit_crypto::DEFAULT_KEY_DIRECTORY_URL;
use serde::Deserialize;
use thiserror::Error;

/// The configuration file written when none exists.
pub const DEFAULT_CONFIG: &str = r#"{
  // Secure chat handling.
  secure_chat: {
    // Where the authentication service publishes its public keys.
    key_directory_url: "https://api.minecraftservices.com/publickeys",
    // What to do with a player whose chat session fails verification:
    // "kick" disconnects them, "ignore" keeps them connected without a
    // session so only their unsigned chat goes through.
    unverified_sessions: "kick",
    // Reject chat sessions whose key has already expired.
    enforce_expiry: true,
  },
}
"#;

/// An error while loading the configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read or created.
    #[error("Failed to access config file: {0}")]
    Io(#[from] io::Error),
    /// The file is not valid JSON5 for [`ProxyConfig`].
    #[error("Failed to parse config file: {0}")]
    Parse(#[from] serde_json5::Error),
}

/// Top-level proxy configuration.
#[derive(Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(default)]
pub struct ProxyConfig {
    /// Secure chat settings.
    pub secure_chat: SecureChatConfig,
}

/// What happens to a player whose chat session fails verification.
#[derive(Deserialize, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UnverifiedSessionPolicy {
    /// Disconnect the player.
    #[default]
    Kick,
    /// Keep the player without a session; their signed chat is dropped.
    Ignore,
}

/// Secure chat settings.
#[derive(Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct SecureChatConfig {
    /// The key directory endpoint.
    pub key_directory_url: String,
    /// Policy for sessions that fail verification.
    pub unverified_sessions: UnverifiedSessionPolicy,
    /// Whether expired session keys are rejected.
    pub enforce_expiry: bool,
}

impl Default for SecureChatConfig {
    fn default() -> Self {
        Self {
            key_directory_url: DEFAULT_KEY_DIRECTORY_URL.to_owned(),
            unverified_sessions: UnverifiedSessionPolicy::default(),
            enforce_expiry: true,
        }
    }
}

impl ProxyConfig {
    /// Parses a JSON5 document.
    pub fn from_json5(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json5::from_str(text)?)
    }

    /// Loads the configuration at `path`, writing [`DEFAULT_CONFIG`] there first
    /// if the file does not exist.
    pub fn load_or_create(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)?;
            }
            fs::write(path, DEFAULT_CONFIG)?;
            log::info!("Wrote default config to {}", path.display());
        }
        Self::from_json5(&fs::read_to_string(path)?)
    }
}
