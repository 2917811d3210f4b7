//! The authentication service's public key directory.
//!
//! Fetched once at startup and then shared read-only. A directory is either
//! fully populated or not built at all: any transport, JSON or key decoding
//! error fails the whole fetch.

use base64::{Engine, engine::general_purpose::STANDARD};
use reqwest::StatusCode;
use rsa::{BigUint, RsaPublicKey};
use serde::Deserialize;
use thiserror::Error;

use crate::verify::{TrustRoot, VerificationError, verify_sha1_rsa};

/// Where the production key directory lives.
pub const DEFAULT_KEY_DIRECTORY_URL: &str = "https://api.minecraftservices.com/publickeys";

/// An error while fetching or parsing the key directory.
#[derive(Error, Debug)]
pub enum KeyDirectoryError {
    /// The HTTP request could not be completed.
    #[error("Key directory request failed: {0}")]
    Transport(#[from] reqwest::Error),
    /// The service answered with something other than `200 OK`.
    #[error("Key directory answered with status {0}")]
    Status(StatusCode),
    /// The body is not the expected JSON document.
    #[error("Key directory response is not valid JSON: {0}")]
    MalformedJson(#[from] serde_json::Error),
    /// A key is not base64 encoded X.509 RSA key material.
    #[error("Malformed public key in {root}: {reason}")]
    MalformedKeyMaterial {
        /// The trust root the key was listed under.
        root: TrustRoot,
        /// What was wrong with it.
        reason: String,
    },
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PublicKeysResponse {
    profile_property_keys: Vec<PublicKeyEntry>,
    player_certificate_keys: Vec<PublicKeyEntry>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PublicKeyEntry {
    public_key: String,
}

/// The two trust roots published by the authentication service.
#[derive(Clone, Debug)]
pub struct PublicKeyDirectory {
    profile_property_keys: Vec<RsaPublicKey>,
    player_certificate_keys: Vec<RsaPublicKey>,
}

impl PublicKeyDirectory {
    /// Builds a directory from already parsed keys.
    #[must_use]
    pub const fn new(
        profile_property_keys: Vec<RsaPublicKey>,
        player_certificate_keys: Vec<RsaPublicKey>,
    ) -> Self {
        Self {
            profile_property_keys,
            player_certificate_keys,
        }
    }

    /// The client setup [`Self::fetch`] uses: `client_identity` as the
    /// `User-Agent` and a direct connection, ignoring proxy variables from the
    /// environment.
    #[must_use]
    pub fn client_builder(client_identity: &str) -> reqwest::ClientBuilder {
        reqwest::Client::builder()
            .user_agent(client_identity)
            .no_proxy()
    }

    /// Fetches and parses the directory.
    ///
    /// `client_identity` is sent as the `User-Agent`, conventionally
    /// `"<name>/<version>"`. No retries happen here.
    pub async fn fetch(endpoint: &str, client_identity: &str) -> Result<Self, KeyDirectoryError> {
        let client = Self::client_builder(client_identity).build()?;
        Self::fetch_with(&client, endpoint).await
    }

    /// Same as [`Self::fetch`] with a caller-configured client.
    pub async fn fetch_with(
        client: &reqwest::Client,
        endpoint: &str,
    ) -> Result<Self, KeyDirectoryError> {
        let response = client.get(endpoint).send().await?;

        match response.status() {
            StatusCode::OK => {}
            other => {
                log::error!("Key directory at {endpoint} answered with {other}");
                return Err(KeyDirectoryError::Status(other));
            }
        }

        let body = response.text().await?;
        let directory = Self::from_json(&body)?;
        log::info!(
            "Fetched key directory: {} profile property keys, {} player certificate keys",
            directory.profile_property_keys.len(),
            directory.player_certificate_keys.len()
        );
        Ok(directory)
    }

    /// Parses the JSON document served by the key directory endpoint.
    pub fn from_json(body: &str) -> Result<Self, KeyDirectoryError> {
        let response: PublicKeysResponse = serde_json::from_str(body)?;
        let directory = Self {
            profile_property_keys: parse_entries(
                &response.profile_property_keys,
                TrustRoot::ProfileProperty,
            )?,
            player_certificate_keys: parse_entries(
                &response.player_certificate_keys,
                TrustRoot::PlayerCertificate,
            )?,
        };

        for root in [TrustRoot::ProfileProperty, TrustRoot::PlayerCertificate] {
            if directory.keys(root).is_empty() {
                log::warn!("Key directory has no {root} keys, verification against it will fail");
            }
        }
        Ok(directory)
    }

    /// Keys trusted to sign profile properties such as skins.
    #[must_use]
    pub fn profile_property_keys(&self) -> &[RsaPublicKey] {
        &self.profile_property_keys
    }

    /// Keys trusted to sign player chat session certificates.
    #[must_use]
    pub fn player_certificate_keys(&self) -> &[RsaPublicKey] {
        &self.player_certificate_keys
    }

    /// The keys of one trust root.
    #[must_use]
    pub fn keys(&self, root: TrustRoot) -> &[RsaPublicKey] {
        match root {
            TrustRoot::ProfileProperty => &self.profile_property_keys,
            TrustRoot::PlayerCertificate => &self.player_certificate_keys,
        }
    }

    /// Checks `signature` over `data` against the player certificate keys.
    pub fn verify_player_certificate(
        &self,
        data: &[u8],
        signature: &[u8],
    ) -> Result<(), VerificationError> {
        verify_sha1_rsa(TrustRoot::PlayerCertificate, self.player_certificate_keys(), data, signature)
    }

    /// Checks a signed profile property. `signature` is base64, as it appears
    /// next to the property value in a game profile.
    pub fn verify_profile_property(
        &self,
        value: &str,
        signature: &str,
    ) -> Result<(), VerificationError> {
        let signature = STANDARD
            .decode(signature)
            .map_err(|e| VerificationError::MalformedSignature(e.to_string()))?;
        verify_sha1_rsa(
            TrustRoot::ProfileProperty,
            self.profile_property_keys(),
            value.as_bytes(),
            &signature,
        )
    }
}

fn parse_entries(
    entries: &[PublicKeyEntry],
    root: TrustRoot,
) -> Result<Vec<RsaPublicKey>, KeyDirectoryError> {
    entries
        .iter()
        .map(|entry| {
            let der = STANDARD.decode(&entry.public_key).map_err(|e| {
                KeyDirectoryError::MalformedKeyMaterial {
                    root,
                    reason: format!("invalid base64: {e}"),
                }
            })?;
            parse_public_key(&der).map_err(|reason| KeyDirectoryError::MalformedKeyMaterial {
                root,
                reason,
            })
        })
        .collect()
}

/// Parses an X.509 `SubjectPublicKeyInfo` holding an RSA key.
pub fn parse_public_key(der: &[u8]) -> Result<RsaPublicKey, String> {
    let (n, e) = rsa_der::public_key_from_der(der).map_err(|e| format!("invalid X.509: {e:?}"))?;
    RsaPublicKey::new(BigUint::from_bytes_be(&n), BigUint::from_bytes_be(&e))
        .map_err(|e| format!("invalid RSA key: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rsa::{RsaPrivateKey, traits::PublicKeyParts};

    fn encoded_key() -> String {
        let private = RsaPrivateKey::new(&mut rand::thread_rng(), 1024).unwrap();
        let public = private.to_public_key();
        STANDARD.encode(rsa_der::public_key_to_der(
            &public.n().to_bytes_be(),
            &public.e().to_bytes_be(),
        ))
    }

    #[test]
    fn parses_both_trust_roots() {
        let key = encoded_key();
        let body = format!(
            r#"{{"profilePropertyKeys":[{{"publicKey":"{key}"}}],
                "playerCertificateKeys":[{{"publicKey":"{key}"}},{{"publicKey":"{key}"}}],
                "authenticationKeys":[]}}"#
        );
        let directory = PublicKeyDirectory::from_json(&body).unwrap();
        assert_eq!(directory.profile_property_keys().len(), 1);
        assert_eq!(directory.player_certificate_keys().len(), 2);
    }

    #[test]
    fn empty_roots_parse_but_stay_empty() {
        let body = r#"{"profilePropertyKeys":[],"playerCertificateKeys":[]}"#;
        let directory = PublicKeyDirectory::from_json(body).unwrap();
        assert!(directory.keys(TrustRoot::PlayerCertificate).is_empty());
    }

    #[test]
    fn missing_root_is_malformed_json() {
        let body = r#"{"profilePropertyKeys":[]}"#;
        assert!(matches!(
            PublicKeyDirectory::from_json(body),
            Err(KeyDirectoryError::MalformedJson(_))
        ));
    }

    #[test]
    fn bad_base64_fails_the_whole_directory() {
        let key = encoded_key();
        let body = format!(
            r#"{{"profilePropertyKeys":[{{"publicKey":"{key}"}}],
                "playerCertificateKeys":[{{"publicKey":"not base64!"}}]}}"#
        );
        assert!(matches!(
            PublicKeyDirectory::from_json(&body),
            Err(KeyDirectoryError::MalformedKeyMaterial {
                root: TrustRoot::PlayerCertificate,
                ..
            })
        ));
    }

    #[test]
    fn non_rsa_material_is_rejected() {
        let body = format!(
            r#"{{"profilePropertyKeys":[{{"publicKey":"{}"}}],"playerCertificateKeys":[]}}"#,
            STANDARD.encode([0x30, 0x03, 0x02, 0x01, 0x00])
        );
        assert!(matches!(
            PublicKeyDirectory::from_json(&body),
            Err(KeyDirectoryError::MalformedKeyMaterial {
                root: TrustRoot::ProfileProperty,
                ..
            })
        ));
    }
}
