//! The conduit proxy binary.
//!
//! Loads the configuration, fetches the authentication service's public keys
//! and keeps the secure chat subsystem ready until shutdown.

use std::path::Path;

use anyhow::Context;
use conduit_core::{Proxy, ProxyConfig};
use conduit_crypto::PublicKeyDirectory;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

const CONFIG_PATH: &str = "config/conduit.json5";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = ProxyConfig::load_or_create(Path::new(CONFIG_PATH))
        .with_context(|| format!("Failed to load {CONFIG_PATH}"))?;
    tracing::debug!(?config, "Loaded configuration");

    let identity = concat!("conduit/", env!("CARGO_PKG_VERSION"));
    let url = &config.secure_chat.key_directory_url;
    let keys = PublicKeyDirectory::fetch(url, identity)
        .await
        .with_context(|| format!("Failed to fetch public keys from {url}"))?;
    tracing::info!(
        profile_property_keys = keys.profile_property_keys().len(),
        player_certificate_keys = keys.player_certificate_keys().len(),
        "Loaded public key directory"
    );

    let proxy = Proxy::new(keys, config.secure_chat, CancellationToken::new());
    let signal = proxy.cancel_token.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => tracing::info!("Received shutdown signal"),
            Err(err) => tracing::error!("Failed to listen for shutdown signal: {err}"),
        }
        signal.cancel();
    });

    tracing::info!(
        unverified_sessions = ?proxy.secure_chat.unverified_sessions,
        enforce_expiry = proxy.secure_chat.enforce_expiry,
        "Secure chat ready"
    );
    proxy.cancel_token.cancelled().await;
    tracing::info!("Stopped");
    Ok(())
}
