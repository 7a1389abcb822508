//! Per-provider JWKS cache with rotation-on-miss.
//!
//! Entries have no time-based expiry: a key set stays valid until a token
//! references a `kid` we do not hold, which is what actual rotation looks
//! like from the outside. On such a miss exactly one fetch per provider is
//! in flight; concurrent missers queue on the fetch gate and re-check the
//! refreshed cache instead of issuing their own request. A failed fetch
//! leaves the previous key set untouched.

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};
use tracing::info;

use super::error::Error;
use super::jwks::{Jwk, Jwks};
use super::provider::Provider;

const DEFAULT_FETCH_TIMEOUT_SECONDS: u64 = 10;

/// Where key sets come from. Production uses [`HttpKeyFetcher`]; tests
/// substitute counting or failing fetchers.
#[async_trait]
pub trait KeyFetcher: Send + Sync {
    async fn fetch(&self, provider: Provider) -> Result<Jwks>;
}

/// Fetches a provider's JWKS endpoint over HTTPS with a bounded timeout.
#[derive(Debug, Clone)]
pub struct HttpKeyFetcher {
    client: Client,
}

impl HttpKeyFetcher {
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .user_agent(crate::APP_USER_AGENT)
            .timeout(timeout)
            .build()
            .context("Failed to build JWKS HTTP client")?;
        Ok(Self { client })
    }

    /// Fetcher with the default timeout.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn with_default_timeout() -> Result<Self> {
        Self::new(Duration::from_secs(DEFAULT_FETCH_TIMEOUT_SECONDS))
    }
}

#[async_trait]
impl KeyFetcher for HttpKeyFetcher {
    async fn fetch(&self, provider: Provider) -> Result<Jwks> {
        let url = provider.jwks_url();
        let response = self
            .client
            .get(url)
            .send()
            .await
            .with_context(|| format!("jwks fetch failed: {url}"))?;
        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("jwks fetch failed: {url} returned {status}");
        }
        let body = response
            .text()
            .await
            .with_context(|| format!("jwks body read failed: {url}"))?;
        Jwks::from_json(&body).with_context(|| format!("invalid jwks json from {url}"))
    }
}

#[derive(Default)]
struct ProviderKeys {
    by_kid: HashMap<String, Jwk>,
    /// Bumped on every successful refresh; lets a queued misser tell
    /// whether the fetch it waited on already happened.
    generation: u64,
    refreshed_at: Option<Instant>,
}

struct ProviderSlot {
    keys: RwLock<ProviderKeys>,
    fetch_gate: Mutex<()>,
}

impl ProviderSlot {
    fn new() -> Self {
        Self {
            keys: RwLock::new(ProviderKeys::default()),
            fetch_gate: Mutex::new(()),
        }
    }
}

pub struct JwksCache {
    fetcher: Arc<dyn KeyFetcher>,
    google: ProviderSlot,
    apple: ProviderSlot,
}

impl JwksCache {
    #[must_use]
    pub fn new(fetcher: Arc<dyn KeyFetcher>) -> Self {
        Self {
            fetcher,
            google: ProviderSlot::new(),
            apple: ProviderSlot::new(),
        }
    }

    fn slot(&self, provider: Provider) -> &ProviderSlot {
        match provider {
            Provider::Google => &self.google,
            Provider::Apple => &self.apple,
        }
    }

    /// Resolve a signing key by `kid`, refreshing the provider's key set on
    /// a miss.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnknownSigningKey`] when a freshly fetched set still
    /// lacks the `kid`, and [`Error::KeySourceUnavailable`] when the key
    /// source cannot be reached.
    pub async fn get_key(&self, provider: Provider, kid: &str) -> Result<Jwk, Error> {
        let slot = self.slot(provider);

        let miss_generation = {
            let keys = slot.keys.read().await;
            if let Some(jwk) = keys.by_kid.get(kid) {
                return Ok(jwk.clone());
            }
            keys.generation
        };

        // One outstanding fetch per provider: whoever holds the gate fetches,
        // everyone queued behind it reuses the refreshed set.
        let _gate = slot.fetch_gate.lock().await;

        {
            let keys = slot.keys.read().await;
            if keys.generation > miss_generation {
                return keys
                    .by_kid
                    .get(kid)
                    .cloned()
                    .ok_or_else(|| Error::UnknownSigningKey(kid.to_string()));
            }
        }

        let jwks = self
            .fetcher
            .fetch(provider)
            .await
            .map_err(|err| Error::KeySourceUnavailable(format!("{err:#}")))?;

        let mut keys = slot.keys.write().await;
        keys.by_kid = jwks
            .keys
            .into_iter()
            .map(|jwk| (jwk.kid.clone(), jwk))
            .collect();
        keys.generation += 1;
        keys.refreshed_at = Some(Instant::now());
        info!(provider = %provider, keys = keys.by_kid.len(), "jwks cache refreshed");

        keys.by_kid
            .get(kid)
            .cloned()
            .ok_or_else(|| Error::UnknownSigningKey(kid.to_string()))
    }

    /// Drop a provider's cached key set, forcing a fetch on next use.
    pub async fn clear(&self, provider: Provider) {
        let mut keys = self.slot(provider).keys.write().await;
        keys.by_kid.clear();
        keys.refreshed_at = None;
    }

    /// When the provider's key set was last fetched, if ever.
    pub async fn last_refreshed(&self, provider: Provider) -> Option<Instant> {
        self.slot(provider).keys.read().await.refreshed_at
    }
}
