use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::Context as _;
use jsonwebtoken::jwk::JwkSet;
use tokio::sync::RwLock;
use tracing::debug;
use url::Url;

use crate::domain::repository::KeySetPort;
use crate::error::AuthServiceError;

/// How long a fetched key set is reused before refetching.
pub const JWKS_CACHE_TTL: Duration = Duration::from_secs(10 * 60);

/// Minimum age of a cached set before an unknown `kid` may force a refetch.
pub const JWKS_REFRESH_COOLDOWN: Duration = Duration::from_secs(30);

/// Upper bound for a single key-set request.
const FETCH_TIMEOUT: Duration = Duration::from_secs(5);

/// Fetches published key sets over HTTPS and caches them per URL.
#[derive(Clone)]
pub struct HttpKeySetFetcher {
    client: reqwest::Client,
    cache: Arc<RwLock<HashMap<Url, (Instant, JwkSet)>>>,
    ttl: Duration,
    refresh_cooldown: Duration,
}

impl HttpKeySetFetcher {
    pub fn new(ttl: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(FETCH_TIMEOUT)
            .build()
            .context("build key set http client")?;
        Ok(Self {
            client,
            cache: Arc::default(),
            ttl,
            refresh_cooldown: JWKS_REFRESH_COOLDOWN,
        })
    }

    async fn cached(&self, jwks_url: &Url, max_age: Duration) -> Option<JwkSet> {
        let cache = self.cache.read().await;
        cache
            .get(jwks_url)
            .filter(|(fetched_at, _)| fetched_at.elapsed() < max_age)
            .map(|(_, keys)| keys.clone())
    }

    async fn load(&self, jwks_url: &Url) -> Result<JwkSet, AuthServiceError> {
        debug!(%jwks_url, "fetching key set");
        let keys: JwkSet = self
            .client
            .get(jwks_url.clone())
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .with_context(|| format!("fetch key set {jwks_url}"))?
            .json()
            .await
            .with_context(|| format!("decode key set {jwks_url}"))?;

        self.cache
            .write()
            .await
            .insert(jwks_url.clone(), (Instant::now(), keys.clone()));
        Ok(keys)
    }
}

impl KeySetPort for HttpKeySetFetcher {
    async fn fetch(&self, jwks_url: &Url) -> Result<JwkSet, AuthServiceError> {
        match self.cached(jwks_url, self.ttl).await {
            Some(keys) => Ok(keys),
            None => self.load(jwks_url).await,
        }
    }

    async fn refresh(&self, jwks_url: &Url) -> Result<JwkSet, AuthServiceError> {
        match self.cached(jwks_url, self.refresh_cooldown).await {
            Some(keys) => Ok(keys),
            None => self.load(jwks_url).await,
        }
    }
}
