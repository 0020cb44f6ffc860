//! HTTP public key repositories.
//!
//! A key id `svc-a/key1` is fetched from every configured repository as
//! `<base_url>svc-a/key1`. Requests run concurrently and the first `200`
//! response wins; the remaining requests are dropped (and thereby cancelled).
//! Successful lookups are stored in a shared [`KeyCache`].
//!
//! # Security
//!
//! - Only `http` and `https` repositories are accepted
//! - Every request carries its own timeout, so a hung repository never blocks
//!   resolution while another one answers
//! - All repositories are trusted equally; they are expected to mirror the
//!   same key set

use super::cache::KeyCache;
use super::PublicKeyLoader;
use crate::error::{ConfigError, KeyFetchError};
use crate::metrics;
use async_trait::async_trait;
use futures::future::{select_ok, BoxFuture};
use futures::FutureExt;
use reqwest::header::ACCEPT;
use reqwest::{StatusCode, Url};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::instrument;

/// Per-request timeout for key repository requests.
pub const DEFAULT_KEY_FETCH_TIMEOUT: Duration = Duration::from_secs(15);

/// `Accept` header value sent to key repositories.
pub const PEM_CONTENT_TYPE: &str = "application/x-pem-file";

/// Validate public key repository base URLs.
///
/// # Errors
///
/// - `NoBaseUrls` - The list is empty
/// - `InvalidBaseUrl` - A URL does not parse, is not `http(s)`, or its path
///   does not end with `/`
pub fn parse_base_urls(urls: &[String]) -> Result<Vec<Url>, ConfigError> {
    if urls.is_empty() {
        return Err(ConfigError::NoBaseUrls);
    }

    urls.iter()
        .map(|raw| {
            let url = Url::parse(raw).map_err(|e| ConfigError::InvalidBaseUrl {
                url: raw.clone(),
                reason: e.to_string(),
            })?;

            if !matches!(url.scheme(), "http" | "https") {
                return Err(ConfigError::InvalidBaseUrl {
                    url: raw.clone(),
                    reason: "Only http(s) ASAP repositories are supported".to_string(),
                });
            }

            if !url.path().ends_with('/') {
                return Err(ConfigError::InvalidBaseUrl {
                    url: raw.clone(),
                    reason: "ASAP repository URLs must end with a trailing slash".to_string(),
                });
            }

            Ok(url)
        })
        .collect()
}

/// Fetches public keys from one or more HTTP repositories.
#[derive(Debug, Clone)]
pub struct HttpKeyFetcher {
    base_urls: Vec<Url>,
    http_client: reqwest::Client,
    cache: Arc<KeyCache>,
}

impl HttpKeyFetcher {
    /// Create a fetcher with its own cache and the default timeout.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if any base URL is invalid or none are given.
    pub fn new(base_urls: &[String]) -> Result<Self, ConfigError> {
        Self::with_cache(base_urls, Arc::new(KeyCache::default()))
    }

    /// Create a fetcher that stores keys in a shared cache.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if any base URL is invalid or none are given.
    pub fn with_cache(base_urls: &[String], cache: Arc<KeyCache>) -> Result<Self, ConfigError> {
        let base_urls = parse_base_urls(base_urls)?;
        Ok(Self {
            base_urls,
            http_client: build_client(DEFAULT_KEY_FETCH_TIMEOUT),
            cache,
        })
    }

    /// Replace the per-request timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.http_client = build_client(timeout);
        self
    }

    /// The cache this fetcher writes to.
    #[must_use]
    pub fn cache(&self) -> &Arc<KeyCache> {
        &self.cache
    }

    /// Resolve a key: cache first, then race all repositories.
    ///
    /// # Errors
    ///
    /// Returns `KeyFetchError::AllSourcesFailed` carrying the last failure if
    /// no repository returned the key.
    #[instrument(skip_all, fields(key_id = %key_id))]
    pub async fn fetch(&self, key_id: &str) -> Result<String, KeyFetchError> {
        if let Some(pem) = self.cache.get(key_id) {
            return Ok(pem);
        }

        let start = Instant::now();
        let requests: Vec<BoxFuture<'_, Result<String, KeyFetchError>>> = self
            .base_urls
            .iter()
            .map(|base| self.fetch_from(base, key_id).boxed())
            .collect();

        // select_ok panics on an empty iterator
        if requests.is_empty() {
            return Err(KeyFetchError::AllSourcesFailed(Box::new(
                KeyFetchError::NotFound {
                    key_id: key_id.to_string(),
                    location: "no repositories configured".to_string(),
                },
            )));
        }

        match select_ok(requests).await {
            Ok((pem, _remaining)) => {
                metrics::record_key_fetch(true, start.elapsed());
                self.cache.insert(key_id, pem.clone());
                tracing::debug!(target: "asap.keys.http", key_id = %key_id, "Fetched public key");
                Ok(pem)
            }
            Err(last) => {
                metrics::record_key_fetch(false, start.elapsed());
                tracing::debug!(
                    target: "asap.keys.http",
                    key_id = %key_id,
                    error = %last,
                    "All public key repositories failed"
                );
                Err(KeyFetchError::AllSourcesFailed(Box::new(last)))
            }
        }
    }

    async fn fetch_from(&self, base: &Url, key_id: &str) -> Result<String, KeyFetchError> {
        let url = Url::parse(&format!("{base}{key_id}")).map_err(|e| {
            KeyFetchError::InvalidKeyUrl {
                key_id: key_id.to_string(),
                reason: e.to_string(),
            }
        })?;
        let url_str = url.to_string();

        let response = self
            .http_client
            .get(url)
            .header(ACCEPT, PEM_CONTENT_TYPE)
            .send()
            .await
            .map_err(|source| {
                tracing::debug!(target: "asap.keys.http", url = %url_str, error = %source, "Key request failed");
                KeyFetchError::Http {
                    url: url_str.clone(),
                    source,
                }
            })?;

        let status = response.status();
        if status != StatusCode::OK {
            tracing::debug!(target: "asap.keys.http", url = %url_str, status = %status, "Key repository returned non-200");
            return Err(KeyFetchError::Status {
                url: url_str,
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|source| KeyFetchError::Http {
            url: url_str,
            source,
        })
    }
}

#[async_trait]
impl PublicKeyLoader for HttpKeyFetcher {
    async fn load(&self, key_id: &str) -> Result<String, KeyFetchError> {
        self.fetch(key_id).await
    }
}

fn build_client(timeout: Duration) -> reqwest::Client {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .unwrap_or_else(|e| {
            tracing::warn!(target: "asap.keys.http", error = %e, "Failed to build HTTP client with custom config, using defaults");
            reqwest::Client::new()
        })
}
