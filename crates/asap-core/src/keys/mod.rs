//! Public key resolution.
//!
//! Every key source implements [`PublicKeyLoader`]: given a key id, return
//! the PEM text of the public key. Sources are selected by configuration
//! through [`KeySource`]:
//!
//! - [`HttpKeyFetcher`]: races one or more key repositories, caching results
//! - [`FileKeyLoader`]: reads `<dir>/<key_id>.pem`
//! - [`EnvKeyLoader`]: reads an environment variable derived from the key id
//! - [`StaticKeyLoader`]: always returns one fixed key (insecure mode only)
//!
//! Only the HTTP source caches.

mod cache;
mod env;
mod file;
mod fixed;
mod http;

pub use cache::{KeyCache, DEFAULT_KEY_CACHE_TTL, DEFAULT_SWEEP_INTERVAL};
pub use env::{env_key_name, EnvKeyLoader, DEFAULT_ENV_PREFIX};
pub use file::FileKeyLoader;
pub use fixed::{StaticKeyLoader, TEST_PRIVATE_KEY, TEST_PUBLIC_KEY};
pub use http::{parse_base_urls, HttpKeyFetcher, DEFAULT_KEY_FETCH_TIMEOUT, PEM_CONTENT_TYPE};

use crate::error::KeyFetchError;
use async_trait::async_trait;
use std::fmt;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

/// A source of PEM-encoded public keys addressed by key id.
#[async_trait]
pub trait PublicKeyLoader: Send + Sync {
    /// Return the PEM text of the public key for `key_id`.
    async fn load(&self, key_id: &str) -> Result<String, KeyFetchError>;
}

/// Adapter turning an async closure into a [`PublicKeyLoader`].
pub struct FnKeyLoader<F, Fut> {
    f: F,
    _fut: PhantomData<fn() -> Fut>,
}

/// Wrap an async function `key_id -> Result<pem, KeyFetchError>` as a loader.
///
/// ```rust,ignore
/// let loader = loader_fn(|key_id| async move {
///     lookup_in_vault(&key_id).await
/// });
/// ```
pub fn loader_fn<F, Fut>(f: F) -> FnKeyLoader<F, Fut>
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = Result<String, KeyFetchError>> + Send,
{
    FnKeyLoader {
        f,
        _fut: PhantomData,
    }
}

#[async_trait]
impl<F, Fut> PublicKeyLoader for FnKeyLoader<F, Fut>
where
    F: Fn(String) -> Fut + Send + Sync,
    Fut: Future<Output = Result<String, KeyFetchError>> + Send,
{
    async fn load(&self, key_id: &str) -> Result<String, KeyFetchError> {
        (self.f)(key_id.to_string()).await
    }
}

/// How an authenticator resolves public keys.
#[derive(Clone)]
pub enum KeySource {
    /// Base URLs of public key repositories, each ending in `/`.
    RepositoryUrls(Vec<String>),

    /// A caller-supplied loader (file, environment, custom).
    Loader(Arc<dyn PublicKeyLoader>),
}

impl KeySource {
    /// Wrap a loader.
    pub fn loader(loader: impl PublicKeyLoader + 'static) -> Self {
        Self::Loader(Arc::new(loader))
    }
}

impl fmt::Debug for KeySource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::RepositoryUrls(urls) => f.debug_tuple("RepositoryUrls").field(urls).finish(),
            Self::Loader(_) => f.write_str("Loader(..)"),
        }
    }
}
