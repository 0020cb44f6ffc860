//! Outbound HTTP client that signs every request with an ASAP token.

use crate::config::IssuerConfig;
use crate::error::{ConfigError, IssuerError};
use crate::issuer::Issuer;
use reqwest::header::{HeaderValue, AUTHORIZATION};
use reqwest::{Method, RequestBuilder};
use secrecy::ExposeSecret;
use std::sync::Arc;
use std::time::Duration;

/// Token expiry used by [`AsapClient::for_service`] (5 minutes).
pub const DEFAULT_CLIENT_TOKEN_EXPIRY: Duration = Duration::from_secs(300);

/// Build the `Authorization` header value for an issuer, marked sensitive.
///
/// # Errors
///
/// Returns `IssuerError` if minting fails or the token is not a valid header
/// value.
pub fn authorization_value(issuer: &Issuer) -> Result<HeaderValue, IssuerError> {
    let header = issuer.auth_header()?;
    let mut value = HeaderValue::from_str(header.expose_secret())
        .map_err(|_| IssuerError::InvalidHeaderValue)?;
    value.set_sensitive(true);
    Ok(value)
}

/// Adds an ASAP `Authorization` header to a `reqwest` request.
pub trait AsapRequestExt: Sized {
    /// Attach the issuer's current `Authorization` header.
    ///
    /// # Errors
    ///
    /// Returns `IssuerError` if a token cannot be minted.
    fn asap(self, issuer: &Issuer) -> Result<Self, IssuerError>;
}

impl AsapRequestExt for RequestBuilder {
    fn asap(self, issuer: &Issuer) -> Result<Self, IssuerError> {
        Ok(self.header(AUTHORIZATION, authorization_value(issuer)?))
    }
}

/// `reqwest::Client` paired with an [`Issuer`].
///
/// Cloning is cheap; clones share the connection pool and the cached token.
#[derive(Debug, Clone)]
pub struct AsapClient {
    http: reqwest::Client,
    issuer: Arc<Issuer>,
}

impl AsapClient {
    /// Client with a default `reqwest::Client`.
    pub fn new(issuer: Issuer) -> Self {
        Self::with_client(reqwest::Client::new(), issuer)
    }

    /// Client reusing an existing `reqwest::Client`.
    pub fn with_client(http: reqwest::Client, issuer: Issuer) -> Self {
        Self {
            http,
            issuer: Arc::new(issuer),
        }
    }

    /// Client for calling `service` as `issuer`, signing with
    /// `<issuer>/<key_name>` and a 5 minute token expiry.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the issuer cannot be built.
    pub fn for_service(
        issuer: &str,
        service: &str,
        key_name: &str,
        private_key: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let config = IssuerConfig::new(private_key, format!("{issuer}/{key_name}"), issuer, service)
            .with_expiry(DEFAULT_CLIENT_TOKEN_EXPIRY);
        Ok(Self::new(Issuer::new(config)?))
    }

    /// Client signing with the fixed test key. Only accepted by services in
    /// insecure mode.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the issuer or audience is empty.
    pub fn insecure(issuer: &str, audience: &str) -> Result<Self, ConfigError> {
        Ok(Self::new(Issuer::new(IssuerConfig::insecure(issuer, audience))?))
    }

    /// The issuer used to sign requests.
    #[must_use]
    pub fn issuer(&self) -> &Issuer {
        &self.issuer
    }

    /// Start a request with the ASAP header attached.
    ///
    /// # Errors
    ///
    /// Returns `IssuerError` if a token cannot be minted.
    pub fn request(&self, method: Method, url: &str) -> Result<RequestBuilder, IssuerError> {
        self.http.request(method, url).asap(&self.issuer)
    }

    /// # Errors
    ///
    /// See [`AsapClient::request`].
    pub fn get(&self, url: &str) -> Result<RequestBuilder, IssuerError> {
        self.request(Method::GET, url)
    }

    /// # Errors
    ///
    /// See [`AsapClient::request`].
    pub fn post(&self, url: &str) -> Result<RequestBuilder, IssuerError> {
        self.request(Method::POST, url)
    }

    /// # Errors
    ///
    /// See [`AsapClient::request`].
    pub fn put(&self, url: &str) -> Result<RequestBuilder, IssuerError> {
        self.request(Method::PUT, url)
    }

    /// # Errors
    ///
    /// See [`AsapClient::request`].
    pub fn patch(&self, url: &str) -> Result<RequestBuilder, IssuerError> {
        self.request(Method::PATCH, url)
    }

    /// # Errors
    ///
    /// See [`AsapClient::request`].
    pub fn delete(&self, url: &str) -> Result<RequestBuilder, IssuerError> {
        self.request(Method::DELETE, url)
    }
}
