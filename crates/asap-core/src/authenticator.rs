//! Inbound ASAP token authentication.
//!
//! [`Authenticator::authenticate`] takes the raw `Authorization` header value
//! and runs these stages in order:
//!
//! 1. No header: no claims
//! 2. Scheme other than `Bearer`: no claims
//! 3. Unverified decode (size limit, structure)
//! 4. Missing `iss` or `kid`: no claims
//! 5. Issuer / key id validation
//! 6. Public key resolution
//! 7. Signature, algorithm, audience, `exp` and `nbf` verification
//! 8. Time claim policy (lifetime, future `iat`, `nbf` range)
//!
//! "No claims" is not an error; it means the request carries no ASAP token
//! and the caller decides whether anonymous access is acceptable. Every
//! failure surfaces as [`AsapError::InvalidToken`].

use crate::claims::AsapClaims;
use crate::config::AuthenticatorConfig;
use crate::error::{AsapError, ConfigError};
use crate::jwt::{decode_unverified, decoding_key_for, is_allowed_algorithm};
use crate::keys::{HttpKeyFetcher, KeyCache, KeySource, PublicKeyLoader, StaticKeyLoader};
use crate::metrics::{self, AuthOutcome};
use crate::validation::{
    validate_issuer_and_key_id, validate_time_claims, TimeClaims, MAX_CLOCK_TOLERANCE,
};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, decode_header, Validation};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

/// Authorization scheme carrying ASAP tokens.
pub const BEARER_SCHEME: &str = "Bearer";

/// Verifies ASAP tokens presented in `Authorization` headers.
pub struct Authenticator {
    audience: String,
    max_lifetime: Duration,
    clock_tolerance: Duration,
    insecure_mode: bool,
    key_loader: Arc<dyn PublicKeyLoader>,
    key_cache: Option<Arc<KeyCache>>,
}

impl Authenticator {
    /// Build an authenticator.
    ///
    /// In insecure mode the configured key source is ignored and the fixed
    /// test public key is used for every token.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the audience is empty, the clock tolerance
    /// exceeds [`MAX_CLOCK_TOLERANCE`], or a repository URL is invalid.
    pub fn new(config: AuthenticatorConfig) -> Result<Self, ConfigError> {
        if config.audience.trim().is_empty() {
            return Err(ConfigError::MissingValue("audience".to_string()));
        }

        if config.clock_tolerance > MAX_CLOCK_TOLERANCE {
            return Err(ConfigError::InvalidValue {
                name: "clock_tolerance".to_string(),
                reason: format!(
                    "{}s exceeds the maximum of {}s",
                    config.clock_tolerance.as_secs(),
                    MAX_CLOCK_TOLERANCE.as_secs()
                ),
            });
        }

        let mut key_cache = None;
        let key_loader: Arc<dyn PublicKeyLoader> = if config.insecure_mode {
            tracing::warn!(
                target: "asap.authenticator",
                "ASAP insecure mode enabled: tokens are verified against the public test key"
            );
            Arc::new(StaticKeyLoader::test_key())
        } else {
            match config.key_source {
                KeySource::RepositoryUrls(urls) => {
                    let fetcher = match config.key_cache {
                        Some(cache) => HttpKeyFetcher::with_cache(&urls, cache)?,
                        None => HttpKeyFetcher::new(&urls)?,
                    };
                    key_cache = Some(Arc::clone(fetcher.cache()));
                    Arc::new(fetcher)
                }
                KeySource::Loader(loader) => loader,
            }
        };

        tracing::info!(
            target: "asap.authenticator",
            audience = %config.audience,
            max_lifetime_secs = config.max_lifetime.as_secs(),
            clock_tolerance_secs = config.clock_tolerance.as_secs(),
            insecure_mode = config.insecure_mode,
            "ASAP authenticator initialized"
        );

        Ok(Self {
            audience: config.audience,
            max_lifetime: config.max_lifetime,
            clock_tolerance: config.clock_tolerance,
            insecure_mode: config.insecure_mode,
            key_loader,
            key_cache,
        })
    }

    /// Build an authenticator from environment variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the environment is incomplete or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::new(AuthenticatorConfig::from_env()?)
    }

    /// Cache used for repository-fetched keys, if any.
    ///
    /// Expired entries are skipped on lookup but only removed by
    /// [`KeyCache::sweep`]; start [`KeyCache::spawn_sweeper`] on this cache
    /// for long-lived authenticators.
    #[must_use]
    pub fn key_cache(&self) -> Option<&Arc<KeyCache>> {
        self.key_cache.as_ref()
    }

    /// Whether tokens are verified against the fixed test key.
    #[must_use]
    pub fn is_insecure(&self) -> bool {
        self.insecure_mode
    }

    /// Authenticate an `Authorization` header value.
    ///
    /// Returns `Ok(None)` when the header is absent, uses another scheme, or
    /// carries a token without `iss` or `kid`.
    ///
    /// # Errors
    ///
    /// Returns `AsapError::InvalidToken` when an ASAP token is present but
    /// fails any check, including when its public key cannot be fetched.
    #[instrument(skip_all)]
    pub async fn authenticate(&self, header: Option<&str>) -> Result<Option<AsapClaims>, AsapError> {
        let result = self.verify(header).await;

        match &result {
            Ok(Some(claims)) => {
                metrics::record_authentication(AuthOutcome::Verified);
                tracing::debug!(
                    target: "asap.authenticator",
                    iss = %claims.iss,
                    "ASAP token verified"
                );
            }
            Ok(None) => metrics::record_authentication(AuthOutcome::NoClaims),
            Err(e) => {
                metrics::record_authentication(AuthOutcome::Rejected);
                tracing::warn!(
                    target: "asap.authenticator",
                    error = %e.describe(),
                    "ASAP authentication failed"
                );
            }
        }

        result
    }

    async fn verify(&self, header: Option<&str>) -> Result<Option<AsapClaims>, AsapError> {
        let Some(header) = header.filter(|h| !h.is_empty()) else {
            return Ok(None);
        };

        let mut parts = header.split(' ');
        if parts.next() != Some(BEARER_SCHEME) {
            tracing::debug!(target: "asap.authenticator", "Non-Bearer authorization scheme, skipping");
            return Ok(None);
        }
        let token = parts.next().unwrap_or_default();

        let unverified = decode_unverified(token)
            .map_err(|e| AsapError::invalid_token(e.to_string()))?;

        let (Some(issuer), Some(key_id)) = (unverified.issuer(), unverified.key_id()) else {
            tracing::debug!(target: "asap.authenticator", "Token has no issuer or key id, skipping");
            return Ok(None);
        };

        validate_issuer_and_key_id(issuer, key_id)?;

        let public_key = self.key_loader.load(key_id).await.map_err(|e| {
            tracing::debug!(target: "asap.authenticator", key_id = %key_id, error = %e, "Public key lookup failed");
            AsapError::invalid_token("failed to fetch public key").with_cause(e)
        })?;

        let claims = self.verify_signature(token, &public_key)?;

        validate_time_claims(
            TimeClaims::from(&claims),
            self.max_lifetime,
            self.clock_tolerance,
        )?;

        Ok(Some(claims))
    }

    fn verify_signature(&self, token: &str, public_key: &str) -> Result<AsapClaims, AsapError> {
        let header = decode_header(token).map_err(verification_error)?;

        if !is_allowed_algorithm(header.alg) {
            tracing::debug!(target: "asap.authenticator", alg = ?header.alg, "Token algorithm not allowed");
            return Err(AsapError::invalid_token("invalid algorithm"));
        }

        let decoding_key = decoding_key_for(header.alg, public_key).map_err(|e| {
            tracing::debug!(target: "asap.authenticator", alg = ?header.alg, error = %e, "Public key does not match token algorithm");
            AsapError::invalid_token("invalid algorithm").with_cause(e)
        })?;

        let mut validation = Validation::new(header.alg);
        validation.set_audience(&[self.audience.as_str()]);
        // A negative or non-integer exp is unparsable, so it must be required
        validation.set_required_spec_claims(&["aud", "exp"]);
        validation.leeway = self.clock_tolerance.as_secs();
        validation.validate_exp = true;
        validation.validate_nbf = true;

        decode::<AsapClaims>(token, &decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(verification_error)
    }
}

/// Map a verification failure to an `InvalidToken` with a stable message.
fn verification_error(err: jsonwebtoken::errors::Error) -> AsapError {
    let message = match err.kind() {
        ErrorKind::InvalidSignature => "invalid signature",
        ErrorKind::ExpiredSignature => "jwt expired",
        ErrorKind::ImmatureSignature => "jwt not active",
        ErrorKind::InvalidAudience => "jwt audience invalid",
        ErrorKind::InvalidAlgorithm | ErrorKind::InvalidAlgorithmName => "invalid algorithm",
        ErrorKind::MissingRequiredClaim(_) => "jwt missing required claim",
        _ => "jwt malformed",
    };
    tracing::debug!(target: "asap.authenticator", error = %err, "Token verification failed");
    AsapError::invalid_token(message).with_cause(err)
}

impl fmt::Debug for Authenticator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Authenticator")
            .field("audience", &self.audience)
            .field("max_lifetime", &self.max_lifetime)
            .field("clock_tolerance", &self.clock_tolerance)
            .field("insecure_mode", &self.insecure_mode)
            .finish_non_exhaustive()
    }
}
