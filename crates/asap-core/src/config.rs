//! Authenticator and issuer configuration.
//!
//! Both configs can be built programmatically or loaded from environment
//! variables. Private keys are held as [`SecretString`] and redacted in Debug
//! output.

use crate::error::ConfigError;
use crate::keys::{KeyCache, KeySource, StaticKeyLoader, TEST_PRIVATE_KEY};
use crate::validation::{DEFAULT_CLOCK_TOLERANCE, DEFAULT_MAX_LIFETIME, MAX_CLOCK_TOLERANCE};
use secrecy::SecretString;
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Environment variable overriding the clock tolerance, in seconds.
pub const LEEWAY_ENV_VAR: &str = "ASAP_SERVER_LEEWAY_SECONDS";

/// Default issued token expiry (10 minutes).
pub const DEFAULT_TOKEN_EXPIRY: Duration = Duration::from_secs(600);

/// Key id used by [`IssuerConfig::insecure`].
pub const INSECURE_KEY_ID_SUFFIX: &str = "insecure-test-key";

// =============================================================================
// Environment helpers
// =============================================================================

/// Parse a clock tolerance value.
///
/// Unset, unparsable, zero and values above [`MAX_CLOCK_TOLERANCE`] fall
/// back to [`DEFAULT_CLOCK_TOLERANCE`]; a warning is logged for values that
/// are set but unusable.
#[must_use]
pub fn parse_leeway(value: Option<&str>) -> Duration {
    let Some(raw) = value else {
        return DEFAULT_CLOCK_TOLERANCE;
    };

    match raw.trim().parse::<u64>() {
        Ok(secs) if secs > 0 && secs <= MAX_CLOCK_TOLERANCE.as_secs() => Duration::from_secs(secs),
        _ => {
            tracing::warn!(
                target: "asap.config",
                value = %raw,
                default_secs = DEFAULT_CLOCK_TOLERANCE.as_secs(),
                "Invalid {LEEWAY_ENV_VAR}, using default"
            );
            DEFAULT_CLOCK_TOLERANCE
        }
    }
}

/// Clock tolerance read from [`LEEWAY_ENV_VAR`].
#[must_use]
pub fn clock_tolerance_from_env() -> Duration {
    parse_leeway(env::var(LEEWAY_ENV_VAR).ok().as_deref())
}

fn required(vars: &HashMap<String, String>, name: &str) -> Result<String, ConfigError> {
    vars.get(name)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ConfigError::MissingValue(name.to_string()))
}

fn optional(vars: &HashMap<String, String>, name: &str) -> Option<String> {
    vars.get(name)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

fn positive_secs(vars: &HashMap<String, String>, name: &str) -> Result<Option<Duration>, ConfigError> {
    let Some(raw) = optional(vars, name) else {
        return Ok(None);
    };

    let secs: u64 = raw.parse().map_err(|e| ConfigError::InvalidValue {
        name: name.to_string(),
        reason: format!("must be a positive integer, got '{raw}': {e}"),
    })?;
    if secs == 0 {
        return Err(ConfigError::InvalidValue {
            name: name.to_string(),
            reason: "must be greater than 0".to_string(),
        });
    }
    Ok(Some(Duration::from_secs(secs)))
}

/// Parse a boolean flag; `true` and `1` (any case) are true.
#[must_use]
pub fn parse_flag(value: Option<&str>) -> bool {
    value.is_some_and(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "true" | "1"))
}

/// Split a comma-separated list, dropping empty items.
#[must_use]
pub fn parse_list(value: Option<&str>) -> Vec<String> {
    value
        .map(|v| {
            v.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

// =============================================================================
// AuthenticatorConfig
// =============================================================================

/// Configuration for an [`Authenticator`](crate::authenticator::Authenticator).
#[derive(Debug, Clone)]
pub struct AuthenticatorConfig {
    /// Audience this resource server accepts (`aud` must contain it).
    pub audience: String,

    /// Where public keys come from.
    pub key_source: KeySource,

    /// Maximum accepted `exp - iat`.
    pub max_lifetime: Duration,

    /// Leeway applied to time claims.
    pub clock_tolerance: Duration,

    /// Verify against the fixed test key, ignoring `key_source`.
    pub insecure_mode: bool,

    /// Cache shared with other authenticators. A fresh cache is created when
    /// absent. Only used with [`KeySource::RepositoryUrls`].
    ///
    /// Nothing sweeps the cache unless the caller runs
    /// [`KeyCache::spawn_sweeper`] on it, either on this cache or on
    /// [`Authenticator::key_cache`](crate::authenticator::Authenticator::key_cache).
    pub key_cache: Option<Arc<KeyCache>>,
}

impl AuthenticatorConfig {
    /// Config with default lifetime, clock tolerance from
    /// [`LEEWAY_ENV_VAR`], and insecure mode off.
    pub fn new(audience: impl Into<String>, key_source: KeySource) -> Self {
        Self {
            audience: audience.into(),
            key_source,
            max_lifetime: DEFAULT_MAX_LIFETIME,
            clock_tolerance: clock_tolerance_from_env(),
            insecure_mode: false,
            key_cache: None,
        }
    }

    /// Config for insecure mode, verifying against the fixed test key.
    pub fn insecure(audience: impl Into<String>) -> Self {
        Self::new(audience, KeySource::loader(StaticKeyLoader::test_key())).with_insecure_mode(true)
    }

    #[must_use]
    pub fn with_max_lifetime(mut self, max_lifetime: Duration) -> Self {
        self.max_lifetime = max_lifetime;
        self
    }

    /// Values above [`MAX_CLOCK_TOLERANCE`] are rejected by
    /// [`Authenticator::new`](crate::authenticator::Authenticator::new).
    #[must_use]
    pub fn with_clock_tolerance(mut self, clock_tolerance: Duration) -> Self {
        self.clock_tolerance = clock_tolerance;
        self
    }

    #[must_use]
    pub fn with_insecure_mode(mut self, insecure_mode: bool) -> Self {
        self.insecure_mode = insecure_mode;
        self
    }

    #[must_use]
    pub fn with_key_cache(mut self, cache: Arc<KeyCache>) -> Self {
        self.key_cache = Some(cache);
        self
    }

    /// Load from process environment variables.
    ///
    /// # Errors
    ///
    /// See [`AuthenticatorConfig::from_vars`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load from a variable map.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the audience is missing, no repository URL is
    /// given outside insecure mode, or a numeric value is invalid.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let audience = required(vars, "ASAP_RESOURCE_SERVER_AUDIENCE")?;
        let insecure_mode = parse_flag(vars.get("ASAP_INSECURE_MODE").map(String::as_str));
        let urls = parse_list(
            vars.get("ASAP_PUBLIC_KEY_REPOSITORY_URLS")
                .map(String::as_str),
        );

        let key_source = if urls.is_empty() {
            if !insecure_mode {
                return Err(ConfigError::MissingValue(
                    "ASAP_PUBLIC_KEY_REPOSITORY_URLS".to_string(),
                ));
            }
            KeySource::loader(StaticKeyLoader::test_key())
        } else {
            KeySource::RepositoryUrls(urls)
        };

        let max_lifetime =
            positive_secs(vars, "ASAP_MAX_LIFETIME_SECONDS")?.unwrap_or(DEFAULT_MAX_LIFETIME);
        let clock_tolerance = parse_leeway(vars.get(LEEWAY_ENV_VAR).map(String::as_str));

        Ok(Self {
            audience,
            key_source,
            max_lifetime,
            clock_tolerance,
            insecure_mode,
            key_cache: None,
        })
    }
}

// =============================================================================
// IssuerConfig
// =============================================================================

/// Configuration for an [`Issuer`](crate::issuer::Issuer).
#[derive(Clone)]
pub struct IssuerConfig {
    /// PEM private key. Escaped `\n` sequences and `"` are normalized away.
    pub private_key: SecretString,

    /// Key id placed in the token header; must be `<issuer>/<name>`.
    pub key_id: String,

    pub issuer: String,

    pub audience: String,

    /// Defaults to the issuer.
    pub subject: Option<String>,

    /// Lifetime of minted tokens.
    pub expiry: Duration,

    /// Age after which a cached token is replaced. Defaults to 90% of
    /// `expiry` and must be strictly less than it.
    pub max_age: Option<Duration>,

    /// Claims added to every minted token, over the standard claims.
    pub additional_claims: Map<String, Value>,
}

impl IssuerConfig {
    /// Config with default expiry and max age.
    pub fn new(
        private_key: impl Into<String>,
        key_id: impl Into<String>,
        issuer: impl Into<String>,
        audience: impl Into<String>,
    ) -> Self {
        Self {
            private_key: SecretString::from(private_key.into()),
            key_id: key_id.into(),
            issuer: issuer.into(),
            audience: audience.into(),
            subject: None,
            expiry: DEFAULT_TOKEN_EXPIRY,
            max_age: None,
            additional_claims: Map::new(),
        }
    }

    /// Config signing with the fixed test private key.
    ///
    /// The key id is `<issuer>/insecure-test-key`. Tokens minted this way are
    /// only accepted by authenticators in insecure mode.
    pub fn insecure(issuer: impl Into<String>, audience: impl Into<String>) -> Self {
        let issuer = issuer.into();
        let key_id = format!("{issuer}/{INSECURE_KEY_ID_SUFFIX}");
        Self::new(TEST_PRIVATE_KEY, key_id, issuer, audience)
    }

    #[must_use]
    pub fn with_subject(mut self, subject: impl Into<String>) -> Self {
        self.subject = Some(subject.into());
        self
    }

    #[must_use]
    pub fn with_expiry(mut self, expiry: Duration) -> Self {
        self.expiry = expiry;
        self
    }

    #[must_use]
    pub fn with_max_age(mut self, max_age: Duration) -> Self {
        self.max_age = Some(max_age);
        self
    }

    #[must_use]
    pub fn with_additional_claims(mut self, claims: Map<String, Value>) -> Self {
        self.additional_claims = claims;
        self
    }

    /// Effective max age.
    #[must_use]
    pub fn effective_max_age(&self) -> Duration {
        self.max_age.unwrap_or_else(|| (self.expiry / 10) * 9)
    }

    /// Check required values and the max age / expiry relationship.
    ///
    /// # Errors
    ///
    /// Returns `MissingValue` for an empty private key, key id, issuer or
    /// audience, `InvalidValue` for a zero expiry, and
    /// `MaxAgeNotBelowExpiry` if the max age is not strictly below expiry.
    pub fn validate(&self) -> Result<(), ConfigError> {
        use secrecy::ExposeSecret;

        if self.private_key.expose_secret().trim().is_empty() {
            return Err(ConfigError::MissingValue("private_key".to_string()));
        }
        for (name, value) in [
            ("key_id", &self.key_id),
            ("issuer", &self.issuer),
            ("audience", &self.audience),
        ] {
            if value.trim().is_empty() {
                return Err(ConfigError::MissingValue(name.to_string()));
            }
        }

        if self.expiry.as_secs() == 0 {
            return Err(ConfigError::InvalidValue {
                name: "expiry".to_string(),
                reason: "must be at least one second".to_string(),
            });
        }

        let max_age = self.effective_max_age();
        if max_age >= self.expiry {
            return Err(ConfigError::MaxAgeNotBelowExpiry {
                max_age_secs: max_age.as_secs(),
                expiry_secs: self.expiry.as_secs(),
            });
        }

        Ok(())
    }

    /// Load from process environment variables.
    ///
    /// # Errors
    ///
    /// See [`IssuerConfig::from_vars`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load from a variable map.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a required value is missing or a numeric
    /// value is invalid.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let mut config = Self::new(
            required(vars, "ASAP_PRIVATE_KEY")?,
            required(vars, "ASAP_KEY_ID")?,
            required(vars, "ASAP_ISSUER")?,
            required(vars, "ASAP_AUDIENCE")?,
        );

        config.subject = optional(vars, "ASAP_SUBJECT");
        if let Some(expiry) = positive_secs(vars, "ASAP_TOKEN_EXPIRY_SECONDS")? {
            config.expiry = expiry;
        }
        config.max_age = positive_secs(vars, "ASAP_TOKEN_MAX_AGE_SECONDS")?;

        Ok(config)
    }
}

/// Custom Debug implementation that redacts the private key.
impl fmt::Debug for IssuerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let additional: Vec<&String> = self.additional_claims.keys().collect();
        f.debug_struct("IssuerConfig")
            .field("private_key", &"[REDACTED]")
            .field("key_id", &self.key_id)
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("subject", &self.subject)
            .field("expiry", &self.expiry)
            .field("max_age", &self.max_age)
            .field("additional_claims", &additional)
            .finish()
    }
}
