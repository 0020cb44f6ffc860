//! Outbound ASAP token minting.
//!
//! An [`Issuer`] signs short-lived RS256 tokens and caches the resulting
//! `Authorization` header value. A cached header is reused until it is older
//! than the configured max age, which is always strictly less than the token
//! expiry, so a reused token never reaches the edge of its validity.
//!
//! # Caching is keyed on time only
//!
//! Per-call claims passed to [`Issuer::auth_header_with`] are only applied
//! when a new token is minted. While a cached header is fresh it is returned
//! unchanged, even if the per-call claims differ from the ones it was minted
//! with. Callers that need per-request claims in every token should use one
//! `Issuer` per claim set.

use crate::config::IssuerConfig;
use crate::error::{ConfigError, IssuerError};
use crate::metrics;
use jsonwebtoken::{Algorithm, EncodingKey, Header};
use ring::rand::{SecureRandom, SystemRandom};
use secrecy::{ExposeSecret, SecretString};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::{Mutex, PoisonError};

/// Number of random bytes in a `jti`.
const JTI_BYTES: usize = 20;

/// Normalize a private key passed through an environment that escapes
/// newlines: literal `\n` sequences become newlines and `"` is removed.
#[must_use]
pub fn normalize_private_key(raw: &str) -> String {
    raw.replace("\\n", "\n").replace('"', "")
}

struct IssuerState {
    header: String,
    generated_at_ms: i64,
}

/// Mints and caches outbound `Authorization` header values.
///
/// Safe to share across tasks; the check-and-regenerate step runs under a
/// single lock.
pub struct Issuer {
    key_id: String,
    issuer: String,
    audience: String,
    subject: String,
    expiry_secs: i64,
    max_age_ms: i64,
    additional_claims: Map<String, Value>,
    encoding_key: EncodingKey,
    rng: SystemRandom,
    state: Mutex<Option<IssuerState>>,
}

impl Issuer {
    /// Build an issuer and mint its first token.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if a required value is missing, the max age is
    /// not below the expiry, or the private key cannot sign an RS256 token.
    pub fn new(config: IssuerConfig) -> Result<Self, ConfigError> {
        config.validate()?;

        let pem = normalize_private_key(config.private_key.expose_secret());
        let encoding_key = EncodingKey::from_rsa_pem(pem.as_bytes())
            .map_err(|e| ConfigError::InvalidPrivateKey(e.to_string()))?;

        let max_age = config.effective_max_age();
        let issuer = Self {
            subject: config.subject.unwrap_or_else(|| config.issuer.clone()),
            key_id: config.key_id,
            issuer: config.issuer,
            audience: config.audience,
            expiry_secs: i64::try_from(config.expiry.as_secs()).unwrap_or(i64::MAX),
            max_age_ms: i64::try_from(max_age.as_millis()).unwrap_or(i64::MAX),
            additional_claims: config.additional_claims,
            encoding_key,
            rng: SystemRandom::new(),
            state: Mutex::new(None),
        };

        // Fail at construction if the key cannot actually sign
        issuer
            .auth_header()
            .map_err(|e| ConfigError::InvalidPrivateKey(e.to_string()))?;

        tracing::info!(
            target: "asap.issuer",
            issuer = %issuer.issuer,
            key_id = %issuer.key_id,
            audience = %issuer.audience,
            "ASAP issuer initialized"
        );

        Ok(issuer)
    }

    /// The key id placed in minted token headers.
    #[must_use]
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// `"Bearer <jwt>"` for an outbound request.
    ///
    /// # Errors
    ///
    /// Returns `IssuerError` if a new token has to be minted and signing or
    /// randomness fails.
    pub fn auth_header(&self) -> Result<SecretString, IssuerError> {
        self.auth_header_with(&Map::new())
    }

    /// Like [`Issuer::auth_header`], merging `claims` over the standard and
    /// configured claims when a new token is minted.
    ///
    /// # Errors
    ///
    /// Returns `IssuerError` if signing or randomness fails.
    pub fn auth_header_with(&self, claims: &Map<String, Value>) -> Result<SecretString, IssuerError> {
        let now_ms = chrono::Utc::now().timestamp_millis();
        self.auth_header_at(now_ms, claims)
    }

    /// Deterministic variant of [`Issuer::auth_header_with`] at `now_ms`.
    pub(crate) fn auth_header_at(
        &self,
        now_ms: i64,
        claims: &Map<String, Value>,
    ) -> Result<SecretString, IssuerError> {
        let mut state = self.state.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(cached) = state.as_ref() {
            if now_ms.saturating_sub(cached.generated_at_ms) <= self.max_age_ms {
                return Ok(SecretString::from(cached.header.clone()));
            }
        }

        let header = format!("Bearer {}", self.mint(now_ms, claims)?);
        *state = Some(IssuerState {
            header: header.clone(),
            generated_at_ms: now_ms,
        });

        Ok(SecretString::from(header))
    }

    fn mint(&self, now_ms: i64, per_call: &Map<String, Value>) -> Result<String, IssuerError> {
        let iat = now_ms.div_euclid(1000);

        let mut claims = Map::new();
        claims.insert("aud".to_string(), Value::from(self.audience.as_str()));
        claims.insert("iss".to_string(), Value::from(self.issuer.as_str()));
        claims.insert("sub".to_string(), Value::from(self.subject.as_str()));
        claims.insert("iat".to_string(), Value::from(iat));
        claims.insert("nbf".to_string(), Value::from(iat));
        claims.insert(
            "exp".to_string(),
            Value::from(iat.saturating_add(self.expiry_secs)),
        );
        claims.insert("jti".to_string(), Value::from(self.generate_jti()?));

        // Later sources win: standard, then configured, then per-call
        claims.extend(self.additional_claims.clone());
        claims.extend(per_call.clone());

        let mut header = Header::new(Algorithm::RS256);
        header.kid = Some(self.key_id.clone());

        let token = jsonwebtoken::encode(&header, &Value::Object(claims), &self.encoding_key)?;

        metrics::record_token_minted();
        tracing::debug!(target: "asap.issuer", key_id = %self.key_id, iat, "Minted ASAP token");

        Ok(token)
    }

    fn generate_jti(&self) -> Result<String, IssuerError> {
        let mut bytes = [0u8; JTI_BYTES];
        self.rng.fill(&mut bytes).map_err(|_| {
            tracing::error!(target: "asap.issuer", "System random generator failed");
            IssuerError::Randomness
        })?;
        Ok(hex::encode(bytes))
    }
}

impl fmt::Debug for Issuer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Issuer")
            .field("key_id", &self.key_id)
            .field("issuer", &self.issuer)
            .field("audience", &self.audience)
            .field("subject", &self.subject)
            .field("expiry_secs", &self.expiry_secs)
            .field("max_age_ms", &self.max_age_ms)
            .field("encoding_key", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}
