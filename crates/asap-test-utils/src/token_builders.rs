//! Builder for ASAP test tokens
//!
//! Produces signed compact JWTs with sensible defaults so tests only spell
//! out the claim they are exercising.

use crate::crypto_fixtures::{TestKeyPair, RSA_PRIMARY};
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::Utc;
use jsonwebtoken::{encode, Header};
use serde_json::{json, Map, Value};
use std::sync::atomic::{AtomicU64, Ordering};

static JTI_COUNTER: AtomicU64 = AtomicU64::new(0);

#[derive(Debug, Clone)]
enum KeyIdChoice {
    /// `<iss>/<key pair name>`
    Derived,
    Explicit(String),
    Omitted,
}

/// Builder for test tokens.
///
/// Defaults: issued now, valid for 60 seconds, signed with [`RSA_PRIMARY`]
/// under the key id `<iss>/rsa-primary`.
///
/// # Example
/// ```rust,ignore
/// let token = TestTokenBuilder::new("svc-a", "svc-b")
///     .expires_in(300)
///     .claim("tenant", "acme")
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct TestTokenBuilder {
    iss: Option<String>,
    aud: Value,
    sub: Option<String>,
    iat: Option<i64>,
    nbf: Option<i64>,
    exp: Option<i64>,
    jti: Option<String>,
    key_id: KeyIdChoice,
    key_pair: TestKeyPair,
    extra: Map<String, Value>,
}

impl TestTokenBuilder {
    /// Create a builder for `issuer` calling `audience`.
    pub fn new(issuer: &str, audience: &str) -> Self {
        let now = Utc::now().timestamp();
        Self {
            iss: Some(issuer.to_string()),
            aud: Value::String(audience.to_string()),
            sub: None,
            iat: Some(now),
            nbf: None,
            exp: Some(now + 60),
            jti: Some(format!(
                "test-jti-{}",
                JTI_COUNTER.fetch_add(1, Ordering::Relaxed)
            )),
            key_id: KeyIdChoice::Derived,
            key_pair: RSA_PRIMARY,
            extra: Map::new(),
        }
    }

    /// Drop the `iss` claim entirely.
    pub fn without_issuer(mut self) -> Self {
        self.iss = None;
        self
    }

    /// Replace the audience with a list.
    pub fn audiences(mut self, audiences: &[&str]) -> Self {
        self.aud = json!(audiences);
        self
    }

    pub fn subject(mut self, sub: &str) -> Self {
        self.sub = Some(sub.to_string());
        self
    }

    /// Use an explicit `kid` header instead of the derived one.
    pub fn key_id(mut self, kid: &str) -> Self {
        self.key_id = KeyIdChoice::Explicit(kid.to_string());
        self
    }

    /// Omit the `kid` header.
    pub fn without_key_id(mut self) -> Self {
        self.key_id = KeyIdChoice::Omitted;
        self
    }

    /// Sign with `pair`, using its algorithm.
    pub fn signed_with(mut self, pair: &TestKeyPair) -> Self {
        self.key_pair = *pair;
        self
    }

    pub fn issued_at(mut self, iat: i64) -> Self {
        self.iat = Some(iat);
        self
    }

    pub fn without_issued_at(mut self) -> Self {
        self.iat = None;
        self
    }

    pub fn not_before(mut self, nbf: i64) -> Self {
        self.nbf = Some(nbf);
        self
    }

    pub fn expires_at(mut self, exp: i64) -> Self {
        self.exp = Some(exp);
        self
    }

    /// Expire `seconds` after the current `iat`.
    pub fn expires_in(mut self, seconds: i64) -> Self {
        let base = self.iat.unwrap_or_else(|| Utc::now().timestamp());
        self.exp = Some(base + seconds);
        self
    }

    pub fn without_expiry(mut self) -> Self {
        self.exp = None;
        self
    }

    /// Add an arbitrary claim.
    pub fn claim(mut self, name: &str, value: impl Into<Value>) -> Self {
        self.extra.insert(name.to_string(), value.into());
        self
    }

    /// The `kid` header the token will carry, if any.
    pub fn resolved_key_id(&self) -> Option<String> {
        match &self.key_id {
            KeyIdChoice::Derived => Some(
                self.key_pair
                    .key_id(self.iss.as_deref().unwrap_or_default()),
            ),
            KeyIdChoice::Explicit(kid) => Some(kid.clone()),
            KeyIdChoice::Omitted => None,
        }
    }

    /// The payload as JSON.
    pub fn claims(&self) -> Value {
        let mut claims = Map::new();
        if let Some(iss) = &self.iss {
            claims.insert("iss".into(), json!(iss));
        }
        claims.insert("aud".into(), self.aud.clone());
        let optional = [
            ("sub", self.sub.as_ref().map(|s| json!(s))),
            ("iat", self.iat.map(|v| json!(v))),
            ("nbf", self.nbf.map(|v| json!(v))),
            ("exp", self.exp.map(|v| json!(v))),
            ("jti", self.jti.as_ref().map(|s| json!(s))),
        ];
        for (name, value) in optional {
            if let Some(value) = value {
                claims.insert(name.into(), value);
            }
        }
        claims.extend(self.extra.clone());
        Value::Object(claims)
    }

    /// Sign and return the compact token.
    ///
    /// # Panics
    ///
    /// Panics if signing with the fixture key fails.
    pub fn build(&self) -> String {
        let mut header = Header::new(self.key_pair.alg);
        header.kid = self.resolved_key_id();
        encode(&header, &self.claims(), &self.key_pair.encoding_key())
            .expect("signing test token must succeed")
    }

    /// `Bearer <token>`, ready for an `Authorization` header.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.build())
    }

    /// Token with `alg: none` and an empty signature.
    pub fn build_unsigned(&self) -> String {
        let mut header = json!({"alg": "none", "typ": "JWT"});
        if let Some(kid) = self.resolved_key_id() {
            header["kid"] = json!(kid);
        }
        format!(
            "{}.{}.",
            URL_SAFE_NO_PAD.encode(header.to_string()),
            URL_SAFE_NO_PAD.encode(self.claims().to_string()),
        )
    }
}
