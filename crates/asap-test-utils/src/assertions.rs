//! Custom test assertions for expressive tests
//!
//! Decodes tokens without verifying them, so tests can check what an issuer
//! actually put on the wire.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde_json::Value;

/// Split a compact JWT (optionally `Bearer `-prefixed) into decoded header
/// and payload.
///
/// # Panics
///
/// Panics if the token is not three base64url JSON segments.
pub fn decode_parts(token: &str) -> (Value, Value) {
    let token = token.strip_prefix("Bearer ").unwrap_or(token);
    let mut parts = token.split('.');
    let header = parts.next().expect("JWT must have a header segment");
    let payload = parts.next().expect("JWT must have a payload segment");
    assert!(
        parts.next().is_some(),
        "JWT must have 3 parts (header.payload.signature)"
    );

    let decode = |segment: &str| -> Value {
        let bytes = URL_SAFE_NO_PAD
            .decode(segment)
            .expect("JWT segment must be base64url");
        serde_json::from_slice(&bytes).expect("JWT segment must be JSON")
    };
    (decode(header), decode(payload))
}

/// Custom assertions for issued tokens
///
/// # Example
/// ```rust,ignore
/// header
///     .assert_issuer("svc-a")
///     .assert_audience("svc-b")
///     .assert_key_id("svc-a/key1")
///     .assert_lifetime(600);
/// ```
pub trait TokenAssertions {
    fn assert_issuer(&self, iss: &str) -> &Self;

    /// Assert that `aud` is or contains `aud`.
    fn assert_audience(&self, aud: &str) -> &Self;

    fn assert_subject(&self, sub: &str) -> &Self;

    fn assert_key_id(&self, kid: &str) -> &Self;

    fn assert_algorithm(&self, alg: &str) -> &Self;

    /// Assert that `exp - iat` equals `seconds`.
    fn assert_lifetime(&self, seconds: i64) -> &Self;

    fn assert_claim(&self, name: &str, value: &Value) -> &Self;
}

impl TokenAssertions for str {
    fn assert_issuer(&self, iss: &str) -> &Self {
        let (_, payload) = decode_parts(self);
        assert_eq!(payload["iss"], iss, "unexpected issuer");
        self
    }

    fn assert_audience(&self, aud: &str) -> &Self {
        let (_, payload) = decode_parts(self);
        let matches = match &payload["aud"] {
            Value::String(s) => s == aud,
            Value::Array(items) => items.iter().any(|item| item == aud),
            _ => false,
        };
        assert!(matches, "audience {aud} not in {}", payload["aud"]);
        self
    }

    fn assert_subject(&self, sub: &str) -> &Self {
        let (_, payload) = decode_parts(self);
        assert_eq!(payload["sub"], sub, "unexpected subject");
        self
    }

    fn assert_key_id(&self, kid: &str) -> &Self {
        let (header, _) = decode_parts(self);
        assert_eq!(header["kid"], kid, "unexpected key id");
        self
    }

    fn assert_algorithm(&self, alg: &str) -> &Self {
        let (header, _) = decode_parts(self);
        assert_eq!(header["alg"], alg, "unexpected algorithm");
        self
    }

    fn assert_lifetime(&self, seconds: i64) -> &Self {
        let (_, payload) = decode_parts(self);
        let iat = payload["iat"].as_i64().expect("iat must be an integer");
        let exp = payload["exp"].as_i64().expect("exp must be an integer");
        assert_eq!(exp - iat, seconds, "unexpected token lifetime");
        self
    }

    fn assert_claim(&self, name: &str, value: &Value) -> &Self {
        let (_, payload) = decode_parts(self);
        assert_eq!(&payload[name], value, "unexpected value for claim {name}");
        self
    }
}
