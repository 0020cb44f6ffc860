//! ASAP token claims.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;

/// The `aud` claim, which may be a single string or a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    Single(String),
    Multiple(Vec<String>),
}

impl Audience {
    /// Whether `audience` is among the listed audiences.
    #[must_use]
    pub fn contains(&self, audience: &str) -> bool {
        match self {
            Self::Single(aud) => aud == audience,
            Self::Multiple(auds) => auds.iter().any(|a| a == audience),
        }
    }
}

impl From<&str> for Audience {
    fn from(value: &str) -> Self {
        Self::Single(value.to_string())
    }
}

/// Verified claims of an ASAP token.
///
/// Only produced by the [`Authenticator`](crate::authenticator::Authenticator)
/// after signature verification. Claims other than the registered ones are
/// kept in `additional`.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
pub struct AsapClaims {
    /// Issuer.
    pub iss: String,

    /// Subject. Defaults to the issuer when minted by an
    /// [`Issuer`](crate::issuer::Issuer).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,

    /// Audience.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<Audience>,

    /// Issued at (Unix seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,

    /// Not before (Unix seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,

    /// Expiration (Unix seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exp: Option<i64>,

    /// Unique token id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,

    /// Caller-supplied claims.
    #[serde(flatten)]
    pub additional: Map<String, Value>,
}

impl AsapClaims {
    /// The subject, falling back to the issuer when absent.
    #[must_use]
    pub fn subject(&self) -> &str {
        self.sub.as_deref().unwrap_or(&self.iss)
    }

    /// Look up a non-registered claim.
    #[must_use]
    pub fn claim(&self, name: &str) -> Option<&Value> {
        self.additional.get(name)
    }
}

impl fmt::Debug for AsapClaims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Additional claims may carry caller data; only their names are shown.
        let additional: Vec<&String> = self.additional.keys().collect();
        f.debug_struct("AsapClaims")
            .field("iss", &self.iss)
            .field("sub", &self.sub)
            .field("aud", &self.aud)
            .field("iat", &self.iat)
            .field("nbf", &self.nbf)
            .field("exp", &self.exp)
            .field("jti", &self.jti)
            .field("additional", &additional)
            .finish()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_deserialize_single_audience_and_extras() {
        let claims: AsapClaims = serde_json::from_value(json!({
            "iss": "svc-a",
            "aud": "svc-b",
            "iat": 1_700_000_000,
            "exp": 1_700_000_060,
            "tenant": "acme"
        }))
        .unwrap();

        assert_eq!(claims.iss, "svc-a");
        assert_eq!(claims.aud, Some(Audience::Single("svc-b".to_string())));
        assert_eq!(claims.nbf, None);
        assert_eq!(claims.claim("tenant"), Some(&json!("acme")));
        assert_eq!(claims.subject(), "svc-a");
    }

    #[test]
    fn test_deserialize_multiple_audiences() {
        let claims: AsapClaims = serde_json::from_value(json!({
            "iss": "svc-a",
            "sub": "user-7",
            "aud": ["svc-b", "svc-c"]
        }))
        .unwrap();

        let aud = claims.aud.as_ref().unwrap();
        assert!(aud.contains("svc-c"));
        assert!(!aud.contains("svc-d"));
        assert_eq!(claims.subject(), "user-7");
    }

    #[test]
    fn test_serialize_omits_absent_claims() {
        let claims = AsapClaims {
            iss: "svc-a".to_string(),
            sub: None,
            aud: Some("svc-b".into()),
            iat: Some(10),
            nbf: None,
            exp: Some(70),
            jti: None,
            additional: Map::new(),
        };

        let value = serde_json::to_value(&claims).unwrap();
        assert_eq!(
            value,
            json!({"iss": "svc-a", "aud": "svc-b", "iat": 10, "exp": 70})
        );
    }

    #[test]
    fn test_debug_hides_additional_claim_values() {
        let mut additional = Map::new();
        additional.insert("session".to_string(), json!("very-secret-value"));
        let claims = AsapClaims {
            iss: "svc-a".to_string(),
            sub: None,
            aud: None,
            iat: None,
            nbf: None,
            exp: None,
            jti: None,
            additional,
        };

        let debug = format!("{claims:?}");
        assert!(debug.contains("session"));
        assert!(!debug.contains("very-secret-value"));
    }
}
