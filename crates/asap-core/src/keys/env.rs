//! Environment variable public key source.

use super::PublicKeyLoader;
use crate::error::KeyFetchError;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine};

/// Default variable name prefix.
pub const DEFAULT_ENV_PREFIX: &str = "PRIVATE_";

/// Variable name for a key id: every `/` becomes `_`, upper-cased, prefixed.
///
/// `svc-a/key1` with prefix `PRIVATE_` becomes `PRIVATE_SVC-A_KEY1`.
#[must_use]
pub fn env_key_name(prefix: &str, key_id: &str) -> String {
    format!("{prefix}{}", key_id.replace('/', "_").to_uppercase())
}

/// Reads public keys from environment variables, optionally base64-encoded.
#[derive(Debug, Clone)]
pub struct EnvKeyLoader {
    prefix: String,
    base64: bool,
}

impl EnvKeyLoader {
    /// Loader with an explicit prefix and encoding.
    pub fn new(prefix: impl Into<String>, base64: bool) -> Self {
        Self {
            prefix: prefix.into(),
            base64,
        }
    }

    fn read(&self, key_id: &str, value: Option<String>) -> Result<String, KeyFetchError> {
        let name = env_key_name(&self.prefix, key_id);
        let value = value.filter(|v| !v.is_empty()).ok_or_else(|| {
            tracing::debug!(target: "asap.keys.env", variable = %name, "Public key variable not set");
            KeyFetchError::NotFound {
                key_id: key_id.to_string(),
                location: format!("environment variable {name}"),
            }
        })?;

        if !self.base64 {
            return Ok(value);
        }

        let bytes = STANDARD
            .decode(value.trim())
            .map_err(|e| KeyFetchError::Decode {
                key_id: key_id.to_string(),
                reason: e.to_string(),
            })?;
        String::from_utf8(bytes).map_err(|e| KeyFetchError::Decode {
            key_id: key_id.to_string(),
            reason: e.to_string(),
        })
    }
}

impl Default for EnvKeyLoader {
    fn default() -> Self {
        Self::new(DEFAULT_ENV_PREFIX, false)
    }
}

#[async_trait]
impl PublicKeyLoader for EnvKeyLoader {
    async fn load(&self, key_id: &str) -> Result<String, KeyFetchError> {
        let value = std::env::var(env_key_name(&self.prefix, key_id)).ok();
        self.read(key_id, value)
    }
}
