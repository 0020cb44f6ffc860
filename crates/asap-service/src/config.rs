//! ASAP Service configuration.
//!
//! Configuration is loaded from environment variables. Authenticator settings
//! are read by [`AuthenticatorConfig::from_vars`]; this module adds the
//! service-level knobs on top.

use asap_core::config::{parse_flag, parse_list};
use asap_core::AuthenticatorConfig;
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Default HTTP bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// What to do with a request whose ASAP token fails verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AuthMode {
    /// Respond 401.
    #[default]
    Reject,

    /// Log the failure and continue without claims.
    Anonymous,
}

impl FromStr for AuthMode {
    type Err = ConfigError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "reject" => Ok(Self::Reject),
            "anonymous" => Ok(Self::Anonymous),
            other => Err(ConfigError::InvalidAuthMode(other.to_string())),
        }
    }
}

impl fmt::Display for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Reject => f.write_str("reject"),
            Self::Anonymous => f.write_str("anonymous"),
        }
    }
}

/// ASAP Service configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Server bind address (default: "0.0.0.0:8080").
    pub bind_address: String,

    /// Policy for invalid tokens (default: reject).
    pub auth_mode: AuthMode,

    /// Issuers allowed to call protected routes. Empty disables the
    /// allow-list.
    pub authorized_issuers: Vec<String>,

    /// Emit logs as JSON.
    pub log_json: bool,

    /// Token verification settings.
    pub authenticator: AuthenticatorConfig,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid ASAP_AUTH_MODE '{0}': expected 'reject' or 'anonymous'")]
    InvalidAuthMode(String),

    #[error(transparent)]
    Asap(#[from] asap_core::ConfigError),
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// See [`Config::from_vars`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a `HashMap` (for testing).
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the auth mode is unknown or the
    /// authenticator settings are invalid.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let auth_mode = match vars.get("ASAP_AUTH_MODE") {
            Some(value) => value.parse()?,
            None => AuthMode::default(),
        };

        let authorized_issuers = parse_list(vars.get("ASAP_AUTHORIZED_ISSUERS").map(String::as_str));
        let log_json = parse_flag(vars.get("ASAP_LOG_JSON").map(String::as_str));
        let authenticator = AuthenticatorConfig::from_vars(vars)?;

        Ok(Self {
            bind_address,
            auth_mode,
            authorized_issuers,
            log_json,
            authenticator,
        })
    }
}
