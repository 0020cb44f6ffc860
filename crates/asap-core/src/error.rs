//! Error types for ASAP authentication.
//!
//! Two families of errors exist:
//!
//! - [`AsapError`] is the only error surface of the authentication boundary.
//!   Every failure of a presented token (bad structure, bad signature,
//!   unreachable key repository, disallowed issuer) ends up here, always
//!   mapping to HTTP 401 and logged at `warn`.
//! - Collaborator errors ([`KeyFetchError`], [`ConfigError`], [`IssuerError`])
//!   describe what went wrong inside key sources, configuration and token
//!   minting. Key source errors never escape the [`Authenticator`]; they are
//!   re-wrapped as [`AsapError::InvalidToken`].
//!
//! [`Authenticator`]: crate::authenticator::Authenticator

use std::error::Error as StdError;
use thiserror::Error;
use tracing::Level;

/// Boxed underlying cause attached to an [`AsapError`].
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Error key for tokens that failed authentication.
pub const INVALID_TOKEN_KEY: &str = "asap-invalid-token";

/// Error key for verified tokens whose issuer is not allowed.
pub const UNAUTHORIZED_ISSUER_KEY: &str = "asap-unauthorized-issuer";

/// HTTP status used for every ASAP failure.
pub const ASAP_ERROR_STATUS: u16 = 401;

// =============================================================================
// AsapError
// =============================================================================

/// Authentication or authorization failure for a presented ASAP token.
#[derive(Error, Debug)]
pub enum AsapError {
    /// The token is structurally or semantically invalid, failed
    /// cryptographic verification, or its public key could not be fetched.
    #[error("{message}")]
    InvalidToken {
        message: String,
        #[source]
        cause: Option<BoxError>,
    },

    /// The token is valid but its issuer is not on the allow-list.
    #[error("{message}")]
    AuthorizationDenied {
        message: String,
        #[source]
        cause: Option<BoxError>,
    },
}

impl AsapError {
    /// Create an `InvalidToken` error without a cause.
    pub fn invalid_token(message: impl Into<String>) -> Self {
        Self::InvalidToken {
            message: message.into(),
            cause: None,
        }
    }

    /// Create an `AuthorizationDenied` error without a cause.
    pub fn authorization_denied(message: impl Into<String>) -> Self {
        Self::AuthorizationDenied {
            message: message.into(),
            cause: None,
        }
    }

    /// Attach an underlying cause, replacing any existing one.
    #[must_use]
    pub fn with_cause(self, cause: impl Into<BoxError>) -> Self {
        match self {
            Self::InvalidToken { message, .. } => Self::InvalidToken {
                message,
                cause: Some(cause.into()),
            },
            Self::AuthorizationDenied { message, .. } => Self::AuthorizationDenied {
                message,
                cause: Some(cause.into()),
            },
        }
    }

    /// The human-readable message, without the cause.
    #[must_use]
    pub fn message(&self) -> &str {
        match self {
            Self::InvalidToken { message, .. } | Self::AuthorizationDenied { message, .. } => {
                message
            }
        }
    }

    /// The underlying cause, if one was attached.
    #[must_use]
    pub fn cause(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        match self {
            Self::InvalidToken { cause, .. } | Self::AuthorizationDenied { cause, .. } => {
                cause.as_deref()
            }
        }
    }

    /// Stable machine-readable key for this error kind.
    #[must_use]
    pub fn error_key(&self) -> &'static str {
        match self {
            Self::InvalidToken { .. } => INVALID_TOKEN_KEY,
            Self::AuthorizationDenied { .. } => UNAUTHORIZED_ISSUER_KEY,
        }
    }

    /// HTTP status code. Always 401 for ASAP failures.
    #[must_use]
    pub fn status_code(&self) -> u16 {
        ASAP_ERROR_STATUS
    }

    /// Level at which callers should log this error.
    #[must_use]
    pub fn log_level(&self) -> Level {
        Level::WARN
    }

    /// Canonical one-line rendering: `[key](status)message: (cause)`.
    #[must_use]
    pub fn describe(&self) -> String {
        let mut out = format!(
            "[{}]({}){}",
            self.error_key(),
            self.status_code(),
            self.message()
        );
        if let Some(cause) = self.cause() {
            out.push_str(&format!(": ({cause})"));
        }
        out
    }
}

// =============================================================================
// KeyFetchError
// =============================================================================

/// Errors raised by public key sources.
#[derive(Error, Debug)]
pub enum KeyFetchError {
    /// The HTTP request could not be completed (connect, timeout, body read).
    #[error("Request to public key repository {url} failed: {source}")]
    Http {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The repository answered with a status other than 200.
    #[error("Public key repository {url} returned status {status}")]
    Status { url: String, status: u16 },

    /// The key does not exist in the source.
    #[error("Public key {key_id} not found in {location}")]
    NotFound { key_id: String, location: String },

    /// Reading the key from disk failed.
    #[error("Failed to read public key from {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// The stored key could not be decoded into PEM text.
    #[error("Failed to decode public key {key_id}: {reason}")]
    Decode { key_id: String, reason: String },

    /// The key id could not be turned into a repository URL.
    #[error("Cannot build repository URL for key {key_id}: {reason}")]
    InvalidKeyUrl { key_id: String, reason: String },

    /// Every configured source failed; carries the last failure observed.
    #[error("All public key sources failed, last error: {0}")]
    AllSourcesFailed(#[source] Box<KeyFetchError>),
}

// =============================================================================
// ConfigError
// =============================================================================

/// Errors raised while constructing an authenticator, issuer or key source.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// A required value is absent or empty.
    #[error("Missing required configuration value: {0}")]
    MissingValue(String),

    /// A value is present but unusable.
    #[error("Invalid value for {name}: {reason}")]
    InvalidValue { name: String, reason: String },

    /// A public key repository URL is malformed or unsupported.
    #[error("Invalid public key repository URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    /// No public key repository URL was given.
    #[error("At least one public key repository URL is required")]
    NoBaseUrls,

    /// The private key could not be parsed or used for signing.
    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(String),

    /// The token max age would let a token be reused up to its expiry.
    #[error("Token max age ({max_age_secs}s) must be less than token expiry ({expiry_secs}s)")]
    MaxAgeNotBelowExpiry { max_age_secs: u64, expiry_secs: u64 },
}

// =============================================================================
// IssuerError
// =============================================================================

/// Errors raised while minting an outbound token.
#[derive(Error, Debug)]
pub enum IssuerError {
    /// Signing the token failed.
    #[error("Failed to sign token: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),

    /// The system random generator failed while creating a `jti`.
    #[error("Failed to generate token id")]
    Randomness,

    /// The minted header could not be used as an HTTP header value.
    #[error("Generated authorization header is not a valid header value")]
    InvalidHeaderValue,
}
