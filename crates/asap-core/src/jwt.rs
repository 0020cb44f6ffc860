//! Low-level JWT helpers for ASAP tokens.
//!
//! This module provides:
//! - Size limits for DoS prevention
//! - Unverified decoding of header and payload (for issuer / `kid` lookup)
//! - The fixed signature algorithm allow-list
//! - Construction of verification keys from PEM text per algorithm family
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing
//! - Unverified contents are only used to locate the verification key; every
//!   claim returned to callers comes from a signature-verified decode
//! - HMAC and `none` algorithms are never accepted

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey};
use serde_json::{Map, Value};
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Maximum allowed JWT size in bytes (8KB).
///
/// ASAP tokens carry a handful of short claims and are typically well under
/// 1KB. Anything above this limit is rejected before base64 or JSON decoding.
pub const MAX_JWT_SIZE_BYTES: usize = 8192;

/// Signature algorithms accepted for ASAP tokens.
///
/// This list is fixed and never derived from the token. `ES512` is part of
/// the ASAP profile but is not supported by the verification primitive, so
/// such tokens fail header decoding.
pub const ALLOWED_ALGORITHMS: [Algorithm; 8] = [
    Algorithm::RS256,
    Algorithm::RS384,
    Algorithm::RS512,
    Algorithm::ES256,
    Algorithm::ES384,
    Algorithm::PS256,
    Algorithm::PS384,
    Algorithm::PS512,
];

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur while decoding a token without verification.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JwtValidationError {
    /// Token size exceeds maximum allowed.
    #[error("jwt exceeds maximum size")]
    TokenTooLarge,

    /// Token is not a `header.payload.signature` structure of JSON objects.
    #[error("jwt could not be decoded")]
    MalformedToken,
}

// =============================================================================
// Unverified Token
// =============================================================================

/// Header and payload of a token whose signature has NOT been checked.
#[derive(Debug, Clone, PartialEq)]
pub struct UnverifiedToken {
    /// JOSE header as a JSON object.
    pub header: Map<String, Value>,

    /// Claims as a JSON object.
    pub payload: Map<String, Value>,
}

impl UnverifiedToken {
    /// The `kid` header as a non-empty string.
    #[must_use]
    pub fn key_id(&self) -> Option<&str> {
        non_empty_str(self.header.get("kid"))
    }

    /// The `iss` claim as a non-empty string.
    #[must_use]
    pub fn issuer(&self) -> Option<&str> {
        non_empty_str(self.payload.get("iss"))
    }
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|s| !s.is_empty())
}

// =============================================================================
// Functions
// =============================================================================

/// Decode a JWT's header and payload without verifying the signature.
///
/// # Errors
///
/// - `TokenTooLarge` - Token exceeds [`MAX_JWT_SIZE_BYTES`]
/// - `MalformedToken` - Wrong number of segments, bad base64url, or a
///   header/payload that is not a JSON object
pub fn decode_unverified(token: &str) -> Result<UnverifiedToken, JwtValidationError> {
    if token.len() > MAX_JWT_SIZE_BYTES {
        tracing::debug!(
            target: "asap.jwt",
            token_size = token.len(),
            max_size = MAX_JWT_SIZE_BYTES,
            "Token rejected: size exceeds maximum allowed"
        );
        return Err(JwtValidationError::TokenTooLarge);
    }

    let mut parts = token.split('.');
    let (Some(header_part), Some(payload_part), Some(_signature), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        tracing::debug!(target: "asap.jwt", "Token rejected: invalid JWT format");
        return Err(JwtValidationError::MalformedToken);
    };

    Ok(UnverifiedToken {
        header: decode_segment(header_part, "header")?,
        payload: decode_segment(payload_part, "payload")?,
    })
}

fn decode_segment(segment: &str, name: &'static str) -> Result<Map<String, Value>, JwtValidationError> {
    let bytes = URL_SAFE_NO_PAD.decode(segment).map_err(|e| {
        tracing::debug!(target: "asap.jwt", segment = name, error = %e, "Failed to decode JWT segment base64");
        JwtValidationError::MalformedToken
    })?;

    match serde_json::from_slice::<Value>(&bytes) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => {
            tracing::debug!(target: "asap.jwt", segment = name, "JWT segment is not a JSON object");
            Err(JwtValidationError::MalformedToken)
        }
        Err(e) => {
            tracing::debug!(target: "asap.jwt", segment = name, error = %e, "Failed to parse JWT segment JSON");
            Err(JwtValidationError::MalformedToken)
        }
    }
}

/// Whether `alg` is on the ASAP allow-list.
#[must_use]
pub fn is_allowed_algorithm(alg: Algorithm) -> bool {
    ALLOWED_ALGORITHMS.contains(&alg)
}

/// Build a verification key from PEM text for the given algorithm.
///
/// RSA (`RS*`, `PS*`) and EC (`ES*`) keys are parsed from their PEM encodings.
///
/// # Errors
///
/// Returns `InvalidAlgorithm` for algorithms outside the allow-list, or the
/// PEM parse error if the key does not match the algorithm family.
pub fn decoding_key_for(alg: Algorithm, pem: &str) -> Result<DecodingKey, jsonwebtoken::errors::Error> {
    match alg {
        Algorithm::RS256
        | Algorithm::RS384
        | Algorithm::RS512
        | Algorithm::PS256
        | Algorithm::PS384
        | Algorithm::PS512 => DecodingKey::from_rsa_pem(pem.as_bytes()),
        Algorithm::ES256 | Algorithm::ES384 => DecodingKey::from_ec_pem(pem.as_bytes()),
        Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 | Algorithm::EdDSA => {
            Err(ErrorKind::InvalidAlgorithm.into())
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
