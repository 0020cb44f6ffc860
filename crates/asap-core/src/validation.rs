//! Claim validation for ASAP tokens.
//!
//! Two pure checks run around signature verification:
//!
//! - [`validate_issuer_and_key_id`] runs on the unverified token, before any
//!   key lookup, so a token can only name keys under its own issuer.
//! - [`validate_time_claims`] runs on the verified claims and enforces the
//!   lifetime policy on top of the library's own `exp`/`nbf` checks.
//!
//! Both fail fast with [`AsapError::InvalidToken`] on the first violated rule.

use crate::claims::AsapClaims;
use crate::error::AsapError;
use std::time::Duration;

/// Default maximum token lifetime (`exp - iat`), one hour.
pub const DEFAULT_MAX_LIFETIME: Duration = Duration::from_secs(3600);

/// Default clock tolerance applied to time claims.
pub const DEFAULT_CLOCK_TOLERANCE: Duration = Duration::from_secs(30);

/// Largest accepted clock tolerance, one day.
pub const MAX_CLOCK_TOLERANCE: Duration = Duration::from_secs(86_400);

// =============================================================================
// Issuer / key id
// =============================================================================

/// Allowed characters for issuers and key ids: ASCII word characters plus
/// `.`, `-`, `+` and `/`.
fn is_valid_identifier(value: &str) -> bool {
    value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-' | '+' | '/'))
}

/// Validate that `key_id` is well-formed and namespaced under `issuer`.
///
/// # Errors
///
/// Returns `AsapError::InvalidToken` if:
/// - `key_id` is empty or contains disallowed characters
/// - `issuer` is empty or contains disallowed characters
/// - any `/`-separated segment of `key_id` is empty, `.` or `..`
/// - `key_id` does not start with `issuer/`
pub fn validate_issuer_and_key_id(issuer: &str, key_id: &str) -> Result<(), AsapError> {
    if key_id.is_empty() || !is_valid_identifier(key_id) {
        tracing::debug!(target: "asap.validation", key_id = %key_id, "Token rejected: invalid key id");
        return Err(AsapError::invalid_token("jwt has invalid keyId"));
    }

    if issuer.is_empty() || !is_valid_identifier(issuer) {
        tracing::debug!(target: "asap.validation", issuer = %issuer, "Token rejected: invalid issuer");
        return Err(AsapError::invalid_token("jwt has invalid issuer"));
    }

    if key_id
        .split('/')
        .any(|segment| matches!(segment, "" | "." | ".."))
    {
        tracing::debug!(target: "asap.validation", key_id = %key_id, "Token rejected: invalid key id path segment");
        return Err(AsapError::invalid_token(
            "jwt has keyId with invalid path component",
        ));
    }

    let namespaced = key_id
        .strip_prefix(issuer)
        .is_some_and(|rest| rest.starts_with('/'));
    if !namespaced {
        tracing::debug!(
            target: "asap.validation",
            key_id = %key_id,
            issuer = %issuer,
            "Token rejected: key id not under issuer"
        );
        return Err(AsapError::invalid_token(
            "jwt has keyId which is invalid for issuer",
        ));
    }

    Ok(())
}

// =============================================================================
// Time claims
// =============================================================================

/// The time-related claims of a token, in Unix seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TimeClaims {
    pub iat: Option<i64>,
    pub nbf: Option<i64>,
    pub exp: Option<i64>,
}

impl From<&AsapClaims> for TimeClaims {
    fn from(claims: &AsapClaims) -> Self {
        Self {
            iat: claims.iat,
            nbf: claims.nbf,
            exp: claims.exp,
        }
    }
}

/// Validate the time claims of a verified token against the current time.
///
/// # Errors
///
/// Returns `AsapError::InvalidToken` if `iat` or `exp` is missing or zero,
/// if `iat >= exp`, if the lifetime exceeds `max_lifetime`, if `exp` has
/// passed by more than `clock_tolerance`, if `iat` is further in the future
/// than `clock_tolerance`, or if `nbf` is present and not in `[iat, exp)`.
pub fn validate_time_claims(
    claims: TimeClaims,
    max_lifetime: Duration,
    clock_tolerance: Duration,
) -> Result<(), AsapError> {
    let now = chrono::Utc::now().timestamp();
    validate_time_claims_at(claims, max_lifetime, clock_tolerance, now)
}

/// Deterministic variant of [`validate_time_claims`] against an explicit `now`.
pub(crate) fn validate_time_claims_at(
    claims: TimeClaims,
    max_lifetime: Duration,
    clock_tolerance: Duration,
    now: i64,
) -> Result<(), AsapError> {
    // Zero counts as missing
    let present = |value: Option<i64>| value.filter(|v| *v != 0);
    let (Some(iat), Some(exp)) = (present(claims.iat), present(claims.exp)) else {
        tracing::debug!(target: "asap.validation", ?claims, "Token rejected: missing iat or exp");
        return Err(AsapError::invalid_token("invalid jwt missing headers"));
    };

    if iat >= exp {
        tracing::debug!(target: "asap.validation", iat, exp, "Token rejected: issued after expiry");
        return Err(AsapError::invalid_token("jwt issued after expiry"));
    }

    let max_lifetime_secs = i64::try_from(max_lifetime.as_secs()).unwrap_or(i64::MAX);
    if exp.saturating_sub(iat) > max_lifetime_secs {
        tracing::debug!(
            target: "asap.validation",
            iat,
            exp,
            max_lifetime_secs,
            "Token rejected: lifetime exceeds maximum"
        );
        return Err(AsapError::invalid_token(format!(
            "jwt has lifetime greater than {max_lifetime_secs} seconds"
        )));
    }

    let tolerance_secs = i64::try_from(clock_tolerance.as_secs()).unwrap_or(i64::MAX);
    if exp < now.saturating_sub(tolerance_secs) {
        tracing::debug!(
            target: "asap.validation",
            exp,
            now,
            tolerance_secs,
            "Token rejected: expired"
        );
        return Err(AsapError::invalid_token("jwt expired"));
    }

    if iat > now.saturating_add(tolerance_secs) {
        tracing::debug!(
            target: "asap.validation",
            iat,
            now,
            tolerance_secs,
            "Token rejected: iat too far in the future"
        );
        return Err(AsapError::invalid_token("jwt not active"));
    }

    if let Some(nbf) = claims.nbf {
        if nbf >= exp {
            tracing::debug!(target: "asap.validation", nbf, exp, "Token rejected: nbf not before exp");
            return Err(AsapError::invalid_token("jwt was never valid"));
        }
        if nbf < iat {
            tracing::debug!(target: "asap.validation", nbf, iat, "Token rejected: nbf before iat");
            return Err(AsapError::invalid_token("jwt valid before issued"));
        }
    }

    Ok(())
}
