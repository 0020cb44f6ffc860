//! Metrics recorded by ASAP authentication and issuance.
//!
//! All metrics follow Prometheus naming conventions:
//! - `asap_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded:
//! - `outcome`: `verified`, `no_claims`, `rejected`
//! - `result`: `hit`, `miss`
//! - `status`: `success`, `error`
//!
//! Key ids and issuers are never used as labels. Installing an exporter is
//! left to the binary; without one these calls are no-ops.

use metrics::{counter, histogram};
use std::time::Duration;

/// Outcome of a single `authenticate` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthOutcome {
    /// A verified claim set was returned.
    Verified,
    /// No ASAP token was present.
    NoClaims,
    /// The token was rejected.
    Rejected,
}

impl AuthOutcome {
    fn as_str(self) -> &'static str {
        match self {
            Self::Verified => "verified",
            Self::NoClaims => "no_claims",
            Self::Rejected => "rejected",
        }
    }
}

/// Record an authentication outcome.
///
/// Metric: `asap_authentications_total`
/// Labels: `outcome`
pub fn record_authentication(outcome: AuthOutcome) {
    counter!("asap_authentications_total", "outcome" => outcome.as_str()).increment(1);
}

/// Record a key cache lookup.
///
/// Metric: `asap_key_cache_lookups_total`
/// Labels: `result`
pub fn record_key_cache_lookup(hit: bool) {
    let result = if hit { "hit" } else { "miss" };
    counter!("asap_key_cache_lookups_total", "result" => result).increment(1);
}

/// Record a public key fetch across all repositories.
///
/// Metric: `asap_key_fetch_total`, `asap_key_fetch_duration_seconds`
/// Labels: `status`
pub fn record_key_fetch(success: bool, duration: Duration) {
    let status = if success { "success" } else { "error" };
    histogram!("asap_key_fetch_duration_seconds", "status" => status)
        .record(duration.as_secs_f64());
    counter!("asap_key_fetch_total", "status" => status).increment(1);
}

/// Record a newly signed outbound token.
///
/// Metric: `asap_tokens_minted_total`
pub fn record_token_minted() {
    counter!("asap_tokens_minted_total").increment(1);
}
