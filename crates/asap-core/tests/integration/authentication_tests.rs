//! End-to-end authentication scenarios against a mock key repository
//!
//! Tokens are minted by `TestTokenBuilder` and public keys are served by
//! `TestKeyRepository`, so every check in the verification pipeline runs
//! against real HTTP key resolution.

use asap_core::config::AuthenticatorConfig;
use asap_core::error::{AsapError, ASAP_ERROR_STATUS};
use asap_core::keys::KeySource;
use asap_core::{Audience, Authenticator};
use asap_test_utils::{TestKeyRepository, TestTokenBuilder, EC_P256, RSA_OTHER, RSA_PRIMARY};
use chrono::Utc;
use std::time::Duration;

// ============================================================================
// Helper Functions
// ============================================================================

const ISSUER: &str = "my-issuer";
const AUDIENCE: &str = "my-service";

/// Start a repository serving the primary RSA and EC keys for `my-issuer`.
async fn repository() -> TestKeyRepository {
    let repo = TestKeyRepository::start().await;
    repo.serve_key(&RSA_PRIMARY.key_id(ISSUER), RSA_PRIMARY.public_pem)
        .await;
    repo.serve_key(&EC_P256.key_id(ISSUER), EC_P256.public_pem)
        .await;
    repo
}

fn authenticator(repo: &TestKeyRepository) -> Authenticator {
    let config = AuthenticatorConfig::new(
        AUDIENCE,
        KeySource::RepositoryUrls(vec![repo.base_url()]),
    );
    Authenticator::new(config).expect("authenticator config should be valid")
}

async fn rejection_message(auth: &Authenticator, header: &str) -> String {
    let err = auth
        .authenticate(Some(header))
        .await
        .expect_err("token should be rejected");
    assert!(
        matches!(err, AsapError::InvalidToken { .. }),
        "unexpected error kind: {err:?}"
    );
    assert_eq!(err.status_code(), ASAP_ERROR_STATUS);
    err.message().to_string()
}

// ============================================================================
// Scenarios
// ============================================================================

/// Absent header yields no claims and no error.
#[tokio::test]
async fn test_absent_header_yields_no_claims() -> Result<(), anyhow::Error> {
    let repo = repository().await;
    let auth = authenticator(&repo);

    assert!(auth.authenticate(None).await?.is_none());
    assert_eq!(repo.request_count().await, 0, "no key lookup expected");

    Ok(())
}

/// A valid token for another audience is rejected with 401.
#[tokio::test]
async fn test_audience_mismatch_is_rejected() {
    let repo = repository().await;
    let auth = authenticator(&repo);
    let header = TestTokenBuilder::new(ISSUER, "someone-else").bearer();

    assert_eq!(
        rejection_message(&auth, &header).await,
        "jwt audience invalid"
    );
}

/// A two hour token exceeds the default one hour lifetime policy.
#[tokio::test]
async fn test_lifetime_over_policy_is_rejected() {
    let repo = repository().await;
    let auth = authenticator(&repo);
    let header = TestTokenBuilder::new(ISSUER, AUDIENCE)
        .expires_in(7200)
        .bearer();

    assert_eq!(
        rejection_message(&auth, &header).await,
        "jwt has lifetime greater than 3600 seconds"
    );
}

/// A key id outside the issuer's namespace fails before any key lookup.
#[tokio::test]
async fn test_key_id_outside_issuer_namespace_is_rejected() {
    let repo = repository().await;
    let auth = authenticator(&repo);
    let header = TestTokenBuilder::new(ISSUER, AUDIENCE)
        .key_id("other-issuer/key1")
        .bearer();

    assert_eq!(
        rejection_message(&auth, &header).await,
        "jwt has keyId which is invalid for issuer"
    );
    assert_eq!(repo.request_count().await, 0, "no key lookup expected");
}

// ============================================================================
// Successful verification
// ============================================================================

#[tokio::test]
async fn test_valid_rs256_token_yields_claims() -> Result<(), anyhow::Error> {
    let repo = repository().await;
    let auth = authenticator(&repo);
    let header = TestTokenBuilder::new(ISSUER, AUDIENCE)
        .subject("user-42")
        .claim("tenant", "acme")
        .bearer();

    let claims = auth
        .authenticate(Some(&header))
        .await?
        .expect("claims should be present");

    assert_eq!(claims.iss, ISSUER);
    assert_eq!(claims.subject(), "user-42");
    assert!(claims.aud.as_ref().is_some_and(|aud| aud.contains(AUDIENCE)));
    assert_eq!(
        claims.claim("tenant").and_then(|v| v.as_str()),
        Some("acme")
    );

    Ok(())
}

#[tokio::test]
async fn test_valid_es256_token_yields_claims() -> Result<(), anyhow::Error> {
    let repo = repository().await;
    let auth = authenticator(&repo);
    let header = TestTokenBuilder::new(ISSUER, AUDIENCE)
        .signed_with(&EC_P256)
        .bearer();

    let claims = auth.authenticate(Some(&header)).await?;
    assert!(claims.is_some());

    Ok(())
}

#[tokio::test]
async fn test_audience_list_containing_service_is_accepted() -> Result<(), anyhow::Error> {
    let repo = repository().await;
    let auth = authenticator(&repo);
    let header = TestTokenBuilder::new(ISSUER, AUDIENCE)
        .audiences(&["other-service", AUDIENCE])
        .bearer();

    let claims = auth
        .authenticate(Some(&header))
        .await?
        .expect("claims should be present");
    assert!(matches!(claims.aud, Some(Audience::Multiple(ref list)) if list.len() == 2));

    Ok(())
}

/// Subject defaults to the issuer when the token has no `sub`.
#[tokio::test]
async fn test_subject_defaults_to_issuer() -> Result<(), anyhow::Error> {
    let repo = repository().await;
    let auth = authenticator(&repo);
    let header = TestTokenBuilder::new(ISSUER, AUDIENCE).bearer();

    let claims = auth
        .authenticate(Some(&header))
        .await?
        .expect("claims should be present");
    assert_eq!(claims.subject(), ISSUER);

    Ok(())
}

// ============================================================================
// Rejections
// ============================================================================

/// Signed by a key other than the one the repository serves for the kid.
#[tokio::test]
async fn test_signature_from_wrong_key_is_rejected() {
    let repo = repository().await;
    let auth = authenticator(&repo);
    let header = TestTokenBuilder::new(ISSUER, AUDIENCE)
        .signed_with(&RSA_OTHER)
        .key_id(&RSA_PRIMARY.key_id(ISSUER))
        .bearer();

    assert_eq!(rejection_message(&auth, &header).await, "invalid signature");
}

#[tokio::test]
async fn test_unknown_key_id_fails_key_fetch() {
    let repo = repository().await;
    let auth = authenticator(&repo);
    let header = TestTokenBuilder::new(ISSUER, AUDIENCE)
        .signed_with(&RSA_OTHER)
        .bearer();

    assert_eq!(
        rejection_message(&auth, &header).await,
        "failed to fetch public key"
    );
}

#[tokio::test]
async fn test_expired_token_is_rejected() {
    let repo = repository().await;
    let auth = authenticator(&repo);
    let now = Utc::now().timestamp();
    let header = TestTokenBuilder::new(ISSUER, AUDIENCE)
        .issued_at(now - 600)
        .expires_at(now - 300)
        .bearer();

    assert_eq!(rejection_message(&auth, &header).await, "jwt expired");
}

/// Expiry inside the clock tolerance is still accepted.
#[tokio::test]
async fn test_recent_expiry_within_tolerance_is_accepted() -> Result<(), anyhow::Error> {
    let repo = repository().await;
    let auth = authenticator(&repo);
    let now = Utc::now().timestamp();
    let header = TestTokenBuilder::new(ISSUER, AUDIENCE)
        .issued_at(now - 60)
        .expires_at(now - 5)
        .bearer();

    assert!(auth.authenticate(Some(&header)).await?.is_some());

    Ok(())
}

#[tokio::test]
async fn test_not_yet_valid_token_is_rejected() {
    let repo = repository().await;
    let auth = authenticator(&repo);
    let now = Utc::now().timestamp();
    let header = TestTokenBuilder::new(ISSUER, AUDIENCE)
        .not_before(now + 300)
        .expires_at(now + 600)
        .bearer();

    assert_eq!(rejection_message(&auth, &header).await, "jwt not active");
}

#[tokio::test]
async fn test_missing_expiry_is_rejected() {
    let repo = repository().await;
    let auth = authenticator(&repo);
    let header = TestTokenBuilder::new(ISSUER, AUDIENCE)
        .without_expiry()
        .bearer();

    assert_eq!(rejection_message(&auth, &header).await, "jwt missing required claim");
}

#[tokio::test]
async fn test_token_from_before_1970_is_rejected() {
    let repo = repository().await;
    let auth = authenticator(&repo);
    let header = TestTokenBuilder::new(ISSUER, AUDIENCE)
        .issued_at(-100)
        .not_before(-100)
        .expires_at(-50)
        .bearer();

    assert!(auth.authenticate(Some(&header)).await.is_err());
}

#[tokio::test]
async fn test_unsigned_token_is_rejected() {
    let repo = repository().await;
    let auth = authenticator(&repo);
    let header = format!(
        "Bearer {}",
        TestTokenBuilder::new(ISSUER, AUDIENCE).build_unsigned()
    );

    assert!(auth.authenticate(Some(&header)).await.is_err());
}

#[tokio::test]
async fn test_token_without_key_id_yields_no_claims() -> Result<(), anyhow::Error> {
    let repo = repository().await;
    let auth = authenticator(&repo);
    let header = TestTokenBuilder::new(ISSUER, AUDIENCE)
        .without_key_id()
        .bearer();

    assert!(auth.authenticate(Some(&header)).await?.is_none());

    Ok(())
}

/// A shorter lifetime policy applies to otherwise valid tokens.
#[tokio::test]
async fn test_custom_max_lifetime_is_enforced() {
    let repo = repository().await;
    let config = AuthenticatorConfig::new(
        AUDIENCE,
        KeySource::RepositoryUrls(vec![repo.base_url()]),
    )
    .with_max_lifetime(Duration::from_secs(30));
    let auth = Authenticator::new(config).expect("config should be valid");

    let header = TestTokenBuilder::new(ISSUER, AUDIENCE).bearer();
    assert_eq!(
        rejection_message(&auth, &header).await,
        "jwt has lifetime greater than 30 seconds"
    );
}
