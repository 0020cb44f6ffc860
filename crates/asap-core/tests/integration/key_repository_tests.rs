//! Public key resolution across repositories
//!
//! Exercises the HTTP key source through the authenticator: racing multiple
//! origins, caching fetched keys, and sharing a cache between instances.

use asap_core::config::AuthenticatorConfig;
use asap_core::keys::{KeyCache, KeySource};
use asap_core::Authenticator;
use asap_test_utils::{TestKeyRepository, TestTokenBuilder, RSA_PRIMARY};
use std::sync::Arc;
use std::time::{Duration, Instant};

const ISSUER: &str = "svc-a";
const AUDIENCE: &str = "svc-b";

fn authenticator_for(urls: Vec<String>) -> Authenticator {
    Authenticator::new(AuthenticatorConfig::new(
        AUDIENCE,
        KeySource::RepositoryUrls(urls),
    ))
    .expect("authenticator config should be valid")
}

// ============================================================================
// Origin racing
// ============================================================================

/// First origin errors, second hangs, third answers: the third wins without
/// waiting on the second.
#[tokio::test]
async fn test_fastest_successful_origin_wins() -> Result<(), anyhow::Error> {
    let key_id = RSA_PRIMARY.key_id(ISSUER);

    let failing = TestKeyRepository::start().await;
    failing.fail_key(&key_id, 500).await;
    let hanging = TestKeyRepository::start().await;
    hanging
        .serve_key_delayed(&key_id, RSA_PRIMARY.public_pem, Duration::from_secs(30))
        .await;
    let healthy = TestKeyRepository::start().await;
    healthy.serve_key(&key_id, RSA_PRIMARY.public_pem).await;

    let auth = authenticator_for(vec![
        failing.base_url(),
        hanging.base_url(),
        healthy.base_url(),
    ]);
    let header = TestTokenBuilder::new(ISSUER, AUDIENCE).bearer();

    let started = Instant::now();
    let claims = auth.authenticate(Some(&header)).await?;

    assert!(claims.is_some());
    assert!(
        started.elapsed() < Duration::from_secs(10),
        "should not wait for the slow origin"
    );

    Ok(())
}

#[tokio::test]
async fn test_all_origins_failing_rejects_token() {
    let key_id = RSA_PRIMARY.key_id(ISSUER);
    let first = TestKeyRepository::start().await;
    first.fail_key(&key_id, 404).await;
    let second = TestKeyRepository::start().await;
    second.fail_key(&key_id, 503).await;

    let auth = authenticator_for(vec![first.base_url(), second.base_url()]);
    let header = TestTokenBuilder::new(ISSUER, AUDIENCE).bearer();

    let err = auth
        .authenticate(Some(&header))
        .await
        .expect_err("token should be rejected");
    assert_eq!(err.message(), "failed to fetch public key");
    assert!(err.cause().is_some(), "fetch failure should be attached");
}

/// A redirect or other non-200 success status is not a key.
#[tokio::test]
async fn test_non_200_success_status_is_not_a_key() {
    let key_id = RSA_PRIMARY.key_id(ISSUER);
    let repo = TestKeyRepository::start().await;
    repo.fail_key(&key_id, 204).await;

    let auth = authenticator_for(vec![repo.base_url()]);
    let header = TestTokenBuilder::new(ISSUER, AUDIENCE).bearer();

    assert!(auth.authenticate(Some(&header)).await.is_err());
}

// ============================================================================
// Caching
// ============================================================================

/// The repository is asked for a key once; later tokens use the cache.
#[tokio::test]
async fn test_fetched_key_is_cached() -> Result<(), anyhow::Error> {
    let repo = TestKeyRepository::start().await;
    repo.serve_key_expecting(&RSA_PRIMARY.key_id(ISSUER), RSA_PRIMARY.public_pem, 1)
        .await;

    let auth = authenticator_for(vec![repo.base_url()]);
    for _ in 0..3 {
        let header = TestTokenBuilder::new(ISSUER, AUDIENCE).bearer();
        assert!(auth.authenticate(Some(&header)).await?.is_some());
    }

    assert_eq!(repo.request_count().await, 1);

    Ok(())
}

/// Authenticators built with the same cache share fetched keys.
#[tokio::test]
async fn test_shared_cache_across_authenticators() -> Result<(), anyhow::Error> {
    let repo = TestKeyRepository::start().await;
    repo.serve_key_expecting(&RSA_PRIMARY.key_id(ISSUER), RSA_PRIMARY.public_pem, 1)
        .await;

    let cache = Arc::new(KeyCache::default());
    let build = || {
        Authenticator::new(
            AuthenticatorConfig::new(AUDIENCE, KeySource::RepositoryUrls(vec![repo.base_url()]))
                .with_key_cache(Arc::clone(&cache)),
        )
        .expect("authenticator config should be valid")
    };
    let first = build();
    let second = build();

    let header = TestTokenBuilder::new(ISSUER, AUDIENCE).bearer();
    assert!(first.authenticate(Some(&header)).await?.is_some());
    assert!(second.authenticate(Some(&header)).await?.is_some());
    assert_eq!(cache.len(), 1);

    Ok(())
}

/// Failed fetches are not cached; a later success is.
#[tokio::test]
async fn test_failed_fetch_is_not_cached() {
    let repo = TestKeyRepository::start().await;
    repo.fail_key(&RSA_PRIMARY.key_id(ISSUER), 500).await;

    let cache = Arc::new(KeyCache::default());
    let auth = Authenticator::new(
        AuthenticatorConfig::new(AUDIENCE, KeySource::RepositoryUrls(vec![repo.base_url()]))
            .with_key_cache(Arc::clone(&cache)),
    )
    .expect("authenticator config should be valid");

    let header = TestTokenBuilder::new(ISSUER, AUDIENCE).bearer();
    assert!(auth.authenticate(Some(&header)).await.is_err());
    assert!(cache.is_empty());
}
