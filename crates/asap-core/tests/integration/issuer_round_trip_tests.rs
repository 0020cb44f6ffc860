//! Issuer to authenticator round trips
//!
//! Tokens minted by `Issuer` and `AsapClient` must verify against an
//! `Authenticator` configured for the same audience and key.

use asap_core::config::{AuthenticatorConfig, IssuerConfig};
use asap_core::keys::KeySource;
use asap_core::secret::ExposeSecret;
use asap_core::{AsapClient, Authenticator, Issuer};
use asap_test_utils::{TestKeyRepository, TokenAssertions, RSA_PRIMARY};
use serde_json::{json, Map};
use std::time::Duration;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

const ISSUER: &str = "svc-a";
const AUDIENCE: &str = "svc-b";

async fn repository_with_primary_key() -> TestKeyRepository {
    let repo = TestKeyRepository::start().await;
    repo.serve_key(&RSA_PRIMARY.key_id(ISSUER), RSA_PRIMARY.public_pem)
        .await;
    repo
}

fn issuer_config() -> IssuerConfig {
    IssuerConfig::new(
        RSA_PRIMARY.private_pem,
        RSA_PRIMARY.key_id(ISSUER),
        ISSUER,
        AUDIENCE,
    )
}

fn authenticator(repo: &TestKeyRepository) -> Authenticator {
    Authenticator::new(AuthenticatorConfig::new(
        AUDIENCE,
        KeySource::RepositoryUrls(vec![repo.base_url()]),
    ))
    .expect("authenticator config should be valid")
}

#[tokio::test]
async fn test_minted_token_verifies() -> Result<(), anyhow::Error> {
    let repo = repository_with_primary_key().await;
    let issuer = Issuer::new(issuer_config())?;
    let header = issuer.auth_header()?;

    let claims = authenticator(&repo)
        .authenticate(Some(header.expose_secret()))
        .await?
        .expect("claims should be present");

    assert_eq!(claims.iss, ISSUER);
    assert_eq!(claims.subject(), ISSUER);
    assert!(claims.aud.as_ref().is_some_and(|aud| aud.contains(AUDIENCE)));
    assert!(claims.jti.as_ref().is_some_and(|jti| jti.len() == 40));

    Ok(())
}

#[tokio::test]
async fn test_minted_token_shape() -> Result<(), anyhow::Error> {
    let issuer = Issuer::new(
        issuer_config()
            .with_subject("batch-job")
            .with_expiry(Duration::from_secs(120)),
    )?;
    let header = issuer.auth_header()?;

    header
        .expose_secret()
        .assert_algorithm("RS256")
        .assert_key_id("svc-a/rsa-primary")
        .assert_issuer(ISSUER)
        .assert_audience(AUDIENCE)
        .assert_subject("batch-job")
        .assert_lifetime(120);

    Ok(())
}

#[tokio::test]
async fn test_configured_and_per_call_claims_verify() -> Result<(), anyhow::Error> {
    let repo = repository_with_primary_key().await;
    let mut global = Map::new();
    global.insert("region".to_string(), json!("eu-west-1"));
    let issuer = Issuer::new(
        issuer_config()
            .with_additional_claims(global)
            .with_max_age(Duration::ZERO),
    )?;

    let mut per_call = Map::new();
    per_call.insert("request_id".to_string(), json!("req-1"));
    // A zero max age mints a fresh token so per-call claims are applied.
    tokio::time::sleep(Duration::from_millis(5)).await;
    let header = issuer.auth_header_with(&per_call)?;

    let claims = authenticator(&repo)
        .authenticate(Some(header.expose_secret()))
        .await?
        .expect("claims should be present");

    assert_eq!(claims.claim("region"), Some(&json!("eu-west-1")));
    assert_eq!(claims.claim("request_id"), Some(&json!("req-1")));

    Ok(())
}

#[tokio::test]
async fn test_token_for_other_audience_is_rejected() -> Result<(), anyhow::Error> {
    let repo = repository_with_primary_key().await;
    let issuer = Issuer::new(IssuerConfig::new(
        RSA_PRIMARY.private_pem,
        RSA_PRIMARY.key_id(ISSUER),
        ISSUER,
        "svc-c",
    ))?;
    let header = issuer.auth_header()?;

    let err = authenticator(&repo)
        .authenticate(Some(header.expose_secret()))
        .await
        .expect_err("token should be rejected");
    assert_eq!(err.message(), "jwt audience invalid");

    Ok(())
}

/// The insecure client and an insecure-mode authenticator agree on the test
/// key without any key repository.
#[tokio::test]
async fn test_insecure_client_round_trip() -> Result<(), anyhow::Error> {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&server)
        .await;

    let client = AsapClient::insecure(ISSUER, AUDIENCE)?;
    client.get(&format!("{}/v1/ping", server.uri()))?.send().await?;

    let requests = server
        .received_requests()
        .await
        .expect("request recording is enabled by default");
    let header = requests
        .first()
        .and_then(|request| request.headers.get("authorization"))
        .and_then(|value| value.to_str().ok())
        .expect("request should carry an Authorization header")
        .to_string();

    let auth = Authenticator::new(AuthenticatorConfig::insecure(AUDIENCE))?;
    let claims = auth
        .authenticate(Some(&header))
        .await?
        .expect("claims should be present");
    assert_eq!(claims.iss, ISSUER);

    Ok(())
}

/// A secure authenticator never trusts the insecure test key.
#[tokio::test]
async fn test_insecure_token_rejected_by_secure_authenticator() -> Result<(), anyhow::Error> {
    let repo = repository_with_primary_key().await;
    let issuer = Issuer::new(IssuerConfig::insecure(ISSUER, AUDIENCE))?;
    let header = issuer.auth_header()?;

    let result = authenticator(&repo)
        .authenticate(Some(header.expose_secret()))
        .await;
    assert!(result.is_err());

    Ok(())
}
