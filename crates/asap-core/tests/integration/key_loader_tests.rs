//! Authentication with non-HTTP key sources
//!
//! Covers the file, environment and closure loaders plugged into an
//! authenticator through `KeySource::Loader`.

use asap_core::config::AuthenticatorConfig;
use asap_core::error::KeyFetchError;
use asap_core::keys::{env_key_name, loader_fn, EnvKeyLoader, FileKeyLoader, KeySource};
use asap_core::Authenticator;
use asap_test_utils::{TestTokenBuilder, RSA_PRIMARY};
use base64::{engine::general_purpose::STANDARD, Engine};

const AUDIENCE: &str = "svc-b";

fn authenticator(source: KeySource) -> Authenticator {
    Authenticator::new(AuthenticatorConfig::new(AUDIENCE, source))
        .expect("authenticator config should be valid")
}

#[tokio::test]
async fn test_file_loader_resolves_nested_key_id() -> Result<(), anyhow::Error> {
    let dir = tempfile::tempdir()?;
    std::fs::create_dir_all(dir.path().join("file-issuer"))?;
    std::fs::write(
        dir.path().join("file-issuer").join("rsa-primary.pem"),
        RSA_PRIMARY.public_pem,
    )?;

    let auth = authenticator(KeySource::loader(FileKeyLoader::new(dir.path())));
    let header = TestTokenBuilder::new("file-issuer", AUDIENCE).bearer();

    let claims = auth.authenticate(Some(&header)).await?;
    assert_eq!(claims.map(|c| c.iss).as_deref(), Some("file-issuer"));

    Ok(())
}

#[tokio::test]
async fn test_file_loader_missing_key_rejects_token() -> Result<(), anyhow::Error> {
    let dir = tempfile::tempdir()?;
    let auth = authenticator(KeySource::loader(FileKeyLoader::new(dir.path())));
    let header = TestTokenBuilder::new("file-issuer", AUDIENCE).bearer();

    let err = auth
        .authenticate(Some(&header))
        .await
        .expect_err("token should be rejected");
    assert_eq!(err.message(), "failed to fetch public key");

    Ok(())
}

/// Each test uses its own issuer so variable names never collide between
/// concurrently running tests.
#[tokio::test]
async fn test_env_loader_plain_pem() -> Result<(), anyhow::Error> {
    let issuer = "env-plain-issuer";
    let name = env_key_name("ASAPTEST_", &RSA_PRIMARY.key_id(issuer));
    std::env::set_var(&name, RSA_PRIMARY.public_pem);

    let auth = authenticator(KeySource::loader(EnvKeyLoader::new("ASAPTEST_", false)));
    let header = TestTokenBuilder::new(issuer, AUDIENCE).bearer();

    assert!(auth.authenticate(Some(&header)).await?.is_some());

    std::env::remove_var(&name);
    Ok(())
}

#[tokio::test]
async fn test_env_loader_base64_pem() -> Result<(), anyhow::Error> {
    let issuer = "env-b64-issuer";
    let name = env_key_name("ASAPTEST_", &RSA_PRIMARY.key_id(issuer));
    std::env::set_var(&name, STANDARD.encode(RSA_PRIMARY.public_pem));

    let auth = authenticator(KeySource::loader(EnvKeyLoader::new("ASAPTEST_", true)));
    let header = TestTokenBuilder::new(issuer, AUDIENCE).bearer();

    assert!(auth.authenticate(Some(&header)).await?.is_some());

    std::env::remove_var(&name);
    Ok(())
}

#[tokio::test]
async fn test_closure_loader_errors_reject_token() {
    let loader = loader_fn(|key_id: String| async move {
        Err::<String, _>(KeyFetchError::NotFound {
            key_id,
            location: "nowhere".to_string(),
        })
    });
    let auth = authenticator(KeySource::loader(loader));
    let header = TestTokenBuilder::new("svc-a", AUDIENCE).bearer();

    assert!(auth.authenticate(Some(&header)).await.is_err());
}
