//! Mock public key repository for tests
//!
//! Provides `TestKeyRepository`, a wiremock server that serves PEM public
//! keys at `/<key id>` the way a real ASAP key repository does.

use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Content type real repositories serve public keys with.
pub const PEM_CONTENT_TYPE: &str = "application/x-pem-file";

/// Mock key repository bound to a random local port.
///
/// # Example
/// ```rust,ignore
/// let repo = TestKeyRepository::start().await;
/// repo.serve_key("svc-a/key1", RSA_PRIMARY.public_pem).await;
///
/// let config = AuthenticatorConfig::new(
///     "svc-b",
///     KeySource::RepositoryUrls(vec![repo.base_url()]),
/// );
/// ```
pub struct TestKeyRepository {
    server: MockServer,
}

impl TestKeyRepository {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Repository base URL, with the trailing slash key URLs are built on.
    pub fn base_url(&self) -> String {
        format!("{}/", self.server.uri())
    }

    /// Serve `pem` for `key_id`.
    pub async fn serve_key(&self, key_id: &str, pem: &str) {
        self.mount(key_id, pem_response(pem), None).await;
    }

    /// Serve `pem` for `key_id` and verify on drop that exactly `times`
    /// requests arrived.
    pub async fn serve_key_expecting(&self, key_id: &str, pem: &str, times: u64) {
        self.mount(key_id, pem_response(pem), Some(times)).await;
    }

    /// Serve `pem` for `key_id` after `delay`.
    pub async fn serve_key_delayed(&self, key_id: &str, pem: &str, delay: Duration) {
        self.mount(key_id, pem_response(pem).set_delay(delay), None)
            .await;
    }

    /// Answer requests for `key_id` with `status` and an empty body.
    pub async fn fail_key(&self, key_id: &str, status: u16) {
        self.mount(key_id, ResponseTemplate::new(status), None).await;
    }

    /// Number of requests received so far.
    pub async fn request_count(&self) -> usize {
        self.server
            .received_requests()
            .await
            .map_or(0, |requests| requests.len())
    }

    async fn mount(&self, key_id: &str, response: ResponseTemplate, expect: Option<u64>) {
        let mock = Mock::given(method("GET"))
            .and(path(format!("/{key_id}")))
            .respond_with(response);
        let mock = match expect {
            Some(times) => mock.expect(times),
            None => mock,
        };
        mock.mount(&self.server).await;
    }
}

fn pem_response(pem: &str) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .insert_header("content-type", PEM_CONTENT_TYPE)
        .set_body_string(pem)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto_fixtures::RSA_PRIMARY;

    #[tokio::test]
    async fn test_base_url_has_trailing_slash() {
        let repo = TestKeyRepository::start().await;
        assert!(repo.base_url().starts_with("http://127.0.0.1:"));
        assert!(repo.base_url().ends_with('/'));
    }

    #[tokio::test]
    async fn test_request_count_starts_at_zero() {
        let repo = TestKeyRepository::start().await;
        repo.serve_key("svc-a/rsa-primary", RSA_PRIMARY.public_pem)
            .await;
        assert_eq!(repo.request_count().await, 0);
    }
}
