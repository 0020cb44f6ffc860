//! HTTP routes for the ASAP Service.
//!
//! Defines the Axum router and application state.

use crate::config::{AuthMode, Config};
use crate::handlers;
use crate::middleware::{asap_auth, http_metrics_middleware, require_authorized_issuer, AuthState};
use asap_core::{Authenticator, IssuerAllowList, KeyCache};
use axum::{middleware, routing::get, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// Application state shared across all handlers and middleware.
#[derive(Clone)]
pub struct AppState {
    pub auth: Arc<AuthState>,

    /// `None` when no issuers are configured.
    pub allow_list: Option<Arc<IssuerAllowList>>,
}

impl AppState {
    /// Build the authenticator and allow-list from configuration, fetching
    /// keys through `key_cache`.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the authenticator cannot be built.
    pub fn new(config: &Config, key_cache: Arc<KeyCache>) -> Result<Self, asap_core::ConfigError> {
        let authenticator = Authenticator::new(config.authenticator.clone().with_key_cache(key_cache))?;
        Ok(Self::with_authenticator(
            authenticator,
            config.auth_mode,
            &config.authorized_issuers,
        ))
    }

    /// State around an existing authenticator.
    pub fn with_authenticator(
        authenticator: Authenticator,
        mode: AuthMode,
        authorized_issuers: &[String],
    ) -> Self {
        let allow_list = (!authorized_issuers.is_empty())
            .then(|| Arc::new(IssuerAllowList::new(authorized_issuers.iter().cloned())));
        Self {
            auth: Arc::new(AuthState {
                authenticator: Arc::new(authenticator),
                mode,
            }),
            allow_list,
        }
    }
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `/health` - Liveness probe - public
/// - `/metrics` - Prometheus metrics endpoint - public
/// - `/v1/claims` - Caller's verified claims - ASAP authentication, plus the
///   issuer allow-list when configured
/// - TraceLayer for request logging
/// - HTTP metrics middleware
/// - 30 second request timeout
pub fn build_routes(state: AppState, metrics_handle: PrometheusHandle) -> Router {
    let public_routes = Router::new().route("/health", get(handlers::health_check));

    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    let mut protected_routes = Router::new().route("/v1/claims", get(handlers::get_claims));
    // route_layer order is inside-out: the allow-list runs after auth
    if let Some(allow_list) = state.allow_list {
        protected_routes = protected_routes.route_layer(middleware::from_fn_with_state(
            allow_list,
            require_authorized_issuer,
        ));
    }
    let protected_routes =
        protected_routes.route_layer(middleware::from_fn_with_state(state.auth, asap_auth));

    // Layer order (bottom-to-top execution):
    // 1. TimeoutLayer - Timeout the request (innermost)
    // 2. TraceLayer - Log request details
    // 3. http_metrics_middleware - Record ALL responses (outermost)
    public_routes
        .merge(metrics_routes)
        .merge(protected_routes)
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .layer(TraceLayer::new_for_http())
        .layer(middleware::from_fn(http_metrics_middleware))
}
