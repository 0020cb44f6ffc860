//! ASAP Service error responses.
//!
//! Every ASAP failure is a 401. The JSON body carries a stable code and the
//! core error message; the underlying cause is only logged.

use asap_core::AsapError;
use axum::{
    http::{header::WWW_AUTHENTICATE, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// `WWW-Authenticate` value sent with every 401.
pub const WWW_AUTHENTICATE_VALUE: &str = "Bearer realm=\"asap\", error=\"invalid_token\"";

/// An authentication or authorization failure rendered as an HTTP response.
#[derive(Debug)]
pub struct AsapRejection(pub AsapError);

impl AsapRejection {
    /// Stable error code for the response body.
    #[must_use]
    pub fn code(&self) -> &'static str {
        match self.0 {
            AsapError::InvalidToken { .. } => "INVALID_TOKEN",
            AsapError::AuthorizationDenied { .. } => "UNAUTHORIZED_ISSUER",
        }
    }
}

impl From<AsapError> for AsapRejection {
    fn from(err: AsapError) -> Self {
        Self(err)
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: &'static str,
    message: String,
}

impl IntoResponse for AsapRejection {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::UNAUTHORIZED);

        let body = ErrorResponse {
            error: ErrorDetail {
                code: self.code(),
                message: self.0.message().to_string(),
            },
        };

        let mut response = (status, Json(body)).into_response();
        response.headers_mut().insert(
            WWW_AUTHENTICATE,
            HeaderValue::from_static(WWW_AUTHENTICATE_VALUE),
        );
        response
    }
}
