//! Issuer allow-list applied after authentication.

use crate::claims::AsapClaims;
use crate::error::AsapError;
use std::collections::HashSet;

/// Message used for every allow-list rejection.
pub const UNAUTHORIZED_ISSUER_MESSAGE: &str = "Unauthorized issuer or subject";

/// Set of issuers allowed to call a service.
#[derive(Debug, Clone, Default)]
pub struct IssuerAllowList {
    issuers: HashSet<String>,
}

impl IssuerAllowList {
    pub fn new<I, S>(issuers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            issuers: issuers.into_iter().map(Into::into).collect(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.issuers.is_empty()
    }

    #[must_use]
    pub fn contains(&self, issuer: &str) -> bool {
        self.issuers.contains(issuer)
    }

    /// Allow the request only if verified claims are present and their
    /// issuer is listed.
    ///
    /// # Errors
    ///
    /// Returns `AsapError::AuthorizationDenied` for anonymous requests and
    /// unlisted issuers.
    pub fn authorize(&self, claims: Option<&AsapClaims>) -> Result<(), AsapError> {
        match claims {
            Some(claims) if self.contains(&claims.iss) => Ok(()),
            Some(claims) => {
                tracing::debug!(target: "asap.authorization", iss = %claims.iss, "Issuer not in allow-list");
                Err(AsapError::authorization_denied(UNAUTHORIZED_ISSUER_MESSAGE)
                    .with_cause(format!("iss={}", claims.iss)))
            }
            None => {
                tracing::debug!(target: "asap.authorization", "No verified claims for allow-list check");
                Err(AsapError::authorization_denied(UNAUTHORIZED_ISSUER_MESSAGE))
            }
        }
    }
}
