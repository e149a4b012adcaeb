//! Authentication and authorization gate.
//!
//! [`CurrentUser`] is an extractor: any handler that takes it runs only
//! after the request's token has been verified, its subject resolved to a
//! live domain user, and `(request path, method)` validated against the
//! policy graph. Token and identity failures reject with 401; a valid
//! identity without permission rejects with 403, never conflated.

use crate::error::ApiError;
use crate::server::GatehouseServer;
use auth_policy::Permission;
use auth_session::User;
use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use tracing::{debug, warn};

/// The authenticated, authorized user for this request.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

#[async_trait]
impl FromRequestParts<GatehouseServer> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        server: &GatehouseServer,
    ) -> Result<Self, Self::Rejection> {
        let token = server
            .sessions
            .extract_token(&parts.headers, parts.uri.query())
            .ok_or_else(|| ApiError::authentication("Authentication failed"))?;

        // a token whose subject no longer resolves is rejected here, so a
        // deleted user cannot ride out a still-valid token
        let user = server.sessions.resolve(&token).await.map_err(|err| {
            if !err.is_authentication_failure() {
                warn!(error = %err, "session resolution failed");
            }
            ApiError::from(err)
        })?;

        // authorization is re-evaluated against current policy on every
        // request; the token carries no role information
        let permission = Permission::new(parts.uri.path(), parts.method.as_str());
        debug!(subject = %user.id, permission = %permission, "validating permission");
        if !server.roles.validate(&user.id, &permission) {
            return Err(ApiError::authorization("You don't have permission to access"));
        }

        Ok(CurrentUser(user))
    }
}
