use auth_policy::PolicyError;
use auth_session::SessionError;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use cache_store::CacheError;
use email_service::EmailError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::error;

/// Error body returned on every failed request: `{code, message}`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiErrorBody {
    pub code: u16,
    pub message: String,
}

/// HTTP-facing error taxonomy. Everything a handler can fail with maps
/// onto one of these, and from there onto a status code.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Bad request: {message}")]
    BadRequest { message: String },

    /// 401: bad credentials or an invalid/expired token. Never reveals
    /// which part of a credential was wrong.
    #[error("Authentication error: {message}")]
    Authentication { message: String },

    /// 403: valid identity, insufficient permission. Distinct from
    /// authentication failure by contract.
    #[error("Authorization error: {message}")]
    Authorization { message: String },

    #[error("Not found: {message}")]
    NotFound { message: String },

    #[error("Internal server error: {message}")]
    Internal { message: String },
}

impl ApiError {
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            message: message.into(),
        }
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::Authentication {
            message: message.into(),
        }
    }

    pub fn authorization(message: impl Into<String>) -> Self {
        Self::Authorization {
            message: message.into(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::BadRequest { .. } => StatusCode::BAD_REQUEST,
            ApiError::Authentication { .. } => StatusCode::UNAUTHORIZED,
            ApiError::Authorization { .. } => StatusCode::FORBIDDEN,
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = %self, "request failed");
        }
        let body = ApiErrorBody {
            code: status.as_u16(),
            message: match self {
                ApiError::BadRequest { message }
                | ApiError::Authentication { message }
                | ApiError::Authorization { message }
                | ApiError::NotFound { message }
                | ApiError::Internal { message } => message,
            },
        };
        (status, Json(body)).into_response()
    }
}

impl From<PolicyError> for ApiError {
    fn from(err: PolicyError) -> Self {
        match err {
            PolicyError::RoleNotExists
            | PolicyError::UserHasRole
            | PolicyError::UserNotHaveRole
            | PolicyError::ReservedRoleName => ApiError::bad_request(err.to_string()),
            PolicyError::StoreTimeout | PolicyError::Database(_) | PolicyError::Io(_) => {
                ApiError::internal(err.to_string())
            }
        }
    }
}

impl From<SessionError> for ApiError {
    fn from(err: SessionError) -> Self {
        if err.is_authentication_failure() {
            // collapse the reason so callers cannot probe tokens or
            // enumerate accounts
            ApiError::authentication("Authentication failed")
        } else {
            ApiError::internal(err.to_string())
        }
    }
}

impl From<CacheError> for ApiError {
    fn from(err: CacheError) -> Self {
        match err {
            CacheError::NotFound => ApiError::not_found("Cache entry not found"),
            CacheError::Redis(_) | CacheError::Backend(_) => ApiError::internal(err.to_string()),
        }
    }
}

impl From<EmailError> for ApiError {
    fn from(err: EmailError) -> Self {
        ApiError::internal(err.to_string())
    }
}

impl From<anyhow::Error> for ApiError {
    fn from(err: anyhow::Error) -> Self {
        ApiError::internal(err.to_string())
    }
}

pub type ApiResult<T> = std::result::Result<T, ApiError>;
