use crate::error::{ApiError, ApiResult};
use crate::server::GatehouseServer;
use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct TokenReply {
    pub code: u16,
    pub token: String,
    pub expire: DateTime<Utc>,
}

/// POST /v1/session — credential login, issues a fresh token.
pub async fn login(
    State(server): State<GatehouseServer>,
    Json(form): Json<LoginForm>,
) -> ApiResult<Json<TokenReply>> {
    if form.username.is_empty() || form.password.is_empty() {
        return Err(ApiError::authentication("Authentication failed"));
    }

    let (_, issued) = server.sessions.login(&form.username, &form.password).await?;
    Ok(Json(TokenReply {
        code: StatusCode::OK.as_u16(),
        token: issued.token,
        expire: issued.expires_at,
    }))
}

/// GET /v1/session/refresh_token — reissue inside the refresh window.
/// The token is read from the configured transports like any request.
pub async fn refresh(
    State(server): State<GatehouseServer>,
    request: axum::extract::Request,
) -> ApiResult<Json<TokenReply>> {
    let token = server
        .sessions
        .extract_token(request.headers(), request.uri().query())
        .ok_or_else(|| ApiError::authentication("Authentication failed"))?;

    let issued = server.sessions.refresh(&token)?;
    Ok(Json(TokenReply {
        code: StatusCode::OK.as_u16(),
        token: issued.token,
        expire: issued.expires_at,
    }))
}

/// DELETE /v1/session — tokens are stateless, logout always succeeds.
pub async fn logout() -> StatusCode {
    StatusCode::OK
}
