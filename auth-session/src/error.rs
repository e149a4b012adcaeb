use thiserror::Error;

#[derive(Error, Debug)]
pub enum SessionError {
    /// Bad username/email or password. Deliberately indistinct so callers
    /// cannot enumerate which part was wrong.
    #[error("Invalid credentials")]
    InvalidCredentials,

    #[error("Invalid token")]
    InvalidToken,

    #[error("Token expired")]
    TokenExpired,

    #[error("Token is outside the refresh window")]
    RefreshWindowClosed,

    /// Token verified but its subject no longer resolves to a user; a
    /// deleted account must not retain access through a live token.
    #[error("Unknown subject")]
    UnknownSubject,

    #[error("Token encoding error: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("User store error: {0}")]
    Store(#[from] anyhow::Error),
}

impl SessionError {
    /// True for outcomes surfaced as 401, as opposed to server faults.
    pub fn is_authentication_failure(&self) -> bool {
        !matches!(self, SessionError::Store(_) | SessionError::Jwt(_))
    }
}

pub type Result<T> = std::result::Result<T, SessionError>;
