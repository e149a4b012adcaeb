use thiserror::Error;

#[derive(Error, Debug)]
pub enum PolicyError {
    #[error("The role does not exist")]
    RoleNotExists,

    #[error("The user already has the role")]
    UserHasRole,

    #[error("The user does not have the role")]
    UserNotHaveRole,

    #[error("The role name is reserved for identities")]
    ReservedRoleName,

    #[error("Policy store timed out")]
    StoreTimeout,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Policy file error: {0}")]
    Io(#[from] std::io::Error),
}

impl PolicyError {
    /// Idempotency signals are non-fatal outcomes of assignment operations;
    /// callers may treat them as success-with-no-effect.
    pub fn is_idempotency_signal(&self) -> bool {
        matches!(self, PolicyError::UserHasRole | PolicyError::UserNotHaveRole)
    }
}

pub type Result<T> = std::result::Result<T, PolicyError>;
