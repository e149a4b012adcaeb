//! User and profile persistence.
//!
//! A thin I/O boundary with no business rules: the account handlers own
//! validation and the session layer owns credential checks. Backends are
//! in-memory (tests, development) and Postgres, selected at
//! configuration time. Both also implement
//! [`auth_session::UserStore`] so the session layer can resolve subjects.

pub mod memory;
pub mod postgres;

pub use memory::*;
pub use postgres::*;

use anyhow::Result;
use async_trait::async_trait;
use auth_session::User;
use serde::{Deserialize, Serialize};

/// Mutable profile fields attached to a user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    #[serde(default)]
    pub avatar: String,
    #[serde(default)]
    pub nickname: String,
    #[serde(default)]
    pub company: String,
    #[serde(default)]
    pub location: String,
}

/// A stored user with their profile.
#[derive(Debug, Clone, Serialize)]
pub struct Account {
    #[serde(flatten)]
    pub user: User,
    pub profile: Profile,
}

/// Listing parameters, already normalized by the handler.
#[derive(Debug, Clone, Default)]
pub struct UserListQuery {
    /// Substring match against username and email; empty matches all.
    pub query: String,
    pub offset: i64,
    pub count: i64,
}

#[derive(Debug, Clone)]
pub struct UserListPage {
    pub total: i64,
    pub accounts: Vec<Account>,
}

#[async_trait]
pub trait AccountRepository: Send + Sync {
    async fn create(&self, account: &Account) -> Result<()>;
    async fn get(&self, id: &str) -> Result<Option<Account>>;
    async fn get_by_username(&self, username: &str) -> Result<Option<Account>>;
    async fn get_by_email(&self, email: &str) -> Result<Option<Account>>;
    async fn update_password(&self, id: &str, password_hash: &str) -> Result<bool>;
    async fn update_profile(&self, id: &str, profile: &Profile) -> Result<bool>;
    async fn delete(&self, id: &str) -> Result<bool>;
    async fn list(&self, query: &UserListQuery) -> Result<UserListPage>;
    async fn count(&self) -> Result<i64>;
}
