use super::{Account, AccountRepository, Profile, UserListQuery, UserListPage};
use anyhow::Result;
use async_trait::async_trait;
use auth_session::{SessionError, User, UserStore};
use chrono::{DateTime, Utc};
use sqlx::PgPool;

/// Postgres-backed account repository. One row per user, profile columns
/// inline.
pub struct PostgresAccountRepository {
    pool: PgPool,
}

#[derive(sqlx::FromRow)]
struct AccountRow {
    id: String,
    username: String,
    email: String,
    password_hash: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    avatar: String,
    nickname: String,
    company: String,
    location: String,
}

impl From<AccountRow> for Account {
    fn from(row: AccountRow) -> Self {
        Account {
            user: User {
                id: row.id,
                username: row.username,
                email: row.email,
                password_hash: row.password_hash,
                created_at: row.created_at,
                updated_at: row.updated_at,
            },
            profile: Profile {
                avatar: row.avatar,
                nickname: row.nickname,
                company: row.company,
                location: row.location,
            },
        }
    }
}

const SELECT_COLUMNS: &str = "id, username, email, password_hash, created_at, updated_at, \
                              avatar, nickname, company, location";

impl PostgresAccountRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create the backing table when it is not present.
    pub async fn ensure_schema(&self) -> Result<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id TEXT PRIMARY KEY,
                username TEXT NOT NULL UNIQUE,
                email TEXT NOT NULL UNIQUE,
                password_hash TEXT NOT NULL,
                created_at TIMESTAMPTZ NOT NULL,
                updated_at TIMESTAMPTZ NOT NULL,
                avatar TEXT NOT NULL DEFAULT '',
                nickname TEXT NOT NULL DEFAULT '',
                company TEXT NOT NULL DEFAULT '',
                location TEXT NOT NULL DEFAULT ''
            )
            "#,
        )
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn fetch_one_by(&self, column: &str, value: &str) -> Result<Option<Account>> {
        let sql = format!("SELECT {SELECT_COLUMNS} FROM users WHERE {column} = $1");
        let row = sqlx::query_as::<_, AccountRow>(&sql)
            .bind(value)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(Account::from))
    }
}

#[async_trait]
impl AccountRepository for PostgresAccountRepository {
    async fn create(&self, account: &Account) -> Result<()> {
        sqlx::query(
            "INSERT INTO users (id, username, email, password_hash, created_at, updated_at, \
             avatar, nickname, company, location) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)",
        )
        .bind(&account.user.id)
        .bind(&account.user.username)
        .bind(&account.user.email)
        .bind(&account.user.password_hash)
        .bind(account.user.created_at)
        .bind(account.user.updated_at)
        .bind(&account.profile.avatar)
        .bind(&account.profile.nickname)
        .bind(&account.profile.company)
        .bind(&account.profile.location)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Account>> {
        self.fetch_one_by("id", id).await
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<Account>> {
        self.fetch_one_by("username", username).await
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<Account>> {
        self.fetch_one_by("email", email).await
    }

    async fn update_password(&self, id: &str, password_hash: &str) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE users SET password_hash = $2, updated_at = $3 WHERE id = $1",
        )
        .bind(id)
        .bind(password_hash)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn update_profile(&self, id: &str, profile: &Profile) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE users SET avatar = $2, nickname = $3, company = $4, location = $5, \
             updated_at = $6 WHERE id = $1",
        )
        .bind(id)
        .bind(&profile.avatar)
        .bind(&profile.nickname)
        .bind(&profile.company)
        .bind(&profile.location)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn list(&self, query: &UserListQuery) -> Result<UserListPage> {
        let pattern = format!("%{}%", query.query);

        let sql = format!(
            "SELECT {SELECT_COLUMNS} FROM users \
             WHERE ($1 = '' OR username ILIKE $2 OR email ILIKE $2) \
             ORDER BY created_at, id OFFSET $3 LIMIT $4"
        );
        let rows = sqlx::query_as::<_, AccountRow>(&sql)
            .bind(&query.query)
            .bind(&pattern)
            .bind(query.offset.max(0))
            .bind(query.count.max(0))
            .fetch_all(&self.pool)
            .await?;

        let total: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM users WHERE ($1 = '' OR username ILIKE $2 OR email ILIKE $2)",
        )
        .bind(&query.query)
        .bind(&pattern)
        .fetch_one(&self.pool)
        .await?;

        Ok(UserListPage {
            total,
            accounts: rows.into_iter().map(Account::from).collect(),
        })
    }

    async fn count(&self) -> Result<i64> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(total)
    }
}

#[async_trait]
impl UserStore for PostgresAccountRepository {
    async fn get_by_id(&self, id: &str) -> auth_session::Result<Option<User>> {
        self.get(id)
            .await
            .map(|account| account.map(|a| a.user))
            .map_err(SessionError::Store)
    }

    async fn get_by_username(&self, username: &str) -> auth_session::Result<Option<User>> {
        AccountRepository::get_by_username(self, username)
            .await
            .map(|account| account.map(|a| a.user))
            .map_err(SessionError::Store)
    }

    async fn get_by_email(&self, email: &str) -> auth_session::Result<Option<User>> {
        AccountRepository::get_by_email(self, email)
            .await
            .map(|account| account.map(|a| a.user))
            .map_err(SessionError::Store)
    }
}
