use crate::config::{CacheDriver, DatabaseDriver, GatehouseConfig, PolicyAdapter};
use crate::db::{AccountRepository, MemoryAccountRepository, PostgresAccountRepository};
use crate::routes;
use anyhow::{bail, Context, Result};
use auth_policy::{
    Enforcer, FilePolicyStore, MemoryPolicyStore, PolicyStore, PostgresPolicyStore, RoleManager,
};
use auth_session::{SessionManager, SessionOptions, UserStore};
use axum::Router;
use cache_store::{CodeCache, MemoryCodeCache, RedisCodeCache};
use chrono::{DateTime, Duration, Utc};
use email_service::{Mailer, MemoryMailer, SmtpMailer};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

/// Shared server state handed to every handler.
#[derive(Clone)]
pub struct GatehouseServer {
    pub config: Arc<GatehouseConfig>,
    pub accounts: Arc<dyn AccountRepository>,
    pub sessions: Arc<SessionManager>,
    pub roles: RoleManager,
    pub codes: Arc<dyn CodeCache>,
    pub mailer: Arc<dyn Mailer>,
    pub started_at: DateTime<Utc>,
}

impl GatehouseServer {
    /// Assemble the server from explicit components. Tests use this with
    /// in-memory backends and a capturing mailer.
    pub fn new(
        config: GatehouseConfig,
        accounts: Arc<dyn AccountRepository>,
        users: Arc<dyn UserStore>,
        roles: RoleManager,
        codes: Arc<dyn CodeCache>,
        mailer: Arc<dyn Mailer>,
    ) -> Self {
        let sessions = Arc::new(SessionManager::new(
            users,
            session_options(&config),
        ));
        Self {
            config: Arc::new(config),
            accounts,
            sessions,
            roles,
            codes,
            mailer,
            started_at: Utc::now(),
        }
    }

    /// Build every component from configuration, seed the declared role
    /// groups, and start the periodic policy reload.
    pub async fn from_config(config: GatehouseConfig) -> Result<Self> {
        let pool = connect_pool_if_needed(&config).await?;

        let (accounts, users): (Arc<dyn AccountRepository>, Arc<dyn UserStore>) =
            match config.database.driver {
                DatabaseDriver::Memory => {
                    let repo = Arc::new(MemoryAccountRepository::new());
                    (repo.clone(), repo)
                }
                DatabaseDriver::Postgres => {
                    let pool = pool.clone().context("database driver requires a dsn")?;
                    let repo = PostgresAccountRepository::new(pool);
                    repo.ensure_schema().await?;
                    let repo = Arc::new(repo);
                    (repo.clone(), repo)
                }
            };

        let store = match config.policy.adapter {
            PolicyAdapter::Memory => PolicyStore::Memory(MemoryPolicyStore::new()),
            PolicyAdapter::File => {
                PolicyStore::File(FilePolicyStore::new(&config.policy.path))
            }
            PolicyAdapter::Database => {
                let pool = pool.context("policy adapter 'database' requires a database dsn")?;
                let store = PostgresPolicyStore::new(pool);
                store.ensure_schema().await?;
                PolicyStore::Postgres(store)
            }
        };

        let enforcer = Arc::new(Enforcer::new(store).await?);
        let roles = RoleManager::new(enforcer.clone());
        roles.apply_static_policy(&config.rbac.roles).await?;

        if config.policy.reload_seconds > 0 {
            let every = std::time::Duration::from_secs(config.policy.reload_seconds);
            let _reload_task = enforcer.clone().spawn_reload(every);
            info!(seconds = config.policy.reload_seconds, "policy reload task started");
        }

        let codes: Arc<dyn CodeCache> = match config.cache.driver {
            CacheDriver::Memory => Arc::new(MemoryCodeCache::new()),
            CacheDriver::Redis => Arc::new(
                RedisCodeCache::connect(&config.cache.dsn, &config.cache.prefix)
                    .await
                    .context("failed to connect to redis cache")?,
            ),
        };

        let mailer: Arc<dyn Mailer> = match &config.mailer.smtp {
            Some(smtp) => Arc::new(SmtpMailer::new(
                smtp.clone(),
                config.mailer.templates.clone(),
            )),
            None => {
                warn!("no smtp transport configured, outbound mail stays in memory");
                Arc::new(MemoryMailer::new())
            }
        };

        Ok(Self::new(config, accounts, users, roles, codes, mailer))
    }

    /// The full application router.
    pub fn router(&self) -> Router {
        Router::new()
            .merge(routes::health_routes())
            .merge(routes::session_routes())
            .merge(routes::account_routes())
            .merge(routes::rbac_routes())
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
            .with_state(self.clone())
    }
}

fn session_options(config: &GatehouseConfig) -> SessionOptions {
    let auth = &config.auth;
    SessionOptions::default()
        .with_secret(&auth.secret_key)
        .with_timeout(Duration::seconds(auth.token_expiration_seconds))
        .with_max_refresh(Duration::seconds(auth.token_refresh_seconds))
        .with_identity_key(&auth.identity_key)
        .with_token_lookup(&auth.token_lookup)
}

async fn connect_pool_if_needed(config: &GatehouseConfig) -> Result<Option<PgPool>> {
    let wants_pool = config.database.driver == DatabaseDriver::Postgres
        || config.policy.adapter == PolicyAdapter::Database;
    if !wants_pool {
        return Ok(None);
    }
    if config.database.dsn.is_empty() {
        bail!("a postgres dsn is required by the configured backends");
    }
    let pool = PgPoolOptions::new()
        .max_connections(20)
        .connect(&config.database.dsn)
        .await
        .context("failed to connect to postgres")?;
    Ok(Some(pool))
}
