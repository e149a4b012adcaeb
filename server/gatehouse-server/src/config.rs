use auth_policy::StaticGroup;
use email_service::{EmailTemplates, SmtpConfig};
use serde::Deserialize;

/// Bind address configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub host: String,
    pub port: u16,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

/// User/profile persistence driver, chosen once at configuration time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DatabaseDriver {
    #[default]
    Memory,
    Postgres,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub driver: DatabaseDriver,
    pub dsn: String,
}

/// Policy persistence adapter. `Database` reuses the relational DSN from
/// [`DatabaseConfig`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PolicyAdapter {
    #[default]
    Memory,
    File,
    Database,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PolicyConfig {
    pub adapter: PolicyAdapter,
    /// Policy file path for the `file` adapter.
    pub path: String,
    /// Background reload period in seconds; zero disables the task.
    pub reload_seconds: u64,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            adapter: PolicyAdapter::default(),
            path: "policy.csv".to_string(),
            reload_seconds: 300,
        }
    }
}

/// Declared role groups plus the two well-known role names handed out at
/// registration time.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RbacConfig {
    pub admin: String,
    pub user: String,
    pub roles: Vec<StaticGroup>,
}

impl Default for RbacConfig {
    fn default() -> Self {
        Self {
            admin: "admin".to_string(),
            user: "user".to_string(),
            roles: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AuthConfig {
    pub secret_key: String,
    pub token_expiration_seconds: i64,
    pub token_refresh_seconds: i64,
    pub token_lookup: String,
    pub identity_key: String,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            secret_key: "gatehouse-dev-secret".to_string(),
            token_expiration_seconds: 3600,
            token_refresh_seconds: 3600,
            token_lookup: "header: Authorization, query: token, cookie: jwt".to_string(),
            identity_key: "user".to_string(),
        }
    }
}

/// One-time-code cache backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheDriver {
    #[default]
    Memory,
    Redis,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub driver: CacheDriver,
    pub dsn: String,
    pub prefix: String,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            driver: CacheDriver::default(),
            dsn: String::new(),
            prefix: "gatehouse.".to_string(),
        }
    }
}

/// Registration and password-reset code handling.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AccountConfig {
    pub register_code_prefix: String,
    pub register_code_expiration_seconds: u64,
    pub password_reset_code_prefix: String,
    pub password_reset_code_expiration_seconds: u64,
}

impl Default for AccountConfig {
    fn default() -> Self {
        Self {
            register_code_prefix: "register.".to_string(),
            register_code_expiration_seconds: 600,
            password_reset_code_prefix: "pwreset.".to_string(),
            password_reset_code_expiration_seconds: 600,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MailerConfig {
    /// SMTP transport; absent means mail is captured in memory (dev).
    pub smtp: Option<SmtpConfig>,
    pub templates: EmailTemplates,
    pub register_code_template: String,
    pub password_reset_code_template: String,
}

impl Default for MailerConfig {
    fn default() -> Self {
        Self {
            smtp: None,
            templates: EmailTemplates::default(),
            register_code_template: "register_code".to_string(),
            password_reset_code_template: "password_reset_code".to_string(),
        }
    }
}

/// The whole service configuration. Loaded from an optional file layered
/// under `GATEHOUSE_`-prefixed environment overrides.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct GatehouseConfig {
    pub http: HttpConfig,
    pub database: DatabaseConfig,
    pub policy: PolicyConfig,
    pub rbac: RbacConfig,
    pub auth: AuthConfig,
    pub cache: CacheConfig,
    pub account: AccountConfig,
    pub mailer: MailerConfig,
}

impl GatehouseConfig {
    /// Load configuration. The file is optional so a bare environment can
    /// still boot the development profile.
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path).required(false))
            .add_source(config::Environment::with_prefix("GATEHOUSE").separator("__"))
            .build()?;
        Ok(settings.try_deserialize()?)
    }
}
