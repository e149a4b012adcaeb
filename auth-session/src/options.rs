use crate::extract::{parse_token_lookup, TokenLookup};
use chrono::Duration;

/// Session configuration values. Built once at startup from the service
/// configuration; the defaults mirror a development profile.
#[derive(Debug, Clone)]
pub struct SessionOptions {
    /// HMAC secret for token signing and verification.
    pub secret_key: String,
    /// Lifetime of an issued token.
    pub timeout: Duration,
    /// How long past issuance a token may still be refreshed.
    pub max_refresh: Duration,
    /// Claim key the subject is carried under.
    pub identity_key: String,
    /// Transport lookup order tried on each request.
    pub token_lookup: Vec<TokenLookup>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            secret_key: "gatehouse-dev-secret".to_string(),
            timeout: Duration::hours(1),
            max_refresh: Duration::hours(1),
            identity_key: "user".to_string(),
            token_lookup: parse_token_lookup("header: Authorization, query: token, cookie: jwt"),
        }
    }
}

impl SessionOptions {
    pub fn with_secret(mut self, secret: &str) -> Self {
        self.secret_key = secret.to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_refresh(mut self, max_refresh: Duration) -> Self {
        self.max_refresh = max_refresh;
        self
    }

    pub fn with_identity_key(mut self, key: &str) -> Self {
        self.identity_key = key.to_string();
        self
    }

    pub fn with_token_lookup(mut self, lookup: &str) -> Self {
        self.token_lookup = parse_token_lookup(lookup);
        self
    }
}
