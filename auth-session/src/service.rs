use crate::claims::Claims;
use crate::error::{Result, SessionError};
use crate::extract::extract_token;
use crate::options::SessionOptions;
use crate::store::{User, UserStore};
use chrono::{DateTime, Utc};
use http::HeaderMap;
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use std::sync::Arc;
use tracing::debug;

/// A freshly signed token and when it stops being accepted.
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Issues, verifies, and refreshes identity tokens, and resolves verified
/// subjects back into domain users through the external user store.
pub struct SessionManager {
    users: Arc<dyn UserStore>,
    options: SessionOptions,
}

impl SessionManager {
    pub fn new(users: Arc<dyn UserStore>, options: SessionOptions) -> Self {
        Self { users, options }
    }

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    /// Authenticate a submitted credential and issue a token on success.
    ///
    /// The login name is tried as a username first, then as an email.
    /// Every failure mode collapses into [`SessionError::InvalidCredentials`]
    /// so the caller cannot tell which part was wrong.
    pub async fn login(&self, login: &str, password: &str) -> Result<(User, IssuedToken)> {
        let user = match self.users.get_by_username(login).await? {
            Some(user) => user,
            None => {
                debug!(login = %login, "username miss, falling back to email lookup");
                self.users
                    .get_by_email(login)
                    .await?
                    .ok_or(SessionError::InvalidCredentials)?
            }
        };

        let matches = bcrypt::verify(password, &user.password_hash)
            .map_err(|_| SessionError::InvalidCredentials)?;
        if !matches {
            return Err(SessionError::InvalidCredentials);
        }

        let issued = self.issue(&user.id)?;
        Ok((user, issued))
    }

    /// Sign a token for `subject` expiring after the configured timeout.
    pub fn issue(&self, subject: &str) -> Result<IssuedToken> {
        self.issue_at(subject, Utc::now())
    }

    fn issue_at(&self, subject: &str, now: DateTime<Utc>) -> Result<IssuedToken> {
        let claims = Claims {
            subject: subject.to_string(),
            issued_at: now,
            expires_at: now + self.options.timeout,
        };
        let token = encode(
            &Header::default(),
            &claims.to_map(&self.options.identity_key),
            &EncodingKey::from_secret(self.options.secret_key.as_bytes()),
        )?;
        Ok(IssuedToken {
            token,
            expires_at: claims.expires_at,
        })
    }

    /// Verify signature and expiration, and return the embedded claims.
    pub fn verify(&self, token: &str) -> Result<Claims> {
        self.decode_claims(token, true)
    }

    /// Verify a token and resolve its subject to a domain user.
    ///
    /// A subject that no longer resolves is an authentication failure,
    /// not a server error: deleting a user revokes their live tokens.
    pub async fn resolve(&self, token: &str) -> Result<User> {
        let claims = self.verify(token)?;
        self.users
            .get_by_id(&claims.subject)
            .await?
            .ok_or(SessionError::UnknownSubject)
    }

    /// Reissue a token with a fresh expiration, without re-checking the
    /// password, provided the original is still inside the refresh window
    /// past its issuance. The original may itself already be expired.
    pub fn refresh(&self, token: &str) -> Result<IssuedToken> {
        let claims = self.decode_claims(token, false)?;
        if claims.issued_at + self.options.max_refresh < Utc::now() {
            return Err(SessionError::RefreshWindowClosed);
        }
        self.issue(&claims.subject)
    }

    /// Pull a token off a request per the configured transport order.
    pub fn extract_token(&self, headers: &HeaderMap, query: Option<&str>) -> Option<String> {
        extract_token(&self.options.token_lookup, headers, query)
    }

    fn decode_claims(&self, token: &str, validate_exp: bool) -> Result<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.validate_exp = validate_exp;
        validation.set_required_spec_claims(&["exp"]);

        let data = decode::<serde_json::Map<String, serde_json::Value>>(
            token,
            &DecodingKey::from_secret(self.options.secret_key.as_bytes()),
            &validation,
        )
        .map_err(|err| match err.kind() {
            ErrorKind::ExpiredSignature => SessionError::TokenExpired,
            _ => SessionError::InvalidToken,
        })?;

        Claims::from_map(&data.claims, &self.options.identity_key)
            .ok_or(SessionError::InvalidToken)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::InMemoryUserStore;
    use chrono::Duration;

    // low cost keeps the hash fast in tests
    fn hash(password: &str) -> String {
        bcrypt::hash(password, 4).unwrap()
    }

    fn user(id: &str, username: &str, email: &str, password: &str) -> User {
        let now = Utc::now();
        User {
            id: id.to_string(),
            username: username.to_string(),
            email: email.to_string(),
            password_hash: hash(password),
            created_at: now,
            updated_at: now,
        }
    }

    fn manager_with(users: Arc<InMemoryUserStore>, options: SessionOptions) -> SessionManager {
        SessionManager::new(users, options)
    }

    #[tokio::test]
    async fn login_by_username_or_email() {
        let store = Arc::new(InMemoryUserStore::new());
        store.insert(user("u1", "alice", "alice@example.com", "secret"));
        let manager = manager_with(store, SessionOptions::default());

        let (found, issued) = manager.login("alice", "secret").await.unwrap();
        assert_eq!(found.id, "u1");
        assert_eq!(manager.verify(&issued.token).unwrap().subject, "u1");

        let (found, _) = manager.login("alice@example.com", "secret").await.unwrap();
        assert_eq!(found.id, "u1");
    }

    #[tokio::test]
    async fn login_failures_are_indistinct() {
        let store = Arc::new(InMemoryUserStore::new());
        store.insert(user("u1", "alice", "alice@example.com", "secret"));
        let manager = manager_with(store, SessionOptions::default());

        for (login, password) in [("alice", "wrong"), ("nobody", "secret")] {
            assert!(matches!(
                manager.login(login, password).await,
                Err(SessionError::InvalidCredentials)
            ));
        }
    }

    #[tokio::test]
    async fn verify_rejects_tampering_and_foreign_secrets() {
        let store = Arc::new(InMemoryUserStore::new());
        let manager = manager_with(store.clone(), SessionOptions::default());
        let issued = manager.issue("u1").unwrap();

        let mut tampered = issued.token.clone();
        tampered.push('x');
        assert!(matches!(
            manager.verify(&tampered),
            Err(SessionError::InvalidToken)
        ));

        let other = manager_with(store, SessionOptions::default().with_secret("other"));
        assert!(matches!(
            other.verify(&issued.token),
            Err(SessionError::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn tokens_expire_at_the_boundary() {
        let manager = manager_with(
            Arc::new(InMemoryUserStore::new()),
            SessionOptions::default().with_timeout(Duration::hours(1)),
        );

        // just inside the lifetime
        let live = manager
            .issue_at("u1", Utc::now() - Duration::minutes(59))
            .unwrap();
        assert!(manager.verify(&live.token).is_ok());

        // just past it
        let dead = manager
            .issue_at("u1", Utc::now() - Duration::minutes(61))
            .unwrap();
        assert!(matches!(
            manager.verify(&dead.token),
            Err(SessionError::TokenExpired)
        ));
    }

    #[tokio::test]
    async fn refresh_window_is_enforced() {
        let manager = manager_with(
            Arc::new(InMemoryUserStore::new()),
            SessionOptions::default()
                .with_timeout(Duration::minutes(5))
                .with_max_refresh(Duration::hours(1)),
        );

        // expired token, still inside the refresh window
        let stale = manager
            .issue_at("u1", Utc::now() - Duration::minutes(30))
            .unwrap();
        assert!(matches!(
            manager.verify(&stale.token),
            Err(SessionError::TokenExpired)
        ));
        let refreshed = manager.refresh(&stale.token).unwrap();
        let claims = manager.verify(&refreshed.token).unwrap();
        assert_eq!(claims.subject, "u1");
        assert!(refreshed.expires_at > stale.expires_at);

        // outside the refresh window
        let ancient = manager
            .issue_at("u1", Utc::now() - Duration::hours(2))
            .unwrap();
        assert!(matches!(
            manager.refresh(&ancient.token),
            Err(SessionError::RefreshWindowClosed)
        ));
    }

    #[tokio::test]
    async fn deleted_user_cannot_resolve() {
        let store = Arc::new(InMemoryUserStore::new());
        store.insert(user("u1", "alice", "alice@example.com", "secret"));
        let manager = manager_with(store.clone(), SessionOptions::default());
        let issued = manager.issue("u1").unwrap();

        assert_eq!(manager.resolve(&issued.token).await.unwrap().id, "u1");

        store.remove("u1");
        let err = manager.resolve(&issued.token).await.unwrap_err();
        assert!(matches!(err, SessionError::UnknownSubject));
        assert!(err.is_authentication_failure());
    }
}
