use super::{Account, AccountRepository, Profile, UserListQuery, UserListPage};
use anyhow::Result;
use async_trait::async_trait;
use auth_session::{SessionError, User, UserStore};
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::HashMap;

/// In-memory account repository for tests and single-process development.
#[derive(Default)]
pub struct MemoryAccountRepository {
    accounts: RwLock<HashMap<String, Account>>,
}

impl MemoryAccountRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AccountRepository for MemoryAccountRepository {
    async fn create(&self, account: &Account) -> Result<()> {
        self.accounts
            .write()
            .insert(account.user.id.clone(), account.clone());
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Option<Account>> {
        Ok(self.accounts.read().get(id).cloned())
    }

    async fn get_by_username(&self, username: &str) -> Result<Option<Account>> {
        Ok(self
            .accounts
            .read()
            .values()
            .find(|a| a.user.username == username)
            .cloned())
    }

    async fn get_by_email(&self, email: &str) -> Result<Option<Account>> {
        Ok(self
            .accounts
            .read()
            .values()
            .find(|a| a.user.email == email)
            .cloned())
    }

    async fn update_password(&self, id: &str, password_hash: &str) -> Result<bool> {
        let mut accounts = self.accounts.write();
        match accounts.get_mut(id) {
            Some(account) => {
                account.user.password_hash = password_hash.to_string();
                account.user.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn update_profile(&self, id: &str, profile: &Profile) -> Result<bool> {
        let mut accounts = self.accounts.write();
        match accounts.get_mut(id) {
            Some(account) => {
                account.profile = profile.clone();
                account.user.updated_at = Utc::now();
                Ok(true)
            }
            None => Ok(false),
        }
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        Ok(self.accounts.write().remove(id).is_some())
    }

    async fn list(&self, query: &UserListQuery) -> Result<UserListPage> {
        let accounts = self.accounts.read();
        let mut matched: Vec<Account> = accounts
            .values()
            .filter(|a| {
                query.query.is_empty()
                    || a.user.username.contains(&query.query)
                    || a.user.email.contains(&query.query)
            })
            .cloned()
            .collect();
        matched.sort_by(|a, b| {
            a.user
                .created_at
                .cmp(&b.user.created_at)
                .then_with(|| a.user.id.cmp(&b.user.id))
        });

        let total = matched.len() as i64;
        let start = (query.offset.max(0) as usize).min(matched.len());
        let end = (start + query.count.max(0) as usize).min(matched.len());
        Ok(UserListPage {
            total,
            accounts: matched[start..end].to_vec(),
        })
    }

    async fn count(&self) -> Result<i64> {
        Ok(self.accounts.read().len() as i64)
    }
}

#[async_trait]
impl UserStore for MemoryAccountRepository {
    async fn get_by_id(&self, id: &str) -> auth_session::Result<Option<User>> {
        Ok(self.accounts.read().get(id).map(|a| a.user.clone()))
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
