use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::{Account, AccountStore, NewAccount};
use crate::error::StoreError;

/// Process-local account store
///
/// Uniqueness checks and inserts happen under one lock, so concurrent
/// registrations for the same email cannot both succeed.
#[derive(Default)]
pub struct InMemoryAccountStore {
    accounts: Mutex<HashMap<Uuid, Account>>,
}

impl InMemoryAccountStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove an account; returns whether it existed
    pub fn delete(&self, id: Uuid) -> Result<bool, StoreError> {
        Ok(self.lock()?.remove(&id).is_some())
    }

    pub fn len(&self) -> Result<usize, StoreError> {
        Ok(self.lock()?.len())
    }

    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.lock()?.is_empty())
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<Uuid, Account>>, StoreError> {
        self.accounts
            .lock()
            .map_err(|_| StoreError::Unavailable("account map lock poisoned".to_string()))
    }
}

#[async_trait]
impl AccountStore for InMemoryAccountStore {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError> {
        Ok(self
            .lock()?
            .values()
            .find(|account| account.email == email)
            .cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, StoreError> {
        Ok(self.lock()?.get(&id).cloned())
    }

    async fn create(&self, account: NewAccount) -> Result<Account, StoreError> {
        let mut accounts = self.lock()?;

        if accounts.values().any(|a| a.email == account.email) {
            return Err(StoreError::UniqueViolation("accounts_email_key".to_string()));
        }
        if accounts.values().any(|a| a.username == account.username) {
            return Err(StoreError::UniqueViolation("accounts_username_key".to_string()));
        }

        let created = Account {
            id: Uuid::new_v4(),
            username: account.username,
            email: account.email,
            password_hash: account.password_hash,
            created_at: Utc::now(),
        };
        accounts.insert(created.id, created.clone());

        Ok(created)
    }
}
