/// Account Store
///
/// Persistence seam for accounts. The store owns uniqueness of email and
/// username: the service's own existence check is only advisory.

mod memory;
mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::auth::verify_password;
use crate::error::{AppError, StoreError};

pub use memory::InMemoryAccountStore;
pub use postgres::PostgresAccountStore;

/// A registered account
///
/// The password hash never leaves the server; it is skipped on serialization.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Account {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Check a plaintext password against the stored hash
    pub fn compare_password(&self, plaintext: &str) -> Result<bool, AppError> {
        verify_password(plaintext, &self.password_hash)
    }
}

/// Validated fields for a new account; the password is already hashed
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub username: String,
    pub email: String,
    pub password_hash: String,
}

#[async_trait]
pub trait AccountStore: Send + Sync {
    async fn find_by_email(&self, email: &str) -> Result<Option<Account>, StoreError>;

    async fn find_by_id(&self, id: Uuid) -> Result<Option<Account>, StoreError>;

    /// Persist a new account
    ///
    /// # Errors
    /// `UniqueViolation` if the email or username is taken,
    /// `Unavailable` if the store cannot complete the write
    async fn create(&self, account: NewAccount) -> Result<Account, StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::hash_password;

    fn account_with_password(password: &str) -> Account {
        Account {
            id: Uuid::new_v4(),
            username: "alice".to_string(),
            email: "alice@x.com".to_string(),
            password_hash: hash_password(password).unwrap(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_compare_password() {
        let account = account_with_password("pw123");

        assert!(account.compare_password("pw123").unwrap());
        assert!(!account.compare_password("wrongpw").unwrap());
    }

    #[test]
    fn test_serialization_omits_password_hash() {
        let account = account_with_password("pw123");
        let json = serde_json::to_value(&account).unwrap();

        assert_eq!(json["username"], "alice");
        assert_eq!(json["email"], "alice@x.com");
        assert!(json.get("password_hash").is_none());
    }
}
