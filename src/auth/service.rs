/// Credential Service
///
/// Registration, login, refresh and logout on top of an account store and
/// the token codec. Every successful call returns the account together with
/// a freshly minted token pair.

use std::sync::Arc;

use uuid::Uuid;

use crate::auth::jwt::{TokenCodec, TokenPair};
use crate::auth::password::hash_password;
use crate::error::{AppError, AuthError, ErrorContext, StoreError};
use crate::store::{Account, AccountStore, NewAccount};
use crate::validators::{is_valid_email, is_valid_username};

/// Account plus the token pair issued for it
#[derive(Debug, Clone)]
pub struct AuthOutcome {
    pub account: Account,
    pub tokens: TokenPair,
}

#[derive(Clone)]
pub struct CredentialService {
    store: Arc<dyn AccountStore>,
    codec: TokenCodec,
}

impl CredentialService {
    pub fn new(store: Arc<dyn AccountStore>, codec: TokenCodec) -> Self {
        Self { store, codec }
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    /// Create an account and issue its first token pair
    ///
    /// # Errors
    /// - `Validation` for a malformed username, email or password
    /// - `AccountExists` if the email (or username) is already registered
    /// - `Store(Unavailable)` if the store fails
    pub async fn register(
        &self,
        username: &str,
        email: &str,
        password: &str,
    ) -> Result<AuthOutcome, AppError> {
        let context = ErrorContext::new("register");

        let username = is_valid_username(username)?;
        let email = is_valid_email(email)?;

        if self.store.find_by_email(&email).await?.is_some() {
            tracing::info!(request_id = %context.request_id, "Registration rejected, email taken");
            return Err(AuthError::AccountExists.into());
        }

        let password_hash = hash_blocking(password.to_string()).await?;

        // The store constraint settles races the lookup above cannot see
        let account = self
            .store
            .create(NewAccount {
                username,
                email,
                password_hash,
            })
            .await
            .map_err(|e| match e {
                StoreError::UniqueViolation(_) => AppError::Auth(AuthError::AccountExists),
                other => {
                    let err = AppError::Store(other);
                    context.log_error(&err);
                    err
                }
            })?;

        let tokens = self.codec.issue(account.id)?;

        tracing::info!(
            request_id = %context.request_id,
            user_id = %account.id,
            "Account registered"
        );

        Ok(AuthOutcome { account, tokens })
    }

    /// Authenticate by email and password
    ///
    /// Unknown email and wrong password are reported identically.
    pub async fn login(&self, email: &str, password: &str) -> Result<AuthOutcome, AppError> {
        let context = ErrorContext::new("login");

        let account = match self.store.find_by_email(email.trim()).await {
            Ok(Some(account)) => account,
            Ok(None) => return Err(AuthError::InvalidCredentials.into()),
            Err(e) => {
                let err = AppError::Store(e);
                context.log_error(&err);
                return Err(err);
            }
        };
        let context = context.with_user_id(account.id.to_string());

        if !compare_blocking(account.clone(), password.to_string()).await? {
            let err = AppError::Auth(AuthError::InvalidCredentials);
            context.log_error(&err);
            return Err(err);
        }

        let tokens = self.codec.issue(account.id)?;

        tracing::info!(
            request_id = %context.request_id,
            user_id = %account.id,
            "User logged in"
        );

        Ok(AuthOutcome { account, tokens })
    }

    /// Exchange a refresh token for a new token pair
    ///
    /// Both tokens are re-minted. The presented refresh token is not revoked
    /// and stays usable until its own expiry.
    ///
    /// # Errors
    /// - `MissingToken` if no token was supplied (nothing else is consulted)
    /// - `InvalidToken` if verification fails
    /// - `AccountNotFound` if the subject no longer exists
    pub async fn refresh(&self, refresh_token: Option<&str>) -> Result<AuthOutcome, AppError> {
        let token = match refresh_token {
            Some(token) if !token.is_empty() => token,
            _ => return Err(AuthError::MissingToken.into()),
        };

        let context = ErrorContext::new("refresh");

        let claims = self.codec.verify_refresh(token)?;
        let account_id = claims.account_id()?;
        let context = context.with_user_id(account_id.to_string());

        let account = match self.store.find_by_id(account_id).await {
            Ok(Some(account)) => account,
            Ok(None) => {
                let err = AppError::Auth(AuthError::AccountNotFound);
                context.log_error(&err);
                return Err(err);
            }
            Err(e) => {
                let err = AppError::Store(e);
                context.log_error(&err);
                return Err(err);
            }
        };

        let tokens = self.codec.issue(account.id)?;

        tracing::info!(
            request_id = %context.request_id,
            user_id = %account.id,
            "Token pair refreshed"
        );

        Ok(AuthOutcome { account, tokens })
    }

    /// Look up the account behind an authenticated request
    pub async fn current_account(&self, account_id: Uuid) -> Result<Account, AppError> {
        self.store
            .find_by_id(account_id)
            .await?
            .ok_or_else(|| AuthError::AccountNotFound.into())
    }

    /// Logout holds no server-side state; the caller drops its tokens
    ///
    /// Always succeeds.
    pub fn logout(&self) -> Result<(), AppError> {
        tracing::debug!("Logout requested");
        Ok(())
    }
}

async fn hash_blocking(password: String) -> Result<String, AppError> {
    tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| AppError::Internal(format!("Password hashing task failed: {}", e)))?
}

async fn compare_blocking(account: Account, password: String) -> Result<bool, AppError> {
    tokio::task::spawn_blocking(move || account.compare_password(&password))
        .await
        .map_err(|e| AppError::Internal(format!("Password check task failed: {}", e)))?
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::password::MAX_PASSWORD_LENGTH;
    use crate::configuration::JwtSettings;
    use crate::error::ValidationError;
    use crate::store::InMemoryAccountStore;
    use async_trait::async_trait;
    use chrono::{Duration, Utc};

    /// Store that fails the test if the service touches it
    struct UntouchableStore;

    #[async_trait]
    impl AccountStore for UntouchableStore {
        async fn find_by_email(&self, _email: &str) -> Result<Option<Account>, StoreError> {
            panic!("store must not be consulted");
        }

        async fn find_by_id(&self, _id: Uuid) -> Result<Option<Account>, StoreError> {
            panic!("store must not be consulted");
        }

        async fn create(&self, _account: NewAccount) -> Result<Account, StoreError> {
            panic!("store must not be consulted");
        }
    }

    /// Store whose backend is down
    struct DownStore;

    #[async_trait]
    impl AccountStore for DownStore {
        async fn find_by_email(&self, _email: &str) -> Result<Option<Account>, StoreError> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }

        async fn find_by_id(&self, _id: Uuid) -> Result<Option<Account>, StoreError> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }

        async fn create(&self, _account: NewAccount) -> Result<Account, StoreError> {
            Err(StoreError::Unavailable("connection refused".to_string()))
        }
    }

    /// Store whose lookup misses but whose insert hits the unique constraint
    struct RacingStore;

    #[async_trait]
    impl AccountStore for RacingStore {
        async fn find_by_email(&self, _email: &str) -> Result<Option<Account>, StoreError> {
            Ok(None)
        }

        async fn find_by_id(&self, _id: Uuid) -> Result<Option<Account>, StoreError> {
            Ok(None)
        }

        async fn create(&self, _account: NewAccount) -> Result<Account, StoreError> {
            Err(StoreError::UniqueViolation("accounts_email_key".to_string()))
        }
    }

    fn codec() -> TokenCodec {
        TokenCodec::new(&JwtSettings::new(
            "service-test-access-secret",
            "service-test-refresh-secret",
        ))
        .unwrap()
    }

    fn service_with(store: Arc<dyn AccountStore>) -> CredentialService {
        CredentialService::new(store, codec())
    }

    fn in_memory() -> (Arc<InMemoryAccountStore>, CredentialService) {
        let store = Arc::new(InMemoryAccountStore::new());
        let service = service_with(store.clone());
        (store, service)
    }

    #[tokio::test]
    async fn test_register_then_login_scenario() {
        let (_store, service) = in_memory();

        let registered = service
            .register("alice", "alice@x.com", "pw123")
            .await
            .expect("Failed to register");
        assert_eq!(registered.account.username, "alice");

        let logged_in = service
            .login("alice@x.com", "pw123")
            .await
            .expect("Failed to log in");
        let claims = service
            .codec()
            .verify_access(&logged_in.tokens.access_token)
            .unwrap();

        assert_eq!(claims.account_id().unwrap(), registered.account.id);
        assert_eq!(logged_in.account.id, registered.account.id);
    }

    #[tokio::test]
    async fn test_register_stores_hash_not_password() {
        let (store, service) = in_memory();
        let outcome = service
            .register("alice", "alice@x.com", "pw123")
            .await
            .unwrap();

        let stored = store.find_by_id(outcome.account.id).await.unwrap().unwrap();
        assert_ne!(stored.password_hash, "pw123");
        assert!(stored.compare_password("pw123").unwrap());
    }

    #[tokio::test]
    async fn test_register_pair_shares_subject() {
        let (_store, service) = in_memory();
        let outcome = service
            .register("alice", "alice@x.com", "pw123")
            .await
            .unwrap();

        let access = service.codec().verify_access(&outcome.tokens.access_token).unwrap();
        let refresh = service.codec().verify_refresh(&outcome.tokens.refresh_token).unwrap();
        assert_eq!(access.sub, refresh.sub);
        assert_eq!(access.account_id().unwrap(), outcome.account.id);
    }

    #[tokio::test]
    async fn test_register_duplicate_email_has_no_side_effects() {
        let (store, service) = in_memory();
        service
            .register("alice", "alice@x.com", "pw123")
            .await
            .unwrap();

        let result = service.register("alice2", "alice@x.com", "pw456").await;

        assert_eq!(
            result.unwrap_err().auth_kind(),
            Some(AuthError::AccountExists)
        );
        assert_eq!(store.len().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_register_duplicate_username() {
        let (store, service) = in_memory();
        service
            .register("alice", "alice@x.com", "pw123")
            .await
            .unwrap();

        let result = service.register("alice", "other@x.com", "pw123").await;

        assert_eq!(
            result.unwrap_err().auth_kind(),
            Some(AuthError::AccountExists)
        );
        assert_eq!(store.len().unwrap(), 1);
    }

    #[tokio::test]
    async fn test_register_race_maps_to_account_exists() {
        let service = service_with(Arc::new(RacingStore));

        let result = service.register("alice", "alice@x.com", "pw123").await;

        assert_eq!(
            result.unwrap_err().auth_kind(),
            Some(AuthError::AccountExists)
        );
    }

    #[tokio::test]
    async fn test_register_rejects_invalid_email() {
        let (store, service) = in_memory();

        let result = service.register("alice", "not-an-email", "pw123").await;

        assert!(matches!(result, Err(AppError::Validation(_))));
        assert!(store.is_empty().unwrap());
    }

    #[tokio::test]
    async fn test_login_wrong_password() {
        let (_store, service) = in_memory();
        service
            .register("alice", "alice@x.com", "pw123")
            .await
            .unwrap();

        let result = service.login("alice@x.com", "wrongpw").await;

        assert_eq!(
            result.unwrap_err().auth_kind(),
            Some(AuthError::InvalidCredentials)
        );
    }

    #[tokio::test]
    async fn test_login_rejects_password_sharing_hashed_prefix() {
        let (_store, service) = in_memory();
        let stored = "a".repeat(MAX_PASSWORD_LENGTH);
        service
            .register("alice", "alice@x.com", &stored)
            .await
            .unwrap();

        let result = service
            .login("alice@x.com", &format!("{}Y-wrong-tail", stored))
            .await;

        assert_eq!(
            result.unwrap_err().auth_kind(),
            Some(AuthError::InvalidCredentials)
        );
        assert!(service.login("alice@x.com", &stored).await.is_ok());
    }

    #[tokio::test]
    async fn test_register_rejects_password_beyond_hash_input() {
        let (store, service) = in_memory();
        let password = format!("{}X-correct-tail", "a".repeat(MAX_PASSWORD_LENGTH));

        let result = service.register("alice", "alice@x.com", &password).await;

        assert!(matches!(
            result,
            Err(AppError::Validation(ValidationError::TooLong("password", 72)))
        ));
        assert!(store.is_empty().unwrap());
    }

    #[tokio::test]
    async fn test_login_unknown_email() {
        let (_store, service) = in_memory();

        let result = service.login("nobody@x.com", "pw123").await;

        assert_eq!(
            result.unwrap_err().auth_kind(),
            Some(AuthError::InvalidCredentials)
        );
    }

    #[tokio::test]
    async fn test_refresh_without_token_touches_nothing() {
        let service = service_with(Arc::new(UntouchableStore));

        let missing = service.refresh(None).await;
        let empty = service.refresh(Some("")).await;

        assert_eq!(missing.unwrap_err().auth_kind(), Some(AuthError::MissingToken));
        assert_eq!(empty.unwrap_err().auth_kind(), Some(AuthError::MissingToken));
    }

    #[tokio::test]
    async fn test_refresh_invalid_token_skips_store() {
        let service = service_with(Arc::new(UntouchableStore));

        let result = service.refresh(Some("invalid.token.here")).await;

        assert_eq!(result.unwrap_err().auth_kind(), Some(AuthError::InvalidToken));
    }

    #[tokio::test]
    async fn test_refresh_with_expired_token_skips_store() {
        let service = service_with(Arc::new(UntouchableStore));
        let expired = codec()
            .issue_at(Uuid::new_v4(), Utc::now() - Duration::days(31))
            .unwrap();

        let result = service.refresh(Some(&expired.refresh_token)).await;

        assert_eq!(result.unwrap_err().auth_kind(), Some(AuthError::InvalidToken));
    }

    #[tokio::test]
    async fn test_refresh_rejects_access_token() {
        let (_store, service) = in_memory();
        let outcome = service
            .register("alice", "alice@x.com", "pw123")
            .await
            .unwrap();

        let result = service.refresh(Some(&outcome.tokens.access_token)).await;

        assert_eq!(result.unwrap_err().auth_kind(), Some(AuthError::InvalidToken));
    }

    #[tokio::test]
    async fn test_refresh_issues_new_pair_for_same_subject() {
        let (_store, service) = in_memory();
        let registered = service
            .register("alice", "alice@x.com", "pw123")
            .await
            .unwrap();

        let refreshed = service
            .refresh(Some(&registered.tokens.refresh_token))
            .await
            .expect("Failed to refresh");

        assert_eq!(refreshed.account.id, registered.account.id);
        assert_ne!(refreshed.tokens.access_token, registered.tokens.access_token);
        assert_ne!(refreshed.tokens.refresh_token, registered.tokens.refresh_token);

        let claims = service
            .codec()
            .verify_access(&refreshed.tokens.access_token)
            .unwrap();
        assert_eq!(claims.account_id().unwrap(), registered.account.id);
    }

    #[tokio::test]
    async fn test_old_refresh_token_remains_valid_after_rotation() {
        // Stateless tokens: rotation does not revoke the previous refresh token
        let (_store, service) = in_memory();
        let registered = service
            .register("alice", "alice@x.com", "pw123")
            .await
            .unwrap();
        let old_refresh = registered.tokens.refresh_token.clone();

        service.refresh(Some(&old_refresh)).await.unwrap();
        let reused = service.refresh(Some(&old_refresh)).await;

        assert!(reused.is_ok());
    }

    #[tokio::test]
    async fn test_refresh_for_deleted_account() {
        let (store, service) = in_memory();
        let registered = service
            .register("alice", "alice@x.com", "pw123")
            .await
            .unwrap();
        store.delete(registered.account.id).unwrap();

        let result = service.refresh(Some(&registered.tokens.refresh_token)).await;

        assert_eq!(
            result.unwrap_err().auth_kind(),
            Some(AuthError::AccountNotFound)
        );
    }

    #[tokio::test]
    async fn test_store_failure_is_service_unavailable() {
        let service = service_with(Arc::new(DownStore));

        let register = service.register("alice", "alice@x.com", "pw123").await;
        let login = service.login("alice@x.com", "pw123").await;

        assert!(register.unwrap_err().is_service_unavailable());
        assert!(login.unwrap_err().is_service_unavailable());
    }

    #[test]
    fn test_logout_always_succeeds() {
        let service = service_with(Arc::new(UntouchableStore));
        assert!(service.logout().is_ok());
    }

    #[tokio::test]
    async fn test_current_account() {
        let (store, service) = in_memory();
        let registered = service
            .register("alice", "alice@x.com", "pw123")
            .await
            .unwrap();

        let account = service.current_account(registered.account.id).await.unwrap();
        assert_eq!(account.username, "alice");

        store.delete(registered.account.id).unwrap();
        let missing = service.current_account(registered.account.id).await;
        assert_eq!(missing.unwrap_err().auth_kind(), Some(AuthError::AccountNotFound));
    }
}
