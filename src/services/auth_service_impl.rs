//! `SeaORM` implementation of the `AuthService` trait.

use crate::config::SecurityConfig;
use crate::db::{Store, User};
use crate::services::auth_service::{AuthError, AuthService};
use crate::services::password::PasswordHashService;
use crate::services::throttle::LoginThrottle;
use async_trait::async_trait;
use tracing::{info, warn};

const MAX_USERNAME_LENGTH: usize = 64;

pub struct SeaOrmAuthService {
    store: Store,
    hasher: PasswordHashService,
    throttle: LoginThrottle,
    min_password_length: usize,
}

impl SeaOrmAuthService {
    pub fn new(store: Store, security: &SecurityConfig) -> anyhow::Result<Self> {
        Ok(Self {
            store,
            hasher: PasswordHashService::new(security)?,
            throttle: LoginThrottle::new(security.login_throttle.clone()),
            min_password_length: security.min_password_length,
        })
    }

    fn validate_username(username: &str) -> Result<(), AuthError> {
        if username.is_empty() {
            return Err(AuthError::Validation("Username is required".to_string()));
        }

        if username.chars().count() > MAX_USERNAME_LENGTH {
            return Err(AuthError::Validation(format!(
                "Username must be {MAX_USERNAME_LENGTH} characters or less"
            )));
        }

        if !username
            .chars()
            .all(|c| c.is_alphanumeric() || c == '_' || c == '-' || c == '.')
        {
            return Err(AuthError::Validation(
                "Username can only contain letters, numbers, dots, hyphens, and underscores"
                    .to_string(),
            ));
        }

        Ok(())
    }

    fn validate_password(&self, password: &str) -> Result<(), AuthError> {
        if password.is_empty() {
            return Err(AuthError::Validation("Password is required".to_string()));
        }

        if password.chars().count() < self.min_password_length {
            return Err(AuthError::Validation(format!(
                "Password must be at least {} characters",
                self.min_password_length
            )));
        }
        Ok(())
    }

    async fn fail_login(&self, username: &str) -> AuthError {
        self.throttle.record_failure(username).await;
        metrics::counter!("auth_logins_total", "outcome" => "invalid").increment(1);
        AuthError::InvalidCredentials
    }
}

#[async_trait]
impl AuthService for SeaOrmAuthService {
    async fn register(&self, username: &str, password: &str) -> Result<User, AuthError> {
        Self::validate_username(username)?;
        self.validate_password(password)?;

        if self.store.get_user_by_username(username).await?.is_some() {
            return Err(AuthError::DuplicateUsername(username.to_string()));
        }

        let password_hash = self.hasher.hash_blocking(password).await?;

        // The unique index catches a registration that raced past the check above.
        let user = self
            .store
            .create_user(username, &password_hash)
            .await?
            .ok_or_else(|| AuthError::DuplicateUsername(username.to_string()))?;

        metrics::counter!("auth_registrations_total").increment(1);
        info!(user_id = user.id, "Registered user {}", user.username);

        Ok(user)
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<User>, AuthError> {
        Ok(self.store.get_user_by_username(username).await?)
    }

    async fn find_by_id(&self, id: i32) -> Result<Option<User>, AuthError> {
        Ok(self.store.get_user_by_id(id).await?)
    }

    async fn verify(&self, user: &User, password: &str) -> Result<bool, AuthError> {
        let Some(password_hash) = self.store.get_user_password_hash(user.id).await? else {
            return Ok(false);
        };

        Ok(PasswordHashService::verify_blocking(password, &password_hash).await?)
    }

    async fn authenticate(&self, username: &str, password: &str) -> Result<User, AuthError> {
        if let Some(remaining) = self.throttle.check(username).await {
            metrics::counter!("auth_logins_total", "outcome" => "throttled").increment(1);
            warn!("Rejected login for throttled username {username}");
            return Err(AuthError::TooManyAttempts {
                retry_after_secs: remaining.as_secs().max(1),
            });
        }

        let Some((user, password_hash)) = self
            .store
            .get_user_by_username_with_password(username)
            .await?
        else {
            return Err(self.fail_login(username).await);
        };

        if !PasswordHashService::verify_blocking(password, &password_hash).await? {
            return Err(self.fail_login(username).await);
        }

        self.throttle.record_success(username).await;
        metrics::counter!("auth_logins_total", "outcome" => "success").increment(1);

        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LoginThrottleConfig;

    async fn service_with_throttle(throttle: LoginThrottleConfig) -> SeaOrmAuthService {
        let store = Store::new("sqlite::memory:").await.unwrap();
        let security = SecurityConfig {
            argon2_memory_cost_kib: 1024,
            argon2_time_cost: 1,
            argon2_parallelism: 1,
            min_password_length: 3,
            login_throttle: throttle,
        };
        SeaOrmAuthService::new(store, &security).unwrap()
    }

    async fn service() -> SeaOrmAuthService {
        service_with_throttle(LoginThrottleConfig {
            enabled: false,
            ..LoginThrottleConfig::default()
        })
        .await
    }

    #[tokio::test]
    async fn test_register_then_authenticate() {
        let auth = service().await;

        let user = auth.register("alice", "pw1").await.unwrap();
        assert_eq!(user.username, "alice");

        let logged_in = auth.authenticate("alice", "pw1").await.unwrap();
        assert_eq!(logged_in.id, user.id);

        assert!(auth.verify(&user, "pw1").await.unwrap());
        assert!(!auth.verify(&user, "wrong").await.unwrap());
    }

    #[tokio::test]
    async fn test_register_duplicate_keeps_first_user() {
        let auth = service().await;
        let first = auth.register("alice", "pw1").await.unwrap();

        let err = auth.register("alice", "anything").await.unwrap_err();
        assert!(matches!(err, AuthError::DuplicateUsername(name) if name == "alice"));

        let stored = auth.find_by_username("alice").await.unwrap().unwrap();
        assert_eq!(stored, first);
        assert!(auth.verify(&stored, "pw1").await.unwrap());
        assert!(!auth.verify(&stored, "anything").await.unwrap());
    }

    #[tokio::test]
    async fn test_password_is_never_stored_plain() {
        let auth = service().await;
        auth.register("alice", "plain-secret").await.unwrap();

        let (_, hash) = auth
            .store
            .get_user_by_username_with_password("alice")
            .await
            .unwrap()
            .unwrap();
        assert_ne!(hash, "plain-secret");
        assert!(hash.starts_with("$argon2id$"));
    }

    #[tokio::test]
    async fn test_register_validation() {
        let auth = service().await;

        assert!(matches!(
            auth.register("", "pw1").await,
            Err(AuthError::Validation(_))
        ));
        assert!(matches!(
            auth.register("has space", "pw1").await,
            Err(AuthError::Validation(_))
        ));
        assert!(matches!(
            auth.register("alice", "pw").await,
            Err(AuthError::Validation(_))
        ));
        assert!(auth.find_by_username("alice").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_authenticate_rejects_bad_credentials() {
        let auth = service().await;
        auth.register("alice", "pw1").await.unwrap();

        assert!(matches!(
            auth.authenticate("alice", "wrong").await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            auth.authenticate("nobody", "pw1").await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_authenticate_throttles_repeated_failures() {
        let auth = service_with_throttle(LoginThrottleConfig {
            enabled: true,
            max_attempts: 2,
            window_seconds: 60,
            lockout_seconds: 60,
        })
        .await;
        auth.register("alice", "pw1").await.unwrap();

        for _ in 0..2 {
            assert!(matches!(
                auth.authenticate("alice", "wrong").await,
                Err(AuthError::InvalidCredentials)
            ));
        }

        // Even the right password is refused during lockout.
        assert!(matches!(
            auth.authenticate("alice", "pw1").await,
            Err(AuthError::TooManyAttempts { .. })
        ));
    }

    #[tokio::test]
    async fn test_verify_with_corrupted_hash_is_false() {
        use crate::entities::users;
        use sea_orm::{ActiveModelTrait, Set};

        let auth = service().await;
        let user = auth.register("alice", "pw1").await.unwrap();

        let active = users::ActiveModel {
            id: Set(user.id),
            password_hash: Set("corrupted".to_string()),
            ..Default::default()
        };
        active.update(&auth.store.conn).await.unwrap();

        assert!(!auth.verify(&user, "pw1").await.unwrap());
        assert!(matches!(
            auth.authenticate("alice", "pw1").await,
            Err(AuthError::InvalidCredentials)
        ));
    }
}
