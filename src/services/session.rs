//! Login-session lifecycle.
//!
//! A session is either anonymous or bound to exactly one user id. The id is
//! the only thing stored in the session; the user record is re-read on every
//! request so a deleted account degrades to anonymous instead of failing.

use serde::Serialize;
use std::sync::Arc;
use tower_sessions::Session;
use tracing::{debug, info, warn};

use crate::db::User;
use crate::services::auth_service::{AuthError, AuthService};

/// Session key holding the authenticated user's id.
pub const USER_ID_KEY: &str = "user_id";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CurrentUser {
    pub id: i32,
    pub username: String,
}

impl From<User> for CurrentUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
        }
    }
}

/// Identity resolved for a single request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Identity {
    #[default]
    Anonymous,
    Authenticated(CurrentUser),
}

impl Identity {
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }

    #[must_use]
    pub const fn user(&self) -> Option<&CurrentUser> {
        match self {
            Self::Authenticated(user) => Some(user),
            Self::Anonymous => None,
        }
    }
}

#[derive(Clone)]
pub struct SessionManager {
    auth: Arc<dyn AuthService>,
}

impl SessionManager {
    #[must_use]
    pub fn new(auth: Arc<dyn AuthService>) -> Self {
        Self { auth }
    }

    /// Verifies credentials and binds the session to the user.
    ///
    /// On failure the session is left exactly as it was.
    pub async fn login(
        &self,
        session: &Session,
        username: &str,
        password: &str,
    ) -> Result<CurrentUser, AuthError> {
        let user = self.auth.authenticate(username, password).await?;

        // New id on privilege change so a pre-login session id cannot be reused.
        session.cycle_id().await?;
        session.insert(USER_ID_KEY, user.id).await?;

        info!(user_id = user.id, "User {} logged in", user.username);
        Ok(CurrentUser::from(user))
    }

    /// Drops the identity and all other session data. Safe to call when anonymous.
    pub async fn logout(&self, session: &Session) -> Result<(), AuthError> {
        if let Some(user_id) = session.get::<i32>(USER_ID_KEY).await? {
            info!(user_id, "User logged out");
        }
        session.flush().await?;
        Ok(())
    }

    /// Resolves the identity stored in the session. Never fails: store errors,
    /// undecodable values and ids of users that no longer exist all yield
    /// [`Identity::Anonymous`].
    pub async fn restore(&self, session: &Session) -> Identity {
        let user_id = match session.get::<i32>(USER_ID_KEY).await {
            Ok(Some(id)) => id,
            Ok(None) => return Identity::Anonymous,
            Err(e) => {
                warn!("Failed to read session identity: {e}");
                return Identity::Anonymous;
            }
        };

        match self.auth.find_by_id(user_id).await {
            Ok(Some(user)) => Identity::Authenticated(CurrentUser::from(user)),
            Ok(None) => {
                debug!(user_id, "Session refers to a missing user, clearing it");
                if let Err(e) = session.remove::<i32>(USER_ID_KEY).await {
                    warn!("Failed to clear stale session identity: {e}");
                }
                Identity::Anonymous
            }
            Err(e) => {
                warn!(user_id, "Failed to load session user: {e}");
                Identity::Anonymous
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LoginThrottleConfig, SecurityConfig};
    use crate::db::Store;
    use crate::services::SeaOrmAuthService;
    use tower_sessions::MemoryStore;

    async fn manager() -> (SessionManager, Arc<dyn AuthService>) {
        let store = Store::new("sqlite::memory:").await.unwrap();
        let security = SecurityConfig {
            argon2_memory_cost_kib: 1024,
            argon2_time_cost: 1,
            argon2_parallelism: 1,
            min_password_length: 3,
            login_throttle: LoginThrottleConfig {
                enabled: false,
                ..LoginThrottleConfig::default()
            },
        };
        let auth: Arc<dyn AuthService> =
            Arc::new(SeaOrmAuthService::new(store, &security).unwrap());
        (SessionManager::new(auth.clone()), auth)
    }

    fn new_session() -> Session {
        Session::new(None, Arc::new(MemoryStore::default()), None)
    }

    #[tokio::test]
    async fn test_fresh_session_is_anonymous() {
        let (sessions, _) = manager().await;
        let session = new_session();

        assert_eq!(sessions.restore(&session).await, Identity::Anonymous);
    }

    #[tokio::test]
    async fn test_login_logout_cycle() {
        let (sessions, auth) = manager().await;
        let user = auth.register("alice", "pw1").await.unwrap();
        let session = new_session();

        let current = sessions.login(&session, "alice", "pw1").await.unwrap();
        assert_eq!(current.id, user.id);

        let identity = sessions.restore(&session).await;
        assert_eq!(identity.user().map(|u| u.username.as_str()), Some("alice"));

        sessions.logout(&session).await.unwrap();
        assert_eq!(sessions.restore(&session).await, Identity::Anonymous);

        // Idempotent.
        sessions.logout(&session).await.unwrap();
        assert_eq!(sessions.restore(&session).await, Identity::Anonymous);
    }

    #[tokio::test]
    async fn test_failed_login_stays_anonymous() {
        let (sessions, auth) = manager().await;
        auth.register("alice", "pw1").await.unwrap();
        let session = new_session();

        let err = sessions.login(&session, "alice", "wrong").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
        assert!(!sessions.restore(&session).await.is_authenticated());
    }

    #[tokio::test]
    async fn test_failed_login_keeps_existing_identity() {
        let (sessions, auth) = manager().await;
        auth.register("alice", "pw1").await.unwrap();
        auth.register("bob", "pw2").await.unwrap();
        let session = new_session();

        sessions.login(&session, "alice", "pw1").await.unwrap();
        assert!(sessions.login(&session, "bob", "wrong").await.is_err());

        let identity = sessions.restore(&session).await;
        assert_eq!(identity.user().map(|u| u.username.as_str()), Some("alice"));
    }

    #[tokio::test]
    async fn test_stale_user_id_restores_anonymous() {
        let (sessions, _) = manager().await;
        let session = new_session();
        session.insert(USER_ID_KEY, 4242).await.unwrap();

        assert_eq!(sessions.restore(&session).await, Identity::Anonymous);
        assert_eq!(session.get::<i32>(USER_ID_KEY).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_garbage_session_value_restores_anonymous() {
        let (sessions, _) = manager().await;
        let session = new_session();
        session.insert(USER_ID_KEY, "not-a-number").await.unwrap();

        assert_eq!(sessions.restore(&session).await, Identity::Anonymous);
    }
}
