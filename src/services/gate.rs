//! Access gate for operations that mutate user-owned resources.

use crate::services::auth_service::AuthError;
use crate::services::session::{CurrentUser, Identity};

/// Passes through the authenticated user or fails with [`AuthError::Unauthorized`].
pub fn require(identity: &Identity) -> Result<&CurrentUser, AuthError> {
    identity.user().ok_or(AuthError::Unauthorized)
}
