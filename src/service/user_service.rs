//! User directory service.

use std::sync::Arc;

use chrono::Utc;

use super::log_rejection;
use crate::domain::{NewUser, User, UserId};
use crate::error::ServiceError;
use crate::persistence::EnrollmentStore;

/// Registers and resolves users.
#[derive(Debug, Clone)]
pub struct UserService {
    store: Arc<dyn EnrollmentStore>,
}

impl UserService {
    /// Creates a new `UserService`.
    #[must_use]
    pub fn new(store: Arc<dyn EnrollmentStore>) -> Self {
        Self { store }
    }

    /// Registers a user.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::InvalidRequest`] on bad input and
    /// [`ServiceError::Conflict`] if the email is taken.
    pub async fn create_user(&self, spec: NewUser) -> Result<User, ServiceError> {
        spec.validate()?;
        let user = self
            .store
            .create_user(User::new(spec, Utc::now()))
            .await
            .inspect_err(|e| log_rejection("create_user", e))?;
        tracing::info!(user_id = %user.id, role = %user.role, "user registered");
        Ok(user)
    }

    /// Loads a user.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::UserNotFound`] if absent.
    pub async fn get_user(&self, user_id: UserId) -> Result<User, ServiceError> {
        self.store.get_user(user_id).await
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::Role;
    use crate::error::ErrorKind;
    use crate::persistence::MemoryStore;

    #[tokio::test]
    async fn register_and_resolve() {
        let service = UserService::new(Arc::new(MemoryStore::new()));
        let spec = NewUser {
            name: "Lin".to_string(),
            email: "LIN@example.org".to_string(),
            role: Role::Admin,
        };
        let Ok(user) = service.create_user(spec.clone()).await else {
            panic!("registration failed");
        };
        assert_eq!(user.email, "lin@example.org");

        let Ok(found) = service.get_user(user.id).await else {
            panic!("lookup failed");
        };
        assert_eq!(found, user);

        let Err(err) = service.create_user(spec).await else {
            panic!("duplicate email accepted");
        };
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn rejects_malformed_input() {
        let service = UserService::new(Arc::new(MemoryStore::new()));
        let spec = NewUser {
            name: "Lin".to_string(),
            email: "not-an-email".to_string(),
            role: Role::Participant,
        };
        let Err(err) = service.create_user(spec).await else {
            panic!("bad email accepted");
        };
        assert_eq!(err.kind(), ErrorKind::Validation);
    }
}
