//! Acting-user extractor.
//!
//! Authentication happens upstream; the gateway in front of this service
//! forwards the authenticated user id in the `X-User-Id` header. The
//! extractor only resolves that id against the user directory.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::app_state::AppState;
use crate::domain::{User, UserId};
use crate::error::ServiceError;

/// Header carrying the acting user's id.
pub const USER_ID_HEADER: &str = "x-user-id";

/// The user on whose behalf a request runs.
#[derive(Debug, Clone)]
pub struct Actor(pub User);

impl Actor {
    /// The acting user's id.
    #[must_use]
    pub fn id(&self) -> UserId {
        self.0.id
    }

    /// Requires the organizer or admin role.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Forbidden`] for participants.
    pub fn require_organizer(&self) -> Result<(), ServiceError> {
        if self.0.can_organize() {
            Ok(())
        } else {
            Err(ServiceError::Forbidden(
                "only organizers can manage events".to_string(),
            ))
        }
    }

    /// Requires ownership of `organizer_id`'s resources or the admin role.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Forbidden`] otherwise.
    pub fn require_manager_of(&self, organizer_id: UserId) -> Result<(), ServiceError> {
        if self.0.manages(organizer_id) {
            Ok(())
        } else {
            Err(ServiceError::Forbidden(
                "only the event organizer or an admin may do this".to_string(),
            ))
        }
    }

    /// Requires the admin role.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Forbidden`] otherwise.
    pub fn require_admin(&self) -> Result<(), ServiceError> {
        if self.0.is_admin() {
            Ok(())
        } else {
            Err(ServiceError::Forbidden("admin role required".to_string()))
        }
    }
}

impl FromRequestParts<AppState> for Actor {
    type Rejection = ServiceError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let raw = parts
            .headers
            .get(USER_ID_HEADER)
            .ok_or_else(|| ServiceError::Unauthorized("missing X-User-Id header".to_string()))?;
        let user_id = raw
            .to_str()
            .ok()
            .and_then(|s| s.trim().parse::<UserId>().ok())
            .ok_or_else(|| ServiceError::Unauthorized("malformed X-User-Id header".to_string()))?;

        match state.user_service.get_user(user_id).await {
            Ok(user) => Ok(Self(user)),
            Err(ServiceError::UserNotFound(_)) => Err(ServiceError::Unauthorized(format!(
                "unknown user {user_id}"
            ))),
            Err(e) => Err(e),
        }
    }
}
