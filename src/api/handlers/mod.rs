//! REST endpoint handlers organized by resource.

pub mod enrollments;
pub mod events;
pub mod refunds;
pub mod system;
pub mod users;

use axum::Router;

use crate::api::actor::Actor;
use crate::app_state::AppState;
use crate::domain::EnrollmentId;
use crate::error::ServiceError;

/// Composes all resource routes under `/api/v1`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(users::routes())
        .merge(events::routes())
        .merge(enrollments::routes())
        .merge(refunds::routes())
}

/// Checks that `actor` manages the event an enrollment belongs to.
async fn require_enrollment_manager(
    state: &AppState,
    actor: &Actor,
    enrollment_id: EnrollmentId,
) -> Result<(), ServiceError> {
    let enrollment = state
        .enrollment_service
        .get_enrollment(enrollment_id)
        .await?;
    let event = state.event_service.get_event(enrollment.event_id).await?;
    actor.require_manager_of(event.organizer_id)
}
