//! Refund workflow handlers: the organizer's queue and the refund action.

use axum::extract::{Path, State};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::actor::Actor;
use crate::api::dto::RefundQueueResponse;
use crate::app_state::AppState;
use crate::domain::{Enrollment, EnrollmentId, UserId};
use crate::error::{ErrorResponse, ServiceError};

/// `POST /enrollments/{id}/refund` — Refund a cancelled enrollment.
///
/// # Errors
///
/// Returns [`ServiceError`] if the enrollment is missing, not cancelled, or
/// the actor does not manage its event.
#[utoipa::path(
    post,
    path = "/api/v1/enrollments/{id}/refund",
    tag = "Refunds",
    summary = "Refund an enrollment",
    description = "Moves a cancelled enrollment to the terminal `refunded` status. Only the event organizer or an admin may refund.",
    params(
        ("id" = uuid::Uuid, Path, description = "Enrollment UUID"),
    ),
    responses(
        (status = 200, description = "Enrollment refunded", body = Enrollment),
        (status = 403, description = "Actor does not manage the event", body = ErrorResponse),
        (status = 404, description = "Enrollment not found", body = ErrorResponse),
        (status = 422, description = "Enrollment is not cancelled", body = ErrorResponse),
    )
)]
pub async fn refund(
    State(state): State<AppState>,
    actor: Actor,
    Path(enrollment_id): Path<EnrollmentId>,
) -> Result<impl IntoResponse, ServiceError> {
    super::require_enrollment_manager(&state, &actor, enrollment_id).await?;
    let enrollment = state.enrollment_service.refund(enrollment_id).await?;
    Ok(Json(enrollment))
}

/// `GET /organizers/{id}/refunds` — Cancelled enrollments awaiting refund.
///
/// # Errors
///
/// Returns [`ServiceError::Forbidden`] unless the actor is that organizer
/// or an admin.
#[utoipa::path(
    get,
    path = "/api/v1/organizers/{id}/refunds",
    tag = "Refunds",
    summary = "Refund queue",
    description = "Cancelled enrollments across the organizer's events, grouped per event and ordered by event date.",
    params(
        ("id" = uuid::Uuid, Path, description = "Organizer UUID"),
    ),
    responses(
        (status = 200, description = "Refund queue", body = RefundQueueResponse),
        (status = 403, description = "Not this organizer", body = ErrorResponse),
    )
)]
pub async fn refund_queue(
    State(state): State<AppState>,
    actor: Actor,
    Path(organizer_id): Path<UserId>,
) -> Result<impl IntoResponse, ServiceError> {
    actor.require_manager_of(organizer_id)?;
    let data = state
        .enrollment_service
        .list_refund_candidates(organizer_id)
        .await?;
    Ok(Json(RefundQueueResponse::new(organizer_id, data)))
}

/// Refund routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/enrollments/{id}/refund", post(refund))
        .route("/organizers/{id}/refunds", get(refund_queue))
}
