//! Enrollment handlers: enroll, cancel, participants, attendance.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::actor::Actor;
use crate::api::dto::ParticipantListResponse;
use crate::app_state::AppState;
use crate::domain::{Enrollment, EnrollmentId, EventId};
use crate::error::{ErrorResponse, ServiceError};

/// `POST /events/{id}/enrollments` — Enroll the acting user.
///
/// # Errors
///
/// Returns [`ServiceError`] when a precondition fails; the first failing
/// check decides the error.
#[utoipa::path(
    post,
    path = "/api/v1/events/{id}/enrollments",
    tag = "Enrollments",
    summary = "Enroll in an event",
    description = "Claims one seat for the acting user. Checks run in order: event exists, event active, date not passed, sales open, no prior enrollment, seat available.",
    params(
        ("id" = uuid::Uuid, Path, description = "Event UUID"),
    ),
    responses(
        (status = 201, description = "Enrollment confirmed", body = Enrollment),
        (status = 404, description = "Event not found", body = ErrorResponse),
        (status = 409, description = "Duplicate enrollment or event full", body = ErrorResponse),
        (status = 422, description = "Event not open for enrollment", body = ErrorResponse),
    )
)]
pub async fn enroll(
    State(state): State<AppState>,
    actor: Actor,
    Path(event_id): Path<EventId>,
) -> Result<impl IntoResponse, ServiceError> {
    let enrollment = state
        .enrollment_service
        .enroll(event_id, actor.id())
        .await?;
    Ok((StatusCode::CREATED, Json(enrollment)))
}

/// `DELETE /events/{id}/enrollments` — Cancel the acting user's enrollment.
///
/// # Errors
///
/// Returns [`ServiceError`] if there is nothing to cancel.
#[utoipa::path(
    delete,
    path = "/api/v1/events/{id}/enrollments",
    tag = "Enrollments",
    summary = "Cancel an enrollment",
    description = "Cancels the acting user's enrollment and frees its seat. A cancelled enrollment waits in the organizer's refund queue.",
    params(
        ("id" = uuid::Uuid, Path, description = "Event UUID"),
    ),
    responses(
        (status = 200, description = "Enrollment cancelled", body = Enrollment),
        (status = 404, description = "No enrollment for this event", body = ErrorResponse),
        (status = 409, description = "Already cancelled", body = ErrorResponse),
        (status = 422, description = "Attendance already recorded", body = ErrorResponse),
    )
)]
pub async fn cancel(
    State(state): State<AppState>,
    actor: Actor,
    Path(event_id): Path<EventId>,
) -> Result<impl IntoResponse, ServiceError> {
    let enrollment = state
        .enrollment_service
        .cancel(event_id, actor.id())
        .await?;
    Ok(Json(enrollment))
}

/// `GET /events/{id}/participants` — List an event's enrollments.
///
/// # Errors
///
/// Returns [`ServiceError`] if the event is missing or the actor does not
/// manage it.
#[utoipa::path(
    get,
    path = "/api/v1/events/{id}/participants",
    tag = "Enrollments",
    summary = "List participants",
    description = "Every enrollment of the event in enrollment order, with user name and email.",
    params(
        ("id" = uuid::Uuid, Path, description = "Event UUID"),
    ),
    responses(
        (status = 200, description = "Participant list", body = ParticipantListResponse),
        (status = 403, description = "Actor does not manage the event", body = ErrorResponse),
        (status = 404, description = "Event not found", body = ErrorResponse),
    )
)]
pub async fn list_participants(
    State(state): State<AppState>,
    actor: Actor,
    Path(event_id): Path<EventId>,
) -> Result<impl IntoResponse, ServiceError> {
    let event = state.event_service.get_event(event_id).await?;
    actor.require_manager_of(event.organizer_id)?;
    let data = state
        .enrollment_service
        .list_participants(event_id)
        .await?;
    Ok(Json(ParticipantListResponse {
        event_id,
        total: data.len(),
        data,
    }))
}

/// `POST /enrollments/{id}/attendance` — Mark a participant as attended.
///
/// # Errors
///
/// Returns [`ServiceError`] if the enrollment is missing, not confirmed, or
/// the actor does not manage its event.
#[utoipa::path(
    post,
    path = "/api/v1/enrollments/{id}/attendance",
    tag = "Enrollments",
    summary = "Mark attendance",
    description = "Moves a confirmed enrollment to `attended`. The seat stays counted.",
    params(
        ("id" = uuid::Uuid, Path, description = "Enrollment UUID"),
    ),
    responses(
        (status = 200, description = "Enrollment marked attended", body = Enrollment),
        (status = 403, description = "Actor does not manage the event", body = ErrorResponse),
        (status = 404, description = "Enrollment not found", body = ErrorResponse),
        (status = 422, description = "Enrollment is not confirmed", body = ErrorResponse),
    )
)]
pub async fn mark_attended(
    State(state): State<AppState>,
    actor: Actor,
    Path(enrollment_id): Path<EnrollmentId>,
) -> Result<impl IntoResponse, ServiceError> {
    super::require_enrollment_manager(&state, &actor, enrollment_id).await?;
    let enrollment = state
        .enrollment_service
        .mark_attended(enrollment_id)
        .await?;
    Ok(Json(enrollment))
}

/// Enrollment routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/events/{id}/enrollments", post(enroll).delete(cancel))
        .route("/events/{id}/participants", get(list_participants))
        .route("/enrollments/{id}/attendance", post(mark_attended))
}
