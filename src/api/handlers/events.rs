//! Event management handlers: create, list, get, update, delete, reconcile.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::actor::Actor;
use crate::api::dto::{EventListQuery, EventListResponse};
use crate::app_state::AppState;
use crate::domain::{CounterReconciliation, Event, EventId, EventPatch, NewEvent};
use crate::error::{ErrorResponse, ServiceError};

/// `POST /events` — Create an event owned by the acting organizer.
///
/// # Errors
///
/// Returns [`ServiceError`] on invalid input or insufficient role.
#[utoipa::path(
    post,
    path = "/api/v1/events",
    tag = "Events",
    summary = "Create an event",
    description = "Creates an `active` event with no enrollments. The acting user (`X-User-Id`) must be an organizer or admin and becomes the owner.",
    request_body = NewEvent,
    responses(
        (status = 201, description = "Event created", body = Event),
        (status = 400, description = "Invalid title or capacity", body = ErrorResponse),
        (status = 401, description = "Unknown actor", body = ErrorResponse),
        (status = 403, description = "Actor is not an organizer", body = ErrorResponse),
    )
)]
pub async fn create_event(
    State(state): State<AppState>,
    actor: Actor,
    Json(req): Json<NewEvent>,
) -> Result<impl IntoResponse, ServiceError> {
    actor.require_organizer()?;
    let event = state.event_service.create_event(actor.id(), req).await?;
    Ok((StatusCode::CREATED, Json(event)))
}

/// `GET /events` — List events.
///
/// # Errors
///
/// Returns [`ServiceError`] on storage failure.
#[utoipa::path(
    get,
    path = "/api/v1/events",
    tag = "Events",
    summary = "List events",
    description = "Lists events ordered by start date, optionally filtered by status and organizer.",
    params(EventListQuery),
    responses(
        (status = 200, description = "Event list", body = EventListResponse),
    )
)]
pub async fn list_events(
    State(state): State<AppState>,
    Query(query): Query<EventListQuery>,
) -> Result<impl IntoResponse, ServiceError> {
    let events = state.event_service.list_events(query.into()).await?;
    Ok(Json(EventListResponse::from(events)))
}

/// `GET /events/{id}` — Get event details.
///
/// # Errors
///
/// Returns [`ServiceError::EventNotFound`] if the event does not exist.
#[utoipa::path(
    get,
    path = "/api/v1/events/{id}",
    tag = "Events",
    summary = "Get an event",
    params(
        ("id" = uuid::Uuid, Path, description = "Event UUID"),
    ),
    responses(
        (status = 200, description = "Event details", body = Event),
        (status = 404, description = "Event not found", body = ErrorResponse),
    )
)]
pub async fn get_event(
    State(state): State<AppState>,
    Path(id): Path<EventId>,
) -> Result<impl IntoResponse, ServiceError> {
    let event = state.event_service.get_event(id).await?;
    Ok(Json(event))
}

/// `PATCH /events/{id}` — Update an event.
///
/// # Errors
///
/// Returns [`ServiceError`] if the event is missing, the actor does not
/// manage it, or the patch is rejected.
#[utoipa::path(
    patch,
    path = "/api/v1/events/{id}",
    tag = "Events",
    summary = "Update an event",
    description = "Applies a partial update. Capacity may not drop below the seats already taken; the enrollment counter is never writable.",
    params(
        ("id" = uuid::Uuid, Path, description = "Event UUID"),
    ),
    request_body = EventPatch,
    responses(
        (status = 200, description = "Updated event", body = Event),
        (status = 400, description = "Invalid patch", body = ErrorResponse),
        (status = 403, description = "Actor does not manage the event", body = ErrorResponse),
        (status = 404, description = "Event not found", body = ErrorResponse),
    )
)]
pub async fn update_event(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<EventId>,
    Json(patch): Json<EventPatch>,
) -> Result<impl IntoResponse, ServiceError> {
    let event = state.event_service.get_event(id).await?;
    actor.require_manager_of(event.organizer_id)?;
    let event = state.event_service.update_event(id, patch).await?;
    Ok(Json(event))
}

/// `DELETE /events/{id}` — Delete an event.
///
/// # Errors
///
/// Returns [`ServiceError::Conflict`] while enrollments other than refunded
/// ones exist.
#[utoipa::path(
    delete,
    path = "/api/v1/events/{id}",
    tag = "Events",
    summary = "Delete an event",
    params(
        ("id" = uuid::Uuid, Path, description = "Event UUID"),
    ),
    responses(
        (status = 204, description = "Event deleted"),
        (status = 403, description = "Actor does not manage the event", body = ErrorResponse),
        (status = 404, description = "Event not found", body = ErrorResponse),
        (status = 409, description = "Event still has enrollments", body = ErrorResponse),
    )
)]
pub async fn delete_event(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<EventId>,
) -> Result<impl IntoResponse, ServiceError> {
    let event = state.event_service.get_event(id).await?;
    actor.require_manager_of(event.organizer_id)?;
    state.event_service.delete_event(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `POST /events/{id}/reconcile` — Recompute the enrollment counter.
///
/// # Errors
///
/// Returns [`ServiceError`] if the event is missing or the actor is not an
/// admin.
#[utoipa::path(
    post,
    path = "/api/v1/events/{id}/reconcile",
    tag = "Events",
    summary = "Reconcile the enrollment counter",
    description = "Admin repair tool: recounts confirmed and attended enrollments and overwrites the stored counter if it drifted.",
    params(
        ("id" = uuid::Uuid, Path, description = "Event UUID"),
    ),
    responses(
        (status = 200, description = "Counter before and after", body = CounterReconciliation),
        (status = 403, description = "Admin role required", body = ErrorResponse),
        (status = 404, description = "Event not found", body = ErrorResponse),
    )
)]
pub async fn reconcile_event(
    State(state): State<AppState>,
    actor: Actor,
    Path(id): Path<EventId>,
) -> Result<impl IntoResponse, ServiceError> {
    actor.require_admin()?;
    let outcome = state.event_service.reconcile_counter(id).await?;
    Ok(Json(outcome))
}

/// Event routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/events", post(create_event).get(list_events))
        .route(
            "/events/{id}",
            get(get_event).patch(update_event).delete(delete_event),
        )
        .route("/events/{id}/reconcile", post(reconcile_event))
}
