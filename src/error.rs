//! Service error types with HTTP status code mapping.
//!
//! [`ServiceError`] is the central error type. Every variant belongs to one
//! [`ErrorKind`] classification, and every kind maps to a specific HTTP status
//! code and structured JSON error response.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{EnrollmentId, EnrollmentStatus, EventId, EventStatus, StatusTransition, UserId};

/// Structured JSON error response body.
///
/// All error responses follow this shape:
/// ```json
/// {
///   "error": {
///     "code": 4001,
///     "kind": "capacity_exceeded",
///     "message": "event 6f1c... is full (capacity 20)",
///     "details": null
///   }
/// }
/// ```
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Structured error payload.
    pub error: ErrorBody,
}

/// Inner error body with numeric code, classification, and message.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorBody {
    /// Numeric error code (see the table on [`ServiceError`]).
    pub code: u32,
    /// Machine-readable error classification.
    pub kind: ErrorKind,
    /// Human-readable error message.
    pub message: String,
    /// Optional additional details.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

/// Caller-facing classification of a failure.
///
/// Enrollment operations only ever fail with `NotFound`, `InvalidState`,
/// `DuplicateEnrollment`, `CapacityExceeded`, or `AlreadyCancelled`; the
/// remaining kinds belong to the surrounding API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    /// Event, enrollment, or user is absent.
    NotFound,
    /// The target is in a state that does not allow the operation.
    InvalidState,
    /// An enrollment already exists for the (user, event) pair.
    DuplicateEnrollment,
    /// The event has no seats left.
    CapacityExceeded,
    /// The enrollment was already cancelled.
    AlreadyCancelled,
    /// Malformed or out-of-range input.
    Validation,
    /// A uniqueness or dependency conflict outside enrollment.
    Conflict,
    /// The caller could not be identified.
    Unauthorized,
    /// The caller is not allowed to perform the operation.
    Forbidden,
    /// Storage or internal failure.
    Internal,
}

/// Server-side error enum with HTTP status code mapping.
///
/// # Error Code Ranges
///
/// | Range     | Category              | HTTP Status                     |
/// |-----------|-----------------------|---------------------------------|
/// | 1000–1999 | Validation / Auth     | 400 / 401 / 403                 |
/// | 2000–2999 | Not Found             | 404 Not Found                   |
/// | 3000–3999 | Server                | 500 Internal Server Error       |
/// | 4000–4999 | Enrollment conflicts  | 409 Conflict / 422 Unprocessable |
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    /// Event with the given ID was not found.
    #[error("event not found: {0}")]
    EventNotFound(EventId),

    /// User with the given ID was not found.
    #[error("user not found: {0}")]
    UserNotFound(UserId),

    /// Enrollment with the given ID was not found.
    #[error("enrollment not found: {0}")]
    EnrollmentNotFound(EnrollmentId),

    /// The user holds no enrollment for the event.
    #[error("user {user_id} is not enrolled in event {event_id}")]
    NotEnrolled {
        /// Target event.
        event_id: EventId,
        /// User without an enrollment.
        user_id: UserId,
    },

    /// The event is cancelled or completed.
    #[error("event {event_id} is not open for enrollment (status {status})")]
    EventNotActive {
        /// Target event.
        event_id: EventId,
        /// Current event status.
        status: EventStatus,
    },

    /// The event date has already passed.
    #[error("event {0} has already taken place")]
    EventInPast(EventId),

    /// The organizer closed sales for the event.
    #[error("sales are closed for event {0}")]
    SalesClosed(EventId),

    /// The user already holds a live enrollment for the event.
    #[error("user {user_id} is already enrolled in event {event_id}")]
    AlreadyEnrolled {
        /// Target event.
        event_id: EventId,
        /// Enrolled user.
        user_id: UserId,
    },

    /// The user's enrollment was cancelled earlier; only the organizer can help.
    #[error(
        "enrollment of user {user_id} in event {event_id} was cancelled; contact the organizer to re-enroll"
    )]
    EnrollmentPreviouslyCancelled {
        /// Target event.
        event_id: EventId,
        /// User with the cancelled enrollment.
        user_id: UserId,
    },

    /// The event is full.
    #[error("event {event_id} is full (capacity {capacity})")]
    CapacityExceeded {
        /// Target event.
        event_id: EventId,
        /// Configured capacity.
        capacity: u32,
    },

    /// The enrollment was already cancelled (or refunded).
    #[error("enrollment {0} is already cancelled")]
    AlreadyCancelled(EnrollmentId),

    /// The requested status transition is not allowed from the current status.
    #[error("cannot {transition} enrollment {enrollment_id} in status {from}")]
    InvalidTransition {
        /// Target enrollment.
        enrollment_id: EnrollmentId,
        /// Status the enrollment is in.
        from: EnrollmentStatus,
        /// Rejected transition.
        transition: StatusTransition,
    },

    /// Request validation failed.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A uniqueness or dependency conflict.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The acting user could not be identified.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The acting user may not perform the operation.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// Persistence layer failure.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ServiceError {
    /// Returns the caller-facing classification of this error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::EventNotFound(_)
            | Self::UserNotFound(_)
            | Self::EnrollmentNotFound(_)
            | Self::NotEnrolled { .. } => ErrorKind::NotFound,
            Self::EventNotActive { .. }
            | Self::EventInPast(_)
            | Self::SalesClosed(_)
            | Self::InvalidTransition { .. } => ErrorKind::InvalidState,
            Self::AlreadyEnrolled { .. } | Self::EnrollmentPreviouslyCancelled { .. } => {
                ErrorKind::DuplicateEnrollment
            }
            Self::CapacityExceeded { .. } => ErrorKind::CapacityExceeded,
            Self::AlreadyCancelled(_) => ErrorKind::AlreadyCancelled,
            Self::InvalidRequest(_) => ErrorKind::Validation,
            Self::Conflict(_) => ErrorKind::Conflict,
            Self::Unauthorized(_) => ErrorKind::Unauthorized,
            Self::Forbidden(_) => ErrorKind::Forbidden,
            Self::Persistence(_) | Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Returns the numeric error code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidRequest(_) => 1001,
            Self::Unauthorized(_) => 1401,
            Self::Forbidden(_) => 1403,
            Self::EventNotFound(_) => 2001,
            Self::EnrollmentNotFound(_) => 2002,
            Self::NotEnrolled { .. } => 2003,
            Self::UserNotFound(_) => 2004,
            Self::Internal(_) => 3000,
            Self::Persistence(_) => 3001,
            Self::CapacityExceeded { .. } => 4001,
            Self::AlreadyEnrolled { .. } => 4002,
            Self::EnrollmentPreviouslyCancelled { .. } => 4003,
            Self::AlreadyCancelled(_) => 4004,
            Self::EventNotActive { .. } => 4101,
            Self::EventInPast(_) => 4102,
            Self::SalesClosed(_) => 4103,
            Self::InvalidTransition { .. } => 4104,
            Self::Conflict(_) => 4200,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self.kind() {
            ErrorKind::NotFound => StatusCode::NOT_FOUND,
            ErrorKind::DuplicateEnrollment
            | ErrorKind::CapacityExceeded
            | ErrorKind::AlreadyCancelled
            | ErrorKind::Conflict => StatusCode::CONFLICT,
            ErrorKind::InvalidState => StatusCode::UNPROCESSABLE_ENTITY,
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::Unauthorized => StatusCode::UNAUTHORIZED,
            ErrorKind::Forbidden => StatusCode::FORBIDDEN,
            ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<sqlx::Error> for ServiceError {
    fn from(err: sqlx::Error) -> Self {
        Self::Persistence(err.to_string())
    }
}

impl IntoResponse for ServiceError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        // Storage failures are logged in full but not echoed to clients.
        let message = if self.kind() == ErrorKind::Internal {
            tracing::error!(error = %self, "request failed");
            "internal server error".to_string()
        } else {
            self.to_string()
        };
        let body = ErrorResponse {
            error: ErrorBody {
                code: self.error_code(),
                kind: self.kind(),
                message,
                details: None,
            },
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}
