//! OpenAPI document aggregating every REST route and schema.

use utoipa::OpenApi;

use crate::api::dto::{EventListResponse, ParticipantListResponse, RefundQueueResponse};
use crate::api::handlers::{enrollments, events, refunds, system, users};
use crate::domain::{
    CounterReconciliation, Enrollment, EnrollmentStatus, Event, EventPatch, EventStatus, NewEvent,
    NewUser, Participant, RefundCandidate, RefundQueueEntry, Role, User, UserSummary,
};
use crate::error::{ErrorBody, ErrorKind, ErrorResponse};

/// The service's OpenAPI document, served by Swagger UI at `/docs`.
#[derive(Debug, OpenApi)]
#[openapi(
    info(
        title = "eventflow",
        description = "Event enrollment and capacity accounting API. Mutating routes identify the acting user with the `X-User-Id` header."
    ),
    paths(
        system::health_handler,
        users::create_user,
        users::get_user,
        events::create_event,
        events::list_events,
        events::get_event,
        events::update_event,
        events::delete_event,
        events::reconcile_event,
        enrollments::enroll,
        enrollments::cancel,
        enrollments::list_participants,
        enrollments::mark_attended,
        refunds::refund,
        refunds::refund_queue,
    ),
    components(schemas(
        system::HealthResponse,
        ErrorResponse,
        ErrorBody,
        ErrorKind,
        User,
        NewUser,
        Role,
        UserSummary,
        Event,
        NewEvent,
        EventPatch,
        EventStatus,
        EventListResponse,
        Enrollment,
        EnrollmentStatus,
        Participant,
        ParticipantListResponse,
        RefundCandidate,
        RefundQueueEntry,
        RefundQueueResponse,
        CounterReconciliation,
    )),
    tags(
        (name = "System", description = "Health"),
        (name = "Users", description = "User directory"),
        (name = "Events", description = "Event management"),
        (name = "Enrollments", description = "Enrollment and attendance"),
        (name = "Refunds", description = "Refund workflow"),
    )
)]
pub struct ApiDoc;
