//! Persistence layer: the event store, enrollment ledger, and user directory.
//!
//! [`EnrollmentStore`] is the seam between the services and storage. Each
//! state-changing method is one atomic unit of work: it either applies all
//! of its writes or none of them. Two backends implement it:
//!
//! - [`memory::MemoryStore`]: in-process maps; a per-event mutex serializes
//!   the check-and-update of an event and its enrollments.
//! - [`postgres::PostgresStore`]: `sqlx` transactions with a row lock on
//!   the event and a conditional counter update.

pub mod memory;
pub mod models;
pub mod postgres;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{
    CounterReconciliation, Enrollment, EnrollmentId, Event, EventFilter, EventId, EventPatch,
    Participant, RefundQueueEntry, StatusTransition, User, UserId,
};
use crate::error::ServiceError;

pub use memory::MemoryStore;
pub use postgres::PostgresStore;

/// Result alias for store operations.
pub type StoreResult<T> = Result<T, ServiceError>;

/// An enrollment together with its event as committed by the same unit of work.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeatChange {
    /// The enrollment after the change.
    pub enrollment: Enrollment,
    /// The event after the change (carries the new `current_enrollments`).
    pub event: Event,
}

/// Storage backend for events, enrollments, and users.
///
/// # Invariants every backend upholds
///
/// - `0 <= current_enrollments <= capacity` after every commit.
/// - `current_enrollments` equals the number of `confirmed` + `attended`
///   enrollments of the event.
/// - At most one enrollment per (user, event).
/// - A failed operation leaves events and enrollments unchanged.
#[async_trait]
pub trait EnrollmentStore: Send + Sync + std::fmt::Debug {
    /// Inserts a user.
    ///
    /// # Errors
    ///
    /// [`ServiceError::Conflict`] if the email is already registered.
    async fn create_user(&self, user: User) -> StoreResult<User>;

    /// Loads a user.
    ///
    /// # Errors
    ///
    /// [`ServiceError::UserNotFound`] if absent.
    async fn get_user(&self, user_id: UserId) -> StoreResult<User>;

    /// Inserts an event.
    ///
    /// # Errors
    ///
    /// [`ServiceError::Persistence`] on storage failure.
    async fn create_event(&self, event: Event) -> StoreResult<Event>;

    /// Loads an event.
    ///
    /// # Errors
    ///
    /// [`ServiceError::EventNotFound`] if absent.
    async fn get_event(&self, event_id: EventId) -> StoreResult<Event>;

    /// Lists events matching `filter`, ordered by start date.
    ///
    /// # Errors
    ///
    /// [`ServiceError::Persistence`] on storage failure.
    async fn list_events(&self, filter: EventFilter) -> StoreResult<Vec<Event>>;

    /// Applies an organizer patch atomically with respect to enrollments.
    ///
    /// # Errors
    ///
    /// [`ServiceError::EventNotFound`] if absent, or
    /// [`ServiceError::InvalidRequest`] if the patch is rejected.
    async fn update_event(
        &self,
        event_id: EventId,
        patch: EventPatch,
        now: DateTime<Utc>,
    ) -> StoreResult<Event>;

    /// Deletes an event together with its refunded history.
    ///
    /// # Errors
    ///
    /// [`ServiceError::EventNotFound`] if absent, or
    /// [`ServiceError::Conflict`] while confirmed, attended, or cancelled
    /// enrollments still reference it.
    async fn delete_event(&self, event_id: EventId) -> StoreResult<()>;

    /// Recomputes `current_enrollments` from the ledger.
    ///
    /// # Errors
    ///
    /// [`ServiceError::EventNotFound`] if absent.
    async fn reconcile_counter(
        &self,
        event_id: EventId,
        now: DateTime<Utc>,
    ) -> StoreResult<CounterReconciliation>;

    /// Enrolls `user_id` in `event_id`, claiming one seat.
    ///
    /// # Errors
    ///
    /// The first failing precondition of [`Event::admit`], or
    /// [`ServiceError::EventNotFound`].
    async fn enroll(
        &self,
        event_id: EventId,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> StoreResult<SeatChange>;

    /// Cancels the user's enrollment in the event, releasing its seat.
    ///
    /// # Errors
    ///
    /// [`ServiceError::NotEnrolled`], [`ServiceError::AlreadyCancelled`], or
    /// [`ServiceError::InvalidTransition`] for attended enrollments.
    async fn cancel(
        &self,
        event_id: EventId,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> StoreResult<SeatChange>;

    /// Applies a status transition to an enrollment addressed by id,
    /// adjusting the counter if the seat is given up.
    ///
    /// # Errors
    ///
    /// [`ServiceError::EnrollmentNotFound`] or the rejection from
    /// [`crate::domain::EnrollmentStatus::apply`].
    async fn transition_enrollment(
        &self,
        enrollment_id: EnrollmentId,
        transition: StatusTransition,
        now: DateTime<Utc>,
    ) -> StoreResult<SeatChange>;

    /// Loads an enrollment.
    ///
    /// # Errors
    ///
    /// [`ServiceError::EnrollmentNotFound`] if absent.
    async fn get_enrollment(&self, enrollment_id: EnrollmentId) -> StoreResult<Enrollment>;

    /// Lists every enrollment of an event with its user, oldest first.
    ///
    /// # Errors
    ///
    /// [`ServiceError::EventNotFound`] if absent.
    async fn list_participants(&self, event_id: EventId) -> StoreResult<Vec<Participant>>;

    /// Lists cancelled enrollments across the organizer's events, grouped
    /// per event and ordered by start date.
    ///
    /// # Errors
    ///
    /// [`ServiceError::Persistence`] on storage failure.
    async fn list_refund_candidates(
        &self,
        organizer_id: UserId,
    ) -> StoreResult<Vec<RefundQueueEntry>>;

    /// Verifies the backend is reachable.
    ///
    /// # Errors
    ///
    /// [`ServiceError::Persistence`] if it is not.
    async fn health_check(&self) -> StoreResult<()>;

    /// Short backend name for health output.
    fn backend_name(&self) -> &'static str;
}
