//! Enrollment service: enroll, cancel, refund, and attendance.

use std::sync::Arc;

use chrono::Utc;

use super::log_rejection;
use crate::domain::{
    Enrollment, EnrollmentEvent, EnrollmentId, EventBus, EventId, Participant, RefundQueueEntry,
    StatusTransition, UserId,
};
use crate::error::ServiceError;
use crate::persistence::{EnrollmentStore, SeatChange};

/// Orchestration layer for the enrollment ledger.
///
/// The capacity and uniqueness invariants are enforced by the store inside
/// one unit of work per call; this layer adds logging and event emission.
/// Authorization (who may refund or mark attendance) is the caller's job.
#[derive(Debug, Clone)]
pub struct EnrollmentService {
    store: Arc<dyn EnrollmentStore>,
    event_bus: EventBus,
}

impl EnrollmentService {
    /// Creates a new `EnrollmentService`.
    #[must_use]
    pub fn new(store: Arc<dyn EnrollmentStore>, event_bus: EventBus) -> Self {
        Self { store, event_bus }
    }

    /// Returns a reference to the inner [`EventBus`].
    #[must_use]
    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }

    /// Enrolls `user_id` in `event_id`.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown event or user, `InvalidState` for an event
    /// that is not open, `DuplicateEnrollment` if any enrollment for the pair
    /// exists, `CapacityExceeded` if the event is full.
    pub async fn enroll(
        &self,
        event_id: EventId,
        user_id: UserId,
    ) -> Result<Enrollment, ServiceError> {
        let SeatChange { enrollment, event } = self
            .store
            .enroll(event_id, user_id, Utc::now())
            .await
            .inspect_err(|e| log_rejection("enroll", e))?;

        tracing::info!(
            %event_id,
            %user_id,
            enrollment_id = %enrollment.id,
            current_enrollments = event.current_enrollments,
            capacity = event.capacity,
            seats_remaining = event.seats_remaining(),
            "enrollment confirmed"
        );
        let _ = self.event_bus.publish(EnrollmentEvent::EnrollmentConfirmed {
            event_id,
            enrollment_id: enrollment.id,
            user_id,
            current_enrollments: event.current_enrollments,
            timestamp: enrollment.updated_at,
        });
        Ok(enrollment)
    }

    /// Cancels the user's enrollment and frees its seat.
    ///
    /// # Errors
    ///
    /// `NotFound` if the user holds no enrollment for the event,
    /// `AlreadyCancelled` if it was cancelled or refunded before,
    /// `InvalidState` if it is already marked attended.
    pub async fn cancel(
        &self,
        event_id: EventId,
        user_id: UserId,
    ) -> Result<Enrollment, ServiceError> {
        let SeatChange { enrollment, event } = self
            .store
            .cancel(event_id, user_id, Utc::now())
            .await
            .inspect_err(|e| log_rejection("cancel", e))?;

        tracing::info!(
            %event_id,
            %user_id,
            enrollment_id = %enrollment.id,
            current_enrollments = event.current_enrollments,
            "enrollment cancelled"
        );
        let _ = self.event_bus.publish(EnrollmentEvent::EnrollmentCancelled {
            event_id,
            enrollment_id: enrollment.id,
            user_id,
            current_enrollments: event.current_enrollments,
            timestamp: enrollment.updated_at,
        });
        Ok(enrollment)
    }

    /// Marks a cancelled enrollment as refunded. The seat count is untouched.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown enrollment, `InvalidState` unless it is
    /// `cancelled`.
    pub async fn refund(&self, enrollment_id: EnrollmentId) -> Result<Enrollment, ServiceError> {
        let enrollment = self
            .transition(enrollment_id, StatusTransition::Refund, "refund")
            .await?;
        tracing::info!(%enrollment_id, event_id = %enrollment.event_id, "enrollment refunded");
        let _ = self.event_bus.publish(EnrollmentEvent::EnrollmentRefunded {
            event_id: enrollment.event_id,
            enrollment_id,
            user_id: enrollment.user_id,
            timestamp: enrollment.updated_at,
        });
        Ok(enrollment)
    }

    /// Marks a confirmed enrollment as attended. The seat stays taken.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown enrollment, `InvalidState` unless it is
    /// `confirmed`.
    pub async fn mark_attended(
        &self,
        enrollment_id: EnrollmentId,
    ) -> Result<Enrollment, ServiceError> {
        let enrollment = self
            .transition(enrollment_id, StatusTransition::MarkAttended, "mark_attended")
            .await?;
        tracing::info!(%enrollment_id, event_id = %enrollment.event_id, "attendance marked");
        let _ = self.event_bus.publish(EnrollmentEvent::AttendanceMarked {
            event_id: enrollment.event_id,
            enrollment_id,
            user_id: enrollment.user_id,
            timestamp: enrollment.updated_at,
        });
        Ok(enrollment)
    }

    async fn transition(
        &self,
        enrollment_id: EnrollmentId,
        transition: StatusTransition,
        operation: &'static str,
    ) -> Result<Enrollment, ServiceError> {
        self.store
            .transition_enrollment(enrollment_id, transition, Utc::now())
            .await
            .map(|change| change.enrollment)
            .inspect_err(|e| log_rejection(operation, e))
    }

    /// Loads one enrollment.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown enrollment.
    pub async fn get_enrollment(
        &self,
        enrollment_id: EnrollmentId,
    ) -> Result<Enrollment, ServiceError> {
        tracing::debug!(%enrollment_id, "get enrollment");
        self.store.get_enrollment(enrollment_id).await
    }

    /// Lists every enrollment of an event with its user, oldest first.
    ///
    /// # Errors
    ///
    /// `NotFound` for an unknown event.
    pub async fn list_participants(
        &self,
        event_id: EventId,
    ) -> Result<Vec<Participant>, ServiceError> {
        tracing::debug!(%event_id, "list participants");
        self.store.list_participants(event_id).await
    }

    /// Lists cancelled enrollments awaiting refund across the organizer's
    /// events, grouped per event.
    ///
    /// # Errors
    ///
    /// Storage failures only.
    pub async fn list_refund_candidates(
        &self,
        organizer_id: UserId,
    ) -> Result<Vec<RefundQueueEntry>, ServiceError> {
        tracing::debug!(%organizer_id, "list refund candidates");
        self.store.list_refund_candidates(organizer_id).await
    }
}
