//! Read-side projections over the enrollment ledger.

use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use super::{Enrollment, EnrollmentId, EnrollmentStatus, Event, EventId, UserSummary};

/// One row of an event's participant list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Participant {
    /// Enrollment identifier.
    pub enrollment_id: EnrollmentId,
    /// Enrolled user.
    pub user: UserSummary,
    /// Enrollment status.
    pub status: EnrollmentStatus,
    /// When the user enrolled.
    pub enrollment_date: DateTime<Utc>,
}

/// A cancelled enrollment awaiting refund.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct RefundCandidate {
    /// The cancelled enrollment.
    pub enrollment: Enrollment,
    /// Its user.
    pub user: UserSummary,
}

/// Refund candidates of one event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct RefundQueueEntry {
    /// The event the candidates belong to.
    pub event: Event,
    /// Cancelled enrollments, oldest first.
    pub candidates: Vec<RefundCandidate>,
}

/// Outcome of recomputing an event's enrollment counter from the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
pub struct CounterReconciliation {
    /// Reconciled event.
    pub event_id: EventId,
    /// Stored counter before reconciliation.
    pub previous: u32,
    /// Seat-holding enrollments found in the ledger.
    pub current: u32,
}

impl CounterReconciliation {
    /// Returns `true` if the stored counter had drifted.
    #[must_use]
    pub const fn drifted(&self) -> bool {
        self.previous != self.current
    }
}
