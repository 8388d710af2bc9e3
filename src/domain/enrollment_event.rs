//! Domain events reflecting committed enrollment and event changes.
//!
//! Every successful mutation emits an [`EnrollmentEvent`] through the
//! [`super::EventBus`] after the store has committed it. Events are broadcast
//! to WebSocket subscribers.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::{EnrollmentId, EventId, UserId};

/// Domain event emitted after every committed mutation.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum EnrollmentEvent {
    /// A new event was published.
    EventCreated {
        /// Event identifier.
        event_id: EventId,
        /// Owning organizer.
        organizer_id: UserId,
        /// Seats offered.
        capacity: u32,
        /// Creation timestamp.
        timestamp: DateTime<Utc>,
    },

    /// Event details changed (capacity, status, sales gate, ...).
    EventUpdated {
        /// Event identifier.
        event_id: EventId,
        /// Capacity after the update.
        capacity: u32,
        /// Seats taken after the update.
        current_enrollments: u32,
        /// Whether sales are closed after the update.
        sales_closed: bool,
        /// Update timestamp.
        timestamp: DateTime<Utc>,
    },

    /// An event was deleted.
    EventDeleted {
        /// Event identifier.
        event_id: EventId,
        /// Deletion timestamp.
        timestamp: DateTime<Utc>,
    },

    /// A user took a seat.
    EnrollmentConfirmed {
        /// Event identifier.
        event_id: EventId,
        /// Enrollment identifier.
        enrollment_id: EnrollmentId,
        /// Enrolled user.
        user_id: UserId,
        /// Seats taken after the enrollment.
        current_enrollments: u32,
        /// Enrollment timestamp.
        timestamp: DateTime<Utc>,
    },

    /// A user gave back a seat.
    EnrollmentCancelled {
        /// Event identifier.
        event_id: EventId,
        /// Enrollment identifier.
        enrollment_id: EnrollmentId,
        /// User who cancelled.
        user_id: UserId,
        /// Seats taken after the cancellation.
        current_enrollments: u32,
        /// Cancellation timestamp.
        timestamp: DateTime<Utc>,
    },

    /// A cancelled enrollment was refunded.
    EnrollmentRefunded {
        /// Event identifier.
        event_id: EventId,
        /// Enrollment identifier.
        enrollment_id: EnrollmentId,
        /// Refunded user.
        user_id: UserId,
        /// Refund timestamp.
        timestamp: DateTime<Utc>,
    },

    /// A participant was marked as attended.
    AttendanceMarked {
        /// Event identifier.
        event_id: EventId,
        /// Enrollment identifier.
        enrollment_id: EnrollmentId,
        /// Attending user.
        user_id: UserId,
        /// Timestamp of the marking.
        timestamp: DateTime<Utc>,
    },
}

impl EnrollmentEvent {
    /// Returns the event ID this change belongs to.
    #[must_use]
    pub fn event_id(&self) -> EventId {
        match self {
            Self::EventCreated { event_id, .. }
            | Self::EventUpdated { event_id, .. }
            | Self::EventDeleted { event_id, .. }
            | Self::EnrollmentConfirmed { event_id, .. }
            | Self::EnrollmentCancelled { event_id, .. }
            | Self::EnrollmentRefunded { event_id, .. }
            | Self::AttendanceMarked { event_id, .. } => *event_id,
        }
    }

    /// Returns the event type as a static string slice.
    #[must_use]
    pub const fn event_type_str(&self) -> &'static str {
        match self {
            Self::EventCreated { .. } => "event_created",
            Self::EventUpdated { .. } => "event_updated",
            Self::EventDeleted { .. } => "event_deleted",
            Self::EnrollmentConfirmed { .. } => "enrollment_confirmed",
            Self::EnrollmentCancelled { .. } => "enrollment_cancelled",
            Self::EnrollmentRefunded { .. } => "enrollment_refunded",
            Self::AttendanceMarked { .. } => "attendance_marked",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tag_matches_event_type_str() {
        let event = EnrollmentEvent::EnrollmentConfirmed {
            event_id: EventId::new(),
            enrollment_id: EnrollmentId::new(),
            user_id: UserId::new(),
            current_enrollments: 3,
            timestamp: Utc::now(),
        };
        let json = serde_json::to_value(&event).unwrap_or_default();
        assert_eq!(
            json.get("event_type").and_then(|v| v.as_str()),
            Some(event.event_type_str())
        );
        assert_eq!(
            json.get("current_enrollments").and_then(|v| v.as_u64()),
            Some(3)
        );
    }

    #[test]
    fn event_id_accessor() {
        let id = EventId::new();
        let event = EnrollmentEvent::EventDeleted {
            event_id: id,
            timestamp: Utc::now(),
        };
        assert_eq!(event.event_id(), id);
    }
}
