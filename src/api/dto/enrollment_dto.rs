//! Enrollment view DTOs.

use serde::Serialize;
use utoipa::ToSchema;

use crate::domain::{EventId, Participant, RefundQueueEntry, UserId};

/// Response body for `GET /events/{id}/participants`.
#[derive(Debug, Serialize, ToSchema)]
pub struct ParticipantListResponse {
    /// Event the list belongs to.
    pub event_id: EventId,
    /// Every enrollment of the event, oldest first.
    pub data: Vec<Participant>,
    /// Number of rows.
    pub total: usize,
}

/// Response body for `GET /organizers/{id}/refunds`.
#[derive(Debug, Serialize, ToSchema)]
pub struct RefundQueueResponse {
    /// Organizer whose events are listed.
    pub organizer_id: UserId,
    /// Events with cancelled enrollments, ordered by start date.
    pub data: Vec<RefundQueueEntry>,
    /// Number of candidates across all events.
    pub total_candidates: usize,
}

impl RefundQueueResponse {
    /// Wraps a refund queue.
    #[must_use]
    pub fn new(organizer_id: UserId, data: Vec<RefundQueueEntry>) -> Self {
        let total_candidates = data.iter().map(|e| e.candidates.len()).sum();
        Self {
            organizer_id,
            data,
            total_candidates,
        }
    }
}
