//! Enrollment records and their status machine.
//!
//! ```text
//! confirmed ──cancel──▶ cancelled ──refund──▶ refunded
//!     │
//!     └──mark_attended──▶ attended
//! ```
//!
//! There are no back-transitions. `refunded` and `attended` are terminal.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::{EnrollmentId, EventId, UserId};
use crate::error::ServiceError;

/// Lifecycle status of an [`Enrollment`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum EnrollmentStatus {
    /// Seat held by the participant.
    Confirmed,
    /// Participant withdrew; awaiting refund acknowledgement.
    Cancelled,
    /// Participant showed up. Still occupies a seat.
    Attended,
    /// Cancellation refunded by the organizer.
    Refunded,
}

/// A status change requested on an enrollment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum StatusTransition {
    /// `confirmed → cancelled`.
    Cancel,
    /// `cancelled → refunded`.
    Refund,
    /// `confirmed → attended`.
    MarkAttended,
}

impl EnrollmentStatus {
    /// Returns the lowercase storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
            Self::Attended => "attended",
            Self::Refunded => "refunded",
        }
    }

    /// Returns `true` if an enrollment in this status counts toward the
    /// event's `current_enrollments`.
    #[must_use]
    pub const fn occupies_seat(self) -> bool {
        match self {
            Self::Confirmed | Self::Attended => true,
            Self::Cancelled | Self::Refunded => false,
        }
    }

    /// Returns `true` if the enrollment was withdrawn (cancelled or refunded).
    #[must_use]
    pub const fn is_withdrawn(self) -> bool {
        match self {
            Self::Cancelled | Self::Refunded => true,
            Self::Confirmed | Self::Attended => false,
        }
    }

    /// Computes the status that results from `transition`.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::AlreadyCancelled`] when cancelling a withdrawn
    /// enrollment and [`ServiceError::InvalidTransition`] for every other
    /// transition the status machine does not allow.
    pub fn apply(
        self,
        transition: StatusTransition,
        enrollment_id: EnrollmentId,
    ) -> Result<Self, ServiceError> {
        match (self, transition) {
            (Self::Confirmed, StatusTransition::Cancel) => Ok(Self::Cancelled),
            (Self::Confirmed, StatusTransition::MarkAttended) => Ok(Self::Attended),
            (Self::Cancelled, StatusTransition::Refund) => Ok(Self::Refunded),
            (Self::Cancelled | Self::Refunded, StatusTransition::Cancel) => {
                Err(ServiceError::AlreadyCancelled(enrollment_id))
            }
            (Self::Attended, StatusTransition::Cancel)
            | (
                Self::Confirmed | Self::Attended | Self::Refunded,
                StatusTransition::Refund,
            )
            | (
                Self::Cancelled | Self::Attended | Self::Refunded,
                StatusTransition::MarkAttended,
            ) => Err(ServiceError::InvalidTransition {
                enrollment_id,
                from: self,
                transition,
            }),
        }
    }
}

impl fmt::Display for EnrollmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EnrollmentStatus {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "confirmed" => Ok(Self::Confirmed),
            "cancelled" => Ok(Self::Cancelled),
            "attended" => Ok(Self::Attended),
            "refunded" => Ok(Self::Refunded),
            other => Err(ServiceError::Internal(format!(
                "unknown enrollment status: {other}"
            ))),
        }
    }
}

impl fmt::Display for StatusTransition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Cancel => "cancel",
            Self::Refund => "refund",
            Self::MarkAttended => "mark attendance for",
        })
    }
}

/// One user's enrollment in one event.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Enrollment {
    /// Enrollment identifier.
    pub id: EnrollmentId,
    /// Enrolled user.
    pub user_id: UserId,
    /// Target event.
    pub event_id: EventId,
    /// Current lifecycle status.
    pub status: EnrollmentStatus,
    /// When the enrollment was created.
    pub enrolled_at: DateTime<Utc>,
    /// Last status change.
    pub updated_at: DateTime<Utc>,
}

impl Enrollment {
    /// Creates a fresh `confirmed` enrollment.
    #[must_use]
    pub fn confirmed(event_id: EventId, user_id: UserId, now: DateTime<Utc>) -> Self {
        Self {
            id: EnrollmentId::new(),
            user_id,
            event_id,
            status: EnrollmentStatus::Confirmed,
            enrolled_at: now,
            updated_at: now,
        }
    }

    /// Applies `transition` in place and returns the previous status.
    ///
    /// # Errors
    ///
    /// Propagates the rejection from [`EnrollmentStatus::apply`]; the record
    /// is left untouched in that case.
    pub fn transition(
        &mut self,
        transition: StatusTransition,
        now: DateTime<Utc>,
    ) -> Result<EnrollmentStatus, ServiceError> {
        let next = self.status.apply(transition, self.id)?;
        let previous = self.status;
        self.status = next;
        self.updated_at = now;
        Ok(previous)
    }
}
