//! Database row types and their conversion into domain records.
//!
//! Counts are stored as `INTEGER` and statuses as lowercase `TEXT`; both are
//! checked on the way out, so a corrupt row surfaces as
//! [`ServiceError::Internal`] instead of a bogus domain value.

use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

use crate::domain::{
    Enrollment, EnrollmentId, Event, EventId, Participant, RefundCandidate, User, UserId,
    UserSummary,
};
use crate::error::ServiceError;

/// Column list matching [`EventRow`], for `SELECT`/`RETURNING` clauses.
pub const EVENT_COLUMNS: &str = "id, organizer_id, title, description, location, starts_at, \
     capacity, current_enrollments, status, sales_closed, created_at, updated_at";

/// Column list matching [`EnrollmentRow`].
pub const ENROLLMENT_COLUMNS: &str = "id, user_id, event_id, status, enrolled_at, updated_at";

/// A row of the `users` table.
#[derive(Debug, Clone, FromRow)]
pub struct UserRow {
    /// Primary key.
    pub id: Uuid,
    /// Display name.
    pub name: String,
    /// Unique, lowercased email.
    pub email: String,
    /// Role as lowercase text.
    pub role: String,
    /// Registration timestamp.
    pub created_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = ServiceError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: UserId::from_uuid(row.id),
            name: row.name,
            email: row.email,
            role: row.role.parse()?,
            created_at: row.created_at,
        })
    }
}

/// A row of the `events` table.
#[derive(Debug, Clone, FromRow)]
pub struct EventRow {
    /// Primary key.
    pub id: Uuid,
    /// Owning organizer.
    pub organizer_id: Uuid,
    /// Display title.
    pub title: String,
    /// Optional description.
    pub description: Option<String>,
    /// Optional venue.
    pub location: Option<String>,
    /// Event date.
    pub starts_at: DateTime<Utc>,
    /// Seat limit (`CHECK capacity > 0`).
    pub capacity: i32,
    /// Seat-holding enrollments.
    pub current_enrollments: i32,
    /// Status as lowercase text.
    pub status: String,
    /// Sales gate.
    pub sales_closed: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<EventRow> for Event {
    type Error = ServiceError;

    fn try_from(row: EventRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse()
            .map_err(|_| ServiceError::Internal(format!("corrupt event status: {}", row.status)))?;
        Ok(Self {
            id: EventId::from_uuid(row.id),
            organizer_id: UserId::from_uuid(row.organizer_id),
            title: row.title,
            description: row.description,
            location: row.location,
            starts_at: row.starts_at,
            capacity: to_count(row.capacity, "capacity")?,
            current_enrollments: to_count(row.current_enrollments, "current_enrollments")?,
            status,
            sales_closed: row.sales_closed,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

/// A row of the `enrollments` table.
#[derive(Debug, Clone, FromRow)]
pub struct EnrollmentRow {
    /// Primary key.
    pub id: Uuid,
    /// Enrolled user.
    pub user_id: Uuid,
    /// Target event.
    pub event_id: Uuid,
    /// Status as lowercase text.
    pub status: String,
    /// Creation timestamp.
    pub enrolled_at: DateTime<Utc>,
    /// Last status change.
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<EnrollmentRow> for Enrollment {
    type Error = ServiceError;

    fn try_from(row: EnrollmentRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: EnrollmentId::from_uuid(row.id),
            user_id: UserId::from_uuid(row.user_id),
            event_id: EventId::from_uuid(row.event_id),
            status: row.status.parse()?,
            enrolled_at: row.enrolled_at,
            updated_at: row.updated_at,
        })
    }
}

/// An enrollment joined with its user, as read by the participant and
/// refund-queue views.
#[derive(Debug, Clone, FromRow)]
pub struct EnrollmentWithUserRow {
    /// Enrollment columns.
    #[sqlx(flatten)]
    pub enrollment: EnrollmentRow,
    /// `users.name`.
    pub user_name: String,
    /// `users.email`.
    pub user_email: String,
}

impl EnrollmentWithUserRow {
    fn split(self) -> Result<(Enrollment, UserSummary), ServiceError> {
        let user = UserSummary {
            id: UserId::from_uuid(self.enrollment.user_id),
            name: self.user_name,
            email: self.user_email,
        };
        Ok((self.enrollment.try_into()?, user))
    }
}

impl TryFrom<EnrollmentWithUserRow> for Participant {
    type Error = ServiceError;

    fn try_from(row: EnrollmentWithUserRow) -> Result<Self, Self::Error> {
        let (enrollment, user) = row.split()?;
        Ok(Self {
            enrollment_id: enrollment.id,
            user,
            status: enrollment.status,
            enrollment_date: enrollment.enrolled_at,
        })
    }
}

impl TryFrom<EnrollmentWithUserRow> for RefundCandidate {
    type Error = ServiceError;

    fn try_from(row: EnrollmentWithUserRow) -> Result<Self, Self::Error> {
        let (enrollment, user) = row.split()?;
        Ok(Self { enrollment, user })
    }
}

/// Converts a non-negative `INTEGER` column into a count.
fn to_count(value: i32, column: &str) -> Result<u32, ServiceError> {
    u32::try_from(value)
        .map_err(|_| ServiceError::Internal(format!("negative {column} in database: {value}")))
}

/// Converts a count into an `INTEGER` bind parameter.
///
/// # Errors
///
/// Returns [`ServiceError::InvalidRequest`] if the value does not fit.
pub fn to_db_count(value: u32) -> Result<i32, ServiceError> {
    i32::try_from(value)
        .map_err(|_| ServiceError::InvalidRequest(format!("value {value} is out of range")))
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::{EnrollmentStatus, EventStatus};
    use crate::error::ErrorKind;

    fn event_row() -> EventRow {
        let now = Utc::now();
        EventRow {
            id: Uuid::new_v4(),
            organizer_id: Uuid::new_v4(),
            title: "Launch party".to_string(),
            description: None,
            location: Some("Hall B".to_string()),
            starts_at: now,
            capacity: 40,
            current_enrollments: 12,
            status: "active".to_string(),
            sales_closed: false,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn event_row_converts() {
        let Ok(event) = Event::try_from(event_row()) else {
            panic!("valid row rejected");
        };
        assert_eq!(event.capacity, 40);
        assert_eq!(event.current_enrollments, 12);
        assert_eq!(event.status, EventStatus::Active);
    }

    #[test]
    fn corrupt_event_rows_are_internal_errors() {
        let mut row = event_row();
        row.current_enrollments = -1;
        let Err(err) = Event::try_from(row) else {
            panic!("negative counter accepted");
        };
        assert_eq!(err.kind(), ErrorKind::Internal);

        let mut row = event_row();
        row.status = "postponed".to_string();
        let Err(err) = Event::try_from(row) else {
            panic!("unknown status accepted");
        };
        assert_eq!(err.kind(), ErrorKind::Internal);
    }

    #[test]
    fn joined_row_becomes_participant() {
        let now = Utc::now();
        let row = EnrollmentWithUserRow {
            enrollment: EnrollmentRow {
                id: Uuid::new_v4(),
                user_id: Uuid::new_v4(),
                event_id: Uuid::new_v4(),
                status: "cancelled".to_string(),
                enrolled_at: now,
                updated_at: now,
            },
            user_name: "Grace".to_string(),
            user_email: "grace@example.org".to_string(),
        };
        let Ok(participant) = Participant::try_from(row) else {
            panic!("valid row rejected");
        };
        assert_eq!(participant.status, EnrollmentStatus::Cancelled);
        assert_eq!(participant.user.name, "Grace");
        assert_eq!(participant.enrollment_date, now);
    }

    #[test]
    fn db_count_bounds() {
        assert_eq!(to_db_count(7).ok(), Some(7));
        assert!(to_db_count(u32::MAX).is_err());
    }
}
