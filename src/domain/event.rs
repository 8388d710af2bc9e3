//! Event records and seat accounting.
//!
//! An [`Event`] carries a fixed `capacity` and a derived `current_enrollments`
//! counter. The counter only moves through [`Event::admit`] and
//! [`Event::release_seat`], which the store calls inside its unit of work.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use utoipa::ToSchema;

use super::{Enrollment, EventId, UserId};
use crate::error::ServiceError;

/// Maximum length of an event title, in characters.
pub const MAX_TITLE_LEN: usize = 200;

/// Largest accepted capacity. Counts are stored as a signed 32-bit column.
pub const MAX_CAPACITY: u32 = i32::MAX.unsigned_abs();

/// Lifecycle status of an [`Event`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum EventStatus {
    /// Open for enrollment (subject to date, sales, and capacity).
    Active,
    /// Called off by the organizer.
    Cancelled,
    /// Took place.
    Completed,
}

impl EventStatus {
    /// Returns the lowercase storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Cancelled => "cancelled",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for EventStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventStatus {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "cancelled" => Ok(Self::Cancelled),
            "completed" => Ok(Self::Completed),
            other => Err(ServiceError::InvalidRequest(format!(
                "unknown event status: {other}"
            ))),
        }
    }
}

/// An event participants can enroll in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Event {
    /// Event identifier.
    pub id: EventId,
    /// Organizer who owns the event.
    pub organizer_id: UserId,
    /// Display title.
    pub title: String,
    /// Free-form description.
    pub description: Option<String>,
    /// Venue, as entered by the organizer.
    pub location: Option<String>,
    /// Event date.
    pub starts_at: DateTime<Utc>,
    /// Maximum number of seat-holding enrollments.
    pub capacity: u32,
    /// Number of `confirmed` + `attended` enrollments.
    pub current_enrollments: u32,
    /// Lifecycle status.
    pub status: EventStatus,
    /// Blocks new enrollments regardless of remaining capacity.
    pub sales_closed: bool,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

impl Event {
    /// Builds a new `active` event with no enrollments.
    #[must_use]
    pub fn new(organizer_id: UserId, spec: NewEvent, now: DateTime<Utc>) -> Self {
        Self {
            id: EventId::new(),
            organizer_id,
            title: spec.title.trim().to_string(),
            description: spec.description,
            location: spec.location,
            starts_at: spec.starts_at,
            capacity: spec.capacity,
            current_enrollments: 0,
            status: EventStatus::Active,
            sales_closed: spec.sales_closed,
            created_at: now,
            updated_at: now,
        }
    }

    /// Seats still available.
    #[must_use]
    pub const fn seats_remaining(&self) -> u32 {
        self.capacity.saturating_sub(self.current_enrollments)
    }

    /// Returns `true` once every seat is taken.
    #[must_use]
    pub const fn is_full(&self) -> bool {
        self.current_enrollments >= self.capacity
    }

    /// Runs the enrollment preconditions for `user_id` and, when all pass,
    /// claims a seat and returns the new `confirmed` enrollment.
    ///
    /// Checks run in a fixed order and the first failure wins: status,
    /// date, sales gate, existing enrollment, capacity. Nothing is modified
    /// unless every check passes.
    ///
    /// # Errors
    ///
    /// - [`ServiceError::EventNotActive`], [`ServiceError::EventInPast`],
    ///   [`ServiceError::SalesClosed`] for an event that does not accept
    ///   enrollments.
    /// - [`ServiceError::AlreadyEnrolled`] or
    ///   [`ServiceError::EnrollmentPreviouslyCancelled`] when `existing` is
    ///   present.
    /// - [`ServiceError::CapacityExceeded`] when no seat is left.
    pub fn admit(
        &mut self,
        user_id: UserId,
        existing: Option<&Enrollment>,
        now: DateTime<Utc>,
    ) -> Result<Enrollment, ServiceError> {
        if self.status != EventStatus::Active {
            return Err(ServiceError::EventNotActive {
                event_id: self.id,
                status: self.status,
            });
        }
        if self.starts_at < now {
            return Err(ServiceError::EventInPast(self.id));
        }
        if self.sales_closed {
            return Err(ServiceError::SalesClosed(self.id));
        }
        if let Some(existing) = existing {
            return Err(if existing.status.is_withdrawn() {
                ServiceError::EnrollmentPreviouslyCancelled {
                    event_id: self.id,
                    user_id,
                }
            } else {
                ServiceError::AlreadyEnrolled {
                    event_id: self.id,
                    user_id,
                }
            });
        }
        if self.is_full() {
            return Err(ServiceError::CapacityExceeded {
                event_id: self.id,
                capacity: self.capacity,
            });
        }

        self.current_enrollments += 1;
        self.updated_at = now;
        Ok(Enrollment::confirmed(self.id, user_id, now))
    }

    /// Gives back one seat, never going below zero.
    pub fn release_seat(&mut self, now: DateTime<Utc>) {
        self.current_enrollments = self.current_enrollments.saturating_sub(1);
        self.updated_at = now;
    }

    /// Applies an organizer patch. `current_enrollments` is never touched.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::InvalidRequest`] if the patch is malformed or
    /// would shrink capacity below the seats already taken.
    pub fn apply_patch(&mut self, patch: &EventPatch, now: DateTime<Utc>) -> Result<(), ServiceError> {
        patch.validate()?;
        if let Some(capacity) = patch.capacity
            && capacity < self.current_enrollments
        {
            return Err(ServiceError::InvalidRequest(format!(
                "capacity {capacity} is below the {} seats already taken",
                self.current_enrollments
            )));
        }

        if let Some(title) = &patch.title {
            self.title = title.trim().to_string();
        }
        if let Some(description) = &patch.description {
            self.description.clone_from(description);
        }
        if let Some(location) = &patch.location {
            self.location.clone_from(location);
        }
        if let Some(starts_at) = patch.starts_at {
            self.starts_at = starts_at;
        }
        if let Some(capacity) = patch.capacity {
            self.capacity = capacity;
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(sales_closed) = patch.sales_closed {
            self.sales_closed = sales_closed;
        }
        self.updated_at = now;
        Ok(())
    }
}

/// Organizer input for a new event.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewEvent {
    /// Display title (1–200 characters).
    pub title: String,
    /// Free-form description.
    #[serde(default)]
    pub description: Option<String>,
    /// Venue.
    #[serde(default)]
    pub location: Option<String>,
    /// Event date.
    pub starts_at: DateTime<Utc>,
    /// Maximum number of seats (at least 1).
    pub capacity: u32,
    /// Start with sales closed.
    #[serde(default)]
    pub sales_closed: bool,
}

impl NewEvent {
    /// Checks title and capacity bounds.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::InvalidRequest`] on an empty or overlong title
    /// or a capacity that is zero or above [`MAX_CAPACITY`].
    pub fn validate(&self) -> Result<(), ServiceError> {
        validate_title(&self.title)?;
        validate_capacity(self.capacity)
    }
}

/// Partial update of an event. Absent fields stay unchanged; `description`
/// and `location` are cleared by an explicit `null`.
#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct EventPatch {
    /// New title.
    #[serde(default)]
    pub title: Option<String>,
    /// New description; `Some(None)` clears it.
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
    /// New venue; `Some(None)` clears it.
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<String>)]
    pub location: Option<Option<String>>,
    /// New date.
    #[serde(default)]
    pub starts_at: Option<DateTime<Utc>>,
    /// New capacity; may not drop below `current_enrollments`.
    #[serde(default)]
    pub capacity: Option<u32>,
    /// New status.
    #[serde(default)]
    pub status: Option<EventStatus>,
    /// Open or close sales.
    #[serde(default)]
    pub sales_closed: Option<bool>,
}

impl EventPatch {
    /// Checks the fields that are present.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::InvalidRequest`] on an empty or overlong title
    /// or a capacity that is zero or above [`MAX_CAPACITY`].
    pub fn validate(&self) -> Result<(), ServiceError> {
        if let Some(title) = &self.title {
            validate_title(title)?;
        }
        if let Some(capacity) = self.capacity {
            validate_capacity(capacity)?;
        }
        Ok(())
    }
}

/// Filter for event listings.
#[derive(Debug, Clone, Copy, Default, Deserialize, ToSchema)]
pub struct EventFilter {
    /// Only events in this status.
    #[serde(default)]
    pub status: Option<EventStatus>,
    /// Only events owned by this organizer.
    #[serde(default)]
    pub organizer_id: Option<UserId>,
}

impl EventFilter {
    /// Returns `true` if `event` passes the filter.
    #[must_use]
    pub fn matches(&self, event: &Event) -> bool {
        self.status.is_none_or(|s| s == event.status)
            && self.organizer_id.is_none_or(|o| o == event.organizer_id)
    }
}

fn validate_title(title: &str) -> Result<(), ServiceError> {
    let trimmed = title.trim();
    if trimmed.is_empty() {
        return Err(ServiceError::InvalidRequest("title must not be empty".to_string()));
    }
    if trimmed.chars().count() > MAX_TITLE_LEN {
        return Err(ServiceError::InvalidRequest(format!(
            "title exceeds {MAX_TITLE_LEN} characters"
        )));
    }
    Ok(())
}

fn validate_capacity(capacity: u32) -> Result<(), ServiceError> {
    if capacity == 0 {
        return Err(ServiceError::InvalidRequest(
            "capacity must be at least 1".to_string(),
        ));
    }
    if capacity > MAX_CAPACITY {
        return Err(ServiceError::InvalidRequest(format!(
            "capacity must not exceed {MAX_CAPACITY}"
        )));
    }
    Ok(())
}

/// Maps a field that is present in the input, `null` included, to `Some`.
/// Paired with `#[serde(default)]`, an absent field stays `None`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    T::deserialize(deserializer).map(Some)
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::domain::{EnrollmentStatus, StatusTransition};
    use crate::error::ErrorKind;

    fn event(capacity: u32) -> Event {
        let spec = NewEvent {
            title: "  Rust meetup ".to_string(),
            description: None,
            location: None,
            starts_at: Utc::now() + Duration::days(7),
            capacity,
            sales_closed: false,
        };
        Event::new(UserId::new(), spec, Utc::now())
    }

    #[test]
    fn new_event_trims_title_and_starts_empty() {
        let ev = event(10);
        assert_eq!(ev.title, "Rust meetup");
        assert_eq!(ev.current_enrollments, 0);
        assert_eq!(ev.status, EventStatus::Active);
        assert_eq!(ev.seats_remaining(), 10);
    }

    #[test]
    fn admit_claims_one_seat() {
        let mut ev = event(2);
        let user = UserId::new();
        let Ok(enrollment) = ev.admit(user, None, Utc::now()) else {
            panic!("admission should succeed");
        };
        assert_eq!(enrollment.user_id, user);
        assert_eq!(enrollment.status, EnrollmentStatus::Confirmed);
        assert_eq!(ev.current_enrollments, 1);
    }

    #[test]
    fn admit_rejects_full_event_without_change() {
        let mut ev = event(1);
        let _ = ev.admit(UserId::new(), None, Utc::now());
        let Err(err) = ev.admit(UserId::new(), None, Utc::now()) else {
            panic!("second admission must fail");
        };
        assert_eq!(err.kind(), ErrorKind::CapacityExceeded);
        assert_eq!(ev.current_enrollments, 1);
    }

    #[test]
    fn admit_checks_run_in_order() {
        // Inactive and past and closed and full: status wins.
        let mut ev = event(1);
        let _ = ev.admit(UserId::new(), None, Utc::now());
        ev.status = EventStatus::Cancelled;
        ev.starts_at = Utc::now() - Duration::days(1);
        ev.sales_closed = true;
        let Err(err) = ev.admit(UserId::new(), None, Utc::now()) else {
            panic!("must fail");
        };
        assert!(matches!(err, ServiceError::EventNotActive { .. }));

        ev.status = EventStatus::Active;
        let Err(err) = ev.admit(UserId::new(), None, Utc::now()) else {
            panic!("must fail");
        };
        assert!(matches!(err, ServiceError::EventInPast(_)));

        ev.starts_at = Utc::now() + Duration::days(1);
        let Err(err) = ev.admit(UserId::new(), None, Utc::now()) else {
            panic!("must fail");
        };
        assert!(matches!(err, ServiceError::SalesClosed(_)));

        ev.sales_closed = false;
        let Err(err) = ev.admit(UserId::new(), None, Utc::now()) else {
            panic!("must fail");
        };
        assert!(matches!(err, ServiceError::CapacityExceeded { .. }));
    }

    #[test]
    fn admit_rejects_existing_enrollments() {
        let mut ev = event(5);
        let user = UserId::new();
        let Ok(mut existing) = ev.admit(user, None, Utc::now()) else {
            panic!("admission should succeed");
        };

        let Err(err) = ev.admit(user, Some(&existing), Utc::now()) else {
            panic!("duplicate must fail");
        };
        assert!(matches!(err, ServiceError::AlreadyEnrolled { .. }));

        let _ = existing.transition(StatusTransition::Cancel, Utc::now());
        ev.release_seat(Utc::now());
        let Err(err) = ev.admit(user, Some(&existing), Utc::now()) else {
            panic!("re-enrollment must fail");
        };
        assert!(matches!(
            err,
            ServiceError::EnrollmentPreviouslyCancelled { .. }
        ));
        assert_eq!(err.kind(), ErrorKind::DuplicateEnrollment);
        assert_eq!(ev.current_enrollments, 0);
    }

    #[test]
    fn release_seat_floors_at_zero() {
        let mut ev = event(3);
        ev.release_seat(Utc::now());
        assert_eq!(ev.current_enrollments, 0);
    }

    #[test]
    fn patch_cannot_shrink_below_taken_seats() {
        let mut ev = event(3);
        let _ = ev.admit(UserId::new(), None, Utc::now());
        let _ = ev.admit(UserId::new(), None, Utc::now());

        let patch = EventPatch {
            capacity: Some(1),
            ..EventPatch::default()
        };
        let Err(err) = ev.apply_patch(&patch, Utc::now()) else {
            panic!("shrinking below taken seats must fail");
        };
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(ev.capacity, 3);

        let patch = EventPatch {
            capacity: Some(2),
            sales_closed: Some(true),
            ..EventPatch::default()
        };
        assert!(ev.apply_patch(&patch, Utc::now()).is_ok());
        assert_eq!(ev.capacity, 2);
        assert!(ev.sales_closed);
        assert_eq!(ev.current_enrollments, 2);
    }

    #[test]
    fn new_event_validation() {
        let mut spec = NewEvent {
            title: " ".to_string(),
            description: None,
            location: None,
            starts_at: Utc::now(),
            capacity: 5,
            sales_closed: false,
        };
        assert!(spec.validate().is_err());
        spec.title = "x".repeat(MAX_TITLE_LEN + 1);
        assert!(spec.validate().is_err());
        spec.title = "ok".to_string();
        spec.capacity = 0;
        assert!(spec.validate().is_err());
        spec.capacity = 1;
        assert!(spec.validate().is_ok());
        spec.capacity = MAX_CAPACITY;
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn capacity_beyond_storable_range_is_rejected() {
        let spec = NewEvent {
            title: "Stadium".to_string(),
            description: None,
            location: None,
            starts_at: Utc::now(),
            capacity: u32::MAX,
            sales_closed: false,
        };
        let Err(err) = spec.validate() else {
            panic!("oversized capacity accepted");
        };
        assert_eq!(err.kind(), ErrorKind::Validation);

        let patch = EventPatch {
            capacity: Some(MAX_CAPACITY + 1),
            ..EventPatch::default()
        };
        let Err(err) = patch.validate() else {
            panic!("oversized capacity patch accepted");
        };
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[test]
    fn patch_distinguishes_absent_from_null() {
        let Ok(patch) = serde_json::from_str::<EventPatch>(r#"{"description": null}"#) else {
            panic!("patch should parse");
        };
        assert_eq!(patch.description, Some(None));
        assert_eq!(patch.location, None);

        let mut ev = event(4);
        ev.description = Some("old".to_string());
        ev.location = Some("Room 1".to_string());
        let Ok(()) = ev.apply_patch(&patch, Utc::now()) else {
            panic!("patch should apply");
        };
        assert_eq!(ev.description, None);
        assert_eq!(ev.location.as_deref(), Some("Room 1"));

        let Ok(patch) = serde_json::from_str::<EventPatch>(r#"{"location": "Room 2"}"#) else {
            panic!("patch should parse");
        };
        let Ok(()) = ev.apply_patch(&patch, Utc::now()) else {
            panic!("patch should apply");
        };
        assert_eq!(ev.location.as_deref(), Some("Room 2"));
    }

    #[test]
    fn filter_matches_status_and_organizer() {
        let ev = event(1);
        assert!(EventFilter::default().matches(&ev));
        let by_owner = EventFilter {
            status: Some(EventStatus::Active),
            organizer_id: Some(ev.organizer_id),
        };
        assert!(by_owner.matches(&ev));
        let other = EventFilter {
            status: None,
            organizer_id: Some(UserId::new()),
        };
        assert!(!other.matches(&ev));
    }
}
