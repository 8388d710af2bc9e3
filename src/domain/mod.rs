//! Domain layer: events, enrollments, users, and the event bus.
//!
//! This module holds the server-side model: typed identifiers, the event
//! record with its seat accounting, the enrollment status machine, the
//! user directory records, read-side views, and the broadcast bus for
//! committed changes.

pub mod enrollment;
pub mod enrollment_event;
pub mod event;
pub mod event_bus;
pub mod ids;
pub mod user;
pub mod views;

pub use enrollment::{Enrollment, EnrollmentStatus, StatusTransition};
pub use enrollment_event::EnrollmentEvent;
pub use event::{Event, EventFilter, EventPatch, EventStatus, NewEvent};
pub use event_bus::EventBus;
pub use ids::{EnrollmentId, EventId, UserId};
pub use user::{NewUser, Role, User, UserSummary};
pub use views::{CounterReconciliation, Participant, RefundCandidate, RefundQueueEntry};
