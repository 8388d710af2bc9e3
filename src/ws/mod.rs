//! WebSocket layer: live feed of enrollment changes.
//!
//! The endpoint at `/ws` streams committed [`EnrollmentEvent`]s to clients
//! that subscribed to the affected event ids, and answers a few read
//! commands.
//!
//! [`EnrollmentEvent`]: crate::domain::EnrollmentEvent

pub mod connection;
pub mod handler;
pub mod messages;
pub mod subscription;
