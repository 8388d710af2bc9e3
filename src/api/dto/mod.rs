//! Data Transfer Objects for REST request/response serialization.
//!
//! Domain records (`Event`, `Enrollment`, `User`) serialize directly; the
//! types here are the list envelopes and query parameters around them.

pub mod enrollment_dto;
pub mod event_dto;

pub use enrollment_dto::*;
pub use event_dto::*;
