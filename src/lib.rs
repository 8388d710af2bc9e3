//! # eventflow
//!
//! Event enrollment and capacity accounting service with REST and WebSocket
//! APIs.
//!
//! Organizers publish events with a fixed number of seats; participants
//! enroll and cancel; organizers refund cancelled enrollments and record
//! attendance. Every enrollment operation runs as one atomic unit of work
//! in the store, so an event never admits more participants than its
//! capacity, a user holds at most one enrollment per event, and the seat
//! counter always equals the number of seat-holding enrollments.
//!
//! ## Architecture
//!
//! ```text
//! Clients (HTTP, WebSocket)
//!     │
//!     ├── REST Handlers + Actor extractor (api/)
//!     ├── WS Handler (ws/)
//!     │
//!     ├── EnrollmentService / EventService / UserService (service/)
//!     ├── EventBus (domain/)
//!     │
//!     ├── Event::admit, EnrollmentStatus::apply (domain/)
//!     │
//!     └── EnrollmentStore (persistence/)
//!           ├── MemoryStore   (per-event mutex)
//!           └── PostgresStore (FOR UPDATE + conditional update)
//! ```

pub mod api;
pub mod app_state;
pub mod config;
pub mod domain;
pub mod error;
pub mod persistence;
pub mod service;
pub mod ws;
