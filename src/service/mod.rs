//! Service layer: business logic orchestration.
//!
//! Each service is a stateless coordinator over an
//! [`EnrollmentStore`](crate::persistence::EnrollmentStore). Every mutation
//! follows the same pattern: run one store unit of work, log the outcome,
//! publish an [`EnrollmentEvent`](crate::domain::EnrollmentEvent) on the
//! [`EventBus`](crate::domain::EventBus) once it has committed, and return.

pub mod enrollment_service;
pub mod event_service;
pub mod user_service;

pub use enrollment_service::EnrollmentService;
pub use event_service::EventService;
pub use user_service::UserService;

use crate::error::{ErrorKind, ServiceError};

/// Logs a failed operation at a level matching its classification.
pub(crate) fn log_rejection(operation: &'static str, err: &ServiceError) {
    match err.kind() {
        ErrorKind::Internal => tracing::error!(operation, error = %err, "operation failed"),
        kind => tracing::warn!(operation, ?kind, error = %err, "operation rejected"),
    }
}
