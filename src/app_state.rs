//! Shared application state injected into all Axum handlers.

use std::sync::Arc;

use crate::domain::EventBus;
use crate::persistence::EnrollmentStore;
use crate::service::{EnrollmentService, EventService, UserService};

/// Shared application state available to all handlers via Axum's
/// `State` extractor.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Enroll, cancel, refund, attendance, and the ledger views.
    pub enrollment_service: Arc<EnrollmentService>,
    /// Organizer-side event management.
    pub event_service: Arc<EventService>,
    /// User directory.
    pub user_service: Arc<UserService>,
    /// Backing store, for health checks.
    pub store: Arc<dyn EnrollmentStore>,
    /// Event bus for WebSocket subscriptions.
    pub event_bus: EventBus,
}

impl AppState {
    /// Wires every service to one store and one bus.
    #[must_use]
    pub fn new(store: Arc<dyn EnrollmentStore>, event_bus: EventBus) -> Self {
        Self {
            enrollment_service: Arc::new(EnrollmentService::new(
                Arc::clone(&store),
                event_bus.clone(),
            )),
            event_service: Arc::new(EventService::new(Arc::clone(&store), event_bus.clone())),
            user_service: Arc::new(UserService::new(Arc::clone(&store))),
            store,
            event_bus,
        }
    }
}
