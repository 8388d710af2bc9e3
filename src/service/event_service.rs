//! Event service: organizer-side event management.

use std::sync::Arc;

use chrono::Utc;

use super::log_rejection;
use crate::domain::{
    CounterReconciliation, EnrollmentEvent, Event, EventBus, EventFilter, EventId, EventPatch,
    NewEvent, UserId,
};
use crate::error::ServiceError;
use crate::persistence::EnrollmentStore;

/// Creates, reads, updates, and deletes events.
///
/// Role checks (organizer, owner, admin) are done by the caller.
#[derive(Debug, Clone)]
pub struct EventService {
    store: Arc<dyn EnrollmentStore>,
    event_bus: EventBus,
}

impl EventService {
    /// Creates a new `EventService`.
    #[must_use]
    pub fn new(store: Arc<dyn EnrollmentStore>, event_bus: EventBus) -> Self {
        Self { store, event_bus }
    }

    /// Publishes a new `active` event owned by `organizer_id`.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::InvalidRequest`] on a bad title or capacity,
    /// [`ServiceError::UserNotFound`] for an unknown organizer.
    pub async fn create_event(
        &self,
        organizer_id: UserId,
        spec: NewEvent,
    ) -> Result<Event, ServiceError> {
        spec.validate()?;
        let event = self
            .store
            .create_event(Event::new(organizer_id, spec, Utc::now()))
            .await
            .inspect_err(|e| log_rejection("create_event", e))?;

        tracing::info!(event_id = %event.id, %organizer_id, capacity = event.capacity, "event created");
        let _ = self.event_bus.publish(EnrollmentEvent::EventCreated {
            event_id: event.id,
            organizer_id,
            capacity: event.capacity,
            timestamp: event.created_at,
        });
        Ok(event)
    }

    /// Loads one event.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::EventNotFound`] if absent.
    pub async fn get_event(&self, event_id: EventId) -> Result<Event, ServiceError> {
        tracing::debug!(%event_id, "get event");
        self.store.get_event(event_id).await
    }

    /// Lists events matching `filter`, ordered by start date.
    ///
    /// # Errors
    ///
    /// Storage failures only.
    pub async fn list_events(&self, filter: EventFilter) -> Result<Vec<Event>, ServiceError> {
        tracing::debug!(?filter, "list events");
        self.store.list_events(filter).await
    }

    /// Applies an organizer patch.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::EventNotFound`] if absent and
    /// [`ServiceError::InvalidRequest`] if the patch is malformed or would
    /// shrink capacity below the seats already taken.
    pub async fn update_event(
        &self,
        event_id: EventId,
        patch: EventPatch,
    ) -> Result<Event, ServiceError> {
        patch.validate()?;
        let event = self
            .store
            .update_event(event_id, patch, Utc::now())
            .await
            .inspect_err(|e| log_rejection("update_event", e))?;

        tracing::info!(%event_id, capacity = event.capacity, status = %event.status, "event updated");
        self.publish_updated(&event);
        Ok(event)
    }

    /// Deletes an event that has no outstanding enrollments.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::EventNotFound`] if absent and
    /// [`ServiceError::Conflict`] while non-refunded enrollments exist.
    pub async fn delete_event(&self, event_id: EventId) -> Result<(), ServiceError> {
        self.store
            .delete_event(event_id)
            .await
            .inspect_err(|e| log_rejection("delete_event", e))?;

        tracing::info!(%event_id, "event deleted");
        let _ = self.event_bus.publish(EnrollmentEvent::EventDeleted {
            event_id,
            timestamp: Utc::now(),
        });
        Ok(())
    }

    /// Recomputes the event's enrollment counter from its ledger.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::EventNotFound`] if absent.
    pub async fn reconcile_counter(
        &self,
        event_id: EventId,
    ) -> Result<CounterReconciliation, ServiceError> {
        let outcome = self
            .store
            .reconcile_counter(event_id, Utc::now())
            .await
            .inspect_err(|e| log_rejection("reconcile_counter", e))?;

        if outcome.drifted() {
            tracing::warn!(
                %event_id,
                previous = outcome.previous,
                current = outcome.current,
                "enrollment counter drift repaired"
            );
            if let Ok(event) = self.store.get_event(event_id).await {
                self.publish_updated(&event);
            }
        } else {
            tracing::info!(%event_id, current = outcome.current, "enrollment counter consistent");
        }
        Ok(outcome)
    }

    fn publish_updated(&self, event: &Event) {
        let _ = self.event_bus.publish(EnrollmentEvent::EventUpdated {
            event_id: event.id,
            capacity: event.capacity,
            current_enrollments: event.current_enrollments,
            sales_closed: event.sales_closed,
            timestamp: event.updated_at,
        });
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use chrono::Duration;

    use super::*;
    use crate::domain::{EventStatus, NewUser, Role, User};
    use crate::error::ErrorKind;
    use crate::persistence::MemoryStore;

    async fn setup() -> (Arc<MemoryStore>, EventService, UserId) {
        let store = Arc::new(MemoryStore::new());
        let service = EventService::new(
            Arc::clone(&store) as Arc<dyn EnrollmentStore>,
            EventBus::new(64),
        );
        let spec = NewUser {
            name: "Olga".to_string(),
            email: "olga@example.org".to_string(),
            role: Role::Organizer,
        };
        let Ok(organizer) = store.create_user(User::new(spec, Utc::now())).await else {
            panic!("user creation failed");
        };
        (store, service, organizer.id)
    }

    fn spec(title: &str, capacity: u32, days_ahead: i64) -> NewEvent {
        NewEvent {
            title: title.to_string(),
            description: Some("bring a laptop".to_string()),
            location: None,
            starts_at: Utc::now() + Duration::days(days_ahead),
            capacity,
            sales_closed: false,
        }
    }

    #[tokio::test]
    async fn create_validates_input() {
        let (_, service, organizer) = setup().await;
        let Err(err) = service.create_event(organizer, spec("", 10, 1)).await else {
            panic!("empty title accepted");
        };
        assert_eq!(err.kind(), ErrorKind::Validation);
        let Err(err) = service.create_event(organizer, spec("Talk", 0, 1)).await else {
            panic!("zero capacity accepted");
        };
        assert_eq!(err.kind(), ErrorKind::Validation);

        let Ok(event) = service.create_event(organizer, spec("Talk", 10, 1)).await else {
            panic!("valid event rejected");
        };
        assert_eq!(event.status, EventStatus::Active);
        assert_eq!(event.current_enrollments, 0);
    }

    #[tokio::test]
    async fn list_is_ordered_and_filtered() {
        let (_, service, organizer) = setup().await;
        let Ok(later) = service.create_event(organizer, spec("Later", 5, 9)).await else {
            panic!("create failed");
        };
        let Ok(sooner) = service.create_event(organizer, spec("Sooner", 5, 2)).await else {
            panic!("create failed");
        };
        let patch = EventPatch {
            status: Some(EventStatus::Cancelled),
            ..EventPatch::default()
        };
        assert!(service.update_event(later.id, patch).await.is_ok());

        let Ok(all) = service.list_events(EventFilter::default()).await else {
            panic!("list failed");
        };
        let ids: Vec<EventId> = all.iter().map(|e| e.id).collect();
        assert_eq!(ids, vec![sooner.id, later.id]);

        let active = EventFilter {
            status: Some(EventStatus::Active),
            organizer_id: None,
        };
        let Ok(active) = service.list_events(active).await else {
            panic!("list failed");
        };
        assert_eq!(active.len(), 1);
    }

    #[tokio::test]
    async fn update_emits_event_and_keeps_counter() {
        let (_, service, organizer) = setup().await;
        let Ok(event) = service.create_event(organizer, spec("Talk", 10, 1)).await else {
            panic!("create failed");
        };
        let mut rx = service.event_bus.subscribe();

        let patch = EventPatch {
            capacity: Some(20),
            sales_closed: Some(true),
            ..EventPatch::default()
        };
        let Ok(updated) = service.update_event(event.id, patch).await else {
            panic!("update failed");
        };
        assert_eq!(updated.capacity, 20);
        assert_eq!(updated.current_enrollments, 0);

        let Ok(published) = rx.recv().await else {
            panic!("expected event");
        };
        assert_eq!(published.event_type_str(), "event_updated");
    }

    #[tokio::test]
    async fn delete_and_reconcile() {
        let (store, service, organizer) = setup().await;
        let Ok(event) = service.create_event(organizer, spec("Talk", 10, 1)).await else {
            panic!("create failed");
        };

        assert!(store.force_counter(event.id, 3).await.is_ok());
        let Ok(outcome) = service.reconcile_counter(event.id).await else {
            panic!("reconcile failed");
        };
        assert_eq!((outcome.previous, outcome.current), (3, 0));

        let Ok(outcome) = service.reconcile_counter(event.id).await else {
            panic!("reconcile failed");
        };
        assert!(!outcome.drifted());

        assert!(service.delete_event(event.id).await.is_ok());
        let Err(err) = service.get_event(event.id).await else {
            panic!("deleted event still readable");
        };
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }
}
