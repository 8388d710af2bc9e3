//! In-memory store with per-event fine-grained locking.
//!
//! Every event lives in its own slot, `Arc<Mutex<EventSlot>>`. The slot
//! holds both the [`Event`] and its enrollment ledger, so one lock covers
//! the counter and the rows it counts. Mutations hold the slot lock from
//! the first precondition check to the last write; concurrent enrollments
//! in the same event are therefore serialized while different events
//! proceed in parallel.
//!
//! Not durable: state is lost on restart. Used for tests and for running
//! the service with `PERSISTENCE_ENABLED=false`.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex, RwLock};

use super::{EnrollmentStore, SeatChange, StoreResult};
use crate::domain::{
    CounterReconciliation, Enrollment, EnrollmentId, EnrollmentStatus, Event, EventFilter,
    EventId, EventPatch, Participant, RefundCandidate, RefundQueueEntry, StatusTransition, User,
    UserId, UserSummary,
};
use crate::error::ServiceError;

/// An event and its enrollment ledger behind one lock.
#[derive(Debug)]
struct EventSlot {
    event: Event,
    /// Insertion order is enrollment order.
    enrollments: Vec<Enrollment>,
    /// Set under the lock when the event is deleted, so tasks that grabbed
    /// the slot before removal see it as gone.
    deleted: bool,
}

impl EventSlot {
    fn live(&self) -> StoreResult<()> {
        if self.deleted {
            return Err(ServiceError::EventNotFound(self.event.id));
        }
        Ok(())
    }

    fn seat_holders(&self) -> u32 {
        let count = self
            .enrollments
            .iter()
            .filter(|e| e.status.occupies_seat())
            .count();
        u32::try_from(count).unwrap_or(u32::MAX)
    }

    /// Applies `transition` to the enrollment at `index`, releasing the seat
    /// when the enrollment stops holding one.
    fn transition_at(
        &mut self,
        index: usize,
        transition: StatusTransition,
        now: DateTime<Utc>,
    ) -> StoreResult<SeatChange> {
        let enrollment = self
            .enrollments
            .get_mut(index)
            .ok_or_else(|| ServiceError::Internal("enrollment index out of range".to_string()))?;
        let previous = enrollment.transition(transition, now)?;
        let released = previous.occupies_seat() && !enrollment.status.occupies_seat();
        let enrollment = enrollment.clone();
        if released {
            self.event.release_seat(now);
        }
        Ok(SeatChange {
            enrollment,
            event: self.event.clone(),
        })
    }
}

/// In-memory [`EnrollmentStore`].
///
/// Lock order is events map → slot → enrollment index. The events map lock
/// is released before a slot lock is awaited, except in `delete_event`.
#[derive(Debug, Default)]
pub struct MemoryStore {
    events: RwLock<HashMap<EventId, Arc<Mutex<EventSlot>>>>,
    enrollment_index: RwLock<HashMap<EnrollmentId, EventId>>,
    users: RwLock<HashMap<UserId, User>>,
}

impl MemoryStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    async fn slot(&self, event_id: EventId) -> StoreResult<Arc<Mutex<EventSlot>>> {
        let map = self.events.read().await;
        map.get(&event_id)
            .cloned()
            .ok_or(ServiceError::EventNotFound(event_id))
    }

    async fn slots(&self) -> Vec<Arc<Mutex<EventSlot>>> {
        self.events.read().await.values().cloned().collect()
    }

    async fn require_user(&self, user_id: UserId) -> StoreResult<()> {
        if self.users.read().await.contains_key(&user_id) {
            Ok(())
        } else {
            Err(ServiceError::UserNotFound(user_id))
        }
    }

    async fn summaries(&self) -> HashMap<UserId, UserSummary> {
        self.users
            .read()
            .await
            .values()
            .map(|u| (u.id, u.summary()))
            .collect()
    }

    /// Overwrites the stored counter of an event without touching the ledger.
    ///
    /// Only exists so tests can simulate counter drift.
    #[cfg(test)]
    pub(crate) async fn force_counter(&self, event_id: EventId, value: u32) -> StoreResult<()> {
        let slot = self.slot(event_id).await?;
        slot.lock().await.event.current_enrollments = value;
        Ok(())
    }
}

#[async_trait]
impl EnrollmentStore for MemoryStore {
    async fn create_user(&self, user: User) -> StoreResult<User> {
        let mut users = self.users.write().await;
        if users.values().any(|u| u.email == user.email) {
            return Err(ServiceError::Conflict(format!(
                "email {} is already registered",
                user.email
            )));
        }
        users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn get_user(&self, user_id: UserId) -> StoreResult<User> {
        self.users
            .read()
            .await
            .get(&user_id)
            .cloned()
            .ok_or(ServiceError::UserNotFound(user_id))
    }

    async fn create_event(&self, event: Event) -> StoreResult<Event> {
        self.require_user(event.organizer_id).await?;
        let mut map = self.events.write().await;
        if map.contains_key(&event.id) {
            return Err(ServiceError::Conflict(format!(
                "event {} already exists",
                event.id
            )));
        }
        map.insert(
            event.id,
            Arc::new(Mutex::new(EventSlot {
                event: event.clone(),
                enrollments: Vec::new(),
                deleted: false,
            })),
        );
        Ok(event)
    }

    async fn get_event(&self, event_id: EventId) -> StoreResult<Event> {
        let slot = self.slot(event_id).await?;
        let slot = slot.lock().await;
        slot.live()?;
        Ok(slot.event.clone())
    }

    async fn list_events(&self, filter: EventFilter) -> StoreResult<Vec<Event>> {
        let mut events = Vec::new();
        for slot in self.slots().await {
            let slot = slot.lock().await;
            if !slot.deleted && filter.matches(&slot.event) {
                events.push(slot.event.clone());
            }
        }
        events.sort_by(|a, b| a.starts_at.cmp(&b.starts_at).then(a.id.cmp(&b.id)));
        Ok(events)
    }

    async fn update_event(
        &self,
        event_id: EventId,
        patch: EventPatch,
        now: DateTime<Utc>,
    ) -> StoreResult<Event> {
        let slot = self.slot(event_id).await?;
        let mut slot = slot.lock().await;
        slot.live()?;
        slot.event.apply_patch(&patch, now)?;
        Ok(slot.event.clone())
    }

    async fn delete_event(&self, event_id: EventId) -> StoreResult<()> {
        let mut map = self.events.write().await;
        let slot = map
            .get(&event_id)
            .cloned()
            .ok_or(ServiceError::EventNotFound(event_id))?;
        let mut slot = slot.lock().await;
        let blocking = slot
            .enrollments
            .iter()
            .filter(|e| e.status != EnrollmentStatus::Refunded)
            .count();
        if blocking > 0 {
            return Err(ServiceError::Conflict(format!(
                "event {event_id} still has {blocking} enrollment(s) that are not refunded"
            )));
        }

        let mut index = self.enrollment_index.write().await;
        for enrollment in &slot.enrollments {
            index.remove(&enrollment.id);
        }
        slot.deleted = true;
        map.remove(&event_id);
        Ok(())
    }

    async fn reconcile_counter(
        &self,
        event_id: EventId,
        now: DateTime<Utc>,
    ) -> StoreResult<CounterReconciliation> {
        let slot = self.slot(event_id).await?;
        let mut slot = slot.lock().await;
        slot.live()?;
        let previous = slot.event.current_enrollments;
        let current = slot.seat_holders();
        if previous != current {
            slot.event.current_enrollments = current;
            slot.event.updated_at = now;
        }
        Ok(CounterReconciliation {
            event_id,
            previous,
            current,
        })
    }

    async fn enroll(
        &self,
        event_id: EventId,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> StoreResult<SeatChange> {
        let slot = self.slot(event_id).await?;
        self.require_user(user_id).await?;
        let mut slot = slot.lock().await;
        slot.live()?;

        // Admit on a copy so a rejected admission leaves the slot untouched.
        let mut event = slot.event.clone();
        let existing = slot.enrollments.iter().find(|e| e.user_id == user_id);
        let enrollment = event.admit(user_id, existing, now)?;

        self.enrollment_index
            .write()
            .await
            .insert(enrollment.id, event_id);
        slot.enrollments.push(enrollment.clone());
        slot.event = event.clone();
        Ok(SeatChange { enrollment, event })
    }

    async fn cancel(
        &self,
        event_id: EventId,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> StoreResult<SeatChange> {
        let slot = self.slot(event_id).await?;
        let mut slot = slot.lock().await;
        slot.live()?;
        let index = slot
            .enrollments
            .iter()
            .position(|e| e.user_id == user_id)
            .ok_or(ServiceError::NotEnrolled { event_id, user_id })?;
        slot.transition_at(index, StatusTransition::Cancel, now)
    }

    async fn transition_enrollment(
        &self,
        enrollment_id: EnrollmentId,
        transition: StatusTransition,
        now: DateTime<Utc>,
    ) -> StoreResult<SeatChange> {
        let event_id = self
            .enrollment_index
            .read()
            .await
            .get(&enrollment_id)
            .copied()
            .ok_or(ServiceError::EnrollmentNotFound(enrollment_id))?;
        let slot = self
            .slot(event_id)
            .await
            .map_err(|_| ServiceError::EnrollmentNotFound(enrollment_id))?;
        let mut slot = slot.lock().await;
        if slot.deleted {
            return Err(ServiceError::EnrollmentNotFound(enrollment_id));
        }
        let index = slot
            .enrollments
            .iter()
            .position(|e| e.id == enrollment_id)
            .ok_or(ServiceError::EnrollmentNotFound(enrollment_id))?;
        slot.transition_at(index, transition, now)
    }

    async fn get_enrollment(&self, enrollment_id: EnrollmentId) -> StoreResult<Enrollment> {
        let event_id = self
            .enrollment_index
            .read()
            .await
            .get(&enrollment_id)
            .copied()
            .ok_or(ServiceError::EnrollmentNotFound(enrollment_id))?;
        let slot = self
            .slot(event_id)
            .await
            .map_err(|_| ServiceError::EnrollmentNotFound(enrollment_id))?;
        let slot = slot.lock().await;
        slot.enrollments
            .iter()
            .find(|e| e.id == enrollment_id)
            .cloned()
            .ok_or(ServiceError::EnrollmentNotFound(enrollment_id))
    }

    async fn list_participants(&self, event_id: EventId) -> StoreResult<Vec<Participant>> {
        let enrollments = {
            let slot = self.slot(event_id).await?;
            let slot = slot.lock().await;
            slot.live()?;
            slot.enrollments.clone()
        };
        let users = self.summaries().await;
        Ok(enrollments
            .into_iter()
            .filter_map(|e| {
                users.get(&e.user_id).map(|user| Participant {
                    enrollment_id: e.id,
                    user: user.clone(),
                    status: e.status,
                    enrollment_date: e.enrolled_at,
                })
            })
            .collect())
    }

    async fn list_refund_candidates(
        &self,
        organizer_id: UserId,
    ) -> StoreResult<Vec<RefundQueueEntry>> {
        let mut owned = Vec::new();
        for slot in self.slots().await {
            let slot = slot.lock().await;
            if slot.deleted || slot.event.organizer_id != organizer_id {
                continue;
            }
            let cancelled: Vec<Enrollment> = slot
                .enrollments
                .iter()
                .filter(|e| e.status == EnrollmentStatus::Cancelled)
                .cloned()
                .collect();
            if !cancelled.is_empty() {
                owned.push((slot.event.clone(), cancelled));
            }
        }

        let users = self.summaries().await;
        let mut queue: Vec<RefundQueueEntry> = owned
            .into_iter()
            .map(|(event, cancelled)| RefundQueueEntry {
                event,
                candidates: cancelled
                    .into_iter()
                    .filter_map(|enrollment| {
                        users.get(&enrollment.user_id).map(|user| RefundCandidate {
                            user: user.clone(),
                            enrollment,
                        })
                    })
                    .collect(),
            })
            .filter(|entry| !entry.candidates.is_empty())
            .collect();
        queue.sort_by(|a, b| {
            a.event
                .starts_at
                .cmp(&b.event.starts_at)
                .then(a.event.id.cmp(&b.event.id))
        });
        Ok(queue)
    }

    async fn health_check(&self) -> StoreResult<()> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
