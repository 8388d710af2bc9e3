//! Contention scenarios run against any [`EnrollmentStore`].

use std::sync::Arc;

use chrono::{Duration, Utc};
use tokio::task::JoinSet;
use tokio_test::{assert_err, assert_ok};

use eventflow::domain::{EventBus, EventId, NewEvent, NewUser, Role, UserId};
use eventflow::error::{ErrorKind, ServiceError};
use eventflow::persistence::EnrollmentStore;
use eventflow::service::{EnrollmentService, EventService, UserService};

/// Services sharing one store.
pub struct Harness {
    /// Enrollment operations.
    pub enrollments: Arc<EnrollmentService>,
    /// Event management.
    pub events: EventService,
    /// User directory.
    pub users: UserService,
    tag: String,
}

impl Harness {
    /// Wires the services over `store`.
    pub fn new(store: Arc<dyn EnrollmentStore>) -> Self {
        let bus = EventBus::new(4096);
        Self {
            enrollments: Arc::new(EnrollmentService::new(Arc::clone(&store), bus.clone())),
            events: EventService::new(Arc::clone(&store), bus),
            users: UserService::new(store),
            tag: uuid::Uuid::new_v4().simple().to_string(),
        }
    }

    /// Registers a user with an email unique to this harness.
    pub async fn user(&self, name: &str, role: Role) -> UserId {
        let spec = NewUser {
            name: name.to_string(),
            email: format!("{name}.{}@example.org", self.tag),
            role,
        };
        assert_ok!(self.users.create_user(spec).await).id
    }

    /// Publishes a future event with `capacity` seats.
    pub async fn event(&self, capacity: u32) -> EventId {
        let organizer = self.user("organizer", Role::Organizer).await;
        let spec = NewEvent {
            title: "Launch Party".to_string(),
            description: None,
            location: Some("Hall B".to_string()),
            starts_at: Utc::now() + Duration::days(3),
            capacity,
            sales_closed: false,
        };
        assert_ok!(self.events.create_event(organizer, spec).await).id
    }

    /// Current seat counter of `event_id`.
    pub async fn seats(&self, event_id: EventId) -> u32 {
        assert_ok!(self.events.get_event(event_id).await).current_enrollments
    }

    /// Enrolls every user concurrently and returns the outcomes.
    pub async fn enroll_all(
        &self,
        event_id: EventId,
        users: &[UserId],
    ) -> Vec<Result<(), ServiceError>> {
        let mut tasks = JoinSet::new();
        for &user_id in users {
            let service = Arc::clone(&self.enrollments);
            tasks.spawn(async move { service.enroll(event_id, user_id).await.map(|_| ()) });
        }
        let mut outcomes = Vec::with_capacity(users.len());
        while let Some(joined) = tasks.join_next().await {
            outcomes.push(assert_ok!(joined));
        }
        outcomes
    }
}

fn count_ok(outcomes: &[Result<(), ServiceError>]) -> usize {
    outcomes.iter().filter(|o| o.is_ok()).count()
}

/// Two users race for the last seat.
pub async fn last_seat_goes_to_one_user(h: &Harness) {
    let event_id = h.event(1).await;
    let a = h.user("racer-a", Role::Participant).await;
    let b = h.user("racer-b", Role::Participant).await;

    let outcomes = h.enroll_all(event_id, &[a, b]).await;
    assert_eq!(count_ok(&outcomes), 1);
    let losers: Vec<_> = outcomes.into_iter().filter_map(Result::err).collect();
    assert_eq!(losers.len(), 1);
    assert!(losers.iter().all(|e| e.kind() == ErrorKind::CapacityExceeded));
    assert_eq!(h.seats(event_id).await, 1);
}

/// Many users race for a handful of seats.
pub async fn oversubscribed_event_fills_exactly(h: &Harness) {
    let event_id = h.event(10).await;
    let mut users = Vec::new();
    for i in 0..50 {
        users.push(h.user(&format!("fan-{i}"), Role::Participant).await);
    }

    let outcomes = h.enroll_all(event_id, &users).await;
    assert_eq!(count_ok(&outcomes), 10);
    assert!(
        outcomes
            .iter()
            .filter_map(|o| o.as_ref().err())
            .all(|e| e.kind() == ErrorKind::CapacityExceeded)
    );
    assert_eq!(h.seats(event_id).await, 10);
    let participants = assert_ok!(h.enrollments.list_participants(event_id).await);
    assert_eq!(participants.len(), 10);
}

/// One user submits the same enrollment twice at once.
pub async fn double_submit_enrolls_once(h: &Harness) {
    let event_id = h.event(5).await;
    let user = h.user("eager", Role::Participant).await;

    let outcomes = h.enroll_all(event_id, &[user, user]).await;
    assert_eq!(count_ok(&outcomes), 1);
    let dup = outcomes.into_iter().find_map(Result::err);
    assert!(dup.is_some_and(|e| e.kind() == ErrorKind::DuplicateEnrollment));
    assert_eq!(h.seats(event_id).await, 1);
}

/// Enrollments and cancellations interleave; the counter stays exact.
pub async fn churn_keeps_counter_exact(h: &Harness) {
    let event_id = h.event(8).await;
    let mut early = Vec::new();
    for i in 0..6 {
        early.push(h.user(&format!("early-{i}"), Role::Participant).await);
    }
    let outcomes = h.enroll_all(event_id, &early).await;
    assert_eq!(count_ok(&outcomes), 6);

    let mut late = Vec::new();
    for i in 0..10 {
        late.push(h.user(&format!("late-{i}"), Role::Participant).await);
    }

    let mut tasks = JoinSet::new();
    for &user_id in early.iter().take(4) {
        let service = Arc::clone(&h.enrollments);
        tasks.spawn(async move { service.cancel(event_id, user_id).await.map(|_| ()) });
    }
    for &user_id in &late {
        let service = Arc::clone(&h.enrollments);
        tasks.spawn(async move { service.enroll(event_id, user_id).await.map(|_| ()) });
    }
    while let Some(joined) = tasks.join_next().await {
        if let Err(err) = assert_ok!(joined) {
            assert_eq!(err.kind(), ErrorKind::CapacityExceeded, "{err}");
        }
    }

    let participants = assert_ok!(h.enrollments.list_participants(event_id).await);
    let holding = participants
        .iter()
        .filter(|p| p.status.occupies_seat())
        .count();
    let seats = h.seats(event_id).await;
    assert!(seats <= 8);
    assert_eq!(usize::try_from(seats).unwrap_or_default(), holding);

    let outcome = assert_ok!(h.events.reconcile_counter(event_id).await);
    assert!(!outcome.drifted());

    // Cancelled users stay locked out.
    let Some(&first) = early.first() else {
        panic!("no early users");
    };
    let err = assert_err!(h.enrollments.enroll(event_id, first).await);
    assert_eq!(err.kind(), ErrorKind::DuplicateEnrollment);
}
