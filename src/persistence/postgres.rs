//! PostgreSQL implementation of [`EnrollmentStore`].
//!
//! Every state-changing operation runs in one transaction. The event row is
//! locked first with `SELECT ... FOR UPDATE`, then the enrollment row, so
//! concurrent work on the same event is serialized and lock order never
//! inverts. Dropping a [`sqlx::Transaction`] without committing rolls it back;
//! every early `?` return therefore aborts all writes of the unit.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use super::models::{
    ENROLLMENT_COLUMNS, EVENT_COLUMNS, EnrollmentRow, EnrollmentWithUserRow, EventRow, UserRow,
    to_db_count,
};
use super::{EnrollmentStore, SeatChange, StoreResult};
use crate::config::ServiceConfig;
use crate::domain::{
    CounterReconciliation, Enrollment, EnrollmentId, Event, EventFilter, EventId, EventPatch,
    Participant, RefundCandidate, RefundQueueEntry, StatusTransition, User, UserId,
};
use crate::error::ServiceError;

const ENROLLMENT_WITH_USER: &str = "SELECT en.id, en.user_id, en.event_id, en.status, \
     en.enrolled_at, en.updated_at, u.name AS user_name, u.email AS user_email \
     FROM enrollments en JOIN users u ON u.id = en.user_id";

/// PostgreSQL-backed store using a `sqlx::PgPool`.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    /// Wraps an existing connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Opens a connection pool sized from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Persistence`] if the database is unreachable.
    pub async fn connect(config: &ServiceConfig) -> StoreResult<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(config.database_max_connections)
            .min_connections(config.database_min_connections)
            .acquire_timeout(Duration::from_secs(config.database_connect_timeout_secs))
            .connect(&config.database_url)
            .await?;
        Ok(Self::new(pool))
    }

    /// Applies the embedded migrations in `migrations/`.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::Persistence`] if a migration fails.
    pub async fn migrate(&self) -> StoreResult<()> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| ServiceError::Persistence(e.to_string()))
    }
}

/// Loads and row-locks an event for the rest of the transaction.
async fn lock_event(conn: &mut PgConnection, event_id: EventId) -> StoreResult<Event> {
    let sql = format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = $1 FOR UPDATE");
    let row: Option<EventRow> = sqlx::query_as(&sql)
        .bind(Uuid::from(event_id))
        .fetch_optional(&mut *conn)
        .await?;
    row.ok_or(ServiceError::EventNotFound(event_id))?
        .try_into()
}

async fn user_exists(conn: &mut PgConnection, user_id: UserId) -> StoreResult<bool> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM users WHERE id = $1)")
        .bind(Uuid::from(user_id))
        .fetch_one(&mut *conn)
        .await?;
    Ok(exists)
}

/// Persists a status change on an enrollment whose event row is already
/// locked, releasing the seat when the enrollment gives it up.
async fn apply_transition(
    conn: &mut PgConnection,
    mut event: Event,
    mut enrollment: Enrollment,
    transition: StatusTransition,
    now: DateTime<Utc>,
) -> StoreResult<SeatChange> {
    let previous = enrollment.transition(transition, now)?;

    sqlx::query("UPDATE enrollments SET status = $2, updated_at = $3 WHERE id = $1")
        .bind(Uuid::from(enrollment.id))
        .bind(enrollment.status.as_str())
        .bind(now)
        .execute(&mut *conn)
        .await?;

    if previous.occupies_seat() && !enrollment.status.occupies_seat() {
        event.release_seat(now);
        sqlx::query(
            "UPDATE events SET current_enrollments = GREATEST(current_enrollments - 1, 0), \
             updated_at = $2 WHERE id = $1",
        )
        .bind(Uuid::from(event.id))
        .bind(now)
        .execute(&mut *conn)
        .await?;
    }

    Ok(SeatChange { enrollment, event })
}

/// Maps a failed enrollment insert. The pair constraint catches a racing
/// duplicate that slipped past the in-transaction lookup.
fn enrollment_insert_error(err: sqlx::Error, event_id: EventId, user_id: UserId) -> ServiceError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            return ServiceError::AlreadyEnrolled { event_id, user_id };
        }
        if db.is_foreign_key_violation() {
            return ServiceError::UserNotFound(user_id);
        }
    }
    err.into()
}

#[async_trait]
impl EnrollmentStore for PostgresStore {
    async fn create_user(&self, user: User) -> StoreResult<User> {
        let result = sqlx::query(
            "INSERT INTO users (id, name, email, role, created_at) VALUES ($1, $2, $3, $4, $5)",
        )
        .bind(Uuid::from(user.id))
        .bind(&user.name)
        .bind(&user.email)
        .bind(user.role.as_str())
        .bind(user.created_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(user),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => Err(
                ServiceError::Conflict(format!("email {} is already registered", user.email)),
            ),
            Err(e) => Err(e.into()),
        }
    }

    async fn get_user(&self, user_id: UserId) -> StoreResult<User> {
        let row: Option<UserRow> =
            sqlx::query_as("SELECT id, name, email, role, created_at FROM users WHERE id = $1")
                .bind(Uuid::from(user_id))
                .fetch_optional(&self.pool)
                .await?;
        row.ok_or(ServiceError::UserNotFound(user_id))?.try_into()
    }

    async fn create_event(&self, event: Event) -> StoreResult<Event> {
        let result = sqlx::query(
            "INSERT INTO events (id, organizer_id, title, description, location, starts_at, \
             capacity, current_enrollments, status, sales_closed, created_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)",
        )
        .bind(Uuid::from(event.id))
        .bind(Uuid::from(event.organizer_id))
        .bind(&event.title)
        .bind(&event.description)
        .bind(&event.location)
        .bind(event.starts_at)
        .bind(to_db_count(event.capacity)?)
        .bind(to_db_count(event.current_enrollments)?)
        .bind(event.status.as_str())
        .bind(event.sales_closed)
        .bind(event.created_at)
        .bind(event.updated_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(event),
            Err(sqlx::Error::Database(db)) if db.is_foreign_key_violation() => {
                Err(ServiceError::UserNotFound(event.organizer_id))
            }
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => Err(
                ServiceError::Conflict(format!("event {} already exists", event.id)),
            ),
            Err(e) => Err(e.into()),
        }
    }

    async fn get_event(&self, event_id: EventId) -> StoreResult<Event> {
        let sql = format!("SELECT {EVENT_COLUMNS} FROM events WHERE id = $1");
        let row: Option<EventRow> = sqlx::query_as(&sql)
            .bind(Uuid::from(event_id))
            .fetch_optional(&self.pool)
            .await?;
        row.ok_or(ServiceError::EventNotFound(event_id))?
            .try_into()
    }

    async fn list_events(&self, filter: EventFilter) -> StoreResult<Vec<Event>> {
        let sql = format!(
            "SELECT {EVENT_COLUMNS} FROM events \
             WHERE ($1::text IS NULL OR status = $1) \
               AND ($2::uuid IS NULL OR organizer_id = $2) \
             ORDER BY starts_at, id"
        );
        let rows: Vec<EventRow> = sqlx::query_as(&sql)
            .bind(filter.status.map(|s| s.as_str()))
            .bind(filter.organizer_id.map(Uuid::from))
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(Event::try_from).collect()
    }

    async fn update_event(
        &self,
        event_id: EventId,
        patch: EventPatch,
        now: DateTime<Utc>,
    ) -> StoreResult<Event> {
        let mut tx = self.pool.begin().await?;
        let mut event = lock_event(&mut tx, event_id).await?;
        event.apply_patch(&patch, now)?;

        sqlx::query(
            "UPDATE events SET title = $2, description = $3, location = $4, starts_at = $5, \
             capacity = $6, status = $7, sales_closed = $8, updated_at = $9 WHERE id = $1",
        )
        .bind(Uuid::from(event.id))
        .bind(&event.title)
        .bind(&event.description)
        .bind(&event.location)
        .bind(event.starts_at)
        .bind(to_db_count(event.capacity)?)
        .bind(event.status.as_str())
        .bind(event.sales_closed)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(event)
    }

    async fn delete_event(&self, event_id: EventId) -> StoreResult<()> {
        let mut tx = self.pool.begin().await?;
        lock_event(&mut tx, event_id).await?;

        let blocking: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM enrollments WHERE event_id = $1 AND status <> 'refunded'",
        )
        .bind(Uuid::from(event_id))
        .fetch_one(&mut *tx)
        .await?;
        if blocking > 0 {
            return Err(ServiceError::Conflict(format!(
                "event {event_id} still has {blocking} enrollment(s) that are not refunded"
            )));
        }

        sqlx::query("DELETE FROM events WHERE id = $1")
            .bind(Uuid::from(event_id))
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        Ok(())
    }

    async fn reconcile_counter(
        &self,
        event_id: EventId,
        now: DateTime<Utc>,
    ) -> StoreResult<CounterReconciliation> {
        let mut tx = self.pool.begin().await?;
        let event = lock_event(&mut tx, event_id).await?;

        let holders: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM enrollments \
             WHERE event_id = $1 AND status IN ('confirmed', 'attended')",
        )
        .bind(Uuid::from(event_id))
        .fetch_one(&mut *tx)
        .await?;
        let current = u32::try_from(holders)
            .map_err(|_| ServiceError::Internal(format!("seat count out of range: {holders}")))?;

        if current != event.current_enrollments {
            sqlx::query(
                "UPDATE events SET current_enrollments = $2, updated_at = $3 WHERE id = $1",
            )
            .bind(Uuid::from(event_id))
            .bind(to_db_count(current)?)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        Ok(CounterReconciliation {
            event_id,
            previous: event.current_enrollments,
            current,
        })
    }

    async fn enroll(
        &self,
        event_id: EventId,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> StoreResult<SeatChange> {
        let mut tx = self.pool.begin().await?;
        let mut event = lock_event(&mut tx, event_id).await?;
        if !user_exists(&mut tx, user_id).await? {
            return Err(ServiceError::UserNotFound(user_id));
        }

        let sql = format!(
            "SELECT {ENROLLMENT_COLUMNS} FROM enrollments WHERE event_id = $1 AND user_id = $2"
        );
        let existing: Option<EnrollmentRow> = sqlx::query_as(&sql)
            .bind(Uuid::from(event_id))
            .bind(Uuid::from(user_id))
            .fetch_optional(&mut *tx)
            .await?;
        let existing = existing.map(Enrollment::try_from).transpose()?;

        let enrollment = event.admit(user_id, existing.as_ref(), now)?;

        sqlx::query(
            "INSERT INTO enrollments (id, user_id, event_id, status, enrolled_at, updated_at) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(Uuid::from(enrollment.id))
        .bind(Uuid::from(user_id))
        .bind(Uuid::from(event_id))
        .bind(enrollment.status.as_str())
        .bind(enrollment.enrolled_at)
        .bind(enrollment.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| enrollment_insert_error(e, event_id, user_id))?;

        let claimed = sqlx::query(
            "UPDATE events SET current_enrollments = current_enrollments + 1, updated_at = $2 \
             WHERE id = $1 AND current_enrollments < capacity",
        )
        .bind(Uuid::from(event_id))
        .bind(now)
        .execute(&mut *tx)
        .await?;
        if claimed.rows_affected() != 1 {
            return Err(ServiceError::CapacityExceeded {
                event_id,
                capacity: event.capacity,
            });
        }

        tx.commit().await?;
        Ok(SeatChange { enrollment, event })
    }

    async fn cancel(
        &self,
        event_id: EventId,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> StoreResult<SeatChange> {
        let mut tx = self.pool.begin().await?;
        let event = lock_event(&mut tx, event_id).await?;

        let sql = format!(
            "SELECT {ENROLLMENT_COLUMNS} FROM enrollments \
             WHERE event_id = $1 AND user_id = $2 FOR UPDATE"
        );
        let row: Option<EnrollmentRow> = sqlx::query_as(&sql)
            .bind(Uuid::from(event_id))
            .bind(Uuid::from(user_id))
            .fetch_optional(&mut *tx)
            .await?;
        let enrollment = row
            .ok_or(ServiceError::NotEnrolled { event_id, user_id })?
            .try_into()?;

        let change =
            apply_transition(&mut tx, event, enrollment, StatusTransition::Cancel, now).await?;
        tx.commit().await?;
        Ok(change)
    }

    async fn transition_enrollment(
        &self,
        enrollment_id: EnrollmentId,
        transition: StatusTransition,
        now: DateTime<Utc>,
    ) -> StoreResult<SeatChange> {
        let mut tx = self.pool.begin().await?;

        let event_id: Option<Uuid> =
            sqlx::query_scalar("SELECT event_id FROM enrollments WHERE id = $1")
                .bind(Uuid::from(enrollment_id))
                .fetch_optional(&mut *tx)
                .await?;
        let event_id =
            EventId::from_uuid(event_id.ok_or(ServiceError::EnrollmentNotFound(enrollment_id))?);
        let event = lock_event(&mut tx, event_id)
            .await
            .map_err(|e| match e {
                ServiceError::EventNotFound(_) => ServiceError::EnrollmentNotFound(enrollment_id),
                other => other,
            })?;

        // Re-read under the event lock; the row may have changed meanwhile.
        let sql = format!("SELECT {ENROLLMENT_COLUMNS} FROM enrollments WHERE id = $1 FOR UPDATE");
        let row: Option<EnrollmentRow> = sqlx::query_as(&sql)
            .bind(Uuid::from(enrollment_id))
            .fetch_optional(&mut *tx)
            .await?;
        let enrollment = row
            .ok_or(ServiceError::EnrollmentNotFound(enrollment_id))?
            .try_into()?;

        let change = apply_transition(&mut tx, event, enrollment, transition, now).await?;
        tx.commit().await?;
        Ok(change)
    }

    async fn get_enrollment(&self, enrollment_id: EnrollmentId) -> StoreResult<Enrollment> {
        let sql = format!("SELECT {ENROLLMENT_COLUMNS} FROM enrollments WHERE id = $1");
        let row: Option<EnrollmentRow> = sqlx::query_as(&sql)
            .bind(Uuid::from(enrollment_id))
            .fetch_optional(&self.pool)
            .await?;
        row.ok_or(ServiceError::EnrollmentNotFound(enrollment_id))?
            .try_into()
    }

    async fn list_participants(&self, event_id: EventId) -> StoreResult<Vec<Participant>> {
        let exists: bool = sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM events WHERE id = $1)")
            .bind(Uuid::from(event_id))
            .fetch_one(&self.pool)
            .await?;
        if !exists {
            return Err(ServiceError::EventNotFound(event_id));
        }

        let sql = format!("{ENROLLMENT_WITH_USER} WHERE en.event_id = $1 ORDER BY en.enrolled_at, en.id");
        let rows: Vec<EnrollmentWithUserRow> = sqlx::query_as(&sql)
            .bind(Uuid::from(event_id))
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(Participant::try_from).collect()
    }

    async fn list_refund_candidates(
        &self,
        organizer_id: UserId,
    ) -> StoreResult<Vec<RefundQueueEntry>> {
        // One snapshot for both reads, so every candidate has its event.
        let mut tx = self.pool.begin().await?;
        sqlx::query("SET TRANSACTION ISOLATION LEVEL REPEATABLE READ")
            .execute(&mut *tx)
            .await?;

        let sql = format!(
            "SELECT {EVENT_COLUMNS} FROM events ev WHERE ev.organizer_id = $1 AND EXISTS \
             (SELECT 1 FROM enrollments c WHERE c.event_id = ev.id AND c.status = 'cancelled') \
             ORDER BY ev.starts_at, ev.id"
        );
        let events: Vec<EventRow> = sqlx::query_as(&sql)
            .bind(Uuid::from(organizer_id))
            .fetch_all(&mut *tx)
            .await?;

        let sql = format!(
            "{ENROLLMENT_WITH_USER} JOIN events ev ON ev.id = en.event_id \
             WHERE ev.organizer_id = $1 AND en.status = 'cancelled' \
             ORDER BY en.enrolled_at, en.id"
        );
        let rows: Vec<EnrollmentWithUserRow> = sqlx::query_as(&sql)
            .bind(Uuid::from(organizer_id))
            .fetch_all(&mut *tx)
            .await?;
        tx.commit().await?;

        let mut by_event: HashMap<EventId, Vec<RefundCandidate>> = HashMap::new();
        for row in rows {
            let candidate = RefundCandidate::try_from(row)?;
            by_event
                .entry(candidate.enrollment.event_id)
                .or_default()
                .push(candidate);
        }

        let mut queue = Vec::with_capacity(events.len());
        for row in events {
            let event = Event::try_from(row)?;
            if let Some(candidates) = by_event.remove(&event.id) {
                queue.push(RefundQueueEntry { event, candidates });
            }
        }
        Ok(queue)
    }

    async fn health_check(&self) -> StoreResult<()> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.pool)
            .await?;
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "postgres"
    }
}
