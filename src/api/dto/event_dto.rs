//! Event request/response DTOs.

use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::{Event, EventFilter, EventStatus, UserId};

/// Query parameters for `GET /events`.
#[derive(Debug, Clone, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct EventListQuery {
    /// Only events in this status.
    pub status: Option<EventStatus>,
    /// Only events owned by this organizer.
    #[param(value_type = Option<uuid::Uuid>)]
    pub organizer_id: Option<UserId>,
}

impl From<EventListQuery> for EventFilter {
    fn from(query: EventListQuery) -> Self {
        Self {
            status: query.status,
            organizer_id: query.organizer_id,
        }
    }
}

/// Response body for `GET /events`.
#[derive(Debug, Serialize, ToSchema)]
pub struct EventListResponse {
    /// Events ordered by start date.
    pub data: Vec<Event>,
    /// Number of events returned.
    pub total: usize,
}

impl From<Vec<Event>> for EventListResponse {
    fn from(data: Vec<Event>) -> Self {
        Self {
            total: data.len(),
            data,
        }
    }
}
