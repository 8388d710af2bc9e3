//! User directory records.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::UserId;
use crate::error::ServiceError;

/// What a user is allowed to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    /// Browses and enrolls.
    Participant,
    /// Creates and manages own events.
    Organizer,
    /// Manages everything.
    Admin,
}

impl Role {
    /// Returns the lowercase storage representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Participant => "participant",
            Self::Organizer => "organizer",
            Self::Admin => "admin",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ServiceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "participant" => Ok(Self::Participant),
            "organizer" => Ok(Self::Organizer),
            "admin" => Ok(Self::Admin),
            other => Err(ServiceError::Internal(format!("unknown role: {other}"))),
        }
    }
}

/// A registered user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct User {
    /// User identifier.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Contact email, unique across users.
    pub email: String,
    /// Permission level.
    pub role: Role,
    /// Registration timestamp.
    pub created_at: DateTime<Utc>,
}

impl User {
    /// Builds a user from validated input.
    #[must_use]
    pub fn new(spec: NewUser, now: DateTime<Utc>) -> Self {
        Self {
            id: UserId::new(),
            name: spec.name.trim().to_string(),
            email: spec.email.trim().to_lowercase(),
            role: spec.role,
            created_at: now,
        }
    }

    /// Returns `true` for admins.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }

    /// Returns `true` if the user may create events.
    #[must_use]
    pub fn can_organize(&self) -> bool {
        matches!(self.role, Role::Organizer | Role::Admin)
    }

    /// Returns `true` if the user owns the event or is an admin.
    #[must_use]
    pub fn manages(&self, organizer_id: UserId) -> bool {
        self.is_admin() || self.id == organizer_id
    }

    /// Returns the public subset of this user.
    #[must_use]
    pub fn summary(&self) -> UserSummary {
        UserSummary {
            id: self.id,
            name: self.name.clone(),
            email: self.email.clone(),
        }
    }
}

/// Registration input.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewUser {
    /// Display name.
    pub name: String,
    /// Contact email.
    pub email: String,
    /// Permission level; defaults to participant.
    #[serde(default = "default_role")]
    pub role: Role,
}

fn default_role() -> Role {
    Role::Participant
}

impl NewUser {
    /// Checks name and email shape.
    ///
    /// # Errors
    ///
    /// Returns [`ServiceError::InvalidRequest`] on an empty name or an email
    /// without `@`.
    pub fn validate(&self) -> Result<(), ServiceError> {
        if self.name.trim().is_empty() {
            return Err(ServiceError::InvalidRequest("name must not be empty".to_string()));
        }
        let email = self.email.trim();
        match email.split_once('@') {
            Some((local, domain)) if !local.is_empty() && !domain.is_empty() => Ok(()),
            _ => Err(ServiceError::InvalidRequest(format!("invalid email: {email}"))),
        }
    }
}

/// Denormalized user data attached to enrollment views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct UserSummary {
    /// User identifier.
    pub id: UserId,
    /// Display name.
    pub name: String,
    /// Contact email.
    pub email: String,
}
