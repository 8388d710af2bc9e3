//! Per-connection subscription manager.
//!
//! Tracks which event IDs a WebSocket client follows and filters the
//! broadcast stream server-side.

use std::collections::HashSet;

use crate::domain::EventId;

/// Manages the set of event subscriptions for a single WebSocket connection.
#[derive(Debug, Default)]
pub struct SubscriptionManager {
    /// Subscribed event IDs. Ignored while `subscribe_all` is set.
    event_ids: HashSet<EventId>,
    /// Whether the client follows all events (wildcard `"*"`).
    subscribe_all: bool,
}

impl SubscriptionManager {
    /// Creates a new empty subscription manager.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds event IDs to the subscription set; `wildcard` enables `"*"`.
    pub fn subscribe(&mut self, ids: &[EventId], wildcard: bool) {
        if wildcard {
            self.subscribe_all = true;
        }
        self.event_ids.extend(ids.iter().copied());
    }

    /// Removes event IDs from the subscription set; `wildcard` clears `"*"`.
    pub fn unsubscribe(&mut self, ids: &[EventId], wildcard: bool) {
        if wildcard {
            self.subscribe_all = false;
        }
        for id in ids {
            self.event_ids.remove(id);
        }
    }

    /// Returns `true` if changes of `event_id` should be forwarded.
    #[must_use]
    pub fn matches(&self, event_id: EventId) -> bool {
        self.subscribe_all || self.event_ids.contains(&event_id)
    }

    /// Returns the number of explicitly subscribed event IDs.
    #[must_use]
    pub fn count(&self) -> usize {
        self.event_ids.len()
    }

    /// Returns `true` if the wildcard subscription is active.
    #[must_use]
    pub fn is_subscribed_all(&self) -> bool {
        self.subscribe_all
    }
}

/// Splits raw ids into parsed [`EventId`]s and a wildcard flag. Entries that
/// are neither `"*"` nor a UUID are returned as rejected.
#[must_use]
pub fn parse_event_ids(raw: &[String]) -> (Vec<EventId>, bool, Vec<String>) {
    let mut ids = Vec::new();
    let mut wildcard = false;
    let mut rejected = Vec::new();
    for s in raw {
        if s == "*" {
            wildcard = true;
        } else if let Ok(id) = s.parse::<EventId>() {
            ids.push(id);
        } else {
            rejected.push(s.clone());
        }
    }
    (ids, wildcard, rejected)
}
