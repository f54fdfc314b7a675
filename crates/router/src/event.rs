//! Event type tags and the universe of events the upstream sessions emit.
//!
//! Event names arrive in several spellings (`MESSAGES_UPSERT` from webhook
//! configuration, `messages.upsert` from the session layer). [`EventType`]
//! normalizes them on construction so every routing decision compares the
//! same canonical form: lowercase, word separators replaced by `.`.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::RouterError;

// ── Known events ──────────────────────────────────────────────────────────

pub const APPLICATION_STARTUP: &str = "application.startup";
pub const QRCODE_UPDATED: &str = "qrcode.updated";
pub const CONNECTION_UPDATE: &str = "connection.update";
pub const STATUS_INSTANCE: &str = "status.instance";
pub const MESSAGES_SET: &str = "messages.set";
pub const MESSAGES_UPSERT: &str = "messages.upsert";
pub const MESSAGES_EDITED: &str = "messages.edited";
pub const MESSAGES_UPDATE: &str = "messages.update";
pub const MESSAGES_DELETE: &str = "messages.delete";
pub const SEND_MESSAGE: &str = "send.message";
pub const CONTACTS_SET: &str = "contacts.set";
pub const CONTACTS_UPSERT: &str = "contacts.upsert";
pub const CONTACTS_UPDATE: &str = "contacts.update";
pub const PRESENCE_UPDATE: &str = "presence.update";
pub const CHATS_SET: &str = "chats.set";
pub const CHATS_UPDATE: &str = "chats.update";
pub const CHATS_UPSERT: &str = "chats.upsert";
pub const CHATS_DELETE: &str = "chats.delete";
pub const GROUPS_UPSERT: &str = "groups.upsert";
pub const GROUPS_UPDATE: &str = "groups.update";
pub const GROUP_PARTICIPANTS_UPDATE: &str = "group.participants.update";
pub const CALL: &str = "call";
pub const TYPEBOT_START: &str = "typebot.start";
pub const TYPEBOT_CHANGE_STATUS: &str = "typebot.change.status";
pub const LABELS_EDIT: &str = "labels.edit";
pub const LABELS_ASSOCIATION: &str = "labels.association";
pub const CREDS_UPDATE: &str = "creds.update";
pub const MESSAGING_HISTORY_SET: &str = "messaging.history.set";
pub const REMOVE_INSTANCE: &str = "remove.instance";
pub const LOGOUT_INSTANCE: &str = "logout.instance";

/// Every event the upstream sessions can emit, in declaration order.
///
/// Catch-all provisioning walks this list, so its order determines the order
/// in which catch-all bindings are asserted.
pub const KNOWN_EVENTS: &[&str] = &[
    APPLICATION_STARTUP,
    QRCODE_UPDATED,
    CONNECTION_UPDATE,
    STATUS_INSTANCE,
    MESSAGES_SET,
    MESSAGES_UPSERT,
    MESSAGES_EDITED,
    MESSAGES_UPDATE,
    MESSAGES_DELETE,
    SEND_MESSAGE,
    CONTACTS_SET,
    CONTACTS_UPSERT,
    CONTACTS_UPDATE,
    PRESENCE_UPDATE,
    CHATS_SET,
    CHATS_UPDATE,
    CHATS_UPSERT,
    CHATS_DELETE,
    GROUPS_UPSERT,
    GROUPS_UPDATE,
    GROUP_PARTICIPANTS_UPDATE,
    CALL,
    TYPEBOT_START,
    TYPEBOT_CHANGE_STATUS,
    LABELS_EDIT,
    LABELS_ASSOCIATION,
    CREDS_UPDATE,
    MESSAGING_HISTORY_SET,
    REMOVE_INSTANCE,
    LOGOUT_INSTANCE,
];

/// Iterate the known event universe as [`EventType`]s.
pub fn known_events() -> impl Iterator<Item = EventType> {
    KNOWN_EVENTS.iter().map(|e| EventType::from_normalized(e))
}

// ── EventType ─────────────────────────────────────────────────────────────

/// A normalized domain event tag, also used verbatim as the routing key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EventType(String);

impl EventType {
    /// Normalize and validate an event name.
    pub fn new(raw: impl AsRef<str>) -> Result<Self, RouterError> {
        let raw = raw.as_ref();
        let normalized = normalize(raw);
        if normalized.is_empty() || normalized.split('.').any(str::is_empty) {
            return Err(RouterError::InvalidEvent(raw.to_string()));
        }
        Ok(Self(normalized))
    }

    /// Wrap a name already in canonical form, such as a [`KNOWN_EVENTS`] entry.
    pub(crate) fn from_normalized(name: &str) -> Self {
        Self(name.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this event is part of [`KNOWN_EVENTS`].
    pub fn is_known(&self) -> bool {
        KNOWN_EVENTS.contains(&self.0.as_str())
    }
}

fn normalize(raw: &str) -> String {
    raw.trim()
        .chars()
        .map(|c| match c {
            '_' | '-' => '.',
            other => other.to_ascii_lowercase(),
        })
        .collect()
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for EventType {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl FromStr for EventType {
    type Err = RouterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for EventType {
    type Error = RouterError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<EventType> for String {
    fn from(value: EventType) -> Self {
        value.0
    }
}

// ── TenantId ──────────────────────────────────────────────────────────────

/// Identifier of a subscriber session. Names the exchange and queues in
/// isolated mode, so it must be non-empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TenantId(String);

impl TenantId {
    pub fn new(raw: impl Into<String>) -> Result<Self, RouterError> {
        let raw = raw.into();
        if raw.trim().is_empty() {
            return Err(RouterError::InvalidTenant(raw));
        }
        Ok(Self(raw))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TenantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for TenantId {
    type Err = RouterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for TenantId {
    type Error = RouterError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<TenantId> for String {
    fn from(value: TenantId) -> Self {
        value.0
    }
}

/// Parse a list of raw event names, failing on the first invalid one.
pub fn parse_events<I, S>(raw: I) -> Result<Vec<EventType>, RouterError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    raw.into_iter().map(EventType::new).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_screaming_snake_case() {
        let e = EventType::new("MESSAGES_UPSERT").unwrap();
        assert_eq!(e.as_str(), "messages.upsert");
        assert_eq!(e, EventType::new("messages.upsert").unwrap());
    }

    #[test]
    fn normalizes_hyphenated_names() {
        let e = EventType::new("group-participants.update").unwrap();
        assert_eq!(e.as_str(), GROUP_PARTICIPANTS_UPDATE);
        assert_eq!(e, EventType::new("GROUP_PARTICIPANTS_UPDATE").unwrap());
    }

    #[test]
    fn rejects_empty_and_degenerate_names() {
        assert!(EventType::new("").is_err());
        assert!(EventType::new("   ").is_err());
        assert!(EventType::new("messages..upsert").is_err());
        assert!(EventType::new("_").is_err());
    }

    #[test]
    fn known_universe_is_already_normalized_and_unique() {
        let mut seen = std::collections::HashSet::new();
        for raw in KNOWN_EVENTS {
            let e = EventType::new(raw).unwrap();
            assert_eq!(e.as_str(), *raw);
            assert!(seen.insert(e), "duplicate known event {raw}");
        }
        assert_eq!(known_events().count(), KNOWN_EVENTS.len());
    }

    #[test]
    fn deserializes_through_normalization() {
        let e: EventType = serde_json::from_str("\"CHATS_UPDATE\"").unwrap();
        assert_eq!(e.as_str(), "chats.update");
        assert!(serde_json::from_str::<EventType>("\"\"").is_err());
    }

    #[test]
    fn tenant_id_rejects_blank() {
        assert!(TenantId::new("").is_err());
        assert!(TenantId::new("  ").is_err());
        assert_eq!(TenantId::new("acct1").unwrap().as_str(), "acct1");
    }

    #[test]
    fn parse_events_fails_fast() {
        assert_eq!(parse_events(["CALL", "chats.set"]).unwrap().len(), 2);
        assert!(parse_events(["CALL", ""]).is_err());
    }
}
