use chrono::{DateTime, FixedOffset, Local, SecondsFormat};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::event::{EventType, TenantId};

/// JSON body published for every event occurrence.
///
/// Consumers read `event` and `instance` to demultiplex shared queues, so both
/// are always present. `apikey` is omitted entirely when the tenant has none.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Normalized event type, identical to the routing key.
    pub event: String,

    /// Tenant the event belongs to.
    pub instance: String,

    /// Event payload, passed through untouched.
    pub data: Value,

    /// Public URL of the service that produced the event.
    pub server_url: String,

    /// Local wall-clock time with an explicit UTC offset.
    pub date_time: String,

    /// Identifier of the account that triggered the event.
    pub sender: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub apikey: Option<String>,
}

impl Envelope {
    /// Build an envelope stamped with the current local time.
    pub fn new(
        event: &EventType,
        tenant: &TenantId,
        data: Value,
        server_url: impl Into<String>,
        sender: impl Into<String>,
        apikey: Option<String>,
    ) -> Self {
        Self::at(event, tenant, data, server_url, sender, apikey, Local::now().fixed_offset())
    }

    /// Build an envelope with an explicit timestamp.
    pub fn at(
        event: &EventType,
        tenant: &TenantId,
        data: Value,
        server_url: impl Into<String>,
        sender: impl Into<String>,
        apikey: Option<String>,
        now: DateTime<FixedOffset>,
    ) -> Self {
        Self {
            event: event.to_string(),
            instance: tenant.to_string(),
            data,
            server_url: server_url.into(),
            date_time: now.to_rfc3339_opts(SecondsFormat::Millis, false),
            sender: sender.into(),
            apikey: apikey.filter(|k| !k.is_empty()),
        }
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}
