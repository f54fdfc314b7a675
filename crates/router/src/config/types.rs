use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::topology::DEFAULT_EXCHANGE;

/// Full configuration for the event router.
///
/// Read once at startup. `mode` is kept as the raw string so an invalid value
/// is reported through [`RouterError::Configuration`](crate::RouterError)
/// rather than as a TOML type error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RouterConfig {
    /// Routing mode: "isolated", "single" or "global".
    #[serde(default = "default_mode")]
    pub mode: String,

    /// Shared exchange used by single and global modes.
    #[serde(default = "default_exchange_name")]
    pub exchange_name: String,

    /// Public URL stamped into every envelope as `server_url`.
    #[serde(default)]
    pub server_url: String,

    /// Pre-provision one queue per enabled event at startup.
    #[serde(default)]
    pub global_queues: bool,

    /// Event name → enabled. Keys use the configuration spelling
    /// (`MESSAGES_UPSERT`) and are normalized when used.
    #[serde(default)]
    pub events: BTreeMap<String, bool>,
}

fn default_mode() -> String {
    "isolated".into()
}

fn default_exchange_name() -> String {
    DEFAULT_EXCHANGE.into()
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            mode: default_mode(),
            exchange_name: default_exchange_name(),
            server_url: String::new(),
            global_queues: false,
            events: BTreeMap::new(),
        }
    }
}
