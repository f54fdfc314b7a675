use std::path::Path;

use crate::error::RouterError;
use crate::event::EventType;
use crate::topology::RoutingMode;

use super::types::RouterConfig;

impl RouterConfig {
    /// Parse config from a TOML string, applying `FANOUT_*` environment overrides.
    pub fn from_toml(toml_str: &str) -> Result<Self, RouterError> {
        Self::from_toml_with(toml_str, |key| std::env::var(key).ok())
    }

    /// Parse config from a TOML string, taking overrides from `lookup`.
    pub fn from_toml_with(toml_str: &str, lookup: impl Fn(&str) -> Option<String>) -> Result<Self, RouterError> {
        let mut config: Self = toml::from_str(toml_str)?;
        config.apply_overrides(lookup);
        config.validate()?;
        Ok(config)
    }

    /// Load config from a file path.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, RouterError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml(&content)
    }

    /// Defaults plus environment overrides, for deployments without a file.
    pub fn from_env() -> Result<Self, RouterError> {
        let mut config = Self::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// The parsed routing mode.
    pub fn routing_mode(&self) -> Result<RoutingMode, RouterError> {
        self.mode.parse()
    }

    /// Events switched on in the `[events]` table, normalized.
    pub fn enabled_events(&self) -> Result<Vec<EventType>, RouterError> {
        self.events
            .iter()
            .filter(|(_, enabled)| **enabled)
            .map(|(name, _)| EventType::new(name))
            .collect()
    }

    // ── Environment variable overrides ──────────────────────────────

    /// Apply environment variable overrides.
    ///
    /// - `FANOUT_MODE` -> `mode`
    /// - `FANOUT_EXCHANGE_NAME` -> `exchange_name`
    /// - `FANOUT_SERVER_URL` -> `server_url`
    /// - `FANOUT_GLOBAL_QUEUES` -> `global_queues`
    pub(crate) fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    pub(crate) fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(v) = lookup("FANOUT_MODE") {
            self.mode = v;
        }
        if let Some(v) = lookup("FANOUT_EXCHANGE_NAME") {
            if !v.is_empty() {
                self.exchange_name = v;
            }
        }
        if let Some(v) = lookup("FANOUT_SERVER_URL") {
            self.server_url = v;
        }
        if let Some(v) = lookup("FANOUT_GLOBAL_QUEUES") {
            if let Ok(flag) = v.parse::<bool>() {
                self.global_queues = flag;
            }
        }
    }
}
