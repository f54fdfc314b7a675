use super::types::RouterConfig;
use crate::error::RouterError;
use crate::event::EventType;

impl RouterConfig {
    /// Validate the config: mode, exchange name and event keys.
    pub fn validate(&self) -> Result<(), RouterError> {
        self.routing_mode()?;
        self.validate_exchange_name()?;
        self.validate_event_keys()?;
        Ok(())
    }

    fn validate_exchange_name(&self) -> Result<(), RouterError> {
        if self.exchange_name.trim().is_empty() {
            return Err(RouterError::Configuration(
                "exchange_name must not be empty".into(),
            ));
        }
        Ok(())
    }

    fn validate_event_keys(&self) -> Result<(), RouterError> {
        for name in self.events.keys() {
            EventType::new(name).map_err(|_| {
                RouterError::Configuration(format!("invalid event name '{name}' in [events]"))
            })?;
        }
        Ok(())
    }
}
