use thiserror::Error;

/// Errors that can occur while resolving, provisioning or publishing.
#[derive(Debug, Error)]
pub enum RouterError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("config parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),

    #[error("config I/O error: {0}")]
    ConfigIo(#[from] std::io::Error),

    #[error("invalid event type: {0:?}")]
    InvalidEvent(String),

    #[error("invalid tenant id: {0:?}")]
    InvalidTenant(String),

    #[error("event '{event}' is listed in both '{first}' and '{second}'")]
    CategoryOverlap {
        event: String,
        first: String,
        second: String,
    },

    #[error("broker channel is not ready")]
    NotReady,

    #[error("broker gateway already attached")]
    AlreadyAttached,

    #[error("{kind} '{name}' already declared with different properties: {detail}")]
    DeclareConflict {
        kind: &'static str,
        name: String,
        detail: String,
    },

    #[error("{kind} '{name}' not found")]
    NotFound { kind: &'static str, name: String },

    #[error("publish failed: {0}")]
    Publish(String),

    #[error("broker error: {0}")]
    Broker(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
