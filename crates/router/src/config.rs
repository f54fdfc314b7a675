//! Router configuration: routing mode, shared exchange, and the events
//! enabled for pre-provisioning.
//!
//! Parsed from `fanout.toml` with `FANOUT_*` environment variable overrides.

mod loading;
mod types;
mod validation;


pub use types::RouterConfig;
