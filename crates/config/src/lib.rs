//! Gateway configuration: schema, file discovery, environment overrides.
//!
//! Precedence, lowest to highest: built-in defaults, `hubgate.toml`
//! (project-local, then user-global), `HUBGATE_*` environment variables.

pub mod loader;
pub mod schema;

pub use {
    loader::{discover_and_load, load_config, set_config_dir},
    schema::{HubConfig, HubgateConfig, ServerConfig},
};
