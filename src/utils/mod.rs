/// Tracing subscriber initialisation.
pub mod logging;
/// TOML configuration loading and validation.
pub mod toml_config;

pub use toml_config::{AppConfig, ConfigError};
