mod loader;
mod types;

pub use loader::{load_config, load_config_from_file};
pub use types::{AppConfig, LoggingConfig, SessionConfig};
