use crate::foundation::secs_to_nanos;
use serde::{Deserialize, Serialize};

/// Base configuration for the core.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Network mode: mainnet or testnet. Identities and wallets are scoped
    /// to this value and never shared across networks.
    #[serde(default)]
    pub network: Option<String>,
    /// Directory for the persistent registry store.
    #[serde(default)]
    pub data_dir: String,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Lifetime of a signing session before it expires, in seconds.
    #[serde(default = "default_session_timeout_secs")]
    pub timeout_secs: u64,
    /// Interval of the periodic expiry sweep, in seconds. The sweep is an
    /// optimization; expiry is also evaluated lazily on every read.
    #[serde(default = "default_sweep_interval_secs")]
    pub sweep_interval_secs: u64,
}

impl SessionConfig {
    /// Session lifetime in the nanosecond form the coordinator consumes.
    pub fn timeout_nanos(&self) -> u64 {
        secs_to_nanos(self.timeout_secs)
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self { timeout_secs: default_session_timeout_secs(), sweep_interval_secs: default_sweep_interval_secs() }
    }
}

fn default_session_timeout_secs() -> u64 {
    600
}

fn default_sweep_interval_secs() -> u64 {
    30
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Filter expression, e.g. `"info"`, `"tether_core=debug"`, `"root=warn"`.
    #[serde(default = "default_log_filters")]
    pub filters: String,
    /// Optional directory for rolling log files; console-only when absent.
    #[serde(default)]
    pub log_dir: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { filters: default_log_filters(), log_dir: None }
    }
}

fn default_log_filters() -> String {
    "info".to_string()
}
