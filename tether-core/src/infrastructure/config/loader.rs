//! Configuration loader using Figment for layered config management.
//!
//! Precedence (lowest to highest):
//! 1. Compiled defaults
//! 2. TOML config file
//! 3. Environment variables (TETHER_* prefix)

use crate::foundation::{NetworkId, TetherError, MAX_SESSION_DURATION_NS, MIN_SESSION_DURATION_NS, NANOS_PER_SECOND};
use crate::infrastructure::config::types::AppConfig;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use log::{debug, info};
use std::path::Path;

/// Environment variable prefix for config overrides.
///
/// Example: `TETHER_SESSION__TIMEOUT_SECS` -> `session.timeout_secs`
const ENV_PREFIX: &str = "TETHER_";

const CONFIG_FILE_NAME: &str = "tether-config.toml";

/// Load configuration from the default file in `data_dir` (`tether-config.toml`).
pub fn load_config(data_dir: &Path) -> Result<AppConfig, TetherError> {
    load_config_from_file(&data_dir.join(CONFIG_FILE_NAME), data_dir)
}

/// Load configuration from a specific file path.
pub fn load_config_from_file(path: &Path, data_dir: &Path) -> Result<AppConfig, TetherError> {
    info!("loading configuration path={} data_dir={}", path.display(), data_dir.display());
    let figment = Figment::from(Serialized::defaults(AppConfig::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).split("__"));
    let mut config: AppConfig =
        figment.extract().map_err(|e| TetherError::ConfigError(format!("config extraction failed: {e}")))?;
    if config.data_dir.trim().is_empty() {
        config.data_dir = data_dir.display().to_string();
    }
    validate(&config)?;
    debug!(
        "configuration loaded network={} data_dir={} session_timeout_secs={}",
        config.network.as_deref().unwrap_or("mainnet"),
        config.data_dir,
        config.session.timeout_secs
    );
    Ok(config)
}

fn validate(config: &AppConfig) -> Result<(), TetherError> {
    if let Some(network) = config.network.as_deref() {
        network.parse::<NetworkId>()?;
    }
    let timeout_ns = config.session.timeout_nanos();
    if timeout_ns < MIN_SESSION_DURATION_NS || timeout_ns > MAX_SESSION_DURATION_NS {
        return Err(TetherError::ConfigError(format!(
            "session.timeout_secs out of range: {} (allowed {}..={})",
            config.session.timeout_secs,
            MIN_SESSION_DURATION_NS / NANOS_PER_SECOND,
            MAX_SESSION_DURATION_NS / NANOS_PER_SECOND
        )));
    }
    if config.session.sweep_interval_secs == 0 {
        return Err(TetherError::ConfigError("session.sweep_interval_secs must be positive".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn defaults_apply_without_file() {
        let dir = TempDir::new().expect("tempdir");
        let config = load_config(dir.path()).expect("load");
        assert_eq!(config.session.timeout_secs, 600);
        assert_eq!(config.session.timeout_nanos(), 600 * 1_000_000_000);
        assert_eq!(config.logging.filters, "info");
        assert_eq!(config.data_dir, dir.path().display().to_string());
    }

    #[test]
    fn file_overrides_defaults() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "network = \"testnet\"\n\n[session]\ntimeout_secs = 120\n").expect("write config");

        let config = load_config(dir.path()).expect("load");
        assert_eq!(config.network.as_deref(), Some("testnet"));
        assert_eq!(config.session.timeout_secs, 120);
    }

    #[test]
    fn out_of_range_timeout_is_rejected() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "[session]\ntimeout_secs = 2\n").expect("write config");

        let err = load_config(dir.path()).expect_err("must reject");
        assert!(matches!(err, TetherError::ConfigError(_)));
    }

    #[test]
    fn unknown_network_is_rejected() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "network = \"devnet\"\n").expect("write config");

        let err = load_config(dir.path()).expect_err("must reject");
        assert!(matches!(err, TetherError::InvalidNetwork(_)));
    }
}
