//! Settings parser for config.toml

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use gfxtrace_service::BootstrapTimeouts;
use rpclib_core::prelude::*;
use rpclib_rpc::{BroadcasterConfig, DEFAULT_MTU, DEFAULT_PROTOCOL_VERSION};

const CONFIG_FILENAME: &str = "config.toml";
const APP_DIR: &str = "gfxtrace";

/// Default replay server address.
pub const DEFAULT_ADDRESS: &str = "127.0.0.1:6700";

/// Contents of `config.toml`. Every key is optional.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub connection: ConnectionSettings,
    pub timeouts: TimeoutSettings,
}

/// `[connection]`
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ConnectionSettings {
    /// `host:port` of the replay server
    pub address: String,
    pub mtu: usize,
    pub protocol_version: u32,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self {
            address: DEFAULT_ADDRESS.to_string(),
            mtu: DEFAULT_MTU,
            protocol_version: DEFAULT_PROTOCOL_VERSION,
        }
    }
}

impl ConnectionSettings {
    pub fn broadcaster_config(&self) -> BroadcasterConfig {
        BroadcasterConfig {
            mtu: self.mtu,
            version: self.protocol_version,
        }
    }
}

/// `[timeouts]`, all in milliseconds.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutSettings {
    pub schema_ms: u64,
    pub features_ms: u64,
    pub string_table_ms: u64,
    pub device_ms: u64,
    pub device_retry_delay_ms: u64,
    pub device_max_retries: u32,
    pub capture_ms: u64,
}

impl Default for TimeoutSettings {
    fn default() -> Self {
        Self {
            schema_ms: 3000,
            features_ms: 3000,
            string_table_ms: 3000,
            device_ms: 3000,
            device_retry_delay_ms: 3000,
            device_max_retries: 30,
            capture_ms: 30000,
        }
    }
}

impl TimeoutSettings {
    pub fn bootstrap(&self) -> BootstrapTimeouts {
        BootstrapTimeouts {
            schema: Duration::from_millis(self.schema_ms),
            features: Duration::from_millis(self.features_ms),
            string_table: Duration::from_millis(self.string_table_ms),
            device: Duration::from_millis(self.device_ms),
            device_retry_delay: Duration::from_millis(self.device_retry_delay_ms),
            device_max_retries: self.device_max_retries,
            capture: Duration::from_millis(self.capture_ms),
        }
    }

    /// Deadline for a single one-off call from the command line.
    pub fn call(&self) -> Duration {
        Duration::from_millis(self.capture_ms)
    }
}

/// `<config dir>/gfxtrace/config.toml`
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILENAME))
}

/// Load settings from `path`, or from the default location when `None`.
///
/// A missing file yields defaults.
///
/// # Errors
///
/// [`Error::ConfigInvalid`] when the file exists but is not valid TOML for
/// these settings.
pub fn load_settings(path: Option<&Path>) -> Result<Settings> {
    let Some(config_path) = path.map(Path::to_path_buf).or_else(default_config_path) else {
        debug!("No config directory, using defaults");
        return Ok(Settings::default());
    };

    if !config_path.exists() {
        debug!("No config file at {:?}, using defaults", config_path);
        return Ok(Settings::default());
    }

    let content = std::fs::read_to_string(&config_path)
        .with_context(|| format!("Failed to read {}", config_path.display()))?;
    let settings = toml::from_str(&content).map_err(|e| {
        Error::config_invalid(format!("{}: {}", config_path.display(), e))
    })?;
    debug!("Loaded settings from {:?}", config_path);
    Ok(settings)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::{NamedTempFile, TempDir};

    fn write_config(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = TempDir::new().unwrap();
        let settings = load_settings(Some(&dir.path().join("none.toml"))).unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.connection.address, DEFAULT_ADDRESS);
        assert_eq!(settings.timeouts.device_max_retries, 30);
    }

    #[test]
    fn test_partial_file_keeps_remaining_defaults() {
        let file = write_config(
            r#"
[connection]
mtu = 4096

[timeouts]
capture_ms = 1000
"#,
        );
        let settings = load_settings(Some(file.path())).unwrap();
        assert_eq!(settings.connection.mtu, 4096);
        assert_eq!(settings.connection.address, DEFAULT_ADDRESS);
        assert_eq!(settings.timeouts.capture_ms, 1000);
        assert_eq!(settings.timeouts.schema_ms, 3000);
    }

    #[test]
    fn test_malformed_file_is_config_invalid() {
        let file = write_config("[connection]\nmtu = \"big\"\n");
        let err = load_settings(Some(file.path())).unwrap_err();
        assert!(matches!(err, Error::ConfigInvalid { .. }));
    }

    #[test]
    fn test_timeouts_convert_to_durations() {
        let timeouts = TimeoutSettings {
            device_retry_delay_ms: 250,
            ..Default::default()
        }
        .bootstrap();
        assert_eq!(timeouts.device_retry_delay, Duration::from_millis(250));
        assert_eq!(timeouts.capture, Duration::from_secs(30));
    }
}
