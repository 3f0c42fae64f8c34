use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Application-level constants
pub const APP_NAME: &str = "VolleyMed";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

pub const DEFAULT_BIND: &str = "127.0.0.1:8787";
pub const DEFAULT_MONITOR_INTERVAL_SECS: u64 = 300;
pub const DEFAULT_OCR_LATENCY_MS: u64 = 2000;

/// `RUST_LOG` fallback.
pub fn default_log_filter() -> &'static str {
    "volleymed=info,volleymed_lib=info,tower_http=info"
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Cannot determine home directory")]
    NoHomeDir,

    #[error("Invalid value for {key}: '{value}' ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Get the application data directory
/// ~/VolleyMed/ on all platforms
pub fn app_data_dir() -> Result<PathBuf, ConfigError> {
    let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
    Ok(home.join(APP_NAME))
}

/// Runtime settings for the server binary.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub database_path: PathBuf,
    pub storage_dir: PathBuf,
    pub bind: SocketAddr,
    /// `None` disables the background monitor.
    pub monitor_interval: Option<Duration>,
    pub ocr_latency: Duration,
    /// When set, OCR goes to this HTTP endpoint instead of the simulator.
    pub ocr_endpoint: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key/value source. Unset keys take defaults;
    /// malformed values are errors.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let database_path = match lookup("VOLLEYMED_DATABASE") {
            Some(path) => PathBuf::from(path),
            None => app_data_dir()?.join("volleymed.db"),
        };
        let storage_dir = match lookup("VOLLEYMED_STORAGE_DIR") {
            Some(path) => PathBuf::from(path),
            None => app_data_dir()?.join("storage"),
        };

        let bind_raw = lookup("VOLLEYMED_BIND").unwrap_or_else(|| DEFAULT_BIND.to_string());
        let bind = bind_raw.parse().map_err(|e: std::net::AddrParseError| ConfigError::Invalid {
            key: "VOLLEYMED_BIND",
            value: bind_raw.clone(),
            reason: e.to_string(),
        })?;

        let interval_secs = parse_u64(
            &lookup,
            "VOLLEYMED_MONITOR_INTERVAL_SECS",
            DEFAULT_MONITOR_INTERVAL_SECS,
        )?;
        let latency_ms = parse_u64(&lookup, "VOLLEYMED_OCR_LATENCY_MS", DEFAULT_OCR_LATENCY_MS)?;

        let ocr_endpoint = lookup("VOLLEYMED_OCR_ENDPOINT").filter(|s| !s.trim().is_empty());
        if let Some(endpoint) = &ocr_endpoint {
            if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
                return Err(ConfigError::Invalid {
                    key: "VOLLEYMED_OCR_ENDPOINT",
                    value: endpoint.clone(),
                    reason: "must be an http(s) URL".into(),
                });
            }
        }

        Ok(Self {
            database_path,
            storage_dir,
            bind,
            monitor_interval: (interval_secs > 0).then(|| Duration::from_secs(interval_secs)),
            ocr_latency: Duration::from_millis(latency_ms),
            ocr_endpoint,
        })
    }
}

fn parse_u64(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
    default: u64,
) -> Result<u64, ConfigError> {
    match lookup(key) {
        None => Ok(default),
        Some(raw) => raw.trim().parse().map_err(|e: std::num::ParseIntError| ConfigError::Invalid {
            key,
            value: raw,
            reason: e.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn config_from(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
        let env: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        AppConfig::from_lookup(|key| env.get(key).cloned())
    }

    #[test]
    fn app_data_dir_under_home() {
        let dir = app_data_dir().unwrap();
        let home = dirs::home_dir().unwrap();
        assert!(dir.starts_with(home));
        assert!(dir.ends_with("VolleyMed"));
    }

    #[test]
    fn defaults_apply() {
        let config = config_from(&[]).unwrap();
        assert_eq!(config.bind.to_string(), DEFAULT_BIND);
        assert_eq!(config.monitor_interval, Some(Duration::from_secs(300)));
        assert_eq!(config.ocr_latency, Duration::from_millis(2000));
        assert!(config.ocr_endpoint.is_none());
        assert!(config.database_path.ends_with("volleymed.db"));
    }

    #[test]
    fn overrides_apply() {
        let config = config_from(&[
            ("VOLLEYMED_DATABASE", "/tmp/vm.db"),
            ("VOLLEYMED_STORAGE_DIR", "/tmp/vm-files"),
            ("VOLLEYMED_BIND", "0.0.0.0:9000"),
            ("VOLLEYMED_MONITOR_INTERVAL_SECS", "0"),
            ("VOLLEYMED_OCR_LATENCY_MS", "5"),
            ("VOLLEYMED_OCR_ENDPOINT", "http://ocr.local/recognize"),
        ])
        .unwrap();
        assert_eq!(config.database_path, PathBuf::from("/tmp/vm.db"));
        assert_eq!(config.storage_dir, PathBuf::from("/tmp/vm-files"));
        assert_eq!(config.bind.port(), 9000);
        assert_eq!(config.monitor_interval, None);
        assert_eq!(config.ocr_latency, Duration::from_millis(5));
        assert_eq!(config.ocr_endpoint.as_deref(), Some("http://ocr.local/recognize"));
    }

    #[test]
    fn malformed_values_are_errors() {
        assert!(matches!(
            config_from(&[("VOLLEYMED_MONITOR_INTERVAL_SECS", "often")]),
            Err(ConfigError::Invalid { key: "VOLLEYMED_MONITOR_INTERVAL_SECS", .. })
        ));
        assert!(config_from(&[("VOLLEYMED_BIND", "localhost")]).is_err());
        assert!(config_from(&[("VOLLEYMED_OCR_ENDPOINT", "ftp://x")]).is_err());
    }

    #[test]
    fn app_name_is_volleymed() {
        assert_eq!(APP_NAME, "VolleyMed");
    }
}
