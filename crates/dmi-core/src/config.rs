use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use url::Url;

use crate::error::ConfigError;

/// Default DMI MetObs gateway.
pub const DEFAULT_API_URL: &str = "https://dmigw.govcloud.dk/metObs/v1";

/// DMI publishes new observations every 10 minutes.
pub const DEFAULT_REFRESH_MINUTES: u32 = 10;

/// Name the platform registers under with the host.
pub const PLATFORM_NAME: &str = "DMI";

/// Environment variable overriding the config file location.
pub const CONFIG_PATH_ENV: &str = "DMI_BRIDGE_CONFIG";

/// Environment variable overriding `metobs.api_key`.
pub const API_KEY_ENV: &str = "DMI_API_KEY";

const API_KEY_PLACEHOLDER: &str = "YOUR_DMI_API_KEY";

/// Configuration validation errors
#[derive(Debug, Clone)]
pub struct ConfigValidationError {
    pub field: String,
    pub message: String,
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Result of config validation
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationResult {
    /// Returns true if there are no errors (warnings are OK)
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Add an error
    pub fn add_error(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Add a warning
    pub fn add_warning(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            field: field.into(),
            message: message.into(),
        });
    }

    /// Get a user-friendly message summarizing all errors
    pub fn error_summary(&self) -> String {
        if self.errors.is_empty() {
            return String::new();
        }
        self.errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Application configuration directory
    pub config_dir: PathBuf,

    /// Host platform settings
    #[serde(default)]
    pub platform: PlatformConfig,

    /// DMI MetObs API settings
    pub metobs: MetObsConfig,

    /// Weather stations to expose, one accessory each
    #[serde(default)]
    pub stations: Vec<StationConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlatformConfig {
    /// Platform name shown by the host
    pub name: String,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            name: PLATFORM_NAME.to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetObsConfig {
    /// API key sent as the `api-key` query parameter
    #[serde(alias = "apikey")]
    pub api_key: String,

    /// Base URL of the MetObs API (the `/observation` path is appended)
    #[serde(default = "default_api_url")]
    pub api_url: String,

    /// Refresh interval in minutes
    #[serde(default = "default_refresh_minutes")]
    pub refresh_minutes: u32,

    /// Per-request timeout. Unset means requests never time out.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
}

fn default_api_url() -> String {
    DEFAULT_API_URL.to_string()
}

fn default_refresh_minutes() -> u32 {
    DEFAULT_REFRESH_MINUTES
}

impl MetObsConfig {
    /// Check if an API key is set (not empty, not the placeholder)
    pub fn is_configured(&self) -> bool {
        let key = self.api_key.trim();
        !key.is_empty() && key != API_KEY_PLACEHOLDER
    }
}

impl Default for MetObsConfig {
    fn default() -> Self {
        Self {
            api_key: API_KEY_PLACEHOLDER.to_string(),
            api_url: default_api_url(),
            refresh_minutes: default_refresh_minutes(),
            request_timeout_secs: None,
        }
    }
}

/// A configured weather station
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StationConfig {
    /// DMI station id, e.g. 6074
    pub id: u32,
    /// Display name used for the accessory and its sensors
    pub name: String,
}

impl Default for Config {
    fn default() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("dmi-bridge");

        Self {
            config_dir,
            platform: PlatformConfig::default(),
            metobs: MetObsConfig::default(),
            stations: Vec::new(),
        }
    }
}

impl Config {
    /// Load configuration from file, creating default if it doesn't exist
    pub fn load() -> Result<Self> {
        let config_path = Self::config_path()?;
        let mut config = Self::load_from(&config_path)?;
        config.apply_overrides(std::env::var(API_KEY_ENV).ok());
        Ok(config)
    }

    /// Load configuration from an explicit path, writing defaults if it doesn't exist
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            tracing::info!("No config at {}, writing defaults", path.display());
            let config = Self::default();
            config.save_to(path)?;
            return Ok(config);
        }

        let contents = std::fs::read_to_string(path).context("Failed to read config file")?;

        let config: Config = toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError(e.to_string()))
            .context("Failed to parse config file")?;

        Ok(config)
    }

    /// Load configuration and validate it
    ///
    /// Returns the config along with any validation warnings.
    /// Returns an error if validation fails with critical errors.
    pub fn load_validated() -> Result<(Self, ValidationResult)> {
        let config = Self::load()?;
        let validation = config.validate();

        if !validation.is_valid() {
            return Err(ConfigError::Invalid(validation.error_summary()))
                .context("Configuration validation failed");
        }

        for warning in &validation.warnings {
            tracing::warn!("Config warning: {}", warning);
        }

        Ok((config, validation))
    }

    /// Apply environment overrides. An empty override is ignored.
    pub fn apply_overrides(&mut self, api_key: Option<String>) {
        if let Some(key) = api_key.filter(|k| !k.trim().is_empty()) {
            tracing::debug!("Using API key from {}", API_KEY_ENV);
            self.metobs.api_key = key;
        }
    }

    /// Validate the configuration
    ///
    /// Returns a ValidationResult containing any errors or warnings.
    pub fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::default();

        if self.platform.name.trim().is_empty() {
            result.add_error("platform.name", "Platform name must not be empty");
        }

        // Observation URLs are malformed without a key
        if !self.metobs.is_configured() {
            result.add_error(
                "metobs.api_key",
                "DMI API key is not configured - observation requests cannot be built",
            );
        }

        self.validate_url(&self.metobs.api_url, "metobs.api_url", &mut result);

        if self.metobs.refresh_minutes == 0 {
            result.add_error(
                "metobs.refresh_minutes",
                "Refresh interval must be greater than 0",
            );
        } else if self.metobs.refresh_minutes < DEFAULT_REFRESH_MINUTES {
            result.add_warning(
                "metobs.refresh_minutes",
                "DMI only updates observations every 10 minutes",
            );
        } else if self.metobs.refresh_minutes > 1440 {
            result.add_warning(
                "metobs.refresh_minutes",
                "Refresh interval is more than 24 hours",
            );
        }

        if self.metobs.request_timeout_secs == Some(0) {
            result.add_error(
                "metobs.request_timeout_secs",
                "Request timeout must be greater than 0 (omit it to disable)",
            );
        }

        if self.stations.is_empty() {
            result.add_warning("stations", "No stations configured - no sensors will be exposed");
        }

        let mut seen = HashSet::new();
        for (i, station) in self.stations.iter().enumerate() {
            if station.id == 0 {
                result.add_error(format!("stations[{}].id", i), "Station id must be positive");
            }
            if station.name.trim().is_empty() {
                result.add_error(format!("stations[{}].name", i), "Station name must not be empty");
            }
            if !seen.insert(station.id) {
                result.add_error(
                    format!("stations[{}].id", i),
                    format!("Station {} is configured more than once", station.id),
                );
            }
        }

        result
    }

    /// Validate a URL field
    fn validate_url(&self, url_str: &str, field_name: &str, result: &mut ValidationResult) {
        match Url::parse(url_str) {
            Ok(url) => {
                if url.scheme() != "http" && url.scheme() != "https" {
                    result.add_error(
                        field_name,
                        format!("URL must use http or https scheme, got: {}", url.scheme()),
                    );
                } else if url.scheme() == "http" {
                    result.add_warning(field_name, "API key will be sent over plain http");
                }

                if url.host().is_none() {
                    result.add_error(field_name, "URL must have a host");
                }

                if url.query().is_some() {
                    result.add_error(field_name, "URL must not carry a query string");
                }
            }
            Err(e) => {
                result.add_error(field_name, format!("Invalid URL: {}", e));
            }
        }
    }

    /// Save configuration to an explicit path
    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).context("Failed to create config directory")?;
        }

        let contents = toml::to_string_pretty(self).context("Failed to serialize config")?;

        std::fs::write(path, contents).context("Failed to write config file")?;

        Ok(())
    }

    /// Get the path to the configuration file
    fn config_path() -> Result<PathBuf> {
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            return Ok(PathBuf::from(path));
        }

        let config_dir = dirs::config_dir()
            .context("Failed to get config directory")?
            .join("dmi-bridge");

        Ok(config_dir.join("config.toml"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn configured() -> Config {
        let mut config = Config::default();
        config.metobs.api_key = "secret".to_string();
        config.stations.push(StationConfig {
            id: 6074,
            name: "Aarhus".to_string(),
        });
        config
    }

    #[test]
    fn test_default_config_requires_api_key() {
        let result = Config::default().validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.field == "metobs.api_key"));
    }

    #[test]
    fn test_configured_config_is_valid() {
        let result = configured().validate();
        assert!(result.is_valid(), "Config should be valid: {:?}", result.errors);
        assert!(result.warnings.is_empty());
    }

    #[test]
    fn test_no_stations_is_warning() {
        let mut config = configured();
        config.stations.clear();
        let result = config.validate();
        assert!(result.is_valid());
        assert!(result.warnings.iter().any(|w| w.field == "stations"));
    }

    #[test]
    fn test_invalid_station_entries() {
        let mut config = configured();
        config.stations.push(StationConfig {
            id: 0,
            name: "  ".to_string(),
        });
        config.stations.push(StationConfig {
            id: 6074,
            name: "Aarhus again".to_string(),
        });
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.field == "stations[1].id"));
        assert!(result.errors.iter().any(|e| e.field == "stations[1].name"));
        assert!(result
            .errors
            .iter()
            .any(|e| e.field == "stations[2].id" && e.message.contains("more than once")));
    }

    #[test]
    fn test_invalid_url_scheme() {
        let mut config = configured();
        config.metobs.api_url = "ftp://dmigw.govcloud.dk".to_string();
        let result = config.validate();
        assert!(!result.is_valid());
        assert!(result.errors.iter().any(|e| e.message.contains("http or https")));
    }

    #[test]
    fn test_zero_refresh_is_error_short_refresh_is_warning() {
        let mut config = configured();
        config.metobs.refresh_minutes = 0;
        assert!(!config.validate().is_valid());

        config.metobs.refresh_minutes = 1;
        let result = config.validate();
        assert!(result.is_valid());
        assert!(result.warnings.iter().any(|w| w.field == "metobs.refresh_minutes"));
    }

    #[test]
    fn test_apikey_alias_and_defaults() {
        let config: Config = toml::from_str(
            r#"
            config_dir = "/tmp/dmi"

            [metobs]
            apikey = "abc"

            [[stations]]
            id = 6074
            name = "Aarhus"

            [[stations]]
            id = 6180
            name = "Kastrup"
            "#,
        )
        .unwrap();

        assert_eq!(config.metobs.api_key, "abc");
        assert_eq!(config.metobs.api_url, DEFAULT_API_URL);
        assert_eq!(config.metobs.refresh_minutes, DEFAULT_REFRESH_MINUTES);
        assert_eq!(config.metobs.request_timeout_secs, None);
        assert_eq!(config.platform.name, PLATFORM_NAME);
        assert_eq!(config.stations.len(), 2);
        assert_eq!(config.stations[1].name, "Kastrup");
    }

    #[test]
    fn test_overrides_ignore_empty_key() {
        let mut config = configured();
        config.apply_overrides(Some(String::new()));
        assert_eq!(config.metobs.api_key, "secret");

        config.apply_overrides(Some("from-env".to_string()));
        assert_eq!(config.metobs.api_key, "from-env");
    }

    #[test]
    fn test_load_from_missing_file_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        let config = Config::load_from(&path).unwrap();
        assert!(path.exists());
        assert!(!config.metobs.is_configured());
    }

    #[test]
    fn test_save_and_reload() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut config = configured();
        config.metobs.request_timeout_secs = Some(30);
        config.save_to(&path).unwrap();

        let reloaded = Config::load_from(&path).unwrap();
        assert_eq!(reloaded.stations, config.stations);
        assert_eq!(reloaded.metobs.api_key, "secret");
        assert_eq!(reloaded.metobs.request_timeout_secs, Some(30));
    }

    #[test]
    fn test_malformed_file_is_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "this is = = not toml").unwrap();

        let err = Config::load_from(&path).unwrap_err();
        assert!(err.downcast_ref::<ConfigError>().is_some());
    }

    #[test]
    fn test_validation_result_error_summary() {
        let mut result = ValidationResult::default();
        result.add_error("field1", "error1");
        result.add_error("field2", "error2");
        let summary = result.error_summary();
        assert!(summary.contains("field1"));
        assert!(summary.contains("field2"));
    }
}
