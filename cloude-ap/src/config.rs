//! Bootstrap configuration for cloude-ap
//!
//! Two tiers:
//! 1. **TOML bootstrap**: port, library folder, settings path, logging.
//!    Read once at startup.
//! 2. **Player settings**: volume, effects, modes. Owned by the engine and
//!    written back through `cloude_common::config::SettingsStore`.
//!
//! # Sources priority
//!
//! 1. Command-line arguments (`--port`, `--library`, `--settings`)
//! 2. Environment variables (via clap `env`)
//! 3. TOML configuration file
//! 4. Built-in defaults

use crate::error::{Error, Result};
use cloude_common::config::{resolve_settings_path, SETTINGS_ENV_VAR};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

/// Default HTTP port
pub const DEFAULT_PORT: u16 = 5741;

/// Bootstrap configuration loaded from TOML
#[derive(Debug, Clone, Deserialize)]
pub struct TomlConfig {
    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Folder scanned for audio files at startup
    #[serde(default)]
    pub library_folder: Option<PathBuf>,

    /// Player settings file
    #[serde(default)]
    pub settings_path: Option<PathBuf>,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            library_folder: None,
            settings_path: None,
            logging: LoggingConfig::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_log_level() -> String {
    "debug".to_string()
}

/// Values given on the command line; each wins over the TOML file
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub port: Option<u16>,
    pub library_folder: Option<PathBuf>,
    pub settings_path: Option<PathBuf>,
}

/// Fully resolved startup configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub library_folder: Option<PathBuf>,
    pub settings_path: PathBuf,
    pub log_level: String,
}

impl TomlConfig {
    /// Parse a TOML file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("Failed to read config file {}: {}", path.display(), e))
        })?;
        let config = toml::from_str(&content)
            .map_err(|e| Error::Config(format!("Failed to parse TOML: {}", e)))?;
        info!("Loaded TOML configuration from {}", path.display());
        Ok(config)
    }
}

impl Config {
    /// Merge an optional TOML file with command-line overrides
    pub fn load(toml_path: Option<&Path>, overrides: ConfigOverrides) -> Result<Self> {
        let toml_config = match toml_path {
            Some(path) => TomlConfig::from_file(path)?,
            None => TomlConfig::default(),
        };
        Ok(Self::resolve(toml_config, overrides))
    }

    pub fn resolve(toml_config: TomlConfig, overrides: ConfigOverrides) -> Self {
        let settings_cli = overrides.settings_path.or(toml_config.settings_path);
        Self {
            port: overrides.port.unwrap_or(toml_config.port),
            library_folder: overrides.library_folder.or(toml_config.library_folder),
            settings_path: resolve_settings_path(settings_cli.as_deref(), SETTINGS_ENV_VAR),
            log_level: toml_config.logging.level,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = TomlConfig::default();
        assert_eq!(config.port, 5741);
        assert_eq!(config.logging.level, "debug");
        assert!(config.library_folder.is_none());
    }

    #[test]
    fn test_partial_toml() {
        let config: TomlConfig = toml::from_str("library_folder = \"/music\"\n").unwrap();
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.library_folder, Some(PathBuf::from("/music")));
    }

    #[test]
    fn test_overrides_win() {
        let toml_config: TomlConfig = toml::from_str(
            "port = 6000\nsettings_path = \"/etc/cloude.toml\"\n[logging]\nlevel = \"warn\"\n",
        )
        .unwrap();
        let config = Config::resolve(
            toml_config,
            ConfigOverrides {
                port: Some(7000),
                library_folder: Some(PathBuf::from("/tmp/lib")),
                settings_path: None,
            },
        );
        assert_eq!(config.port, 7000);
        assert_eq!(config.library_folder, Some(PathBuf::from("/tmp/lib")));
        assert_eq!(config.settings_path, PathBuf::from("/etc/cloude.toml"));
        assert_eq!(config.log_level, "warn");
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let err = Config::load(Some(Path::new("/nonexistent/cloude.toml")), ConfigOverrides::default())
            .unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }
}
