//! TOML-based configuration for the event client.
//!
//! Reads `AppConfig` from the platform-appropriate config file, or from an
//! explicit path given on the command line:
//! - Windows:  `%APPDATA%\EventClient\config.toml`
//! - Linux:    `~/.config/evclient/config.toml`
//! - macOS:    `~/Library/Application Support/EventClient/config.toml`
//!
//! ```toml
//! [client]
//! device_name = "EventClient"
//! icon = "/usr/share/pixmaps/remote.png"
//! log_level = "info"
//!
//! [network]
//! host = "127.0.0.1"
//! port = 9777
//! keepalive_secs = 20
//!
//! [encoding]
//! overflow = "truncate"
//! ```
//!
//! # Serde default values
//!
//! Every field carries `#[serde(default = "...")]` and every section is
//! optional, so an empty file (or no file at all) yields `AppConfig::default()`.

use std::path::{Path, PathBuf};
use std::time::Duration;

use evc_core::{protocol::messages::DEFAULT_PORT, Icon, IconType, OverflowPolicy};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::application::session::SessionOptions;

/// Error type for configuration and icon file operations.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The platform config directory could not be determined.
    #[error("could not determine platform config directory")]
    NoPlatformConfigDir,

    /// A file system I/O error occurred.
    #[error("I/O error accessing config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The config could not be serialized to TOML.
    #[error("failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// The icon file could not be read or has an unsupported format.
    #[error("cannot load icon {path}: {source}")]
    Icon {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level configuration stored on disk.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub client: ClientConfig,
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub encoding: EncodingConfig,
}

/// How this remote presents itself to the host.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientConfig {
    /// Name shown by the host when the session starts.
    #[serde(default = "default_device_name")]
    pub device_name: String,
    /// PNG/JPEG/GIF sent with HELO.  Type is inferred from the extension.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<PathBuf>,
    /// `tracing` filter used when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Where packets are sent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NetworkConfig {
    /// Hostname or IP address of the event server.
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Seconds between keepalive PINGs.
    #[serde(default = "default_keepalive_secs")]
    pub keepalive_secs: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct EncodingConfig {
    #[serde(default)]
    pub overflow: OverflowPolicy,
}

// ── Default helpers ───────────────────────────────────────────────────────────

fn default_device_name() -> String {
    "EventClient".to_string()
}
fn default_log_level() -> String {
    "info".to_string()
}
fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_port() -> u16 {
    DEFAULT_PORT
}
fn default_keepalive_secs() -> u64 {
    20
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            device_name: default_device_name(),
            icon: None,
            log_level: default_log_level(),
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            keepalive_secs: default_keepalive_secs(),
        }
    }
}

impl AppConfig {
    /// Session tunables derived from this configuration.
    ///
    /// A keepalive of 0 seconds is raised to 1 second; a zero-period interval
    /// is not allowed.
    pub fn session_options(&self) -> SessionOptions {
        SessionOptions {
            keepalive_interval: Duration::from_secs(self.network.keepalive_secs.max(1)),
            overflow: self.encoding.overflow,
        }
    }

    /// Loads the HELO icon named by `client.icon`, if any.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Icon`] if the file cannot be read or its
    /// extension is not a supported image type.
    pub fn load_icon(&self) -> Result<Option<Icon>, ConfigError> {
        self.client.icon.as_deref().map(load_icon).transpose()
    }

    /// Renders the configuration as pretty TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }
}

// ── Icon loading ──────────────────────────────────────────────────────────────

/// Reads an image file and infers its [`IconType`] from the extension.
///
/// # Errors
///
/// Returns [`ConfigError::Icon`] for an unsupported extension or a read failure.
pub fn load_icon(path: &Path) -> Result<Icon, ConfigError> {
    let icon_type = path
        .extension()
        .and_then(|e| e.to_str())
        .and_then(IconType::from_extension)
        .ok_or_else(|| ConfigError::Icon {
            path: path.to_path_buf(),
            source: std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "unsupported icon format (expected .png, .jpg, .jpeg or .gif)",
            ),
        })?;
    let data = std::fs::read(path).map_err(|source| ConfigError::Icon {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Icon::new(icon_type, data))
}

// ── Config repository ─────────────────────────────────────────────────────────

/// Determines the platform-appropriate directory for the config file.
///
/// # Errors
///
/// Returns [`ConfigError::NoPlatformConfigDir`] when the platform config base
/// directory cannot be determined from the environment.
pub fn config_dir() -> Result<PathBuf, ConfigError> {
    platform_config_dir().ok_or(ConfigError::NoPlatformConfigDir)
}

/// Resolves the full path to the config file.
pub fn config_file_path() -> Result<PathBuf, ConfigError> {
    Ok(config_dir()?.join("config.toml"))
}

/// Loads `AppConfig` from the platform config file.
///
/// # Errors
///
/// See [`load_config_from`].
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_from(&config_file_path()?)
}

/// Loads `AppConfig` from `path`, returning `AppConfig::default()` if the file
/// does not exist.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system errors other than "not found",
/// and [`ConfigError::Parse`] if the TOML is malformed.
pub fn load_config_from(path: &Path) -> Result<AppConfig, ConfigError> {
    match std::fs::read_to_string(path) {
        Ok(content) => Ok(toml::from_str(&content)?),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(AppConfig::default()),
        Err(source) => Err(ConfigError::Io {
            path: path.to_path_buf(),
            source,
        }),
    }
}

/// Writes `config` to `path`, creating parent directories as needed.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] for file-system failures or
/// [`ConfigError::Serialize`] if serialization fails.
pub fn save_config_to(path: &Path, config: &AppConfig) -> Result<(), ConfigError> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|source| ConfigError::Io {
            path: dir.to_path_buf(),
            source,
        })?;
    }

    let content = config.to_toml()?;
    std::fs::write(path, content).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Resolves the platform config directory including the application subdirectory.
fn platform_config_dir() -> Option<PathBuf> {
    #[cfg(target_os = "windows")]
    {
        std::env::var_os("APPDATA").map(|p| PathBuf::from(p).join("EventClient"))
    }

    #[cfg(target_os = "linux")]
    {
        // XDG_CONFIG_HOME or ~/.config
        let base = std::env::var_os("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .or_else(|| std::env::var_os("HOME").map(|h| PathBuf::from(h).join(".config")))?;
        Some(base.join("evclient"))
    }

    #[cfg(target_os = "macos")]
    {
        std::env::var_os("HOME").map(|h| {
            PathBuf::from(h)
                .join("Library")
                .join("Application Support")
                .join("EventClient")
        })
    }

    #[cfg(not(any(target_os = "windows", target_os = "linux", target_os = "macos")))]
    {
        None
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    /// Fresh scratch directory under the system temp dir.
    fn scratch_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("evc_test_{}_{name}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    // ── Defaults ──────────────────────────────────────────────────────────────

    #[test]
    fn test_app_config_default_values() {
        // Arrange / Act
        let cfg = AppConfig::default();

        // Assert
        assert_eq!(cfg.client.device_name, "EventClient");
        assert_eq!(cfg.client.icon, None);
        assert_eq!(cfg.client.log_level, "info");
        assert_eq!(cfg.network.host, "127.0.0.1");
        assert_eq!(cfg.network.port, 9777);
        assert_eq!(cfg.network.keepalive_secs, 20);
        assert_eq!(cfg.encoding.overflow, OverflowPolicy::Truncate);
    }

    #[test]
    fn test_session_options_follow_config() {
        let mut cfg = AppConfig::default();
        cfg.network.keepalive_secs = 5;
        cfg.encoding.overflow = OverflowPolicy::Reject;

        let options = cfg.session_options();

        assert_eq!(options.keepalive_interval, Duration::from_secs(5));
        assert_eq!(options.overflow, OverflowPolicy::Reject);
    }

    #[test]
    fn test_zero_keepalive_is_raised_to_one_second() {
        let mut cfg = AppConfig::default();
        cfg.network.keepalive_secs = 0;
        assert_eq!(
            cfg.session_options().keepalive_interval,
            Duration::from_secs(1)
        );
    }

    // ── TOML parsing ──────────────────────────────────────────────────────────

    #[test]
    fn test_empty_toml_uses_defaults() {
        let cfg: AppConfig = toml::from_str("").expect("deserialize empty");
        assert_eq!(cfg, AppConfig::default());
    }

    #[test]
    fn test_partial_toml_overrides_only_named_fields() {
        // Arrange
        let toml_str = r#"
[network]
host = "mediabox.local"

[encoding]
overflow = "reject"
"#;

        // Act
        let cfg: AppConfig = toml::from_str(toml_str).expect("deserialize partial");

        // Assert
        assert_eq!(cfg.network.host, "mediabox.local");
        assert_eq!(cfg.network.port, 9777);
        assert_eq!(cfg.encoding.overflow, OverflowPolicy::Reject);
        assert_eq!(cfg.client.device_name, "EventClient");
    }

    #[test]
    fn test_unknown_overflow_value_is_a_parse_error() {
        let result: Result<AppConfig, _> = toml::from_str("[encoding]\noverflow = \"wrap\"");
        assert!(result.is_err());
    }

    #[test]
    fn test_round_trip_omits_absent_icon() {
        // Arrange
        let mut cfg = AppConfig::default();
        cfg.client.device_name = "Kitchen".to_string();

        // Act
        let toml_str = cfg.to_toml().expect("serialize");
        let restored: AppConfig = toml::from_str(&toml_str).expect("deserialize");

        // Assert
        assert!(!toml_str.contains("icon"), "None icon must be omitted");
        assert_eq!(restored, cfg);
    }

    // ── File access ───────────────────────────────────────────────────────────

    #[test]
    fn test_load_config_from_missing_file_returns_default() {
        let path = PathBuf::from("/nonexistent/path/that/cannot/exist/config.toml");

        let cfg = load_config_from(&path).expect("missing file is not an error");

        assert_eq!(cfg, AppConfig::default());
    }

    #[test]
    fn test_load_config_from_malformed_file_returns_parse_error() {
        let dir = scratch_dir("malformed");
        let path = dir.join("config.toml");
        std::fs::write(&path, "[[[ not valid toml").unwrap();

        let result = load_config_from(&path);

        assert!(matches!(result, Err(ConfigError::Parse(_))));
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_save_then_load_round_trip_via_temp_dir() {
        // Arrange
        let dir = scratch_dir("save_load");
        let path = dir.join("nested").join("config.toml");
        let mut cfg = AppConfig::default();
        cfg.network.port = 9800;
        cfg.client.icon = Some(PathBuf::from("/tmp/remote.png"));

        // Act
        save_config_to(&path, &cfg).unwrap();
        let loaded = load_config_from(&path).unwrap();

        // Assert
        assert_eq!(loaded, cfg);
        std::fs::remove_dir_all(&dir).ok();
    }

    // ── Icons ─────────────────────────────────────────────────────────────────

    #[test]
    fn test_load_icon_infers_type_from_extension() {
        // Arrange
        let dir = scratch_dir("icon");
        let path = dir.join("remote.JPG");
        std::fs::write(&path, [0xFF, 0xD8, 0xFF]).unwrap();

        // Act
        let icon = load_icon(&path).unwrap();

        // Assert
        assert_eq!(icon.icon_type, IconType::Jpeg);
        assert_eq!(icon.data, vec![0xFF, 0xD8, 0xFF]);
        std::fs::remove_dir_all(&dir).ok();
    }

    #[test]
    fn test_load_icon_rejects_unknown_extension() {
        let result = load_icon(Path::new("/tmp/remote.bmp"));
        assert!(matches!(result, Err(ConfigError::Icon { .. })));
    }

    #[test]
    fn test_load_icon_missing_file_is_icon_error() {
        let result = load_icon(Path::new("/nonexistent/remote.png"));
        assert!(matches!(result, Err(ConfigError::Icon { .. })));
    }

    #[test]
    fn test_config_without_icon_loads_none() {
        assert!(AppConfig::default().load_icon().unwrap().is_none());
    }

    #[test]
    fn test_config_file_path_ends_with_config_toml() {
        if let Ok(path) = config_file_path() {
            assert!(
                path.ends_with("config.toml"),
                "config file must be named config.toml, got {path:?}"
            );
        }
        // NoPlatformConfigDir is acceptable in a stripped CI environment.
    }
}
