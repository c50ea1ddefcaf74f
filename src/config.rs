//! Application configuration.
//!
//! Configuration is stored as JSON. Every field has a default, so a file
//! only needs to mention what it overrides.

use std::path::Path;

use serde::{Deserialize, Serialize};

use nalgebra::Vector3;

use crate::module::{DEFAULT_MAX_DELIVERIES_PER_SEND, DEFAULT_MAX_DISPATCH_DEPTH};
use crate::patch::PortRole;

/// Current configuration format version.
pub const CONFIG_VERSION: u32 = 1;

/// Environment variable naming the configuration file to load.
pub const CONFIG_ENV_VAR: &str = "MODULE_PATCHER_CONFIG";

/// Top-level configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Format version for future compatibility.
    pub version: u32,
    /// Routing behavior.
    pub patcher: PatcherConfig,
    /// Rate of the heartbeat sensor when it is created.
    pub heartbeat_bpm: f32,
    /// MIDI input device to connect on startup, matched by name prefix.
    pub midi_device: Option<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            patcher: PatcherConfig::default(),
            heartbeat_bpm: 72.0,
            midi_device: None,
        }
    }
}

impl Config {
    /// Check if this config version is compatible with the current format.
    pub fn is_compatible(&self) -> bool {
        self.version <= CONFIG_VERSION
    }
}

/// Settings the patcher reads.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatcherConfig {
    /// Offset added to a sender control's local position.
    pub sender_inset: Vector3<f32>,
    /// Offset added to a receiver control's local position.
    pub receiver_inset: Vector3<f32>,
    /// Whether a module may be patched into itself.
    pub allow_self_patch: bool,
    /// Nested deliveries allowed within one send before messages are dropped.
    pub max_dispatch_depth: usize,
    /// Total deliveries one send may cause, however the patch graph fans out.
    pub max_deliveries_per_send: usize,
    /// Whether connectors start out visible.
    pub connectors_visible: bool,
}

impl Default for PatcherConfig {
    fn default() -> Self {
        Self {
            sender_inset: Vector3::new(0.012, 0.0, 0.0),
            receiver_inset: Vector3::new(-0.012, 0.0, 0.0),
            allow_self_patch: true,
            max_dispatch_depth: DEFAULT_MAX_DISPATCH_DEPTH,
            max_deliveries_per_send: DEFAULT_MAX_DELIVERIES_PER_SEND,
            connectors_visible: true,
        }
    }
}

impl PatcherConfig {
    /// Inset applied to anchors of ports with `role`.
    pub fn inset_for(&self, role: PortRole) -> Vector3<f32> {
        match role {
            PortRole::Sender => self.sender_inset,
            PortRole::Receiver => self.receiver_inset,
        }
    }
}

/// Error type for configuration I/O.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File system error.
    #[error("File error: {0}")]
    Io(#[from] std::io::Error),
    /// JSON error.
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
    /// Incompatible config version.
    #[error("Incompatible config version: found {found}, expected <= {expected}")]
    IncompatibleVersion { found: u32, expected: u32 },
}

/// Save a configuration to a JSON file.
pub fn save_to_file(config: &Config, path: &Path) -> Result<(), ConfigError> {
    let json = serde_json::to_string_pretty(config)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// Load a configuration from a JSON file.
pub fn load_from_file(path: &Path) -> Result<Config, ConfigError> {
    let json = std::fs::read_to_string(path)?;
    let config: Config = serde_json::from_str(&json)?;

    if !config.is_compatible() {
        return Err(ConfigError::IncompatibleVersion {
            found: config.version,
            expected: CONFIG_VERSION,
        });
    }

    Ok(config)
}

/// Loads the configuration named by [`CONFIG_ENV_VAR`], falling back to
/// defaults when the variable is unset or the file cannot be used.
pub fn load_or_default() -> Config {
    let Some(path) = std::env::var_os(CONFIG_ENV_VAR) else {
        log::debug!("{} not set, using default configuration", CONFIG_ENV_VAR);
        return Config::default();
    };
    let path = Path::new(&path);
    match load_from_file(path) {
        Ok(config) => {
            log::info!("Loaded configuration from {}", path.display());
            config
        }
        Err(e) => {
            log::warn!("Could not load {}: {}; using defaults", path.display(), e);
            Config::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("module_patcher_{}_{}.json", name, std::process::id()))
    }

    #[test]
    fn test_default_insets_face_opposite_ways() {
        let config = PatcherConfig::default();
        let sender = config.inset_for(PortRole::Sender);
        let receiver = config.inset_for(PortRole::Receiver);
        assert!(sender.x > 0.0);
        assert!(receiver.x < 0.0);
        assert_eq!(sender, -receiver);
    }

    #[test]
    fn test_missing_fields_take_defaults() {
        let config: Config =
            serde_json::from_str(r#"{ "patcher": { "allow_self_patch": false } }"#).unwrap();
        assert!(!config.patcher.allow_self_patch);
        assert_eq!(config.patcher.max_dispatch_depth, DEFAULT_MAX_DISPATCH_DEPTH);
        assert_eq!(
            config.patcher.max_deliveries_per_send,
            DEFAULT_MAX_DELIVERIES_PER_SEND
        );
        assert_eq!(config.version, CONFIG_VERSION);
        assert!(config.midi_device.is_none());
    }

    #[test]
    fn test_insets_read_as_arrays() {
        let config: Config = serde_json::from_str(
            r#"{ "patcher": { "sender_inset": [0.0, 0.02, 0.0], "max_deliveries_per_send": 64 } }"#,
        )
        .unwrap();
        assert_eq!(config.patcher.sender_inset, Vector3::new(0.0, 0.02, 0.0));
        assert_eq!(config.patcher.receiver_inset, Vector3::new(-0.012, 0.0, 0.0));
        assert_eq!(config.patcher.max_deliveries_per_send, 64);
    }

    #[test]
    fn test_save_and_load() {
        let path = temp_path("roundtrip");
        let mut config = Config::default();
        config.heartbeat_bpm = 90.0;
        config.midi_device = Some("Launchkey".to_string());

        save_to_file(&config, &path).unwrap();
        let loaded = load_from_file(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_future_version_rejected() {
        let path = temp_path("future");
        let config = Config {
            version: CONFIG_VERSION + 1,
            ..Config::default()
        };
        save_to_file(&config, &path).unwrap();
        let result = load_from_file(&path);
        let _ = std::fs::remove_file(&path);

        assert!(matches!(
            result,
            Err(ConfigError::IncompatibleVersion { found, .. }) if found == CONFIG_VERSION + 1
        ));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = load_from_file(&temp_path("does_not_exist"));
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }
}
