//! Configuration management for boxwiz.
//!
//! Settings are resolved through layers, highest priority first:
//! 1. Environment variables (`BOXWIZ_*`)
//! 2. Programmatically set values
//! 3. Values loaded from the YAML settings file
//! 4. Built-in defaults
//!
//! ## Example
//!
//! ```no_run
//! use boxwiz_core::config::WizardSettings;
//!
//! let settings = WizardSettings::load(None)?;
//! println!("template: {}", settings.template.display());
//! # Ok::<(), boxwiz_types::WizardError>(())
//! ```

use boxwiz_types::{LogLevel, Platform, WizardError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::util::data::{deep_merge, get_path, set_path};

/// Prefix of environment variables that override settings.
pub const ENV_PREFIX: &str = "BOXWIZ_";

/// Configuration layer priority
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ConfigLayer {
    /// Default values
    Default = 0,
    /// Values loaded from file
    Loaded = 1,
    /// Values set programmatically
    Set = 2,
    /// Values from environment variables
    Environment = 3,
}

impl ConfigLayer {
    const ASCENDING: [ConfigLayer; 4] = [
        ConfigLayer::Default,
        ConfigLayer::Loaded,
        ConfigLayer::Set,
        ConfigLayer::Environment,
    ];
}

/// Layered key/value configuration backed by an optional YAML file.
#[derive(Clone, Debug, Default)]
pub struct Config {
    layers: HashMap<ConfigLayer, Value>,
    file_path: Option<PathBuf>,
}

impl Config {
    /// Load configuration from a YAML file.
    ///
    /// If the file doesn't exist, an empty configuration is created.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut layers = HashMap::new();

        if path.exists() {
            let content = fs::read_to_string(path)
                .map_err(|e| WizardError::Config(format!("Failed to read config file: {}", e)))?;

            if !content.trim().is_empty() {
                let value: Value = serde_yaml::from_str(&content)
                    .map_err(|e| WizardError::Config(format!("Failed to parse config: {}", e)))?;
                layers.insert(ConfigLayer::Loaded, value);
            }
        }

        Ok(Self {
            layers,
            file_path: Some(path.to_path_buf()),
        })
    }

    /// Replace the defaults layer.
    pub fn with_defaults(mut self, defaults: Value) -> Self {
        self.layers.insert(ConfigLayer::Default, defaults);
        self
    }

    /// Populate the environment layer from `BOXWIZ_*` variables.
    ///
    /// `BOXWIZ_LOG__LEVEL=debug` sets `log.level`. Values that parse as JSON
    /// (booleans, numbers) keep their type; everything else is a string.
    pub fn with_env(mut self, vars: impl IntoIterator<Item = (String, String)>) -> Result<Self> {
        let mut env_layer = Value::Object(Default::default());
        for (name, raw) in vars {
            let Some(key) = name.strip_prefix(ENV_PREFIX) else {
                continue;
            };
            if key.is_empty() {
                continue;
            }
            let path = key.to_lowercase().replace("__", ".");
            let value = serde_json::from_str::<Value>(&raw)
                .ok()
                .filter(|v| !v.is_object() && !v.is_array())
                .unwrap_or(Value::String(raw));
            set_path(&mut env_layer, &path, value)?;
        }
        self.layers.insert(ConfigLayer::Environment, env_layer);
        Ok(self)
    }

    /// Get a configuration value by key, respecting layer priority.
    ///
    /// Returns None if the key doesn't exist in any layer.
    pub fn get<T: for<'de> Deserialize<'de>>(&self, key: &str) -> Option<T> {
        ConfigLayer::ASCENDING.iter().rev().find_map(|layer| {
            let data = self.layers.get(layer)?;
            let value = get_path(data, key)?;
            serde_json::from_value(value.clone()).ok()
        })
    }

    /// Set a configuration value programmatically.
    pub fn set(&mut self, key: &str, value: impl Serialize) -> Result<()> {
        let value = serde_json::to_value(value)
            .map_err(|e| WizardError::Config(format!("Failed to serialize value: {}", e)))?;

        let set_layer = self
            .layers
            .entry(ConfigLayer::Set)
            .or_insert(Value::Object(Default::default()));

        set_path(set_layer, key, value)
    }

    /// Save the file and programmatic layers back to the YAML file.
    ///
    /// Defaults and environment overrides are not persisted.
    pub fn save(&self) -> Result<()> {
        let path = self
            .file_path
            .as_ref()
            .ok_or_else(|| WizardError::Config("Cannot save: no file path set".to_string()))?;

        let mut merged = Value::Object(Default::default());
        for layer in [ConfigLayer::Loaded, ConfigLayer::Set] {
            if let Some(data) = self.layers.get(&layer) {
                merged = deep_merge(merged, data.clone());
            }
        }

        let yaml = serde_yaml::to_string(&merged)
            .map_err(|e| WizardError::Config(format!("Failed to serialize config: {}", e)))?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(path, yaml)
            .map_err(|e| WizardError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Merged view of all layers.
    pub fn merged_data(&self) -> Value {
        ConfigLayer::ASCENDING
            .iter()
            .filter_map(|layer| self.layers.get(layer))
            .fold(Value::Object(Default::default()), |merged, data| {
                deep_merge(merged, data.clone())
            })
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogSettings {
    /// Minimum level for boxwiz crates
    #[serde(default)]
    pub level: LogLevel,

    /// Emit JSON lines instead of human-readable text
    #[serde(default)]
    pub json: bool,

    /// Optional log file; written in addition to stderr
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            json: false,
            file: None,
        }
    }
}

/// User-wide wizard settings (`<config dir>/boxwiz/config.yml`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WizardSettings {
    /// Path of the wizard template document
    #[serde(default = "default_template")]
    pub template: PathBuf,

    /// Path of the generated sing-box configuration
    #[serde(default = "default_config_path")]
    pub config_path: PathBuf,

    /// Directory holding saved wizard states
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,

    /// Platform used for overlay and catalog filtering; defaults to the host
    #[serde(default)]
    pub platform: Platform,

    /// Whether TUN mode is enabled (affects `darwin-tun` scopes)
    #[serde(default = "default_true")]
    pub enable_tun: bool,

    /// Generated-outbound count above which previews collapse to a summary
    #[serde(default = "default_preview_node_limit")]
    pub preview_node_limit: usize,

    /// Debounce window for parser-config edits, in milliseconds
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,

    /// Subscription fetch timeout, in seconds
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,

    /// User-Agent sent with subscription requests
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Logging settings
    #[serde(default)]
    pub log: LogSettings,
}

fn default_template() -> PathBuf {
    PathBuf::from("bin/wizard_template.json")
}

fn default_config_path() -> PathBuf {
    PathBuf::from("bin/config.json")
}

fn default_state_dir() -> PathBuf {
    PathBuf::from("bin/wizard_states")
}

fn default_true() -> bool {
    true
}

fn default_preview_node_limit() -> usize {
    20
}

fn default_debounce_ms() -> u64 {
    400
}

fn default_fetch_timeout_secs() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("{}/{}", crate::APP_NAME, crate::VERSION)
}

impl Default for WizardSettings {
    fn default() -> Self {
        Self {
            template: default_template(),
            config_path: default_config_path(),
            state_dir: default_state_dir(),
            platform: Platform::current(),
            enable_tun: true,
            preview_node_limit: default_preview_node_limit(),
            debounce_ms: default_debounce_ms(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
            user_agent: default_user_agent(),
            log: LogSettings::default(),
        }
    }
}

impl WizardSettings {
    /// Load settings from `path` (or the default location) with environment
    /// overrides applied.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::default_path()?,
        };
        Self::load_with_env(path, std::env::vars())
    }

    /// Load settings from `path`, taking overrides from `vars`.
    pub fn load_with_env(
        path: impl AsRef<Path>,
        vars: impl IntoIterator<Item = (String, String)>,
    ) -> Result<Self> {
        let defaults = serde_json::to_value(Self::default())
            .map_err(|e| WizardError::Config(format!("Failed to serialize defaults: {}", e)))?;
        let config = Config::load(path)?.with_defaults(defaults).with_env(vars)?;
        serde_json::from_value(config.merged_data())
            .map_err(|e| WizardError::Config(format!("Failed to parse settings: {}", e)))
    }

    /// Default settings file location.
    pub fn default_path() -> Result<PathBuf> {
        dirs::config_dir()
            .map(|dir| dir.join(crate::APP_NAME).join("config.yml"))
            .ok_or_else(|| WizardError::Config("Could not determine config directory".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn vars(items: &[(&str, &str)]) -> Vec<(String, String)> {
        items.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect()
    }

    #[test]
    fn test_config_layers() {
        let mut config = Config::default().with_defaults(serde_json::json!({"key": "default_value"}));
        config
            .layers
            .insert(ConfigLayer::Loaded, serde_json::json!({"key": "loaded_value"}));

        let value: String = config.get("key").unwrap();
        assert_eq!(value, "loaded_value");

        config.set("key", "set_value").unwrap();
        let value: String = config.get("key").unwrap();
        assert_eq!(value, "set_value");
    }

    #[test]
    fn test_env_layer_nested_keys() {
        let config = Config::default()
            .with_env(vars(&[
                ("BOXWIZ_LOG__LEVEL", "debug"),
                ("BOXWIZ_ENABLE_TUN", "false"),
                ("BOXWIZ_DEBOUNCE_MS", "250"),
                ("HOME", "/root"),
            ]))
            .unwrap();

        assert_eq!(config.get::<String>("log.level").as_deref(), Some("debug"));
        assert_eq!(config.get::<bool>("enable_tun"), Some(false));
        assert_eq!(config.get::<u64>("debounce_ms"), Some(250));
        assert!(config.get::<String>("home").is_none());
    }

    #[test]
    fn test_settings_defaults_when_file_missing() {
        let dir = TempDir::new().unwrap();
        let settings =
            WizardSettings::load_with_env(dir.path().join("config.yml"), Vec::new()).unwrap();

        assert_eq!(settings.template, PathBuf::from("bin/wizard_template.json"));
        assert_eq!(settings.preview_node_limit, 20);
        assert_eq!(settings.fetch_timeout_secs, 30);
        assert!(settings.enable_tun);
        assert_eq!(settings.platform, Platform::current());
    }

    #[test]
    fn test_settings_file_then_env_override() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.yml");
        fs::write(&path, "platform: darwin\nenable_tun: true\nlog:\n  level: warn\n").unwrap();

        let settings =
            WizardSettings::load_with_env(&path, vars(&[("BOXWIZ_ENABLE_TUN", "false")])).unwrap();

        assert!(settings.platform.is_darwin());
        assert!(!settings.enable_tun);
        assert_eq!(settings.log.level, LogLevel::Warn);
    }

    #[test]
    fn test_save_skips_defaults_and_env() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("config.yml");
        let mut config = Config::load(&path)
            .unwrap()
            .with_defaults(serde_json::json!({"debounce_ms": 400}))
            .with_env(vars(&[("BOXWIZ_USER_AGENT", "probe")]))
            .unwrap();
        config.set("state_dir", "/tmp/states").unwrap();
        config.save().unwrap();

        let reloaded = Config::load(&path).unwrap();
        assert_eq!(reloaded.get::<String>("state_dir").as_deref(), Some("/tmp/states"));
        assert!(reloaded.get::<u64>("debounce_ms").is_none());
        assert!(reloaded.get::<String>("user_agent").is_none());
    }
}
