//! Studio configuration.
//!
//! Handles loading, validating, and merging `chronosnap.toml`. Stock defaults
//! are serialized to a TOML table and the user's file is merged on top, so a
//! config file only needs the keys it wants to change.
//!
//! ## Config File Location
//!
//! `chronosnap.toml` is read from the config directory (`--config-dir`,
//! default: current directory). A missing file means stock defaults.
//!
//! ## Configuration Options
//!
//! ```toml
//! # All options are optional - defaults shown below
//!
//! [generation]
//! endpoint = "https://generativelanguage.googleapis.com/v1beta/models"
//! model = "gemini-2.5-flash-image"
//! api_key_env = "GEMINI_API_KEY"  # Environment variable holding the key
//! timeout_secs = 120              # 0 = wait forever
//!
//! [export]
//! dir = "."                       # Where exported plates are written
//! prefix = "chronosnap"           # <prefix>-<era>-<millis>.<ext>
//!
//! [darkroom]
//! brightness = 100                # 50-150 (%)
//! contrast = 100                  # 50-150 (%)
//! sepia = 0                       # 0-100 (%)
//! grain = false
//! ```
//!
//! Unknown keys are rejected to catch typos early.

use crate::darkroom::{BRIGHTNESS_RANGE, CONTRAST_RANGE, SEPIA_RANGE};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// File name looked up inside the config directory.
pub const CONFIG_FILENAME: &str = "chronosnap.toml";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Studio configuration loaded from `chronosnap.toml`.
///
/// All fields have defaults. Unknown keys are rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Remote generator settings.
    pub generation: GenerationConfig,
    /// Where and how plates are exported.
    pub export: ExportConfig,
    /// Starting values for the display adjustments.
    pub darkroom: DarkroomConfig,
}

impl Config {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let endpoint = &self.generation.endpoint;
        if !(endpoint.starts_with("https://") || endpoint.starts_with("http://")) {
            return Err(ConfigError::Validation(
                "generation.endpoint must be an http(s) URL".into(),
            ));
        }
        if self.generation.model.trim().is_empty() {
            return Err(ConfigError::Validation(
                "generation.model must not be empty".into(),
            ));
        }
        if self.generation.api_key_env.trim().is_empty() {
            return Err(ConfigError::Validation(
                "generation.api_key_env must not be empty".into(),
            ));
        }
        let prefix = &self.export.prefix;
        if prefix.is_empty() || prefix.contains(['/', '\\']) {
            return Err(ConfigError::Validation(
                "export.prefix must be a non-empty file name fragment".into(),
            ));
        }
        let d = &self.darkroom;
        if !BRIGHTNESS_RANGE.contains(&d.brightness) {
            return Err(ConfigError::Validation(
                "darkroom.brightness must be 50-150".into(),
            ));
        }
        if !CONTRAST_RANGE.contains(&d.contrast) {
            return Err(ConfigError::Validation(
                "darkroom.contrast must be 50-150".into(),
            ));
        }
        if !SEPIA_RANGE.contains(&d.sepia) {
            return Err(ConfigError::Validation("darkroom.sepia must be 0-100".into()));
        }
        Ok(())
    }
}

/// Remote generator settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GenerationConfig {
    /// Base URL of the models collection; the model name is appended.
    pub endpoint: String,
    /// Image-capable model to call.
    pub model: String,
    /// Name of the environment variable that holds the API key.
    pub api_key_env: String,
    /// Whole-request timeout in seconds. `0` disables the timeout.
    pub timeout_secs: u64,
}

impl GenerationConfig {
    /// The request timeout, or `None` when disabled.
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://generativelanguage.googleapis.com/v1beta/models".to_string(),
            model: "gemini-2.5-flash-image".to_string(),
            api_key_env: "GEMINI_API_KEY".to_string(),
            timeout_secs: 120,
        }
    }
}

/// Export settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExportConfig {
    /// Output directory for exported plates.
    pub dir: String,
    /// File name prefix.
    pub prefix: String,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            dir: ".".to_string(),
            prefix: "chronosnap".to_string(),
        }
    }
}

/// Starting darkroom adjustments, in percent.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DarkroomConfig {
    pub brightness: u32,
    pub contrast: u32,
    pub sepia: u32,
    pub grain: bool,
}

impl Default for DarkroomConfig {
    fn default() -> Self {
        Self {
            brightness: 100,
            contrast: 100,
            sepia: 0,
            grain: false,
        }
    }
}

// =============================================================================
// Config loading, merging, and validation
// =============================================================================

/// Returns the stock default config as a `toml::Value::Table`.
pub fn stock_defaults_value() -> toml::Value {
    toml::Value::try_from(Config::default()).expect("default config must serialize")
}

/// Recursively merge `overlay` on top of `base`. Tables merge key by key;
/// any other overlay value replaces the base value.
fn merge_toml(base: toml::Value, overlay: toml::Value) -> toml::Value {
    match (base, overlay) {
        (toml::Value::Table(mut base_table), toml::Value::Table(overlay_table)) => {
            for (key, overlay_val) in overlay_table {
                let merged = match base_table.remove(&key) {
                    Some(base_val) => merge_toml(base_val, overlay_val),
                    None => overlay_val,
                };
                base_table.insert(key, merged);
            }
            toml::Value::Table(base_table)
        }
        (_, overlay) => overlay,
    }
}

/// Load config from the given directory: stock defaults, user overrides,
/// unknown-key rejection, validation. A missing file means stock defaults.
pub fn load_config(dir: &Path) -> Result<Config, ConfigError> {
    let config_path = dir.join(CONFIG_FILENAME);
    let mut merged = stock_defaults_value();
    if config_path.exists() {
        let content = fs::read_to_string(&config_path)?;
        let overlay: toml::Value = toml::from_str(&content)?;
        merged = merge_toml(merged, overlay);
        tracing::debug!(path = %config_path.display(), "loaded config overrides");
    }
    let config: Config = merged.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Returns a fully-commented stock `chronosnap.toml`.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# ChronoSnap Configuration
# ========================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# Place this file as chronosnap.toml in the config directory
# (--config-dir, default: the current directory).
# Unknown keys will cause an error.

# ---------------------------------------------------------------------------
# Remote generator
# ---------------------------------------------------------------------------
[generation]
# Base URL of the model collection. The request goes to
# <endpoint>/<model>:generateContent
endpoint = "https://generativelanguage.googleapis.com/v1beta/models"

# Image-capable model.
model = "gemini-2.5-flash-image"

# Environment variable that holds the API key. The key itself never
# lives in this file.
api_key_env = "GEMINI_API_KEY"

# Give up on a request after this many seconds. 0 waits forever.
timeout_secs = 120

# ---------------------------------------------------------------------------
# Export
# ---------------------------------------------------------------------------
[export]
# Directory exported plates are written to.
dir = "."

# Exported files are named <prefix>-<era id>-<unix millis>.<ext>
prefix = "chronosnap"

# ---------------------------------------------------------------------------
# Darkroom (display adjustments, in percent)
# ---------------------------------------------------------------------------
[darkroom]
# Exposure, 50-150.
brightness = 100

# Contrast, 50-150.
contrast = 100

# Sepia tone, 0-100.
sepia = 0

# Film grain overlay in the preview page.
grain = false
"##
}
