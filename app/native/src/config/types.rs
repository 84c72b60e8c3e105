//! Configuration types for Themed.
//!
//! The configuration file supports JSONC format (JSON with comments).
//! Both single-line (`//`) and multi-line (`/* */`) comments are allowed.

use std::fs;
use std::path::{Path, PathBuf};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::appearance::{DEFAULT_DEBOUNCE_MS, DEFAULT_POLL_INTERVAL_MS, MonitorSettings};
use crate::cache::{DEFAULT_MAX_DIMENSION, DEFAULT_MAX_ENTRIES};
use crate::platform::path::{expand, expand_and_resolve};
use crate::wallpaper::ScreenTarget;

/// Directory name used under every configuration root.
pub const APP_DIR_NAME: &str = "themed";

/// Configuration file names to search for (in priority order).
const CONFIG_FILE_NAMES: &[&str] = &["config.jsonc", "config.json"];

/// Legacy configuration file names in home directory.
const LEGACY_CONFIG_FILE_NAMES: &[&str] = &[".themed.jsonc", ".themed.json"];

/// File holding the persisted wallpaper tokens.
const PREFERENCES_FILE_NAME: &str = "preferences.json";

/// Where the persisted selections live.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct StorageConfig {
    /// Path to the preferences file holding the wallpaper tokens.
    /// Supports `~`. Relative paths are resolved against the config file.
    /// Default: "<config dir>/themed/preferences.json"
    pub path: String,
}

impl StorageConfig {
    /// The preferences file to use.
    #[must_use]
    pub fn resolved_path(&self) -> Option<PathBuf> {
        expand(&self.path).or_else(default_storage_path)
    }
}

/// Desktop picture options.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct WallpaperConfig {
    /// Image applied when all selections are cleared.
    /// Empty uses the system's factory default picture.
    pub default_image: String,

    /// Which displays receive the wallpaper.
    /// - `all`: every attached display (default)
    /// - `main`: only the main display
    pub screens: ScreenTarget,
}

impl WallpaperConfig {
    /// The configured default image, if any.
    #[must_use]
    pub fn default_image_path(&self) -> Option<PathBuf> { expand(&self.default_image) }
}

/// Preview cache options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct PreviewConfig {
    /// Maximum number of decoded previews kept in memory.
    /// Default: 8
    pub max_entries: usize,

    /// Longest edge of a preview in pixels.
    /// Default: 480
    pub max_dimension: u32,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            max_entries: DEFAULT_MAX_ENTRIES,
            max_dimension: DEFAULT_MAX_DIMENSION,
        }
    }
}

/// Appearance monitor options.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct AppearanceConfig {
    /// Quiet period after a preferences write before the appearance is read.
    /// Default: 200
    pub debounce_ms: u64,

    /// Fallback poll interval in milliseconds.
    /// Default: 2000
    pub poll_interval_ms: u64,
}

impl Default for AppearanceConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
        }
    }
}

impl AppearanceConfig {
    #[must_use]
    pub fn monitor_settings(&self) -> MonitorSettings {
        MonitorSettings::from_millis(self.debounce_ms, self.poll_interval_ms)
    }
}

/// Root configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(default, rename_all = "camelCase")]
pub struct ThemedConfig {
    /// JSON Schema reference for editor support.
    #[serde(rename = "$schema", skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,

    /// Persistence of the chosen wallpapers.
    pub storage: StorageConfig,

    /// Desktop picture options.
    pub wallpaper: WallpaperConfig,

    /// Preview cache options.
    pub preview: PreviewConfig,

    /// Appearance monitor options.
    pub appearance: AppearanceConfig,
}

impl ThemedConfig {
    /// Rewrites relative paths so they are relative to `base_dir`.
    fn resolve_relative_paths(&mut self, base_dir: &Path) {
        if let Some(path) = expand_and_resolve(&self.storage.path, base_dir) {
            self.storage.path = path.display().to_string();
        }
        if let Some(path) = expand_and_resolve(&self.wallpaper.default_image, base_dir) {
            self.wallpaper.default_image = path.display().to_string();
        }
    }
}

/// Errors that can occur when loading the configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// No configuration file was found in any of the expected locations.
    #[error(
        "No configuration file found. Expected at ~/.config/themed/config.jsonc, \
         ~/Library/Application Support/themed/config.jsonc, or ~/.themed.jsonc"
    )]
    NotFound,
    /// A configuration file given explicitly does not exist.
    #[error("Configuration file not found: {0}")]
    Missing(PathBuf),
    /// The configuration file exists but could not be read.
    #[error("Failed to read configuration file: {0}")]
    Io(#[from] std::io::Error),
    /// The configuration file contains invalid JSON.
    #[error("Failed to parse configuration file: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Default location of the preferences file.
#[must_use]
pub fn default_storage_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR_NAME).join(PREFERENCES_FILE_NAME))
}

/// Returns the possible configuration file paths in priority order.
///
/// The function checks the following locations (both `.jsonc` and `.json` variants):
/// 1. `$XDG_CONFIG_HOME/themed/config.jsonc` if the variable is set
/// 2. `~/.config/themed/config.jsonc` or `config.json`
/// 3. `~/Library/Application Support/themed/config.jsonc` (macOS native)
/// 4. `~/.themed.jsonc` or `~/.themed.json`
#[must_use]
pub fn config_paths() -> Vec<PathBuf> {
    let mut paths = Vec::new();

    if let Some(xdg_config) = std::env::var("XDG_CONFIG_HOME").ok().filter(|v| !v.trim().is_empty()) {
        push_config_dir(&mut paths, &PathBuf::from(xdg_config).join(APP_DIR_NAME));
    }

    if let Some(home) = dirs::home_dir() {
        push_config_dir(&mut paths, &home.join(".config").join(APP_DIR_NAME));
    }

    if let Some(config_dir) = dirs::config_dir() {
        push_config_dir(&mut paths, &config_dir.join(APP_DIR_NAME));
    }

    if let Some(home) = dirs::home_dir() {
        for filename in LEGACY_CONFIG_FILE_NAMES {
            paths.push(home.join(filename));
        }
    }

    paths
}

fn push_config_dir(paths: &mut Vec<PathBuf>, dir: &Path) {
    for filename in CONFIG_FILE_NAMES {
        let path = dir.join(filename);
        // XDG_CONFIG_HOME may well be ~/.config
        if !paths.contains(&path) {
            paths.push(path);
        }
    }
}

/// Loads the configuration from the first available config file.
///
/// # Errors
///
/// Returns `ConfigError::NotFound` if no configuration file exists in any of
/// the expected locations, or the error from [`load_config_from_path`] for
/// the first file that exists.
pub fn load_config() -> Result<(ThemedConfig, PathBuf), ConfigError> {
    config_paths()
        .into_iter()
        .find(|path| path.exists())
        .map_or(Err(ConfigError::NotFound), |path| load_config_from_path(&path))
}

/// Loads the configuration from `path`.
///
/// Comments are stripped before parsing.
///
/// # Errors
///
/// Returns `ConfigError::Missing` if the file does not exist,
/// `ConfigError::Io` if it cannot be read, and `ConfigError::Parse` if it is
/// not valid JSONC.
pub fn load_config_from_path(path: &Path) -> Result<(ThemedConfig, PathBuf), ConfigError> {
    if !path.exists() {
        return Err(ConfigError::Missing(path.to_path_buf()));
    }

    let file = fs::File::open(path)?;
    let reader = json_comments::StripComments::new(file);
    let mut config: ThemedConfig = serde_json::from_reader(reader)?;

    if let Some(base_dir) = path.parent() {
        config.resolve_relative_paths(base_dir);
    }
    Ok((config, path.to_path_buf()))
}
