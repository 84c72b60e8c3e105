//! Configuration module for Themed.
//!
//! The configuration file supports JSONC format (JSON with comments).
//! Both single-line (`//`) and multi-line (`/* */`) comments are allowed.

pub mod schema;
pub mod template;
mod types;

use std::path::PathBuf;
use std::sync::OnceLock;

pub use types::{
    APP_DIR_NAME, AppearanceConfig, ConfigError, PreviewConfig, StorageConfig, ThemedConfig,
    WallpaperConfig, config_paths, default_storage_path, load_config, load_config_from_path,
};

/// Global configuration instance, loaded once at startup.
static CONFIG: OnceLock<ThemedConfig> = OnceLock::new();

/// Custom config path override (set via CLI --config flag).
static CUSTOM_CONFIG_PATH: OnceLock<PathBuf> = OnceLock::new();

/// Sets a custom configuration file path to use instead of the default search paths.
///
/// This must be called before `init()` to take effect.
///
/// Returns `false` if a path was already set.
pub fn set_custom_config_path(path: PathBuf) -> bool { CUSTOM_CONFIG_PATH.set(path).is_ok() }

/// Loads the configuration from disk.
///
/// Returns the loaded configuration, or defaults if loading fails.
/// If no configuration file exists, creates a template configuration file.
fn load_or_default() -> ThemedConfig {
    let result = CUSTOM_CONFIG_PATH.get().map_or_else(load_config, |path| load_config_from_path(path));

    match result {
        Ok((config, path)) => {
            tracing::debug!(path = %path.display(), "configuration loaded");
            config
        }
        Err(ConfigError::NotFound) => {
            create_default_config_file();
            ThemedConfig::default()
        }
        Err(err) => {
            tracing::warn!(error = %err, "failed to load configuration, using defaults");
            ThemedConfig::default()
        }
    }
}

/// Creates a template configuration file at the preferred location.
fn create_default_config_file() {
    let Some(config_path) = config_paths().into_iter().next() else {
        tracing::debug!("no config path available for creating template");
        return;
    };

    if config_path.exists() {
        return;
    }

    match template::create_config_file(&config_path) {
        Ok(()) => {
            tracing::info!(path = %config_path.display(), "created default configuration file");
        }
        Err(err) => {
            tracing::debug!(
                error = %err,
                path = %config_path.display(),
                "failed to create default configuration file"
            );
        }
    }
}

/// Initializes and returns the global configuration instance.
///
/// Calling it again returns the same instance.
pub fn init() -> &'static ThemedConfig { CONFIG.get_or_init(load_or_default) }
