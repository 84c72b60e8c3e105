//! Error types for Themed.
//!
//! Each subsystem has its own error enum; [`ThemedError`] unifies them at the
//! command-line boundary, where every error becomes a `themed: <message>` line.

use thiserror::Error;

use crate::cache::PreviewError;
use crate::chooser::ChooserError;
use crate::config::ConfigError;
use crate::selection::{SelectionError, WallpaperSlot};
use crate::storage::StorageError;
use crate::wallpaper::ApplyError;

/// Errors that can occur during application execution.
#[derive(Debug, Error)]
pub enum ThemedError {
    /// Invalid command arguments.
    #[error("{0}")]
    InvalidArguments(String),
    /// Selecting a file failed.
    #[error(transparent)]
    Selection(#[from] SelectionError),
    /// Applying a wallpaper failed.
    #[error("Failed to apply wallpaper: {0}")]
    Apply(String),
    /// The applier did not finish in time.
    #[error("Timed out waiting for the wallpaper to be applied")]
    ApplyTimedOut,
    /// A command needs a slot that is not set.
    #[error("No {0} wallpaper is selected")]
    SlotUnset(WallpaperSlot),
    /// The preview could not be produced.
    #[error(transparent)]
    Preview(#[from] PreviewError),
    /// The file chooser failed.
    #[error(transparent)]
    Chooser(#[from] ChooserError),
    /// Configuration error.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    /// Preferences storage error.
    #[error(transparent)]
    Storage(#[from] StorageError),
    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<ApplyError> for ThemedError {
    fn from(err: ApplyError) -> Self { Self::Apply(err.to_string()) }
}

#[cfg(test)]
mod tests {
    use std::path::PathBuf;

    use super::*;

    #[test]
    fn test_invalid_arguments_display() {
        let err = ThemedError::InvalidArguments("Unknown slot".to_string());
        assert_eq!(err.to_string(), "Unknown slot");
    }

    #[test]
    fn test_selection_error_is_transparent() {
        let err: ThemedError =
            SelectionError::FileUnreadable { path: PathBuf::from("/tmp/gone.png") }.into();
        assert_eq!(err.to_string(), "Selected file is unreadable: /tmp/gone.png");
    }

    #[test]
    fn test_storage_error_is_transparent() {
        let err: ThemedError = StorageError::Malformed {
            path: PathBuf::from("/tmp/preferences.json"),
            reason: "expected value".to_string(),
        }
        .into();
        assert_eq!(err.to_string(), "Malformed preferences file /tmp/preferences.json: expected value");
    }

    #[test]
    fn test_apply_error_display() {
        let err: ThemedError = ApplyError::from(crate::wallpaper::BackendError::NoScreens).into();
        let msg = err.to_string();
        assert!(msg.contains("Failed to apply wallpaper"));
        assert!(msg.contains("No screens available"));
    }

    #[test]
    fn test_slot_unset_display() {
        let err = ThemedError::SlotUnset(WallpaperSlot::Dark);
        assert_eq!(err.to_string(), "No dark wallpaper is selected");
    }

    #[test]
    fn test_config_error_display() {
        let err: ThemedError = ConfigError::NotFound.into();
        assert!(err.to_string().contains("Configuration error"));
    }
}
