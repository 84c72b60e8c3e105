//! Desktop background setting.
//!
//! [`DesktopBackend`] is the seam to the OS desktop-picture API. The
//! [`Applier`] drives it from a worker thread so the interactive context
//! never blocks on the (possibly slow) decode-and-set call.

mod applier;
mod generic;
#[cfg(target_os = "macos")]
mod macos;

use std::path::{Path, PathBuf};
use std::sync::Arc;

pub use applier::{Applier, ApplierState, ApplyError, ApplyOutcome, ApplyTarget, OutcomeHandler};
pub use generic::GenericBackend;
#[cfg(target_os = "macos")]
pub use macos::MacBackend;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can occur when setting the wallpaper.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BackendError {
    /// The wallpaper file does not exist.
    #[error("Wallpaper file not found: {0}")]
    FileNotFound(String),
    /// The OS rejected the image or the call failed.
    #[error("Failed to set wallpaper: {0}")]
    SetWallpaperFailed(String),
    /// The display disappeared between enumeration and the set call.
    #[error("Invalid screen index: {0}")]
    InvalidScreen(usize),
    /// No displays are attached.
    #[error("No screens available")]
    NoScreens,
    /// Some displays failed while others succeeded.
    #[error("Failed to set wallpaper on {failed} of {total} screen(s): {first}")]
    Partial {
        failed: usize,
        total: usize,
        first: String,
    },
}

/// An attached display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Screen {
    /// 0-based index; 0 is the main screen.
    pub index: usize,
    pub name: String,
}

/// Which displays receive the wallpaper.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum ScreenTarget {
    /// Every attached display.
    #[default]
    All,
    /// Only the main display.
    Main,
}

/// OS desktop-background API.
pub trait DesktopBackend: Send + Sync {
    /// Enumerates the attached displays.
    ///
    /// # Errors
    ///
    /// Returns an error if the displays cannot be queried.
    fn screens(&self) -> Result<Vec<Screen>, BackendError>;

    /// Sets `path` as the background of `screen`.
    ///
    /// # Errors
    ///
    /// Returns an error if the OS rejects the call. A failed call leaves the
    /// previous background of that display in place.
    fn set_for_screen(&self, path: &Path, screen: &Screen) -> Result<(), BackendError>;

    /// The platform's factory default background, if known.
    fn default_image(&self) -> Option<PathBuf>;
}

/// Shared handle to the process-wide backend.
pub type SharedBackend = Arc<dyn DesktopBackend>;

/// Sets `path` on every targeted display.
///
/// Each display is attempted even when an earlier one fails; failures are
/// aggregated into a single error.
///
/// # Errors
///
/// Returns an error if no display could be enumerated or any display failed.
pub fn set_on_screens(
    backend: &dyn DesktopBackend,
    path: &Path,
    target: ScreenTarget,
) -> Result<(), BackendError> {
    if !path.exists() {
        return Err(BackendError::FileNotFound(path.display().to_string()));
    }

    let mut screens = backend.screens()?;
    if target == ScreenTarget::Main {
        screens.truncate(1);
    }
    if screens.is_empty() {
        return Err(BackendError::NoScreens);
    }

    let total = screens.len();
    let mut failures: Vec<BackendError> = screens
        .iter()
        .filter_map(|screen| {
            backend.set_for_screen(path, screen).err().inspect(|err| {
                tracing::warn!(screen = %screen.name, error = %err, "failed to set wallpaper on screen");
            })
        })
        .collect();

    if failures.is_empty() {
        return Ok(());
    }
    if total == 1 {
        return Err(failures.remove(0));
    }

    Err(BackendError::Partial {
        failed: failures.len(),
        total,
        first: failures[0].to_string(),
    })
}

/// Returns the backend appropriate for this platform.
#[must_use]
pub fn default_backend() -> SharedBackend {
    #[cfg(target_os = "macos")]
    {
        Arc::new(MacBackend::new())
    }

    #[cfg(not(target_os = "macos"))]
    {
        Arc::new(GenericBackend::new())
    }
}
