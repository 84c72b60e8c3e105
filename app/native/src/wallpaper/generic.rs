//! Cross-platform backend built on the `wallpaper` crate.
//!
//! The crate applies one image to the whole desktop, so the backend reports
//! a single logical screen.

use std::path::{Path, PathBuf};

use super::{BackendError, DesktopBackend, Screen};

/// Desktop backend that delegates to the `wallpaper` crate.
#[derive(Debug, Default)]
pub struct GenericBackend;

impl GenericBackend {
    #[must_use]
    pub const fn new() -> Self { Self }
}

impl DesktopBackend for GenericBackend {
    fn screens(&self) -> Result<Vec<Screen>, BackendError> {
        Ok(vec![Screen { index: 0, name: "Desktop".to_string() }])
    }

    fn set_for_screen(&self, path: &Path, screen: &Screen) -> Result<(), BackendError> {
        if screen.index != 0 {
            return Err(BackendError::InvalidScreen(screen.index));
        }
        if !path.exists() {
            return Err(BackendError::FileNotFound(path.display().to_string()));
        }

        let path_str = path.display().to_string();
        wallpaper::set_from_path(&path_str)
            .map_err(|e| BackendError::SetWallpaperFailed(e.to_string()))
    }

    fn default_image(&self) -> Option<PathBuf> { None }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_one_screen() {
        let screens = GenericBackend::new().screens().unwrap();
        assert_eq!(screens.len(), 1);
        assert_eq!(screens[0].index, 0);
    }

    #[test]
    fn rejects_missing_file() {
        let backend = GenericBackend::new();
        let screen = Screen { index: 0, name: "Desktop".to_string() };
        let err = backend.set_for_screen(Path::new("/nonexistent/wall.png"), &screen).unwrap_err();
        assert!(matches!(err, BackendError::FileNotFound(_)));
    }

    #[test]
    fn rejects_unknown_screen() {
        let backend = GenericBackend::new();
        let screen = Screen { index: 3, name: "Ghost".to_string() };
        let err = backend.set_for_screen(Path::new("/nonexistent/wall.png"), &screen).unwrap_err();
        assert_eq!(err, BackendError::InvalidScreen(3));
    }
}
