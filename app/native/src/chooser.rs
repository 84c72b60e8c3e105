//! Interactive file choosing.
//!
//! A [`FileChooser`] asks the user for one image file. Cancelling is not an
//! error: it yields `Ok(None)` and callers leave everything unchanged.

use std::path::{Path, PathBuf};

use thiserror::Error;

use crate::selection::WallpaperSlot;

/// Image extensions accepted for wallpapers (compared case-insensitively).
pub const SUPPORTED_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "tif", "tiff", "heic"];

/// Checks if a file has a supported image extension.
#[must_use]
pub fn is_supported_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
}

/// Errors raised by a chooser.
#[derive(Debug, Error)]
pub enum ChooserError {
    #[error("No interactive file chooser on this platform. Pass a path instead.")]
    Unavailable,
    #[error("Failed to run file chooser: {0}")]
    Launch(String),
    #[error("File chooser failed: {0}")]
    Failed(String),
}

/// Prompts for a single image file.
pub trait FileChooser {
    /// Returns the chosen file, or `None` if the user cancelled.
    ///
    /// # Errors
    ///
    /// Returns an error if the chooser could not be shown.
    fn choose(&self, slot: WallpaperSlot) -> Result<Option<PathBuf>, ChooserError>;
}

/// Chooser that returns a path decided up front (e.g. a CLI argument).
#[derive(Debug, Clone, Default)]
pub struct FixedChooser(Option<PathBuf>);

impl FixedChooser {
    #[must_use]
    pub const fn new(path: Option<PathBuf>) -> Self { Self(path) }
}

impl FileChooser for FixedChooser {
    fn choose(&self, _slot: WallpaperSlot) -> Result<Option<PathBuf>, ChooserError> {
        Ok(self.0.clone())
    }
}

/// Chooser for platforms without a native picker.
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableChooser;

impl FileChooser for UnavailableChooser {
    fn choose(&self, _slot: WallpaperSlot) -> Result<Option<PathBuf>, ChooserError> {
        Err(ChooserError::Unavailable)
    }
}

/// The native chooser for this platform.
#[must_use]
pub fn default_chooser() -> Box<dyn FileChooser> {
    #[cfg(target_os = "macos")]
    {
        Box::new(macos::OsaScriptChooser)
    }
    #[cfg(not(target_os = "macos"))]
    {
        Box::new(UnavailableChooser)
    }
}

#[cfg(target_os = "macos")]
pub mod macos {
    //! Native open panel driven through `osascript`.

    use std::path::PathBuf;
    use std::process::Command;

    use super::{ChooserError, FileChooser};
    use crate::selection::WallpaperSlot;

    /// Uniform type identifiers offered in the panel.
    const TYPE_IDENTIFIERS: &[&str] = &["public.jpeg", "public.png", "public.tiff", "public.heic"];

    /// AppleScript error number for "User canceled".
    const USER_CANCELED: &str = "-128";

    /// Shows the standard open panel restricted to image types.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct OsaScriptChooser;

    impl FileChooser for OsaScriptChooser {
        fn choose(&self, slot: WallpaperSlot) -> Result<Option<PathBuf>, ChooserError> {
            let output = Command::new("/usr/bin/osascript")
                .arg("-e")
                .arg(script(slot))
                .output()
                .map_err(|err| ChooserError::Launch(err.to_string()))?;

            if output.status.success() {
                let chosen = String::from_utf8_lossy(&output.stdout).trim().to_string();
                return Ok((!chosen.is_empty()).then(|| PathBuf::from(chosen)));
            }

            let stderr = String::from_utf8_lossy(&output.stderr);
            if stderr.contains(USER_CANCELED) {
                tracing::debug!(%slot, "file chooser cancelled");
                return Ok(None);
            }
            Err(ChooserError::Failed(stderr.trim().to_string()))
        }
    }

    pub(super) fn script(slot: WallpaperSlot) -> String {
        let types = TYPE_IDENTIFIERS.iter().map(|t| format!("\"{t}\"")).collect::<Vec<_>>().join(", ");
        format!(
            "POSIX path of (choose file with prompt \"Choose the {slot} mode wallpaper\" of type {{{types}}})"
        )
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn script_names_slot_and_types() {
            let script = script(WallpaperSlot::Dark);
            assert!(script.contains("dark mode wallpaper"));
            assert!(script.contains("\"public.heic\""));
            assert!(script.starts_with("POSIX path of (choose file"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn supported_extensions_are_case_insensitive() {
        assert!(is_supported_image(Path::new("/a/b.JPG")));
        assert!(is_supported_image(Path::new("/a/b.jpeg")));
        assert!(is_supported_image(Path::new("/a/b.Png")));
        assert!(is_supported_image(Path::new("/a/b.tif")));
        assert!(is_supported_image(Path::new("/a/b.tiff")));
        assert!(is_supported_image(Path::new("/a/b.heic")));
    }

    #[test]
    fn unsupported_extensions_are_rejected() {
        assert!(!is_supported_image(Path::new("/a/b.gif")));
        assert!(!is_supported_image(Path::new("/a/b.txt")));
        assert!(!is_supported_image(Path::new("/a/noext")));
    }

    #[test]
    fn fixed_chooser_returns_its_path() {
        let chooser = FixedChooser::new(Some(PathBuf::from("/tmp/x.png")));
        assert_eq!(chooser.choose(WallpaperSlot::Light).unwrap(), Some(PathBuf::from("/tmp/x.png")));
        assert_eq!(FixedChooser::default().choose(WallpaperSlot::Dark).unwrap(), None);
    }

    #[test]
    fn unavailable_chooser_errors() {
        assert!(matches!(
            UnavailableChooser.choose(WallpaperSlot::Light),
            Err(ChooserError::Unavailable)
        ));
    }
}
