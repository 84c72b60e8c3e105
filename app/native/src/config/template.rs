//! Configuration template generation.
//!
//! Generates a commented configuration template with all available options.

use std::fs;
use std::path::Path;

/// Generates a configuration template with all options commented out.
#[must_use]
pub fn generate_config_template() -> String {
    r#"// Themed Configuration File
// =========================
// This file uses JSONC format (JSON with comments).
// All options below are commented out and show their default values.
// Uncomment and modify the options you want to configure.
//
// Print the JSON Schema with: themed schema

{
  // ============================================================================
  // Storage
  // ============================================================================
  // "storage": {
  //   // File holding the chosen light and dark wallpapers.
  //   // Relative paths are resolved against this file's directory.
  //   "path": "~/Library/Application Support/themed/preferences.json"
  // },

  // ============================================================================
  // Wallpaper
  // ============================================================================
  // "wallpaper": {
  //   // Image applied by `themed clear`. Empty uses the system default picture.
  //   "defaultImage": "",
  //
  //   // Displays that receive the wallpaper: "all" or "main"
  //   "screens": "all"
  // },

  // ============================================================================
  // Previews
  // ============================================================================
  // "preview": {
  //   // Maximum number of decoded previews kept in memory
  //   "maxEntries": 8,
  //
  //   // Longest edge of a preview in pixels
  //   "maxDimension": 480
  // },

  // ============================================================================
  // Appearance
  // ============================================================================
  // "appearance": {
  //   // Quiet period after a preferences write before reading the appearance
  //   "debounceMs": 200,
  //
  //   // Fallback poll interval in milliseconds
  //   "pollIntervalMs": 2000
  // }
}
"#
    .to_string()
}

/// Creates a configuration file with the template at the specified path.
///
/// Creates parent directories if they don't exist.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn create_config_file(path: &Path) -> Result<(), std::io::Error> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, generate_config_template())
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::super::ThemedConfig;
    use super::*;

    #[test]
    fn test_template_parses_to_defaults() {
        let template = generate_config_template();
        let reader = json_comments::StripComments::new(template.as_bytes());
        let config: ThemedConfig = serde_json::from_reader(reader).unwrap();
        assert_eq!(config, ThemedConfig::default());
    }

    #[test]
    fn test_template_mentions_every_section() {
        let template = generate_config_template();
        for key in ["storage", "defaultImage", "screens", "maxEntries", "maxDimension", "debounceMs", "pollIntervalMs"] {
            assert!(template.contains(key), "template is missing {key}");
        }
    }

    #[test]
    fn test_create_config_file_creates_parents() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested/themed/config.jsonc");

        create_config_file(&path).unwrap();

        assert!(path.exists());
        assert_eq!(fs::read_to_string(&path).unwrap(), generate_config_template());
    }
}
