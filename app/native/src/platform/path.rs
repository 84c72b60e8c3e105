//! Expansion of user-supplied paths.
//!
//! Paths in the configuration file may start with `~` and may be relative to
//! the directory holding the configuration file. An empty value means "not
//! set" and expands to `None`.

use std::path::{Path, PathBuf};

/// Expands a leading `~` to the home directory.
///
/// Returns `None` for an empty or whitespace-only value.
#[must_use]
pub fn expand(path: &str) -> Option<PathBuf> {
    let path = path.trim();
    if path.is_empty() {
        return None;
    }
    Some(PathBuf::from(shellexpand::tilde(path).as_ref()))
}

/// Expands `path` and joins it onto `base_dir` if it is still relative.
#[must_use]
pub fn expand_and_resolve(path: &str, base_dir: &Path) -> Option<PathBuf> {
    let expanded = expand(path)?;
    if expanded.is_absolute() {
        return Some(expanded);
    }
    Some(base_dir.join(expanded))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_values_are_unset() {
        assert_eq!(expand(""), None);
        assert_eq!(expand("  "), None);
        assert_eq!(expand_and_resolve("", Path::new("/cfg")), None);
    }

    #[test]
    fn absolute_paths_pass_through() {
        assert_eq!(
            expand("/System/Library/Desktop Pictures/Sonoma.heic"),
            Some(PathBuf::from("/System/Library/Desktop Pictures/Sonoma.heic"))
        );
        assert_eq!(
            expand_and_resolve("/var/themed/prefs.json", Path::new("/cfg")),
            Some(PathBuf::from("/var/themed/prefs.json"))
        );
    }

    #[test]
    fn tilde_expands_to_home() {
        let expanded = expand("~/Pictures/night.png").unwrap();
        assert!(!expanded.to_string_lossy().starts_with('~'));
        assert!(expanded.ends_with("Pictures/night.png"));
    }

    #[test]
    fn relative_paths_join_base_dir() {
        assert_eq!(
            expand_and_resolve(" prefs.json ", Path::new("/home/me/.config/themed")),
            Some(PathBuf::from("/home/me/.config/themed/prefs.json"))
        );
    }

    #[test]
    fn tilde_is_not_joined_onto_base_dir() {
        let resolved = expand_and_resolve("~/walls/day.jpg", Path::new("/base")).unwrap();
        assert!(!resolved.starts_with("/base"));
        assert!(resolved.ends_with("walls/day.jpg"));
    }
}
