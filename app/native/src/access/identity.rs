//! Filesystem identity of a file, independent of its path.

use std::path::Path;
use std::time::UNIX_EPOCH;

use serde::{Deserialize, Serialize};

/// Identity and version of a file as reported by the filesystem.
///
/// Two identities compare equal only when they describe the same file in the
/// same state; use [`FileIdentity::same_file`] to ignore content changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileIdentity {
    pub device: u64,
    pub inode: u64,
    pub len: u64,
    pub modified_secs: u64,
    pub modified_nanos: u32,
}

impl FileIdentity {
    /// Reads the identity of the file at `path`, following symlinks.
    ///
    /// # Errors
    ///
    /// Returns an error if the file metadata cannot be read.
    pub fn of(path: &Path) -> std::io::Result<Self> {
        let metadata = std::fs::metadata(path)?;
        let modified = metadata
            .modified()
            .ok()
            .and_then(|time| time.duration_since(UNIX_EPOCH).ok())
            .unwrap_or_default();

        #[cfg(unix)]
        let (device, inode) = {
            use std::os::unix::fs::MetadataExt;
            (metadata.dev(), metadata.ino())
        };

        #[cfg(not(unix))]
        let (device, inode) = (0, 0);

        Ok(Self {
            device,
            inode,
            len: metadata.len(),
            modified_secs: modified.as_secs(),
            modified_nanos: modified.subsec_nanos(),
        })
    }

    /// Whether both identities name the same underlying file.
    ///
    /// Without inode numbers this falls back to comparing size and
    /// modification time.
    #[must_use]
    pub const fn same_file(&self, other: &Self) -> bool {
        if cfg!(unix) {
            self.device == other.device && self.inode == other.inode
        } else {
            self.len == other.len
                && self.modified_secs == other.modified_secs
                && self.modified_nanos == other.modified_nanos
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    #[test]
    fn identity_is_stable_for_unchanged_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.png");
        fs::write(&path, b"one").unwrap();

        let first = FileIdentity::of(&path).unwrap();
        let second = FileIdentity::of(&path).unwrap();
        assert_eq!(first, second);
        assert!(first.same_file(&second));
    }

    #[test]
    fn identity_fails_for_missing_file() {
        let dir = TempDir::new().unwrap();
        assert!(FileIdentity::of(&dir.path().join("missing.png")).is_err());
    }

    #[cfg(unix)]
    #[test]
    fn rename_keeps_same_file() {
        let dir = TempDir::new().unwrap();
        let before = dir.path().join("before.png");
        let after = dir.path().join("after.png");
        fs::write(&before, b"pixels").unwrap();

        let original = FileIdentity::of(&before).unwrap();
        fs::rename(&before, &after).unwrap();
        let moved = FileIdentity::of(&after).unwrap();

        assert!(original.same_file(&moved));
    }

    #[cfg(unix)]
    #[test]
    fn replacement_is_a_different_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.png");
        let other = dir.path().join("b.png");
        fs::write(&path, b"one").unwrap();
        let original = FileIdentity::of(&path).unwrap();

        // Keep the old inode alive under another name so it cannot be reused.
        fs::rename(&path, &other).unwrap();
        fs::write(&path, b"two").unwrap();

        let replaced = FileIdentity::of(&path).unwrap();
        assert!(!original.same_file(&replaced));
    }
}
