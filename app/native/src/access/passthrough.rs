//! Path-based tokens for processes that need no sandbox grant.
//!
//! The token records the canonical path and the file's identity, so a file
//! that is renamed inside its directory, or replaced at the same path, is
//! still found and reported as stale.

use std::fs::File;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::{AccessError, AccessProvider, DurableToken, FileIdentity, Resolved, ScopeCounts};

const TOKEN_VERSION: u8 = 1;

#[derive(Debug, Serialize, Deserialize)]
struct PathToken {
    version: u8,
    path: PathBuf,
    identity: FileIdentity,
}

/// Access provider backed by plain filesystem paths.
#[derive(Debug, Default)]
pub struct PassthroughProvider {
    scopes: ScopeCounts,
}

impl PassthroughProvider {
    #[must_use]
    pub fn new() -> Self { Self::default() }

    fn decode(token: &DurableToken) -> Result<PathToken, AccessError> {
        let decoded: PathToken = serde_json::from_slice(token.as_bytes())
            .map_err(|err| AccessError::Corrupt(err.to_string()))?;
        if decoded.version != TOKEN_VERSION {
            return Err(AccessError::Corrupt(format!(
                "unsupported token version {}",
                decoded.version
            )));
        }
        Ok(decoded)
    }

    /// Looks for the file next to its recorded location after a rename.
    #[cfg(unix)]
    fn find_renamed(recorded: &PathToken) -> Option<PathBuf> {
        let parent = recorded.path.parent()?;
        std::fs::read_dir(parent).ok()?.flatten().map(|entry| entry.path()).find(|candidate| {
            FileIdentity::of(candidate).is_ok_and(|found| found.same_file(&recorded.identity))
        })
    }

    #[cfg(not(unix))]
    fn find_renamed(_recorded: &PathToken) -> Option<PathBuf> { None }
}

impl AccessProvider for PassthroughProvider {
    fn mint(&self, path: &Path) -> Result<DurableToken, AccessError> {
        let canonical = path.canonicalize().map_err(|err| AccessError::from_io(path, &err))?;
        if !canonical.is_file() {
            return Err(AccessError::Mint {
                path: canonical,
                reason: "not a regular file".to_string(),
            });
        }

        File::open(&canonical).map_err(|err| AccessError::from_io(&canonical, &err))?;
        let identity =
            FileIdentity::of(&canonical).map_err(|err| AccessError::from_io(&canonical, &err))?;

        let token = PathToken {
            version: TOKEN_VERSION,
            path: canonical,
            identity,
        };
        serde_json::to_vec(&token).map(DurableToken::from_bytes).map_err(|err| {
            AccessError::Mint {
                path: token.path.clone(),
                reason: err.to_string(),
            }
        })
    }

    fn resolve(&self, token: &DurableToken) -> Result<Resolved, AccessError> {
        let recorded = Self::decode(token)?;

        if let Ok(current) = FileIdentity::of(&recorded.path) {
            return Ok(Resolved {
                stale: !current.same_file(&recorded.identity),
                path: recorded.path,
            });
        }

        match Self::find_renamed(&recorded) {
            Some(path) => Ok(Resolved { path, stale: true }),
            None => Err(AccessError::NotFound(recorded.path)),
        }
    }

    fn open(&self, token: &DurableToken) -> Result<Resolved, AccessError> {
        let resolved = self.resolve(token)?;
        File::open(&resolved.path).map_err(|err| AccessError::from_io(&resolved.path, &err))?;
        self.scopes.acquire(&resolved.path);
        Ok(resolved)
    }

    fn close(&self, path: &Path) { self.scopes.release(path); }

    fn open_scopes(&self) -> usize { self.scopes.total() }
}
