//! Durable, re-resolvable access to files outside the app's own sandbox.
//!
//! A [`DurableToken`] is minted once when the user picks a file and persisted
//! as opaque bytes. Each run resolves it back into a live path. Reading that
//! path requires an open access scope, which must be closed again; the
//! [`AccessScope`] guard closes on drop so no exit path leaks a scope.
//!
//! Providers:
//!
//! - [`PassthroughProvider`] - path plus file identity, for unsandboxed use
//! - `BookmarkProvider` - security-scoped, read-only bookmarks (macOS)

mod identity;
mod passthrough;

#[cfg(target_os = "macos")]
mod bookmark;

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[cfg(target_os = "macos")]
pub use bookmark::BookmarkProvider;
pub use identity::FileIdentity;
use parking_lot::Mutex;
pub use passthrough::PassthroughProvider;
use thiserror::Error;

/// Opaque, persist-safe reference to one external file.
///
/// The bytes are produced and interpreted only by an [`AccessProvider`];
/// everything else just round-trips them.
#[derive(Clone, PartialEq, Eq)]
pub struct DurableToken(Vec<u8>);

impl DurableToken {
    #[must_use]
    pub const fn from_bytes(bytes: Vec<u8>) -> Self { Self(bytes) }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] { &self.0 }
}

impl fmt::Debug for DurableToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "DurableToken({} bytes)", self.0.len())
    }
}

/// Result of resolving a token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolved {
    /// Live location of the file.
    pub path: PathBuf,
    /// The token still resolved, but should be re-minted and re-persisted.
    pub stale: bool,
}

/// Errors raised while minting, resolving, or opening a token.
#[derive(Debug, Error)]
pub enum AccessError {
    /// The target no longer exists (deleted, or its volume is unmounted).
    #[error("File not found: {0}")]
    NotFound(PathBuf),
    /// The OS refused read access.
    #[error("Access denied: {0}")]
    Denied(PathBuf),
    /// A token could not be created for the location.
    #[error("Failed to create access token for {path}: {reason}")]
    Mint { path: PathBuf, reason: String },
    /// The token bytes could not be interpreted.
    #[error("Unrecognized access token: {0}")]
    Corrupt(String),
    /// The OS failed to resolve the token.
    #[error("Failed to resolve access token: {0}")]
    Resolve(String),
}

impl AccessError {
    pub(crate) fn from_io(path: &Path, err: &std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(path.to_path_buf()),
            _ => Self::Denied(path.to_path_buf()),
        }
    }
}

/// Mints, resolves, opens and closes durable tokens.
///
/// `open` resolves the token and opens a read scope on the result; every
/// successful `open` must be paired with one `close` of the returned path.
/// Prefer [`AccessScope::open`], which does the pairing.
pub trait AccessProvider: Send + Sync {
    /// Creates a read-only token for `path`.
    ///
    /// # Errors
    ///
    /// Returns an error if the file does not exist or is not readable.
    fn mint(&self, path: &Path) -> Result<DurableToken, AccessError>;

    /// Resolves a token without opening access.
    ///
    /// # Errors
    ///
    /// Returns an error if the target cannot be located.
    fn resolve(&self, token: &DurableToken) -> Result<Resolved, AccessError>;

    /// Resolves a token and opens a read scope on its target.
    ///
    /// # Errors
    ///
    /// Returns an error if resolution fails or access is refused.
    fn open(&self, token: &DurableToken) -> Result<Resolved, AccessError>;

    /// Closes one scope previously opened on `path`.
    fn close(&self, path: &Path);

    /// Number of scopes currently open.
    fn open_scopes(&self) -> usize;
}

/// Shared handle to the process-wide provider.
pub type SharedAccess = Arc<dyn AccessProvider>;

/// An open read scope that closes itself when dropped.
pub struct AccessScope {
    provider: SharedAccess,
    path: PathBuf,
    stale: bool,
}

impl AccessScope {
    /// Resolves `token` and opens a read scope on it.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider cannot resolve or open the token.
    pub fn open(provider: &SharedAccess, token: &DurableToken) -> Result<Self, AccessError> {
        let resolved = provider.open(token)?;
        Ok(Self {
            provider: Arc::clone(provider),
            path: resolved.path,
            stale: resolved.stale,
        })
    }

    #[must_use]
    pub fn path(&self) -> &Path { &self.path }

    /// Whether resolution reported the token as stale.
    #[must_use]
    pub const fn was_stale(&self) -> bool { self.stale }
}

impl fmt::Debug for AccessScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessScope").field("path", &self.path).finish_non_exhaustive()
    }
}

impl Drop for AccessScope {
    fn drop(&mut self) { self.provider.close(&self.path); }
}

/// Reference counts of open scopes, keyed by resolved path.
#[derive(Debug, Default)]
pub(crate) struct ScopeCounts {
    counts: Mutex<HashMap<PathBuf, usize>>,
}

impl ScopeCounts {
    /// Records an open; returns `true` when this is the first scope on `path`.
    pub(crate) fn acquire(&self, path: &Path) -> bool {
        let mut counts = self.counts.lock();
        let count = counts.entry(path.to_path_buf()).or_insert(0);
        *count += 1;
        *count == 1
    }

    /// Records a close; returns `true` when the last scope on `path` closed.
    pub(crate) fn release(&self, path: &Path) -> bool {
        let mut counts = self.counts.lock();
        let Some(count) = counts.get_mut(path) else {
            tracing::debug!(path = %path.display(), "close without matching open");
            return false;
        };
        *count -= 1;
        if *count == 0 {
            counts.remove(path);
            return true;
        }
        false
    }

    pub(crate) fn total(&self) -> usize { self.counts.lock().values().sum() }
}

/// Returns the provider appropriate for this platform.
#[must_use]
pub fn default_provider() -> SharedAccess {
    #[cfg(target_os = "macos")]
    {
        Arc::new(BookmarkProvider::new())
    }

    #[cfg(not(target_os = "macos"))]
    {
        Arc::new(PassthroughProvider::new())
    }
}
