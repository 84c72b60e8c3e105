//! In-memory preview cache.
//!
//! Maps a resolved location to its decoded, downsized preview. Entries can be
//! dropped at any time (capacity bound or memory pressure), so every caller
//! must treat a miss as "decode again", never as an error.
//!
//! The key includes the file's identity, so a file replaced at the same path
//! gets a new entry when the filesystem can tell the two apart. When it
//! cannot, the old preview is shown until the slot is re-selected or the
//! process restarts.

use std::collections::{HashMap, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use image::{DynamicImage, ImageReader};
use parking_lot::Mutex;
use thiserror::Error;

use crate::access::FileIdentity;

/// Default number of cached previews.
pub const DEFAULT_MAX_ENTRIES: usize = 8;

/// Default longest edge of a preview, in pixels.
pub const DEFAULT_MAX_DIMENSION: u32 = 480;

/// A decoded preview, shared with renderers.
pub type PreviewImage = Arc<DynamicImage>;

/// Cache key: a resolved location plus its filesystem identity.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LocationIdentity {
    path: PathBuf,
    identity: Option<FileIdentity>,
}

impl LocationIdentity {
    /// Captures the current identity of `path`.
    #[must_use]
    pub fn of(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
            identity: FileIdentity::of(path).ok(),
        }
    }

    #[must_use]
    pub fn path(&self) -> &Path { &self.path }
}

/// Errors raised while decoding a preview.
#[derive(Debug, Error)]
pub enum PreviewError {
    #[error("Failed to load preview for {path}: {reason}")]
    Unreadable { path: PathBuf, reason: String },
    #[error("Failed to write preview to {path}: {reason}")]
    Write { path: PathBuf, reason: String },
}

/// Cache statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
}

#[derive(Debug, Default)]
struct Inner {
    entries: HashMap<LocationIdentity, PreviewImage>,
    /// Insertion order, oldest first.
    order: VecDeque<LocationIdentity>,
    stats: CacheStats,
}

impl Inner {
    fn evict_oldest(&mut self) {
        while let Some(key) = self.order.pop_front() {
            if self.entries.remove(&key).is_some() {
                self.stats.evictions += 1;
                return;
            }
        }
    }
}

/// Bounded map from resolved location to decoded preview.
#[derive(Debug)]
pub struct PreviewCache {
    inner: Mutex<Inner>,
    max_entries: usize,
    max_dimension: u32,
}

impl Default for PreviewCache {
    fn default() -> Self { Self::new(DEFAULT_MAX_ENTRIES, DEFAULT_MAX_DIMENSION) }
}

impl PreviewCache {
    /// Creates a cache holding at most `max_entries` previews whose longest
    /// edge is at most `max_dimension` pixels.
    #[must_use]
    pub fn new(max_entries: usize, max_dimension: u32) -> Self {
        Self {
            inner: Mutex::new(Inner::default()),
            max_entries: max_entries.max(1),
            max_dimension: max_dimension.max(1),
        }
    }

    /// Returns the cached preview for `key`, if present.
    pub fn get(&self, key: &LocationIdentity) -> Option<PreviewImage> {
        let mut inner = self.inner.lock();
        let found = inner.entries.get(key).cloned();
        if found.is_some() {
            inner.stats.hits += 1;
        } else {
            inner.stats.misses += 1;
        }
        found
    }

    /// Stores a preview, evicting the oldest entries beyond capacity.
    pub fn put(&self, key: LocationIdentity, image: PreviewImage) {
        let mut inner = self.inner.lock();
        if inner.entries.insert(key.clone(), image).is_some() {
            inner.order.retain(|existing| existing != &key);
        }
        inner.order.push_back(key);

        while inner.entries.len() > self.max_entries {
            inner.evict_oldest();
        }
    }

    /// Returns the preview for `path`, decoding and caching it on a miss.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be opened or decoded.
    pub fn get_or_decode(&self, path: &Path) -> Result<PreviewImage, PreviewError> {
        let key = LocationIdentity::of(path);
        if let Some(image) = self.get(&key) {
            return Ok(image);
        }

        let image = Arc::new(self.decode(path)?);
        self.put(key, Arc::clone(&image));
        Ok(image)
    }

    fn decode(&self, path: &Path) -> Result<DynamicImage, PreviewError> {
        let unreadable = |reason: String| PreviewError::Unreadable {
            path: path.to_path_buf(),
            reason,
        };

        let image = ImageReader::open(path)
            .map_err(|err| unreadable(err.to_string()))?
            .with_guessed_format()
            .map_err(|err| unreadable(err.to_string()))?
            .decode()
            .map_err(|err| unreadable(err.to_string()))?;

        if image.width() <= self.max_dimension && image.height() <= self.max_dimension {
            return Ok(image);
        }
        Ok(image.thumbnail(self.max_dimension, self.max_dimension))
    }

    /// Drops every entry, as the OS asks under memory pressure.
    ///
    /// Returns the number of entries dropped.
    pub fn on_memory_pressure(&self) -> usize {
        let mut inner = self.inner.lock();
        let dropped = inner.entries.len();
        inner.entries.clear();
        inner.order.clear();
        inner.stats.evictions += dropped as u64;
        if dropped > 0 {
            tracing::debug!(dropped, "preview cache purged");
        }
        dropped
    }

    #[must_use]
    pub fn len(&self) -> usize { self.inner.lock().entries.len() }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.inner.lock().entries.is_empty() }

    #[must_use]
    pub fn stats(&self) -> CacheStats { self.inner.lock().stats }
}

/// Formats a byte count as a human-readable string.
#[must_use]
#[allow(clippy::cast_precision_loss)] // Precision loss is acceptable for human-readable output
pub fn format_bytes(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{bytes} bytes")
    }
}
