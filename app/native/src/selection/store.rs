//! Persistent store of the two wallpaper selections.
//!
//! Each set slot holds its token, the resolved path, and an open access
//! scope on that path. Replacing or clearing a slot drops the old scope,
//! which closes it. Only tokens are persisted; paths are re-derived each run.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use super::{Appearance, WallpaperSelection, WallpaperSlot};
use crate::access::{AccessError, AccessScope, DurableToken, SharedAccess};
use crate::storage::{KeyValueStore, StorageError};

/// Errors surfaced to the user when selecting a file.
#[derive(Debug, Error)]
pub enum SelectionError {
    /// A durable token could not be minted, re-resolved, or opened.
    #[error("Failed to access the selected file: {0}")]
    AccessDenied(#[source] AccessError),
    /// The chosen location could not be opened for reading.
    #[error("Selected file is unreadable: {path}")]
    FileUnreadable { path: PathBuf },
    /// The chosen file is not one of the supported image types.
    #[error("Unsupported image type: {path}. Use JPEG, PNG, TIFF, or HEIC.")]
    UnsupportedType { path: PathBuf },
    /// The token could not be persisted.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl SelectionError {
    fn from_access(candidate: &Path, err: AccessError) -> Self {
        match err {
            AccessError::NotFound(_) => Self::FileUnreadable { path: candidate.to_path_buf() },
            other => Self::AccessDenied(other),
        }
    }
}

/// What startup resolution did for one slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolveOutcome {
    /// Nothing was persisted for the slot.
    Unset,
    /// The token resolved and access is open.
    Resolved(PathBuf),
    /// The token was stale; a fresh one was minted and persisted.
    Repaired(PathBuf),
    /// The token no longer resolves; it was erased and the slot is unset.
    Cleared(String),
}

struct SlotEntry {
    selection: WallpaperSelection,
    // Held for its Drop, which closes the access scope.
    _scope: AccessScope,
}

/// The light/dark selections and their persisted tokens.
pub struct SelectionStore {
    storage: Arc<dyn KeyValueStore>,
    access: SharedAccess,
    slots: [Option<SlotEntry>; 2],
}

impl SelectionStore {
    /// Creates an empty store. Call [`Self::resolve_all_on_startup`] next.
    #[must_use]
    pub fn new(storage: Arc<dyn KeyValueStore>, access: SharedAccess) -> Self {
        Self { storage, access, slots: [None, None] }
    }

    /// Shared access provider, for collaborators that open scopes themselves.
    #[must_use]
    pub const fn access(&self) -> &SharedAccess { &self.access }

    /// Resolves every persisted token and opens access on it.
    ///
    /// Stale tokens are silently re-minted. Tokens that no longer resolve are
    /// erased so they are not retried next launch; this is logged and never
    /// returned as an error.
    pub fn resolve_all_on_startup(&mut self) -> [(WallpaperSlot, ResolveOutcome); 2] {
        WallpaperSlot::ALL.map(|slot| (slot, self.resolve_slot(slot)))
    }

    fn resolve_slot(&mut self, slot: WallpaperSlot) -> ResolveOutcome {
        let key = slot.storage_key();
        let Some(bytes) = self.storage.get(key) else {
            self.slots[slot.index()] = None;
            return ResolveOutcome::Unset;
        };

        let token = DurableToken::from_bytes(bytes);
        let scope = match AccessScope::open(&self.access, &token) {
            Ok(scope) => scope,
            Err(err) => {
                tracing::warn!(%slot, error = %err, "stored wallpaper no longer resolves, clearing it");
                self.slots[slot.index()] = None;
                if let Err(storage_err) = self.storage.remove(key) {
                    tracing::warn!(%slot, error = %storage_err, "failed to erase stale wallpaper token");
                }
                return ResolveOutcome::Cleared(err.to_string());
            }
        };

        let path = scope.path().to_path_buf();
        let (token, outcome) = if scope.was_stale() {
            match self.repair(slot, &path) {
                Some(fresh) => (fresh, ResolveOutcome::Repaired(path.clone())),
                None => (token, ResolveOutcome::Resolved(path.clone())),
            }
        } else {
            (token, ResolveOutcome::Resolved(path.clone()))
        };

        tracing::debug!(%slot, path = %path.display(), "wallpaper resolved");
        self.slots[slot.index()] = Some(SlotEntry {
            selection: WallpaperSelection::new(token, path),
            _scope: scope,
        });
        outcome
    }

    /// Picks up tokens another process persisted since the last resolution.
    ///
    /// Storage is re-read first. Slots whose stored token matches the one
    /// held in memory are left alone; the others are resolved again, with the
    /// same repair and cleanup rules as startup.
    ///
    /// # Errors
    ///
    /// Returns an error if storage cannot be re-read. Nothing changes then.
    pub fn sync(&mut self) -> Result<Vec<(WallpaperSlot, ResolveOutcome)>, StorageError> {
        self.storage.reload()?;

        let changed: Vec<WallpaperSlot> =
            WallpaperSlot::ALL.into_iter().filter(|slot| self.stored_token_differs(*slot)).collect();

        Ok(changed.into_iter().map(|slot| (slot, self.resolve_slot(slot))).collect())
    }

    fn stored_token_differs(&self, slot: WallpaperSlot) -> bool {
        let stored = self.storage.get(slot.storage_key());
        let held = self.selection(slot).map(|selection| selection.token().as_bytes());
        stored.as_deref() != held
    }

    /// Re-mints and persists a token for a stale slot.
    ///
    /// Returns `None` when repair fails; the stale token keeps working for
    /// this run and repair is retried next launch.
    fn repair(&self, slot: WallpaperSlot, path: &Path) -> Option<DurableToken> {
        let fresh = match self.access.mint(path) {
            Ok(token) => token,
            Err(err) => {
                tracing::warn!(%slot, error = %err, "failed to refresh stale wallpaper token");
                return None;
            }
        };

        if let Err(err) = self.storage.set(slot.storage_key(), fresh.as_bytes()) {
            tracing::warn!(%slot, error = %err, "failed to persist refreshed wallpaper token");
            return None;
        }

        tracing::info!(%slot, path = %path.display(), "refreshed stale wallpaper token");
        Some(fresh)
    }

    /// Stores a freshly chosen file for `slot`.
    ///
    /// The token is minted, immediately re-resolved and opened, and only then
    /// persisted, so a token known to be unusable is never stored. The scope
    /// held for the previous selection closes once the new one is in place.
    ///
    /// # Errors
    ///
    /// Returns [`SelectionError::FileUnreadable`] if the file cannot be
    /// found, [`SelectionError::AccessDenied`] if a token cannot be minted or
    /// opened, and [`SelectionError::Storage`] if it cannot be persisted.
    pub fn select_file(
        &mut self,
        slot: WallpaperSlot,
        candidate: &Path,
    ) -> Result<&WallpaperSelection, SelectionError> {
        let token = self
            .access
            .mint(candidate)
            .map_err(|err| SelectionError::from_access(candidate, err))?;
        let scope = AccessScope::open(&self.access, &token).map_err(SelectionError::AccessDenied)?;

        self.storage.set(slot.storage_key(), token.as_bytes())?;

        let path = scope.path().to_path_buf();
        tracing::info!(%slot, path = %path.display(), "wallpaper selected");

        let entry = self.slots[slot.index()].insert(SlotEntry {
            selection: WallpaperSelection::new(token, path),
            _scope: scope,
        });
        Ok(&entry.selection)
    }

    /// Unsets both slots, erases both tokens, and closes all access.
    ///
    /// Both keys are attempted even if one fails. A slot whose token could
    /// not be erased stays set, matching what the next launch will restore.
    ///
    /// # Errors
    ///
    /// Returns the first storage error encountered.
    pub fn clear_all(&mut self) -> Result<(), SelectionError> {
        let mut first_err = None;
        for slot in WallpaperSlot::ALL {
            match self.storage.remove(slot.storage_key()) {
                Ok(()) => self.slots[slot.index()] = None,
                Err(err) => {
                    tracing::warn!(%slot, error = %err, "failed to erase wallpaper token");
                    first_err.get_or_insert(err);
                }
            }
        }

        tracing::info!("wallpaper selections cleared");
        first_err.map_or(Ok(()), |err| Err(err.into()))
    }

    /// The selection shown for `appearance`, if that slot is set.
    #[must_use]
    pub fn current_selection(&self, appearance: Appearance) -> Option<&WallpaperSelection> {
        self.selection(appearance.slot())
    }

    /// The selection stored in `slot`, if set.
    #[must_use]
    pub fn selection(&self, slot: WallpaperSlot) -> Option<&WallpaperSelection> {
        self.slots[slot.index()].as_ref().map(|entry| &entry.selection)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;
    use crate::access::{AccessProvider, PassthroughProvider};
    use crate::storage::MemoryStore;

    struct Fixture {
        dir: TempDir,
        storage: Arc<MemoryStore>,
        access: Arc<PassthroughProvider>,
    }

    impl Fixture {
        fn new() -> Self {
            Self {
                dir: TempDir::new().unwrap(),
                storage: Arc::new(MemoryStore::new()),
                access: Arc::new(PassthroughProvider::new()),
            }
        }

        fn store(&self) -> SelectionStore {
            SelectionStore::new(self.storage.clone(), self.access.clone())
        }

        fn image(&self, name: &str) -> PathBuf {
            let path = self.dir.path().join(name);
            fs::write(&path, b"image bytes").unwrap();
            path.canonicalize().unwrap()
        }
    }

    #[test]
    fn select_file_persists_and_resolves() {
        let fx = Fixture::new();
        let path = fx.image("day.png");
        let mut store = fx.store();

        let selection = store.select_file(WallpaperSlot::Light, &path).unwrap();
        assert_eq!(selection.resolved_path(), path);
        assert!(fx.storage.get("lightModeBookmark").is_some());
        assert!(fx.storage.get("darkModeBookmark").is_none());
    }

    #[test]
    fn select_missing_file_is_unreadable_and_not_persisted() {
        let fx = Fixture::new();
        let mut store = fx.store();

        let err = store
            .select_file(WallpaperSlot::Dark, &fx.dir.path().join("missing.png"))
            .unwrap_err();

        assert!(matches!(err, SelectionError::FileUnreadable { .. }));
        assert!(fx.storage.is_empty());
        assert!(store.selection(WallpaperSlot::Dark).is_none());
    }

    #[test]
    fn reselecting_closes_previous_scope() {
        let fx = Fixture::new();
        let first = fx.image("first.png");
        let second = fx.image("second.png");
        let mut store = fx.store();

        store.select_file(WallpaperSlot::Dark, &first).unwrap();
        assert_eq!(fx.access.open_scopes(), 1);

        store.select_file(WallpaperSlot::Dark, &second).unwrap();
        assert_eq!(fx.access.open_scopes(), 1);
        assert_eq!(store.selection(WallpaperSlot::Dark).unwrap().resolved_path(), second);
    }

    #[test]
    fn startup_resolution_restores_both_slots() {
        let fx = Fixture::new();
        let day = fx.image("day.png");
        let night = fx.image("night.png");
        {
            let mut store = fx.store();
            store.select_file(WallpaperSlot::Light, &day).unwrap();
            store.select_file(WallpaperSlot::Dark, &night).unwrap();
        }
        assert_eq!(fx.access.open_scopes(), 0);

        let mut fresh = fx.store();
        let outcomes = fresh.resolve_all_on_startup();

        assert_eq!(outcomes[0], (WallpaperSlot::Light, ResolveOutcome::Resolved(day.clone())));
        assert_eq!(outcomes[1], (WallpaperSlot::Dark, ResolveOutcome::Resolved(night.clone())));
        assert_eq!(fresh.current_selection(Appearance::Light).unwrap().resolved_path(), day);
        assert_eq!(fresh.current_selection(Appearance::Dark).unwrap().resolved_path(), night);
        assert_eq!(fx.access.open_scopes(), 2);
    }

    #[test]
    fn deleted_file_clears_slot_once() {
        let fx = Fixture::new();
        let path = fx.image("doomed.png");
        fx.store().select_file(WallpaperSlot::Dark, &path).unwrap();
        fs::remove_file(&path).unwrap();

        let mut store = fx.store();
        let outcomes = store.resolve_all_on_startup();
        assert!(matches!(outcomes[1].1, ResolveOutcome::Cleared(_)));
        assert!(store.selection(WallpaperSlot::Dark).is_none());
        assert!(fx.storage.get("darkModeBookmark").is_none());

        let again = store.resolve_all_on_startup();
        assert_eq!(again[1].1, ResolveOutcome::Unset);
    }

    #[cfg(unix)]
    #[test]
    fn stale_token_is_repaired_silently() {
        let fx = Fixture::new();
        let path = fx.image("before.png");
        fx.store().select_file(WallpaperSlot::Light, &path).unwrap();
        let original = fx.storage.get("lightModeBookmark").unwrap();

        let moved = path.with_file_name("after.png");
        fs::rename(&path, &moved).unwrap();

        let mut store = fx.store();
        let outcomes = store.resolve_all_on_startup();

        assert_eq!(outcomes[0].1, ResolveOutcome::Repaired(moved.clone()));
        assert_ne!(fx.storage.get("lightModeBookmark").unwrap(), original);
        assert_eq!(store.selection(WallpaperSlot::Light).unwrap().resolved_path(), moved);
    }

    #[test]
    fn clear_all_is_idempotent() {
        let fx = Fixture::new();
        let path = fx.image("day.png");
        let mut store = fx.store();
        store.select_file(WallpaperSlot::Light, &path).unwrap();

        store.clear_all().unwrap();
        store.clear_all().unwrap();

        assert!(store.selection(WallpaperSlot::Light).is_none());
        assert!(store.selection(WallpaperSlot::Dark).is_none());
        assert!(fx.storage.is_empty());
        assert_eq!(fx.access.open_scopes(), 0);
    }

    #[test]
    fn sync_picks_up_selection_from_another_store() {
        let fx = Fixture::new();
        let night = fx.image("night.png");
        let mut agent = fx.store();
        agent.resolve_all_on_startup();

        fx.store().select_file(WallpaperSlot::Dark, &night).unwrap();

        let changed = agent.sync().unwrap();
        assert_eq!(changed, vec![(WallpaperSlot::Dark, ResolveOutcome::Resolved(night.clone()))]);
        assert_eq!(agent.current_selection(Appearance::Dark).unwrap().resolved_path(), night);
    }

    #[test]
    fn sync_without_changes_touches_nothing() {
        let fx = Fixture::new();
        let day = fx.image("day.png");
        let mut store = fx.store();
        store.select_file(WallpaperSlot::Light, &day).unwrap();

        assert!(store.sync().unwrap().is_empty());
        assert_eq!(fx.access.open_scopes(), 1);
    }

    #[test]
    fn sync_sees_clear_from_another_store() {
        let fx = Fixture::new();
        let day = fx.image("day.png");
        let mut agent = fx.store();
        agent.select_file(WallpaperSlot::Light, &day).unwrap();

        fx.store().clear_all().unwrap();

        let changed = agent.sync().unwrap();
        assert_eq!(changed, vec![(WallpaperSlot::Light, ResolveOutcome::Unset)]);
        assert!(agent.selection(WallpaperSlot::Light).is_none());
        assert_eq!(fx.access.open_scopes(), 0);
    }

    #[test]
    fn current_selection_follows_appearance() {
        let fx = Fixture::new();
        let night = fx.image("night.png");
        let mut store = fx.store();
        store.select_file(WallpaperSlot::Dark, &night).unwrap();

        assert!(store.current_selection(Appearance::Light).is_none());
        assert!(store.current_selection(Appearance::Dark).is_some());
    }
}
