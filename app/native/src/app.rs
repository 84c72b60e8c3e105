//! Application state.
//!
//! [`App`] owns the selection store, the applier, and the preview cache. It is
//! mutated from a single context; every mutation is followed by an
//! [`AppEvent`] passed to the render callback. The applier reports its
//! outcomes through the same callback from its worker thread.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::access::{SharedAccess, default_provider};
use crate::cache::{PreviewCache, PreviewError, PreviewImage};
use crate::chooser::{FileChooser, is_supported_image};
use crate::config::ThemedConfig;
use crate::error::ThemedError;
use crate::events::AppEvent;
use crate::selection::{
    Appearance, ResolveOutcome, SelectionError, SelectionStore, WallpaperSelection, WallpaperSlot,
};
use crate::storage::{JsonFileStore, KeyValueStore};
use crate::wallpaper::{
    Applier, ApplyOutcome, BackendError, OutcomeHandler, Screen, SharedBackend, default_backend,
};

/// Receives every [`AppEvent`]. Called from the app's context and from the
/// applier's worker thread.
pub type RenderCallback = Arc<dyn Fn(&AppEvent) + Send + Sync>;

/// The platform collaborators an [`App`] is built from.
pub struct Services {
    pub storage: Arc<dyn KeyValueStore>,
    pub access: SharedAccess,
    pub backend: SharedBackend,
}

impl Services {
    /// Opens the configured preferences file and the platform backends.
    ///
    /// # Errors
    ///
    /// Returns an error if no preferences location is known or the file is
    /// unreadable.
    pub fn from_config(config: &ThemedConfig) -> Result<Self, ThemedError> {
        let path = config.storage.resolved_path().ok_or_else(|| {
            ThemedError::InvalidArguments(
                "No location for the preferences file. Set `storage.path` in the configuration."
                    .to_string(),
            )
        })?;
        let storage = JsonFileStore::open(path)?;

        Ok(Self {
            storage: Arc::new(storage),
            access: default_provider(),
            backend: default_backend(),
        })
    }
}

/// Explicit application state.
pub struct App {
    store: SelectionStore,
    applier: Applier,
    previews: PreviewCache,
    backend: SharedBackend,
    default_image: Option<PathBuf>,
    appearance: Appearance,
    render: RenderCallback,
}

impl App {
    /// Builds the app and starts its applier. Nothing is resolved or applied
    /// until [`App::startup`] or [`App::restore`] is called.
    #[must_use]
    pub fn new(
        services: Services,
        config: &ThemedConfig,
        appearance: Appearance,
        render: RenderCallback,
    ) -> Self {
        let outcome_render = Arc::clone(&render);
        let on_outcome: OutcomeHandler =
            Arc::new(move |outcome: &ApplyOutcome| outcome_render(&outcome_event(outcome)));

        let applier = Applier::new(
            Arc::clone(&services.backend),
            Arc::clone(&services.access),
            config.wallpaper.screens,
            on_outcome,
        );

        Self {
            store: SelectionStore::new(services.storage, services.access),
            applier,
            previews: PreviewCache::new(config.preview.max_entries, config.preview.max_dimension),
            backend: services.backend,
            default_image: config.wallpaper.default_image_path(),
            appearance,
            render,
        }
    }

    fn emit(&self, event: &AppEvent) { (self.render)(event) }

    /// Resolves both persisted selections without applying anything.
    pub fn restore(&mut self) -> [(WallpaperSlot, ResolveOutcome); 2] {
        let outcomes = self.store.resolve_all_on_startup();
        for (slot, outcome) in &outcomes {
            if !matches!(outcome, ResolveOutcome::Unset) {
                self.emit(&AppEvent::SelectionChanged { slot: *slot, path: resolved_path(outcome) });
            }
        }
        outcomes
    }

    /// Picks up selections another process saved, such as `themed set`.
    ///
    /// Returns the slots that changed. A storage read failure is reported as
    /// an alert and leaves the selections as they were.
    pub fn sync_selections(&mut self) -> Vec<WallpaperSlot> {
        let changed = match self.store.sync() {
            Ok(changed) => changed,
            Err(err) => {
                tracing::warn!(error = %err, "failed to reload saved wallpapers");
                self.emit(&AppEvent::Alert { message: err.to_string() });
                return Vec::new();
            }
        };

        for (slot, outcome) in &changed {
            tracing::info!(%slot, ?outcome, "saved wallpaper changed");
            self.emit(&AppEvent::SelectionChanged { slot: *slot, path: resolved_path(outcome) });
        }
        changed.into_iter().map(|(slot, _)| slot).collect()
    }

    /// Handles a change to the saved selections.
    ///
    /// Returns `true` if the applier was triggered, which happens only when
    /// the slot for the active appearance changed.
    pub fn on_selections_changed(&mut self) -> bool {
        let active = self.appearance.slot();
        if !self.sync_selections().contains(&active) {
            return false;
        }
        self.apply_current()
    }

    /// Resolves both persisted selections and applies the active one.
    pub fn startup(&mut self) -> [(WallpaperSlot, ResolveOutcome); 2] {
        let outcomes = self.restore();
        self.apply_current();
        outcomes
    }

    /// Stores `candidate` in `slot`.
    ///
    /// Returns `true` if the applier was triggered, which happens only when
    /// `slot` is the one shown for the active appearance.
    ///
    /// # Errors
    ///
    /// Returns an error if the file is not a supported image or cannot be
    /// accessed or persisted. The slot is left unchanged in that case and the
    /// error is also reported as an alert.
    pub fn select_file(&mut self, slot: WallpaperSlot, candidate: &Path) -> Result<bool, SelectionError> {
        let result = self.try_select_file(slot, candidate);
        if let Err(err) = &result {
            self.emit(&AppEvent::Alert { message: err.to_string() });
        }
        result
    }

    fn try_select_file(&mut self, slot: WallpaperSlot, candidate: &Path) -> Result<bool, SelectionError> {
        if !is_supported_image(candidate) {
            return Err(SelectionError::UnsupportedType { path: candidate.to_path_buf() });
        }

        let selection = self.store.select_file(slot, candidate)?;
        let token = selection.token().clone();
        let path = selection.resolved_path().to_path_buf();
        self.emit(&AppEvent::SelectionChanged { slot, path: Some(path) });

        if !slot.matches(self.appearance) {
            return Ok(false);
        }
        self.applier.apply(slot, token);
        Ok(true)
    }

    /// Asks `chooser` for a file and selects it.
    ///
    /// Returns `None` if the user cancelled, otherwise whether the applier was
    /// triggered.
    ///
    /// # Errors
    ///
    /// Returns an error if the chooser fails or the selection is rejected.
    pub fn choose_file(
        &mut self,
        slot: WallpaperSlot,
        chooser: &dyn FileChooser,
    ) -> Result<Option<bool>, ThemedError> {
        let Some(candidate) = chooser.choose(slot)? else {
            tracing::debug!(%slot, "no file chosen");
            return Ok(None);
        };
        Ok(Some(self.select_file(slot, &candidate)?))
    }

    /// Unsets both slots and requests the default background.
    ///
    /// Returns the default image that was requested, or `None` if none is
    /// known for this platform.
    ///
    /// # Errors
    ///
    /// Returns the first storage error. The default background is requested
    /// regardless.
    pub fn clear_all(&mut self) -> Result<Option<PathBuf>, SelectionError> {
        let cleared = self.store.clear_all();
        self.emit(&AppEvent::SelectionsCleared);

        let default_image = self.default_image();
        match &default_image {
            Some(path) => {
                self.applier.apply_default(path.clone());
            }
            None => tracing::warn!("no default wallpaper known, leaving desktop unchanged"),
        }

        cleared.map(|()| default_image)
    }

    /// Handles an appearance-change signal.
    ///
    /// Saved selections are synced first, so a wallpaper chosen by another
    /// process since the last change is the one applied.
    ///
    /// Returns `true` if the applier was triggered.
    pub fn on_appearance_changed(&mut self, appearance: Appearance) -> bool {
        if appearance != self.appearance {
            self.appearance = appearance;
            self.emit(&AppEvent::AppearanceChanged { appearance });
        }
        self.sync_selections();
        self.apply_current()
    }

    /// Applies the selection for the active appearance, if that slot is set.
    pub fn apply_current(&self) -> bool {
        let Some(selection) = self.store.current_selection(self.appearance) else {
            tracing::debug!(appearance = %self.appearance, "active slot is unset");
            return false;
        };
        self.applier.apply(self.appearance.slot(), selection.token().clone());
        true
    }

    /// Blocks until the applier has nothing pending or running.
    pub fn wait_idle(&self, timeout: Duration) -> bool { self.applier.wait_idle(timeout) }

    /// Preview of the image in `slot`, decoded on a cache miss.
    ///
    /// # Errors
    ///
    /// Returns an error if the image cannot be decoded.
    pub fn preview(&self, slot: WallpaperSlot) -> Result<Option<PreviewImage>, PreviewError> {
        self.store
            .selection(slot)
            .map(|selection| self.previews.get_or_decode(selection.resolved_path()))
            .transpose()
    }

    /// Image used when all selections are cleared.
    #[must_use]
    pub fn default_image(&self) -> Option<PathBuf> {
        self.default_image.clone().or_else(|| self.backend.default_image())
    }

    /// The displays that would receive the wallpaper.
    ///
    /// # Errors
    ///
    /// Returns an error if the displays cannot be queried.
    pub fn screens(&self) -> Result<Vec<Screen>, BackendError> { self.backend.screens() }

    #[must_use]
    pub const fn appearance(&self) -> Appearance { self.appearance }

    /// The selection shown for the active appearance.
    #[must_use]
    pub fn current_selection(&self) -> Option<&WallpaperSelection> {
        self.store.current_selection(self.appearance)
    }

    #[must_use]
    pub fn selection(&self, slot: WallpaperSlot) -> Option<&WallpaperSelection> {
        self.store.selection(slot)
    }

    #[must_use]
    pub const fn previews(&self) -> &PreviewCache { &self.previews }
}

fn resolved_path(outcome: &ResolveOutcome) -> Option<PathBuf> {
    match outcome {
        ResolveOutcome::Resolved(path) | ResolveOutcome::Repaired(path) => Some(path.clone()),
        ResolveOutcome::Unset | ResolveOutcome::Cleared(_) => None,
    }
}

fn outcome_event(outcome: &ApplyOutcome) -> AppEvent {
    match &outcome.result {
        Ok(path) => AppEvent::Applied { slot: outcome.slot, path: path.clone() },
        Err(err) => AppEvent::ApplyFailed { slot: outcome.slot, message: err.to_string() },
    }
}
