//! Wallpaper CLI commands.
//!
//! Each command opens a short-lived [`Session`]: the saved selections are
//! restored, the command runs, and any apply it triggered is awaited so the
//! exit status reflects whether the desktop actually changed.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use colored::Colorize;
use parking_lot::Mutex;

use crate::app::{App, Services};
use crate::appearance;
use crate::cache::{PreviewError, format_bytes};
use crate::chooser::{FileChooser, FixedChooser, default_chooser};
use crate::config;
use crate::error::ThemedError;
use crate::events::AppEvent;
use crate::platform::path::expand;
use crate::selection::WallpaperSlot;

/// How long a command waits for the desktop picture to be set.
const APPLY_TIMEOUT: Duration = Duration::from_secs(30);

/// An [`App`] that records apply failures for the exit status.
pub(super) struct Session {
    pub(super) app: App,
    failure: Arc<Mutex<Option<String>>>,
}

impl Session {
    /// Loads configuration and restores the saved selections.
    pub(super) fn open() -> Result<Self, ThemedError> {
        let config = config::init();
        let services = Services::from_config(config)?;
        let failure = Arc::new(Mutex::new(None));

        let sink = Arc::clone(&failure);
        let render = Arc::new(move |event: &AppEvent| {
            tracing::debug!(event = event.name(), "event");
            if let AppEvent::ApplyFailed { message, .. } = event {
                *sink.lock() = Some(message.clone());
            }
        });

        let mut app = App::new(services, config, appearance::current(), render);
        app.restore();
        Ok(Self { app, failure })
    }

    /// Waits for pending applies and reports the last failure, if any.
    pub(super) fn finish(&self) -> Result<(), ThemedError> {
        if !self.app.wait_idle(APPLY_TIMEOUT) {
            return Err(ThemedError::ApplyTimedOut);
        }
        self.failure.lock().take().map_or(Ok(()), |message| Err(ThemedError::Apply(message)))
    }
}

/// Execute the set command.
pub fn execute_set(slot: WallpaperSlot, path: Option<&str>) -> Result<(), ThemedError> {
    let chooser: Box<dyn FileChooser> = match path {
        Some(raw) => {
            let candidate = expand(raw)
                .ok_or_else(|| ThemedError::InvalidArguments("Path must not be empty.".to_string()))?;
            Box::new(FixedChooser::new(Some(candidate)))
        }
        None => default_chooser(),
    };

    let mut session = Session::open()?;
    let Some(applied) = session.app.choose_file(slot, chooser.as_ref())? else {
        println!("{}", "No file chosen. Nothing changed.".dimmed());
        return Ok(());
    };

    if let Some(selection) = session.app.selection(slot) {
        println!("{} {}", format!("{slot} wallpaper:").bold(), selection.resolved_path().display());
    }

    if applied {
        session.finish()?;
        println!("{}", "Wallpaper applied.".green());
    }
    Ok(())
}

/// Execute the clear command.
pub fn execute_clear() -> Result<(), ThemedError> {
    let mut session = Session::open()?;
    let Some(default_image) = session.app.clear_all()? else {
        println!("Wallpapers cleared.");
        eprintln!(
            "{} {}",
            "warning:".yellow().bold(),
            "No default wallpaper is known, so the desktop was left unchanged. Set `wallpaper.defaultImage` to restore one."
        );
        return Ok(());
    };

    session.finish()?;
    println!("Wallpapers cleared. Restored {}.", default_image.display());
    Ok(())
}

/// Execute the apply command.
pub fn execute_apply() -> Result<(), ThemedError> {
    let session = Session::open()?;
    if !session.app.apply_current() {
        return Err(ThemedError::SlotUnset(session.app.appearance().slot()));
    }

    session.finish()?;
    println!("{}", "Wallpaper applied.".green());
    Ok(())
}

/// Execute the preview command.
pub fn execute_preview(slot: WallpaperSlot, output: &str) -> Result<(), ThemedError> {
    let output: PathBuf = expand(output)
        .ok_or_else(|| ThemedError::InvalidArguments("Output path must not be empty.".to_string()))?;

    let session = Session::open()?;
    let preview = session.app.preview(slot)?.ok_or(ThemedError::SlotUnset(slot))?;

    preview.save(&output).map_err(|err| PreviewError::Write {
        path: output.clone(),
        reason: err.to_string(),
    })?;

    let size = std::fs::metadata(&output).map(|m| m.len()).unwrap_or_default();
    println!(
        "Preview written to {} ({}x{}, {}).",
        output.display(),
        preview.width(),
        preview.height(),
        format_bytes(size)
    );
    Ok(())
}
