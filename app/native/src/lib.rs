//! Themed - separate desktop wallpapers for light and dark mode.
//!
//! This library provides both the background agent and the CLI. The agent
//! restores the two saved wallpapers, applies the one matching the current
//! system appearance, and swaps it whenever the appearance changes. It also
//! watches the preferences file, so wallpapers chosen with `themed set` take
//! effect while it runs.

pub mod access;
pub mod app;
pub mod appearance;
pub mod cache;
pub mod chooser;
pub mod cli;
pub mod config;
pub mod error;
pub mod events;
pub mod logging;
pub mod platform;
pub mod selection;
pub mod storage;
pub mod wallpaper;

use std::sync::Arc;
use std::sync::mpsc;
use std::time::Duration;

use crate::app::{App, RenderCallback, Services};
use crate::appearance::AppearanceMonitor;
use crate::error::ThemedError;
use crate::events::AppEvent;
use crate::selection::Appearance;
use crate::storage::{PREFERENCES_DEBOUNCE_MS, PreferencesWatcher};

/// What wakes the agent loop.
enum AgentSignal {
    AppearanceChanged(Appearance),
    SelectionsChanged,
}

/// Runs the background agent until the process is terminated.
///
/// Errors are printed and end the process with status 1.
pub fn run() {
    if let Err(err) = run_agent(false) {
        eprintln!("themed: {err}");
        std::process::exit(1);
    }
}

/// Runs the background agent on the calling thread.
///
/// With `json_events`, every event is printed to stdout as a JSON line.
///
/// # Errors
///
/// Returns an error if the preferences file cannot be opened.
pub fn run_agent(json_events: bool) -> Result<(), ThemedError> {
    let config = config::init();
    let services = Services::from_config(config)?;

    let render: RenderCallback = Arc::new(move |event: &AppEvent| cli::render_event(event, json_events));
    let mut app = App::new(services, config, appearance::current(), render);

    for (slot, outcome) in app.startup() {
        tracing::debug!(%slot, ?outcome, "startup resolution");
    }

    let (tx, rx) = mpsc::channel();

    let appearance_tx = tx.clone();
    let _monitor = AppearanceMonitor::start_system(
        config.appearance.monitor_settings(),
        app.appearance(),
        move |appearance| {
            let _ = appearance_tx.send(AgentSignal::AppearanceChanged(appearance));
        },
    );

    let _preferences = config.storage.resolved_path().and_then(|path| {
        PreferencesWatcher::start(&path, Duration::from_millis(PREFERENCES_DEBOUNCE_MS), move || {
            let _ = tx.send(AgentSignal::SelectionsChanged);
        })
    });

    tracing::info!(appearance = %app.appearance(), "themed agent running");
    for signal in rx {
        match signal {
            AgentSignal::AppearanceChanged(appearance) => {
                app.on_appearance_changed(appearance);
            }
            AgentSignal::SelectionsChanged => {
                app.on_selections_changed();
            }
        }
    }

    Ok(())
}
