//! System appearance detection.
//!
//! [`current`] samples the appearance once; [`AppearanceMonitor`] reports
//! changes as they happen.

#[cfg(target_os = "macos")]
mod macos;
mod monitor;

pub use monitor::{
    AppearanceMonitor, AppearanceSource, DEFAULT_DEBOUNCE_MS, DEFAULT_POLL_INTERVAL_MS, MonitorSettings,
};

use crate::selection::Appearance;

/// Environment variable that forces the reported appearance.
pub const APPEARANCE_ENV: &str = "THEMED_APPEARANCE";

/// Returns the current system appearance.
///
/// `THEMED_APPEARANCE=light|dark` takes precedence over the OS value.
#[must_use]
pub fn current() -> Appearance {
    if let Some(forced) = std::env::var(APPEARANCE_ENV).ok().as_deref().and_then(parse_override) {
        return forced;
    }
    system_appearance()
}

#[cfg(target_os = "macos")]
fn system_appearance() -> Appearance { macos::interface_style() }

#[cfg(not(target_os = "macos"))]
const fn system_appearance() -> Appearance { Appearance::Light }

fn parse_override(value: &str) -> Option<Appearance> {
    match value.trim().to_ascii_lowercase().as_str() {
        "light" => Some(Appearance::Light),
        "dark" => Some(Appearance::Dark),
        "" => None,
        other => {
            tracing::warn!(value = other, "ignoring unknown {APPEARANCE_ENV} value");
            None
        }
    }
}
