//! Application events.
//!
//! Every state change the [`App`](crate::app::App) makes is reported as an
//! [`AppEvent`] to its render callback. User-visible failures travel the same
//! way, so one sink serves as both renderer and alert surface.
//!
//! ## Naming Convention
//!
//! Event names follow the pattern: `themed://<module>/<event-name>`
//!
//! - `themed://` - Prefix identifying this as a Themed event
//! - `<module>` - The module that owns the event (e.g., `selection`, `applier`)
//! - `<event-name>` - Descriptive kebab-case name for the event

use std::path::PathBuf;

use serde::Serialize;

use crate::selection::{Appearance, WallpaperSlot};

/// Selection-related events.
pub mod selection {
    /// Emitted when a slot is set, repaired, or cleared at startup.
    ///
    /// Payload: `{ slot, path }` - `path` is `null` when the slot became unset.
    pub const CHANGED: &str = "themed://selection/changed";

    /// Emitted after both slots were cleared.
    pub const CLEARED: &str = "themed://selection/cleared";
}

/// Appearance-related events.
pub mod appearance {
    /// Emitted when the system appearance changes.
    ///
    /// Payload: `"light"` or `"dark"`.
    pub const CHANGED: &str = "themed://appearance/changed";
}

/// Applier-related events.
pub mod applier {
    /// Emitted when the OS accepted a new desktop picture.
    ///
    /// Payload: `{ slot, path }` - `slot` is `null` for the default image.
    pub const APPLIED: &str = "themed://applier/applied";

    /// Emitted when applying a desktop picture failed.
    ///
    /// Payload: `{ slot, message }`
    pub const FAILED: &str = "themed://applier/failed";
}

/// Alert events.
pub mod alert {
    /// A user-visible error with the underlying message.
    pub const SHOW: &str = "themed://alert/show";
}

/// A state change or alert reported to the render callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum AppEvent {
    SelectionChanged { slot: WallpaperSlot, path: Option<PathBuf> },
    SelectionsCleared,
    AppearanceChanged { appearance: Appearance },
    Applied { slot: Option<WallpaperSlot>, path: PathBuf },
    ApplyFailed { slot: Option<WallpaperSlot>, message: String },
    Alert { message: String },
}

impl AppEvent {
    /// The event's `themed://` name.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::SelectionChanged { .. } => selection::CHANGED,
            Self::SelectionsCleared => selection::CLEARED,
            Self::AppearanceChanged { .. } => appearance::CHANGED,
            Self::Applied { .. } => applier::APPLIED,
            Self::ApplyFailed { .. } => applier::FAILED,
            Self::Alert { .. } => alert::SHOW,
        }
    }

    /// Whether the event should be shown to the user as an error.
    #[must_use]
    pub const fn is_alert(&self) -> bool {
        matches!(self, Self::ApplyFailed { .. } | Self::Alert { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn all_names() -> Vec<&'static str> {
        vec![
            selection::CHANGED,
            selection::CLEARED,
            appearance::CHANGED,
            applier::APPLIED,
            applier::FAILED,
            alert::SHOW,
        ]
    }

    #[test]
    fn all_events_follow_naming_convention() {
        for event in all_names() {
            assert!(event.starts_with("themed://"), "Event '{event}' should start with 'themed://'");

            let path = event.strip_prefix("themed://").unwrap();
            let parts: Vec<&str> = path.split('/').collect();
            assert_eq!(parts.len(), 2, "Event '{event}' should have format 'themed://module/event-name'");

            let event_name = parts[1];
            assert!(
                event_name.chars().all(|c| c.is_ascii_lowercase() || c == '-'),
                "Event name '{event_name}' should be kebab-case"
            );
        }
    }

    #[test]
    fn all_events_are_unique() {
        let names = all_names();
        let mut unique = names.clone();
        unique.sort_unstable();
        unique.dedup();
        assert_eq!(unique.len(), names.len(), "Found duplicate event names");
    }

    #[test]
    fn event_name_matches_variant() {
        let event = AppEvent::SelectionChanged { slot: WallpaperSlot::Dark, path: None };
        assert_eq!(event.name(), selection::CHANGED);
        assert_eq!(AppEvent::SelectionsCleared.name(), selection::CLEARED);
    }

    #[test]
    fn only_failures_are_alerts() {
        assert!(AppEvent::Alert { message: "x".into() }.is_alert());
        assert!(AppEvent::ApplyFailed { slot: None, message: "x".into() }.is_alert());
        assert!(!AppEvent::SelectionsCleared.is_alert());
    }

    #[test]
    fn events_serialize_with_kind_tag() {
        let event = AppEvent::AppearanceChanged { appearance: Appearance::Dark };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "appearanceChanged");
        assert_eq!(json["appearance"], "dark");
    }
}
