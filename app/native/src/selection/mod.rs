//! Wallpaper selection model.
//!
//! A selection is kept per [`WallpaperSlot`]. The slot that is "live" at any
//! moment is derived from the system [`Appearance`].

mod store;

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

pub use store::{ResolveOutcome, SelectionError, SelectionStore};

use crate::access::DurableToken;

/// The system appearance as reported by the OS.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Appearance {
    #[default]
    Light,
    Dark,
}

impl Appearance {
    /// Returns the slot whose wallpaper is shown for this appearance.
    #[must_use]
    pub const fn slot(self) -> WallpaperSlot {
        match self {
            Self::Light => WallpaperSlot::Light,
            Self::Dark => WallpaperSlot::Dark,
        }
    }
}

impl fmt::Display for Appearance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Light => write!(f, "light"),
            Self::Dark => write!(f, "dark"),
        }
    }
}

/// One of the two appearance-indexed wallpaper slots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum WallpaperSlot {
    Light,
    Dark,
}

impl WallpaperSlot {
    /// Both slots, in display order.
    pub const ALL: [Self; 2] = [Self::Light, Self::Dark];

    /// Key under which the slot's token is persisted.
    #[must_use]
    pub const fn storage_key(self) -> &'static str {
        match self {
            Self::Light => "lightModeBookmark",
            Self::Dark => "darkModeBookmark",
        }
    }

    /// Whether this slot is the one shown for `appearance`.
    #[must_use]
    pub fn matches(self, appearance: Appearance) -> bool { appearance.slot() == self }

    pub(crate) const fn index(self) -> usize {
        match self {
            Self::Light => 0,
            Self::Dark => 1,
        }
    }
}

impl fmt::Display for WallpaperSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Light => write!(f, "light"),
            Self::Dark => write!(f, "dark"),
        }
    }
}

impl FromStr for WallpaperSlot {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            other => Err(format!("Invalid slot '{other}'. Use 'light' or 'dark'.")),
        }
    }
}

/// A chosen wallpaper whose token resolved successfully this run.
///
/// Values of this type only exist for slots that are "set": an unresolvable
/// token never produces one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WallpaperSelection {
    token: DurableToken,
    resolved: PathBuf,
}

impl WallpaperSelection {
    pub(crate) const fn new(token: DurableToken, resolved: PathBuf) -> Self {
        Self { token, resolved }
    }

    /// The opaque, persisted location token.
    #[must_use]
    pub const fn token(&self) -> &DurableToken { &self.token }

    /// The live location produced by resolving the token.
    #[must_use]
    pub fn resolved_path(&self) -> &Path { &self.resolved }

    /// File name of the resolved location, for display.
    #[must_use]
    pub fn display_name(&self) -> String {
        self.resolved
            .file_name()
            .map_or_else(|| self.resolved.display().to_string(), |n| n.to_string_lossy().into_owned())
    }
}
