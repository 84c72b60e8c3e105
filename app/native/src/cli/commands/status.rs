//! Status command.

use colored::Colorize;
use serde::Serialize;
use tabled::settings::object::Columns;
use tabled::settings::{Alignment, Modify, Style};
use tabled::{Table, Tabled};

use super::wallpaper::Session;
use crate::app::App;
use crate::cli::output;
use crate::error::ThemedError;
use crate::selection::{Appearance, WallpaperSlot};

/// Machine-readable status.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Status {
    appearance: Appearance,
    slots: Vec<SlotStatus>,
    default_image: Option<String>,
    screens: Vec<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SlotStatus {
    slot: WallpaperSlot,
    active: bool,
    path: Option<String>,
}

#[derive(Tabled)]
struct SlotRow {
    #[tabled(rename = "Slot")]
    slot: String,
    #[tabled(rename = "Active")]
    active: String,
    #[tabled(rename = "Wallpaper")]
    wallpaper: String,
}

/// Maximum characters shown for a wallpaper path in the table.
const MAX_PATH_CHARS: usize = 60;

fn collect(app: &App) -> Status {
    let appearance = app.appearance();
    let slots = WallpaperSlot::ALL
        .iter()
        .map(|&slot| SlotStatus {
            slot,
            active: slot.matches(appearance),
            path: app.selection(slot).map(|s| s.resolved_path().display().to_string()),
        })
        .collect();

    let screens = match app.screens() {
        Ok(screens) => screens.into_iter().map(|s| s.name).collect(),
        Err(err) => {
            tracing::debug!(error = %err, "failed to enumerate screens");
            Vec::new()
        }
    };

    Status {
        appearance,
        slots,
        default_image: app.default_image().map(|p| p.display().to_string()),
        screens,
    }
}

/// Execute the status command.
pub fn execute(json: bool) -> Result<(), ThemedError> {
    let session = Session::open()?;
    let status = collect(&session.app);

    if json {
        output::print_highlighted_json(&serde_json::to_value(&status)?);
        return Ok(());
    }

    let rows: Vec<SlotRow> = status
        .slots
        .iter()
        .map(|s| SlotRow {
            slot: s.slot.to_string(),
            active: output::format_bool(s.active),
            wallpaper: s.path.as_deref().map_or_else(
                || "not set".dimmed().to_string(),
                |p| output::truncate(p, MAX_PATH_CHARS),
            ),
        })
        .collect();

    let table = Table::new(rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(1..2)).with(Alignment::center()))
        .to_string();

    println!("{} {}", "Appearance:".bold(), status.appearance);
    println!("{table}");

    if let Some(default_image) = &status.default_image {
        println!("{} {}", "Default:".bold(), output::truncate(default_image, MAX_PATH_CHARS));
    }
    if !status.screens.is_empty() {
        println!("{} {}", "Screens:".bold(), status.screens.join(", "));
    }

    Ok(())
}
