//! CLI output formatting utilities.
//!
//! - JSON syntax highlighting
//! - Event rendering for the agent
//! - Small helpers for table cells

use std::fmt::Write as _;

use colored::Colorize;
use serde::Serialize;
use serde_json::Value;

use crate::events::AppEvent;

const INDENT: &str = "  ";

/// Prints JSON with syntax highlighting.
///
/// Colors:
/// - Keys: Cyan
/// - Strings: Green
/// - Numbers: Yellow
/// - Booleans/Null: Magenta
/// - Brackets/Braces: White (bold)
pub fn print_highlighted_json(value: &Value) {
    println!("{}", highlight_json(value));
}

/// Pretty-prints `value` with ANSI colors.
#[must_use]
pub fn highlight_json(value: &Value) -> String {
    let mut out = String::new();
    write_value(&mut out, value, 0);
    out
}

fn write_value(out: &mut String, value: &Value, depth: usize) {
    match value {
        Value::Null => out.push_str(&"null".magenta().to_string()),
        Value::Bool(b) => out.push_str(&b.to_string().magenta().to_string()),
        Value::Number(n) => out.push_str(&n.to_string().yellow().to_string()),
        Value::String(s) => out.push_str(&quoted(s).green().to_string()),
        Value::Array(items) if items.is_empty() => out.push_str(&"[]".white().bold().to_string()),
        Value::Object(map) if map.is_empty() => out.push_str(&"{}".white().bold().to_string()),
        Value::Array(items) => {
            out.push_str(&"[".white().bold().to_string());
            for (i, item) in items.iter().enumerate() {
                separator(out, i, depth + 1);
                write_value(out, item, depth + 1);
            }
            close(out, "]", depth);
        }
        Value::Object(map) => {
            out.push_str(&"{".white().bold().to_string());
            for (i, (key, item)) in map.iter().enumerate() {
                separator(out, i, depth + 1);
                let _ = write!(out, "{}{} ", quoted(key).cyan(), ":".white());
                write_value(out, item, depth + 1);
            }
            close(out, "}", depth);
        }
    }
}

fn separator(out: &mut String, index: usize, depth: usize) {
    if index > 0 {
        out.push_str(&",".white().to_string());
    }
    out.push('\n');
    out.push_str(&INDENT.repeat(depth));
}

fn close(out: &mut String, bracket: &str, depth: usize) {
    out.push('\n');
    out.push_str(&INDENT.repeat(depth));
    out.push_str(&bracket.white().bold().to_string());
}

fn quoted(s: &str) -> String { Value::String(s.to_string()).to_string() }

#[derive(Serialize)]
struct EventLine<'a> {
    event: &'static str,
    #[serde(flatten)]
    data: &'a AppEvent,
}

/// Renders an agent event.
///
/// With `json`, every event is printed to stdout as one JSON line. Otherwise
/// events are logged and alerts are printed to stderr.
pub fn render_event(event: &AppEvent, json: bool) {
    if json {
        match serde_json::to_string(&EventLine { event: event.name(), data: event }) {
            Ok(line) => println!("{line}"),
            Err(err) => tracing::warn!(error = %err, "failed to serialize event"),
        }
        return;
    }

    if event.is_alert() {
        eprintln!("{} {}", "themed:".red().bold(), describe(event));
    } else {
        tracing::info!(event = event.name(), "{}", describe(event));
    }
}

/// One-line human description of an event.
#[must_use]
pub fn describe(event: &AppEvent) -> String {
    match event {
        AppEvent::SelectionChanged { slot, path: Some(path) } => {
            format!("{slot} wallpaper set to {}", path.display())
        }
        AppEvent::SelectionChanged { slot, path: None } => format!("{slot} wallpaper is no longer available"),
        AppEvent::SelectionsCleared => "wallpapers cleared".to_string(),
        AppEvent::AppearanceChanged { appearance } => format!("appearance changed to {appearance}"),
        AppEvent::Applied { path, .. } => format!("applied {}", path.display()),
        AppEvent::ApplyFailed { message, .. } => format!("failed to apply wallpaper: {message}"),
        AppEvent::Alert { message } => message.clone(),
    }
}

/// Shortens a path-like string to `max_chars`, keeping its end.
///
/// Counts characters rather than bytes, so multi-byte file names are never
/// split.
#[must_use]
pub fn truncate(s: &str, max_chars: usize) -> String {
    let char_count = s.chars().count();

    if char_count <= max_chars {
        return s.to_string();
    }
    if max_chars <= 1 {
        return "…".to_string();
    }

    let keep = max_chars - 1;
    let tail: String = s.chars().skip(char_count - keep).collect();
    format!("…{tail}")
}

/// Formats a boolean as a colored string.
#[must_use]
pub fn format_bool(value: bool) -> String {
    if value {
        "✓".green().to_string()
    } else {
        "✗".red().to_string()
    }
}
