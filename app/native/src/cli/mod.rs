//! CLI module for Themed.
//!
//! Every command runs in-process against the same preferences file the agent
//! uses. A running agent watches that file and picks changes up as they are
//! saved.

mod commands;
mod output;

use clap::Parser;
pub use commands::Cli;
pub use output::render_event;

use crate::error::ThemedError;

/// Runs the CLI.
///
/// Parses command-line arguments and executes the appropriate command.
///
/// # Errors
///
/// Returns an error if the command execution fails.
pub fn run() -> Result<(), ThemedError> {
    let cli = Cli::parse();
    cli.execute()
}
