//! CLI command definitions using Clap.
//!
//! - `wallpaper` - Selecting, clearing, applying and previewing wallpapers
//! - `status` - Reporting the current state

use std::io;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{Generator, Shell, generate};

use crate::config;
use crate::error::ThemedError;
use crate::selection::WallpaperSlot;

mod status;
mod wallpaper;

/// Application version from Cargo.toml.
const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Themed CLI - separate wallpapers for light and dark mode.
#[derive(Parser, Debug)]
#[command(name = "themed")]
#[command(author, version = APP_VERSION, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Path to a custom configuration file.
    ///
    /// Overrides the default configuration file search paths.
    /// Supports JSONC format (JSON with comments).
    #[arg(long, short, global = true, value_name = "PATH")]
    pub config: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available CLI commands.
#[derive(Subcommand, Debug)]
#[command(next_display_order = None)]
pub enum Commands {
    /// Run the background agent.
    ///
    /// Restores the saved wallpapers, applies the one for the current
    /// appearance, and switches whenever the appearance changes. This is
    /// what `themed` does without arguments.
    Watch {
        /// Print every event as a JSON line on stdout.
        #[arg(long)]
        json: bool,
    },

    /// Choose the wallpaper for light or dark mode.
    ///
    /// Without a path, the system file chooser is shown. Cancelling it
    /// leaves everything unchanged.
    #[command(
        verbatim_doc_comment,
        after_long_help = r#"Examples:
  themed set light ~/Pictures/day.jpg     # Use day.jpg in light mode
  themed set dark ~/Pictures/night.heic   # Use night.heic in dark mode
  themed set dark                         # Pick the dark mode image in a file chooser"#
    )]
    Set {
        /// Which appearance the image is for.
        #[arg(value_enum)]
        slot: WallpaperSlot,

        /// The image to use (JPEG, PNG, TIFF or HEIC).
        #[arg(value_name = "PATH")]
        path: Option<String>,
    },

    /// Forget both wallpapers and restore the system default picture.
    Clear,

    /// Show the current appearance and both wallpapers.
    Status {
        /// Output as JSON.
        #[arg(long, short)]
        json: bool,
    },

    /// Apply the wallpaper for the current appearance once.
    Apply,

    /// Write the preview thumbnail of a wallpaper to a file.
    Preview {
        /// Which wallpaper to preview.
        #[arg(value_enum)]
        slot: WallpaperSlot,

        /// Output image path. The format follows the extension.
        #[arg(long, short, value_name = "FILE")]
        output: String,
    },

    /// Output Themed configuration JSON Schema.
    ///
    /// Outputs a JSON Schema to stdout that describes the structure of the
    /// Themed configuration file. Can be redirected to a file for use with
    /// editors that support JSON Schema validation.
    Schema,

    /// Generate shell completions.
    ///
    /// Outputs shell completion script to stdout for the specified shell.
    ///
    /// Usage:
    ///   eval "$(themed completions --shell zsh)"
    ///   themed completions --shell fish > ~/.config/fish/completions/themed.fish
    Completions {
        /// The shell to generate completions for.
        #[arg(long, short, value_enum)]
        shell: Shell,
    },
}

impl Cli {
    /// Returns the custom config path if specified via --config flag.
    #[must_use]
    pub fn config_path(&self) -> Option<std::path::PathBuf> {
        self.config.as_ref().map(std::path::PathBuf::from)
    }

    /// Execute the CLI command.
    ///
    /// # Errors
    ///
    /// Returns an error if the command execution fails.
    pub fn execute(&self) -> Result<(), ThemedError> {
        match self.config_path() {
            Some(path) if !path.exists() => return Err(config::ConfigError::Missing(path).into()),
            Some(path) => {
                config::set_custom_config_path(path);
            }
            None => {}
        }

        match &self.command {
            None => crate::run_agent(false),
            Some(Commands::Watch { json }) => crate::run_agent(*json),
            Some(Commands::Set { slot, path }) => wallpaper::execute_set(*slot, path.as_deref()),
            Some(Commands::Clear) => wallpaper::execute_clear(),
            Some(Commands::Status { json }) => status::execute(*json),
            Some(Commands::Apply) => wallpaper::execute_apply(),
            Some(Commands::Preview { slot, output }) => wallpaper::execute_preview(*slot, output),
            Some(Commands::Schema) => {
                println!("{}", config::schema::generate_schema_json());
                Ok(())
            }
            Some(Commands::Completions { shell }) => {
                Self::print_completions(*shell);
                Ok(())
            }
        }
    }

    /// Print shell completions to stdout.
    fn print_completions<G: Generator>(generator: G) {
        let mut cmd = Self::command();
        generate(generator, &mut cmd, "themed", &mut io::stdout());
    }
}
