//! Themed - separate desktop wallpapers for light and dark mode.
//!
//! This binary serves as both the background agent and the CLI:
//! - When called with no arguments: runs the agent
//! - When called with subcommands (e.g., `themed set dark night.heic`): runs CLI commands

fn main() {
    themed_lib::logging::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() == 1 {
        themed_lib::run();
    } else if let Err(err) = themed_lib::cli::run() {
        eprintln!("themed: {err}");
        std::process::exit(1);
    }
}
