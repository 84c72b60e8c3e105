//! Platform helpers shared across modules.
//!
//! - [`path`] - Expanding user-supplied paths from the configuration file
//! - [`thread`] - Named background threads

pub mod path;
pub mod thread;
