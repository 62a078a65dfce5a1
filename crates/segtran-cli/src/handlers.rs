//! Command handlers for CLI subcommands
//!
//! This module contains the implementation logic for each CLI subcommand.

mod completions;
mod config;
mod models;
mod segment;
mod translate;
mod utils;

pub use completions::handle_completions;
pub use config::handle_config;
pub use models::handle_models;
pub use segment::handle_segment;
pub use translate::handle_translate;
