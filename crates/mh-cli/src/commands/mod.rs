//! CLI subcommand implementations.

pub mod categories;
pub mod import;
pub mod report;
pub mod settings;
pub mod status;
pub mod timer;
mod util;
