//! Command-line argument definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::commands::import::ImportArgs;
use crate::commands::report::ReportArgs;
use crate::commands::timer::{StartArgs, StopArgs};

/// Personal time tracker.
///
/// Records time spans per category and summarizes them in weekly, monthly
/// and yearly reports.
#[derive(Debug, Parser)]
#[command(name = "mh", version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output.
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Path to config file.
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Start the timer.
    Start(StartArgs),

    /// Stop the running timer.
    Stop(StopArgs),

    /// Show the running record and this week's totals.
    Status,

    /// Show a weekly, monthly or yearly report.
    Report(ReportArgs),

    /// Import finished records from a file.
    Import(ImportArgs),

    /// Manage categories.
    #[command(subcommand)]
    Categories(CategoriesAction),

    /// Show or change settings.
    #[command(subcommand)]
    Settings(SettingsAction),
}

/// Category operations.
#[derive(Debug, Subcommand)]
pub enum CategoriesAction {
    /// List all categories.
    List,

    /// Create a category.
    Add {
        /// Category name.
        name: String,
    },
}

/// Settings operations.
#[derive(Debug, Subcommand)]
pub enum SettingsAction {
    /// Show all settings.
    Show,

    /// Set the category used when none is given.
    DefaultCategory {
        /// Category ID.
        id: i64,
    },
}
