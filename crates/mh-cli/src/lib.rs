//! myhours CLI library.
//!
//! This crate provides the command-line interface for myhours.

mod cli;
pub mod commands;
mod config;

pub use cli::{CategoriesAction, Cli, Commands, SettingsAction};
pub use config::Config;
