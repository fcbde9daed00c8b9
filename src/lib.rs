// annex-watch - COSING annex change monitor
// Detects updated annex spreadsheets, downloads them and commits them to a repository

pub mod cli;
pub mod locator;
pub mod logging;
pub mod models;
pub mod net;
pub mod publish;
pub mod state;
pub mod sync;
pub mod workbook;

pub use anyhow::{Context, Result};
pub use colored::Colorize;

// Re-export commonly used types
pub use models::{Annex, Config, ItemOutcome, SyncReport};
pub use state::StateManager;
pub use sync::SyncRunner;
