//! Change detection and file sync

mod runner;

pub use runner::SyncRunner;
