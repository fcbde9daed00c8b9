pub mod annex;
pub mod config;
pub mod report;

pub use annex::Annex;
pub use config::{Config, PublishConfig, PublishTarget};
pub use report::{ItemOutcome, ItemReport, Stage, SyncReport};
