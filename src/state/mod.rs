//! State file management
//!
//! Persists the last-seen freshness marker of every tracked annex. The file is
//! a flat JSON object (`{"II": "<marker>", ...}`), loaded once per run and
//! written once at the end.

mod manager;

pub use manager::StateManager;
