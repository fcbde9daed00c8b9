//! Run report models
//!
//! A report is built by the sync runner and rendered by the CLI, either as
//! colored text or as JSON for the scheduler's logs.

use crate::models::Annex;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;

/// Step of the per-annex sequence at which an item failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Freshness,
    Download,
    Write,
    Publish,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Freshness => "freshness check",
            Stage::Download => "download",
            Stage::Write => "write",
            Stage::Publish => "publish",
        };
        f.write_str(name)
    }
}

/// What happened to one annex during a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ItemOutcome {
    /// Marker matches the recorded one
    Unchanged { marker: String },

    /// Marker differs, only reported in dry runs
    Changed {
        previous: Option<String>,
        marker: String,
    },

    /// New file downloaded, published and recorded
    Updated {
        previous: Option<String>,
        marker: String,
        path: String,
    },

    /// Index page unavailable or no link found; prior state kept
    Skipped { reason: String },

    /// A step after the lookup failed; prior state kept
    Failed { stage: Stage, error: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ItemReport {
    pub annex: Annex,
    #[serde(flatten)]
    pub outcome: ItemOutcome,
}

/// Result of one sync pass
#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
    pub dry_run: bool,
    pub items: Vec<ItemReport>,

    /// Repository paths written by the publish step
    pub published: Vec<String>,

    /// Whether the state file itself reached the repository
    pub state_published: bool,
}

impl SyncReport {
    pub fn new(dry_run: bool) -> Self {
        Self {
            started_at: Utc::now(),
            finished_at: None,
            dry_run,
            items: Vec::new(),
            published: Vec::new(),
            state_published: false,
        }
    }

    pub fn push(&mut self, annex: Annex, outcome: ItemOutcome) {
        self.items.push(ItemReport { annex, outcome });
    }

    pub fn finish(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    pub fn outcome(&self, annex: Annex) -> Option<&ItemOutcome> {
        self.items
            .iter()
            .find(|item| item.annex == annex)
            .map(|item| &item.outcome)
    }

    pub fn updated_count(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Updated { .. }))
    }

    pub fn skipped_count(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Skipped { .. }))
    }

    pub fn failed_count(&self) -> usize {
        self.count(|o| matches!(o, ItemOutcome::Failed { .. }))
    }

    pub fn has_failures(&self) -> bool {
        self.failed_count() > 0
    }

    fn count(&self, pred: impl Fn(&ItemOutcome) -> bool) -> usize {
        self.items.iter().filter(|item| pred(&item.outcome)).count()
    }
}
