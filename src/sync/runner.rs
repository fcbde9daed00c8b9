use crate::locator::{file_extension, LinkExtractor, SourceLocator, SpreadsheetLinkExtractor};
use crate::models::{Annex, Config, ItemOutcome, Stage, SyncReport};
use crate::net::{fingerprint, write_file, Transport};
use crate::publish::{to_repo_path, PendingFile, Publisher};
use crate::state::StateManager;
use crate::workbook;
use crate::Result;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};
use url::Url;

/// A downloaded annex waiting for the publish step
#[derive(Debug)]
struct Change {
    annex: Annex,
    previous: Option<String>,
    marker: String,
    file: PendingFile,
}

/// Per-annex result of the check phase
enum Checked {
    Done(ItemOutcome),
    Changed(Change),
}

/// Drives one sync pass over the configured annexes
///
/// For every annex: locate → check freshness → compare → (skip | fetch).
/// Changed files are then published in one batch and a marker is recorded
/// only for files whose publish succeeded. The state file is written once at
/// the end and, when an annex was updated, published in a second call with
/// its own commit message.
///
/// Without a `Last-Modified` or `ETag` header the file is downloaded and the
/// marker is the workbook's embedded `Last update` date, or a SHA-256 of the
/// body when the workbook carries none.
pub struct SyncRunner<'a> {
    config: &'a Config,
    workdir: PathBuf,
    transport: &'a dyn Transport,
    publisher: &'a dyn Publisher,
    extractor: Box<dyn LinkExtractor>,
    dry_run: bool,
}

impl<'a> SyncRunner<'a> {
    pub fn new(
        config: &'a Config,
        workdir: impl Into<PathBuf>,
        transport: &'a dyn Transport,
        publisher: &'a dyn Publisher,
    ) -> Self {
        Self {
            config,
            workdir: workdir.into(),
            transport,
            publisher,
            extractor: Box::new(SpreadsheetLinkExtractor::default()),
            dry_run: false,
        }
    }

    pub fn with_extractor(mut self, extractor: Box<dyn LinkExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    /// Locate and compare only; nothing is downloaded or written
    pub fn dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    pub fn state_path(&self) -> PathBuf {
        self.workdir.join(&self.config.state_file)
    }

    pub async fn run(&self) -> Result<SyncReport> {
        let mut state = if self.dry_run {
            StateManager::load(self.state_path())?
        } else {
            StateManager::load_or_recover(self.state_path())?
        };
        let mut report = SyncReport::new(self.dry_run);

        let mut checked = Vec::with_capacity(self.config.annexes.len());
        for &annex in &self.config.annexes {
            let result = self.check(annex, state.marker(annex)).await;
            checked.push((annex, result));
        }

        let changes: Vec<&Change> = checked
            .iter()
            .filter_map(|(_, c)| match c {
                Checked::Changed(change) => Some(change),
                Checked::Done(_) => None,
            })
            .collect();

        let mut published = Vec::new();
        if !changes.is_empty() {
            let files: Vec<PendingFile> = changes.iter().map(|c| c.file.clone()).collect();
            let ids: Vec<&str> = changes.iter().map(|c| c.annex.id()).collect();
            let message = format!("{}: Annex {}", self.config.commit_prefix, ids.join(", "));

            info!(
                "Publishing {} file(s) to {}",
                files.len(),
                self.publisher.describe()
            );
            published = self.publisher.publish(&files, &message).await;
        }

        for (annex, result) in checked {
            let outcome = match result {
                Checked::Done(outcome) => outcome,
                Checked::Changed(change) => {
                    let publish = published
                        .iter()
                        .find(|o| o.repo_path == change.file.repo_path)
                        .map(|o| o.result.as_ref().map_err(|e| e.to_string()));

                    match publish {
                        Some(Ok(_)) => {
                            state.record(annex, change.marker.clone());
                            report.published.push(change.file.repo_path.clone());
                            ItemOutcome::Updated {
                                previous: change.previous,
                                marker: change.marker,
                                path: change.file.repo_path,
                            }
                        }
                        Some(Err(e)) => ItemOutcome::Failed {
                            stage: Stage::Publish,
                            error: e,
                        },
                        None => ItemOutcome::Failed {
                            stage: Stage::Publish,
                            error: "publisher returned no outcome".to_string(),
                        },
                    }
                }
            };
            report.push(annex, outcome);
        }

        if !self.dry_run {
            state.save()?;
            if report.updated_count() > 0 {
                report.state_published = self.publish_state(&state).await;
            }
        }

        report.finish();
        Ok(report)
    }

    async fn publish_state(&self, state: &StateManager) -> bool {
        let file = PendingFile::new(state.path(), to_repo_path(&self.config.state_file));
        let message = format!("{}: state", self.config.commit_prefix);

        let outcomes = self.publisher.publish(std::slice::from_ref(&file), &message).await;
        match outcomes.first().map(|o| &o.result) {
            Some(Ok(_)) => true,
            Some(Err(e)) => {
                warn!("State file not published: {}", e);
                false
            }
            None => false,
        }
    }

    async fn check(&self, annex: Annex, previous: Option<&str>) -> Checked {
        let template = &self.config.index_url_template;
        let page_url = match Url::parse(&annex.index_url(template)) {
            Ok(url) => url,
            Err(e) => {
                warn!(%annex, "Invalid index URL from template '{}': {}", template, e);
                return Checked::Done(ItemOutcome::Skipped {
                    reason: format!("invalid index URL: {}", e),
                });
            }
        };

        let locator = SourceLocator::new(self.transport, self.extractor.as_ref());
        let file_url = match locator.locate(&page_url).await {
            Ok(Some(url)) => url,
            Ok(None) => {
                warn!(%annex, "No spreadsheet link found on {}", page_url);
                return Checked::Done(ItemOutcome::Skipped {
                    reason: "no spreadsheet link found".to_string(),
                });
            }
            Err(e) => {
                warn!(%annex, "Index page unavailable: {}", e);
                return Checked::Done(ItemOutcome::Skipped {
                    reason: format!("index page unavailable: {}", e),
                });
            }
        };

        let freshness = match self.transport.head(&file_url).await {
            Ok(f) => f,
            Err(e) => return failed(annex, Stage::Freshness, e),
        };

        let name = annex.file_name(&file_extension(&file_url));
        let relative = self.config.output_dir.join(&name);

        let (marker, bytes) = match freshness {
            Some(freshness) => {
                let marker = freshness.marker().to_string();
                if previous == Some(marker.as_str()) {
                    return Checked::Done(ItemOutcome::Unchanged { marker });
                }
                if self.dry_run {
                    return Checked::Done(ItemOutcome::Changed {
                        previous: previous.map(str::to_string),
                        marker,
                    });
                }
                match self.transport.get_bytes(&file_url).await {
                    Ok(bytes) => (marker, bytes),
                    Err(e) => return failed(annex, Stage::Download, e),
                }
            }
            None if self.dry_run => {
                return Checked::Done(ItemOutcome::Skipped {
                    reason: "server sent no freshness marker".to_string(),
                });
            }
            None => {
                let bytes = match self.transport.get_bytes(&file_url).await {
                    Ok(bytes) => bytes,
                    Err(e) => return failed(annex, Stage::Download, e),
                };
                let marker =
                    workbook::last_update(&bytes).unwrap_or_else(|| fingerprint(&bytes));
                if previous == Some(marker.as_str()) {
                    return Checked::Done(ItemOutcome::Unchanged { marker });
                }
                (marker, bytes)
            }
        };

        info!(
            %annex,
            "Changed: {} -> {}",
            previous.unwrap_or("(never seen)"),
            marker
        );

        let local_path = self.local_path(&relative);
        if let Err(e) = write_file(&local_path, &bytes) {
            return failed(annex, Stage::Write, e);
        }
        self.remove_stale_copies(annex, &local_path);

        Checked::Changed(Change {
            annex,
            previous: previous.map(str::to_string),
            marker,
            file: PendingFile::new(local_path, to_repo_path(&relative)),
        })
    }

    fn local_path(&self, relative: &Path) -> PathBuf {
        self.workdir.join(relative)
    }

    /// Drop a local copy left under the other spreadsheet extension
    ///
    /// The repository copy is not deleted.
    fn remove_stale_copies(&self, annex: Annex, current: &Path) {
        for ext in ["xls", "xlsx"] {
            let stale = self.local_path(&self.config.output_dir.join(annex.file_name(ext)));
            if stale == current || !stale.exists() {
                continue;
            }
            warn!(
                %annex,
                "Download extension changed; removing {} (the repository copy stays)",
                stale.display()
            );
            if let Err(e) = std::fs::remove_file(&stale) {
                warn!(%annex, "Failed to remove {}: {}", stale.display(), e);
            }
        }
    }
}

fn failed(annex: Annex, stage: Stage, e: impl std::fmt::Display) -> Checked {
    error!(%annex, "{} failed: {}", stage, e);
    Checked::Done(ItemOutcome::Failed {
        stage,
        error: e.to_string(),
    })
}
