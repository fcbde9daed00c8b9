//! Publishing changed files to version control
//!
//! A [`Publisher`] takes a batch of local files plus one commit message and
//! reports a per-file outcome. [`RepositoryPublisher`] implements the
//! create-or-update policy on top of any [`RemoteRepository`]:
//!
//! - `Exists { sha }` → update with that version identifier
//! - `Absent` → create
//! - `Unknown` → the file fails; nothing is written

pub mod github;

pub use github::GithubRepository;

use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, info, warn};

#[derive(Debug, thiserror::Error)]
pub enum PublishError {
    #[error("Failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Request for {path} failed: {source}")]
    Request {
        path: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{path}: repository returned HTTP {status}: {message}")]
    Status {
        path: String,
        status: u16,
        message: String,
    },

    #[error("{path}: unexpected repository response: {reason}")]
    Response { path: String, reason: String },

    #[error("Invalid credential: {0}")]
    Credential(String),
}

/// Result of the existence check for one repository path
#[derive(Debug)]
pub enum RemoteFile {
    /// File exists; carries its current version identifier
    Exists { sha: String },
    /// Repository confirmed the path does not exist
    Absent,
    /// Existence could not be determined
    Unknown(PublishError),
}

/// A local file and the repository path it is published to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingFile {
    pub local_path: PathBuf,
    pub repo_path: String,
}

impl PendingFile {
    pub fn new(local_path: impl Into<PathBuf>, repo_path: impl Into<String>) -> Self {
        Self {
            local_path: local_path.into(),
            repo_path: repo_path.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishAction {
    Created,
    Updated,
    /// Kept on local disk only
    Local,
}

#[derive(Debug)]
pub struct PublishOutcome {
    pub repo_path: String,
    pub result: Result<PublishAction, PublishError>,
}

/// Writes a batch of files under one commit message
#[async_trait]
pub trait Publisher: Send + Sync {
    /// One outcome per input file, in input order
    async fn publish(&self, files: &[PendingFile], message: &str) -> Vec<PublishOutcome>;

    /// Human-readable target, e.g. `acme/annexes@main`
    fn describe(&self) -> String;
}

/// Remote create-or-update store keyed by path
#[async_trait]
pub trait RemoteRepository: Send + Sync {
    async fn lookup(&self, repo_path: &str) -> RemoteFile;

    /// Create (`sha = None`) or update a file
    async fn put(
        &self,
        repo_path: &str,
        content: &[u8],
        message: &str,
        sha: Option<&str>,
    ) -> Result<(), PublishError>;

    fn describe(&self) -> String;
}

/// Create-or-update publisher over a [`RemoteRepository`]
pub struct RepositoryPublisher<R> {
    repo: R,
}

impl<R: RemoteRepository> RepositoryPublisher<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    async fn publish_one(
        &self,
        file: &PendingFile,
        message: &str,
    ) -> Result<PublishAction, PublishError> {
        let content = tokio::fs::read(&file.local_path)
            .await
            .map_err(|source| PublishError::Read {
                path: file.local_path.clone(),
                source,
            })?;

        match self.repo.lookup(&file.repo_path).await {
            RemoteFile::Exists { sha } => {
                debug!(path = %file.repo_path, %sha, "updating existing file");
                self.repo
                    .put(&file.repo_path, &content, message, Some(sha.as_str()))
                    .await?;
                Ok(PublishAction::Updated)
            }
            RemoteFile::Absent => {
                debug!(path = %file.repo_path, "creating new file");
                self.repo.put(&file.repo_path, &content, message, None).await?;
                Ok(PublishAction::Created)
            }
            RemoteFile::Unknown(e) => Err(e),
        }
    }
}

#[async_trait]
impl<R: RemoteRepository> Publisher for RepositoryPublisher<R> {
    async fn publish(&self, files: &[PendingFile], message: &str) -> Vec<PublishOutcome> {
        let mut outcomes = Vec::with_capacity(files.len());

        for file in files {
            let result = self.publish_one(file, message).await;
            match &result {
                Ok(action) => info!(path = %file.repo_path, ?action, "published"),
                Err(e) => warn!(path = %file.repo_path, "publish failed: {}", e),
            }
            outcomes.push(PublishOutcome {
                repo_path: file.repo_path.clone(),
                result,
            });
        }

        outcomes
    }

    fn describe(&self) -> String {
        self.repo.describe()
    }
}

/// Publisher used when no repository is configured
///
/// A file counts as published once it is on local disk.
pub struct LocalPublisher;

#[async_trait]
impl Publisher for LocalPublisher {
    async fn publish(&self, files: &[PendingFile], _message: &str) -> Vec<PublishOutcome> {
        files
            .iter()
            .map(|file| PublishOutcome {
                repo_path: file.repo_path.clone(),
                result: if file.local_path.is_file() {
                    Ok(PublishAction::Local)
                } else {
                    Err(PublishError::Read {
                        path: file.local_path.clone(),
                        source: std::io::Error::from(std::io::ErrorKind::NotFound),
                    })
                },
            })
            .collect()
    }

    fn describe(&self) -> String {
        "local disk".to_string()
    }
}

/// Repository path (forward slashes, no leading `/` or `.`) for a relative path
pub fn to_repo_path(path: &Path) -> String {
    path.components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("/")
}
