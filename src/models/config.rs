use crate::models::Annex;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// Default config file looked up in the working directory
pub const CONFIG_FILE: &str = "annex-watch.toml";

/// Environment variable carrying the repository credential
pub const TOKEN_ENV: &str = "GITHUB_TOKEN";
/// Environment variable overriding `publish.repo`
pub const REPO_ENV: &str = "ANNEX_WATCH_REPO";
/// Environment variable overriding `publish.branch`
pub const BRANCH_ENV: &str = "ANNEX_WATCH_BRANCH";

const DEFAULT_INDEX_TEMPLATE: &str =
    "https://ec.europa.eu/growth/tools-databases/cosing/reference/annexes/list/{annex}";

/// Run configuration
///
/// Loaded from `annex-watch.toml` (every field optional) and then overlaid with
/// environment values by the binary. The sync runner only ever sees this value,
/// never the process environment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Index page URL, `{annex}` is replaced by the annex identifier
    pub index_url_template: String,

    /// Annexes to track
    pub annexes: Vec<Annex>,

    /// Directory (relative to the working directory) receiving the spreadsheets
    pub output_dir: PathBuf,

    /// State file (relative to the working directory)
    pub state_file: PathBuf,

    /// User-Agent sent with every request
    pub user_agent: String,

    /// Overall request timeout in seconds
    pub timeout_secs: u64,

    /// Commit message prefix
    pub commit_prefix: String,

    /// Repository publishing
    pub publish: PublishConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            index_url_template: DEFAULT_INDEX_TEMPLATE.to_string(),
            annexes: Annex::ALL.to_vec(),
            output_dir: PathBuf::from("RESTRICCIONES"),
            state_file: PathBuf::from("annexes_state.json"),
            user_agent: format!("annex-watch/{}", env!("CARGO_PKG_VERSION")),
            timeout_secs: 30,
            commit_prefix: "Auto-update COSING annexes".to_string(),
            publish: PublishConfig::default(),
        }
    }
}

impl Config {
    /// Load config from an explicit path, or from `annex-watch.toml` in `workdir`
    ///
    /// An explicit path must exist. The implicit file is optional.
    pub fn load(explicit: Option<&Path>, workdir: &Path) -> Result<Self> {
        let config_path = match explicit {
            Some(path) => {
                if !path.exists() {
                    anyhow::bail!("Config file not found: {}", path.display());
                }
                path.to_path_buf()
            }
            None => {
                let path = workdir.join(CONFIG_FILE);
                if !path.exists() {
                    return Ok(Self::default());
                }
                path
            }
        };

        let content = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;
        Ok(config)
    }

    /// Overlay credential and repository target from an environment lookup
    pub fn with_env_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(token) = non_empty(TOKEN_ENV) {
            self.publish.token = Some(token);
        }
        if let Some(repo) = non_empty(REPO_ENV) {
            self.publish.repo = Some(repo);
        }
        if let Some(branch) = non_empty(BRANCH_ENV) {
            self.publish.branch = branch;
        }
        self
    }

    /// Resolve the publishing target, `None` when publishing is not configured
    pub fn publish_target(&self) -> Result<Option<PublishTarget>> {
        let (Some(repo), Some(token)) = (&self.publish.repo, &self.publish.token) else {
            return Ok(None);
        };

        let Some((owner, name)) = repo.trim().split_once('/') else {
            anyhow::bail!("Invalid repository '{}': expected <owner>/<name>", repo);
        };
        if owner.is_empty() || name.is_empty() || name.contains('/') {
            anyhow::bail!("Invalid repository '{}': expected <owner>/<name>", repo);
        }

        Ok(Some(PublishTarget {
            owner: owner.to_string(),
            repo: name.to_string(),
            branch: self.publish.branch.clone(),
            api_base: self.publish.api_base.clone(),
            token: token.clone(),
        }))
    }
}

/// `[publish]` section
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PublishConfig {
    /// Target repository as `<owner>/<name>`
    pub repo: Option<String>,

    /// Branch receiving the commits
    pub branch: String,

    /// REST API root
    pub api_base: String,

    /// Credential, only ever taken from the environment
    #[serde(skip)]
    pub token: Option<String>,
}

impl Default for PublishConfig {
    fn default() -> Self {
        Self {
            repo: None,
            branch: "main".to_string(),
            api_base: "https://api.github.com".to_string(),
            token: None,
        }
    }
}

impl fmt::Debug for PublishConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublishConfig")
            .field("repo", &self.repo)
            .field("branch", &self.branch)
            .field("api_base", &self.api_base)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

/// Fully resolved repository target
#[derive(Clone)]
pub struct PublishTarget {
    pub owner: String,
    pub repo: String,
    pub branch: String,
    pub api_base: String,
    pub token: String,
}

impl fmt::Debug for PublishTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PublishTarget")
            .field("owner", &self.owner)
            .field("repo", &self.repo)
            .field("branch", &self.branch)
            .field("api_base", &self.api_base)
            .finish_non_exhaustive()
    }
}
