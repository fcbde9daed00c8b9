//! GitHub contents API repository
//!
//! `GET /repos/{owner}/{repo}/contents/{path}?ref={branch}` for the existence
//! check and `PUT` on the same URL to create or update.

use super::{PublishError, RemoteFile, RemoteRepository};
use crate::models::PublishTarget;
use anyhow::{Context, Result};
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION};
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::instrument;
use url::Url;

const API_VERSION: &str = "2022-11-28";

#[derive(Debug, Deserialize)]
struct ContentEntry {
    sha: String,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    message: String,
}

pub struct GithubRepository {
    client: Client,
    api_base: Url,
    target: PublishTarget,
}

impl GithubRepository {
    pub fn new(target: PublishTarget, user_agent: &str, timeout_secs: u64) -> Result<Self> {
        let api_base = Url::parse(&target.api_base)
            .with_context(|| format!("Invalid API base URL '{}'", target.api_base))?;
        if api_base.cannot_be_a_base() {
            anyhow::bail!("Invalid API base URL '{}'", target.api_base);
        }

        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .build()
            .context("Failed to create GitHub client")?;

        Ok(Self {
            client,
            api_base,
            target,
        })
    }

    fn headers(&self) -> Result<HeaderMap, PublishError> {
        let mut h = HeaderMap::new();
        h.insert(
            ACCEPT,
            HeaderValue::from_static("application/vnd.github+json"),
        );
        h.insert("X-GitHub-Api-Version", HeaderValue::from_static(API_VERSION));
        let auth = format!("Bearer {}", self.target.token);
        let mut auth = HeaderValue::from_str(&auth)
            .map_err(|e| PublishError::Credential(e.to_string()))?;
        auth.set_sensitive(true);
        h.insert(AUTHORIZATION, auth);
        Ok(h)
    }

    fn contents_url(&self, repo_path: &str) -> Url {
        contents_url(
            &self.api_base,
            &self.target.owner,
            &self.target.repo,
            repo_path,
        )
    }
}

/// `{api_base}/repos/{owner}/{repo}/contents/{path}` with every segment escaped
fn contents_url(api_base: &Url, owner: &str, repo: &str, repo_path: &str) -> Url {
    let mut url = api_base.clone();
    if let Ok(mut segments) = url.path_segments_mut() {
        segments
            .pop_if_empty()
            .extend(["repos", owner, repo, "contents"])
            .extend(repo_path.split('/').filter(|s| !s.is_empty()));
    }
    url
}

/// Map the existence-check response onto the tri-state result
fn classify_lookup(repo_path: &str, status: StatusCode, body: &str) -> RemoteFile {
    if status == StatusCode::NOT_FOUND {
        return RemoteFile::Absent;
    }

    if !status.is_success() {
        return RemoteFile::Unknown(PublishError::Status {
            path: repo_path.to_string(),
            status: status.as_u16(),
            message: api_message(body),
        });
    }

    // A directory listing comes back as an array and fails to parse here
    match serde_json::from_str::<ContentEntry>(body) {
        Ok(entry) => RemoteFile::Exists { sha: entry.sha },
        Err(e) => RemoteFile::Unknown(PublishError::Response {
            path: repo_path.to_string(),
            reason: e.to_string(),
        }),
    }
}

fn put_body(content: &[u8], message: &str, branch: &str, sha: Option<&str>) -> serde_json::Value {
    let mut body = serde_json::json!({
        "message": message,
        "content": BASE64.encode(content),
        "branch": branch,
    });
    if let Some(sha) = sha {
        body["sha"] = serde_json::Value::String(sha.to_string());
    }
    body
}

fn api_message(body: &str) -> String {
    serde_json::from_str::<ApiMessage>(body)
        .map(|m| m.message)
        .ok()
        .filter(|m| !m.is_empty())
        .unwrap_or_else(|| body.chars().take(200).collect())
}

#[async_trait]
impl RemoteRepository for GithubRepository {
    #[instrument(level = "debug", skip(self))]
    async fn lookup(&self, repo_path: &str) -> RemoteFile {
        let headers = match self.headers() {
            Ok(h) => h,
            Err(e) => return RemoteFile::Unknown(e),
        };

        let response = match self
            .client
            .get(self.contents_url(repo_path))
            .headers(headers)
            .query(&[("ref", self.target.branch.as_str())])
            .send()
            .await
        {
            Ok(r) => r,
            Err(source) => {
                return RemoteFile::Unknown(PublishError::Request {
                    path: repo_path.to_string(),
                    source,
                })
            }
        };

        let status = response.status();
        match response.text().await {
            Ok(body) => classify_lookup(repo_path, status, &body),
            Err(source) => RemoteFile::Unknown(PublishError::Request {
                path: repo_path.to_string(),
                source,
            }),
        }
    }

    #[instrument(level = "debug", skip(self, content, message))]
    async fn put(
        &self,
        repo_path: &str,
        content: &[u8],
        message: &str,
        sha: Option<&str>,
    ) -> Result<(), PublishError> {
        let request_err = |source| PublishError::Request {
            path: repo_path.to_string(),
            source,
        };

        let response = self
            .client
            .put(self.contents_url(repo_path))
            .headers(self.headers()?)
            .json(&put_body(content, message, &self.target.branch, sha))
            .send()
            .await
            .map_err(request_err)?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(PublishError::Status {
            path: repo_path.to_string(),
            status: status.as_u16(),
            message: api_message(&body),
        })
    }

    fn describe(&self) -> String {
        format!(
            "{}/{}@{}",
            self.target.owner, self.target.repo, self.target.branch
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn target() -> PublishTarget {
        PublishTarget {
            owner: "acme".to_string(),
            repo: "annexes".to_string(),
            branch: "main".to_string(),
            api_base: "https://api.github.com".to_string(),
            token: "t0ken".to_string(),
        }
    }

    #[test]
    fn test_contents_url() {
        let base = Url::parse("https://api.github.com").unwrap();
        let url = contents_url(&base, "acme", "annexes", "RESTRICCIONES/COSING_Annex_II_v2.xlsx");
        assert_eq!(
            url.as_str(),
            "https://api.github.com/repos/acme/annexes/contents/RESTRICCIONES/COSING_Annex_II_v2.xlsx"
        );
    }

    #[test]
    fn test_contents_url_escapes_segments_and_keeps_prefix() {
        let base = Url::parse("https://ghe.example.test/api/v3/").unwrap();
        let url = contents_url(&base, "acme", "annexes", "dir with space/a#b.xlsx");
        assert_eq!(
            url.as_str(),
            "https://ghe.example.test/api/v3/repos/acme/annexes/contents/dir%20with%20space/a%23b.xlsx"
        );
    }

    #[test]
    fn test_classify_found() {
        let body = r#"{"type": "file", "sha": "3d21ec53a331a6f037a91c368710b99387d012c1", "size": 5362}"#;
        match classify_lookup("a.xlsx", StatusCode::OK, body) {
            RemoteFile::Exists { sha } => {
                assert_eq!(sha, "3d21ec53a331a6f037a91c368710b99387d012c1")
            }
            other => panic!("expected Exists, got {:?}", other),
        }
    }

    #[test]
    fn test_classify_not_found_is_absent() {
        let body = r#"{"message": "Not Found", "documentation_url": "https://docs.github.com"}"#;
        assert!(matches!(
            classify_lookup("a.xlsx", StatusCode::NOT_FOUND, body),
            RemoteFile::Absent
        ));
    }

    #[test]
    fn test_classify_server_error_is_unknown() {
        let body = r#"{"message": "Server Error"}"#;
        match classify_lookup("a.xlsx", StatusCode::BAD_GATEWAY, body) {
            RemoteFile::Unknown(PublishError::Status {
                status, message, ..
            }) => {
                assert_eq!(status, 502);
                assert_eq!(message, "Server Error");
            }
            other => panic!("expected Unknown, got {:?}", other),
        }
    }

    #[test]
    fn test_classify_unauthorized_is_unknown() {
        assert!(matches!(
            classify_lookup("a.xlsx", StatusCode::UNAUTHORIZED, "Bad credentials"),
            RemoteFile::Unknown(PublishError::Status { status: 401, .. })
        ));
    }

    #[test]
    fn test_classify_directory_listing_is_unknown() {
        assert!(matches!(
            classify_lookup("RESTRICCIONES", StatusCode::OK, "[]"),
            RemoteFile::Unknown(PublishError::Response { .. })
        ));
    }

    #[test]
    fn test_put_body_create() {
        let body = put_body(b"hello", "Auto-update COSING annexes: I", "main", None);
        assert_eq!(body["message"], "Auto-update COSING annexes: I");
        assert_eq!(body["content"], "aGVsbG8=");
        assert_eq!(body["branch"], "main");
        assert!(body.get("sha").is_none());
    }

    #[test]
    fn test_put_body_update_carries_sha() {
        let body = put_body(b"hello", "msg", "data", Some("abc"));
        assert_eq!(body["sha"], "abc");
        assert_eq!(body["branch"], "data");
    }

    #[test]
    fn test_describe() {
        let repo = GithubRepository::new(target(), "annex-watch/test", 5).unwrap();
        assert_eq!(repo.describe(), "acme/annexes@main");
    }

    #[test]
    fn test_rejects_bad_api_base() {
        let mut t = target();
        t.api_base = "not a url".to_string();
        assert!(GithubRepository::new(t, "annex-watch/test", 5).is_err());
    }
}
