use super::{FetchError, Freshness, Transport};
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::header::{HeaderName, ETAG, LAST_MODIFIED};
use std::time::Duration;
use tracing::debug;
use url::Url;

/// reqwest-backed [`Transport`]
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
}

impl HttpClient {
    pub fn new(user_agent: &str, timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }

    async fn send(
        &self,
        request: reqwest::RequestBuilder,
        url: &Url,
    ) -> Result<reqwest::Response, FetchError> {
        let response = request.send().await.map_err(|source| FetchError::Transport {
            url: url.to_string(),
            source,
        })?;

        let status = response.status();
        debug!(%url, status = status.as_u16(), "response");
        if !status.is_success() {
            return Err(FetchError::status(url, status.as_u16()));
        }
        Ok(response)
    }
}

#[async_trait]
impl Transport for HttpClient {
    async fn get_text(&self, url: &Url) -> Result<String, FetchError> {
        let response = self.send(self.client.get(url.clone()), url).await?;
        response.text().await.map_err(|source| FetchError::Transport {
            url: url.to_string(),
            source,
        })
    }

    async fn head(&self, url: &Url) -> Result<Option<Freshness>, FetchError> {
        let response = self.send(self.client.head(url.clone()), url).await?;
        let headers = response.headers();
        let header = |name: HeaderName| headers.get(name).and_then(|v| v.to_str().ok());

        Ok(Freshness::from_headers(header(LAST_MODIFIED), header(ETAG)))
    }

    async fn get_bytes(&self, url: &Url) -> Result<Vec<u8>, FetchError> {
        let response = self.send(self.client.get(url.clone()), url).await?;
        let body = response.bytes().await.map_err(|source| FetchError::Transport {
            url: url.to_string(),
            source,
        })?;
        debug!(%url, bytes = body.len(), "downloaded");
        Ok(body.to_vec())
    }
}
