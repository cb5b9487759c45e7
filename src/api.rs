use crate::error::{RepoLikesError, Result};
use crate::types::{RepositoryId, RepositoryRecord};
use async_trait::async_trait;
use reqwest::{Client, Method, Response};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

pub const DEFAULT_API_URL: &str = "http://localhost:3333";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Remote side of the repository list: fetch everything, like one.
#[async_trait]
pub trait RepositoryApi: Send + Sync + 'static {
    async fn list_repositories(&self) -> Result<Vec<RepositoryRecord>>;

    async fn like_repository(&self, id: &RepositoryId) -> Result<RepositoryRecord>;
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: Url,
    pub timeout: Duration,
    pub user_agent: String,
}

impl ClientConfig {
    pub fn new(base_url: Url) -> Self {
        Self {
            base_url,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            user_agent: format!("repo-likes/{}", env!("CARGO_PKG_VERSION")),
        }
    }

    pub fn from_url(base_url: &str) -> Result<Self> {
        let parsed = Url::parse(base_url)
            .map_err(|e| RepoLikesError::InvalidBaseUrl(format!("{}: {}", base_url, e)))?;
        Ok(Self::new(parsed))
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

pub struct ApiClient {
    client: Client,
    base_url: Url,
}

impl ApiClient {
    pub fn new(config: ClientConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .timeout(config.timeout)
            .build()?;

        let mut base_url = config.base_url;
        if base_url.cannot_be_a_base() {
            return Err(RepoLikesError::InvalidBaseUrl(base_url.to_string()));
        }
        // Keep a trailing slash so joined segments land under any base path
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(ApiClient { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn repositories_url(&self) -> Result<Url> {
        self.endpoint(&["repositories"])
    }

    pub fn like_url(&self, id: &RepositoryId) -> Result<Url> {
        let id = id.to_string();
        self.endpoint(&["repositories", id.as_str(), "like"])
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| RepoLikesError::InvalidBaseUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    async fn make_request(&self, method: Method, url: Url) -> Result<Response> {
        debug!(%method, %url, "Sending request");

        let response = self
            .client
            .request(method, url.clone())
            .header("Accept", "application/json")
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => Ok(response),
            reqwest::StatusCode::NOT_FOUND => {
                Err(RepoLikesError::NotFound(url.to_string()))
            }
            status => {
                let error_text = response.text().await.unwrap_or_default();
                warn!(%status, %url, "Request failed");
                Err(RepoLikesError::ApiError(
                    format!("API request failed with status {}: {}", status, error_text)
                ))
            }
        }
    }
}

#[async_trait]
impl RepositoryApi for ApiClient {
    async fn list_repositories(&self) -> Result<Vec<RepositoryRecord>> {
        let url = self.repositories_url()?;
        let response = self.make_request(Method::GET, url).await?;
        let body = response.bytes().await?;
        let records: Vec<RepositoryRecord> = serde_json::from_slice(&body)?;
        debug!(count = records.len(), "Fetched repositories");
        Ok(records)
    }

    async fn like_repository(&self, id: &RepositoryId) -> Result<RepositoryRecord> {
        let url = self.like_url(id)?;
        let response = self.make_request(Method::POST, url).await?;
        let body = response.bytes().await?;
        let record: RepositoryRecord = serde_json::from_slice(&body)?;
        debug!(%id, likes = record.likes, "Liked repository");
        Ok(record)
    }
}
