//! Client toolkit for the Oro REST API.
//!
//! Mirrors the data layer a frontend sits on: a thin HTTP wrapper
//! ([`ApiClient`]), a query cache with mutation-driven invalidation
//! ([`QueryCache`], [`PromptQueries`]), debounced search/filter state
//! ([`PromptFilterState`]), and pluggable draft autosave ([`DraftStore`]).

mod cache;
mod drafts;
mod queries;
mod search;

pub use cache::*;
pub use drafts::*;
pub use queries::*;
pub use search::*;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::api::MessageResponse;
use crate::errors::ErrorBody;
use crate::models::{
    CreatePromptRequest, CreateTagRequest, ExecutionStats, Prompt, PromptListResponse, Tag,
    TagWithCount, UpdatePromptRequest,
};

/// Errors surfaced by the API client.
#[derive(Debug)]
pub enum ClientError {
    /// Transport-level failure (connection refused, timeout, bad JSON)
    Http(reqwest::Error),
    /// The server answered with an error status and an `{error}` body
    Api { status: u16, message: String },
}

impl std::fmt::Display for ClientError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientError::Http(err) => write!(f, "http error: {}", err),
            ClientError::Api { status, message } => write!(f, "api error {}: {}", status, message),
        }
    }
}

impl std::error::Error for ClientError {}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::Http(err)
    }
}

/// Thin HTTP wrapper around the REST surface.
///
/// Stateless apart from the connection pool; callers wanting caching
/// compose it with [`PromptQueries`].
#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    /// `base_url` is the server root, e.g. `http://127.0.0.1:8080`.
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            http: reqwest::Client::new(),
            base_url,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}/api/v1{}", self.base_url, path)
    }

    /// Decode a response, mapping non-2xx statuses to [`ClientError::Api`].
    async fn decode<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, ClientError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response.json().await?);
        }

        let message = match response.json::<ErrorBody>().await {
            Ok(body) => body.error,
            Err(_) => status
                .canonical_reason()
                .unwrap_or("Unknown error")
                .to_string(),
        };
        Err(ClientError::Api {
            status: status.as_u16(),
            message,
        })
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ClientError> {
        let response = self.http.get(self.url(path)).send().await?;
        Self::decode(response).await
    }

    async fn post_json<B: Serialize, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<T, ClientError> {
        let response = self.http.post(self.url(path)).json(body).send().await?;
        Self::decode(response).await
    }

    /// List prompts with pagination, search, and tag filters.
    pub async fn list_prompts(
        &self,
        params: &PromptQueryParams,
    ) -> Result<PromptListResponse, ClientError> {
        let response = self
            .http
            .get(self.url("/prompts"))
            .query(&params.query_pairs())
            .send()
            .await?;
        Self::decode(response).await
    }

    /// Fetch a single prompt with its full execution history.
    pub async fn get_prompt(&self, id: &str) -> Result<Prompt, ClientError> {
        self.get_json(&format!("/prompts/{}", id)).await
    }

    /// Create a prompt.
    pub async fn create_prompt(&self, request: &CreatePromptRequest) -> Result<Prompt, ClientError> {
        self.post_json("/prompts", request).await
    }

    /// Partially update a prompt.
    pub async fn update_prompt(
        &self,
        id: &str,
        request: &UpdatePromptRequest,
    ) -> Result<Prompt, ClientError> {
        let response = self
            .http
            .put(self.url(&format!("/prompts/{}", id)))
            .json(request)
            .send()
            .await?;
        Self::decode(response).await
    }

    /// Delete a prompt.
    pub async fn delete_prompt(&self, id: &str) -> Result<MessageResponse, ClientError> {
        let response = self
            .http
            .delete(self.url(&format!("/prompts/{}", id)))
            .send()
            .await?;
        Self::decode(response).await
    }

    /// Fetch execution statistics for a prompt.
    pub async fn prompt_stats(&self, id: &str) -> Result<ExecutionStats, ClientError> {
        self.get_json(&format!("/prompts/{}/stats", id)).await
    }

    /// List all tags with prompt counts.
    pub async fn list_tags(&self) -> Result<Vec<TagWithCount>, ClientError> {
        self.get_json("/tags").await
    }

    /// Create a tag.
    pub async fn create_tag(&self, name: &str) -> Result<Tag, ClientError> {
        self.post_json(
            "/tags",
            &CreateTagRequest {
                name: name.to_string(),
            },
        )
        .await
    }
}

/// Parameters for the prompt listing endpoint.
#[derive(Debug, Clone)]
pub struct PromptQueryParams {
    pub skip: i64,
    pub limit: i64,
    pub search: Option<String>,
    pub tags: Vec<String>,
}

impl Default for PromptQueryParams {
    fn default() -> Self {
        Self {
            skip: 0,
            limit: 100,
            search: None,
            tags: Vec::new(),
        }
    }
}

impl PromptQueryParams {
    fn query_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = vec![
            ("skip", self.skip.to_string()),
            ("limit", self.limit.to_string()),
        ];
        if let Some(search) = &self.search {
            pairs.push(("search", search.clone()));
        }
        if !self.tags.is_empty() {
            pairs.push(("tags", self.tags.join(",")));
        }
        pairs
    }

    /// Stable cache key for these parameters.
    pub fn cache_key(&self) -> String {
        format!(
            "skip={}&limit={}&search={}&tags={}",
            self.skip,
            self.limit,
            self.search.as_deref().unwrap_or(""),
            self.tags.join(",")
        )
    }
}
