//! Cached query and mutation layer over [`ApiClient`].
//!
//! Reads go through the cache; mutations hit the server and, on success,
//! invalidate the affected collection (and the specific item for updates)
//! so subsequent reads refetch. Concurrent mutations from different
//! sessions can race; the last write to reach the store wins.

use std::sync::Arc;

use crate::api::MessageResponse;
use crate::models::{
    CreatePromptRequest, Prompt, PromptListResponse, Tag, TagWithCount, UpdatePromptRequest,
};

use super::{ApiClient, ClientError, PromptQueryParams, QueryCache, QueryKey};

const PROMPTS_RESOURCE: &str = "prompts";
const TAGS_RESOURCE: &str = "tags";

/// Data-fetching layer pairing an [`ApiClient`] with an explicit
/// [`QueryCache`] handle.
pub struct PromptQueries {
    client: ApiClient,
    cache: Arc<QueryCache>,
}

impl PromptQueries {
    pub fn new(client: ApiClient, cache: Arc<QueryCache>) -> Self {
        Self { client, cache }
    }

    fn item_key(id: &str) -> QueryKey {
        QueryKey::new(PROMPTS_RESOURCE, format!("id={}", id))
    }

    /// Fetch the prompt list for the given parameters, served from cache
    /// when possible.
    pub async fn prompts(
        &self,
        params: &PromptQueryParams,
    ) -> Result<PromptListResponse, ClientError> {
        let key = QueryKey::new(PROMPTS_RESOURCE, params.cache_key());
        if let Some(cached) = self.cache.get(&key) {
            return Ok(cached);
        }
        let fresh = self.client.list_prompts(params).await?;
        self.cache.put(key, &fresh);
        Ok(fresh)
    }

    /// Fetch a single prompt, served from cache when possible.
    pub async fn prompt(&self, id: &str) -> Result<Prompt, ClientError> {
        let key = Self::item_key(id);
        if let Some(cached) = self.cache.get(&key) {
            return Ok(cached);
        }
        let fresh = self.client.get_prompt(id).await?;
        self.cache.put(key, &fresh);
        Ok(fresh)
    }

    /// Fetch all tags, served from cache when possible.
    pub async fn tags(&self) -> Result<Vec<TagWithCount>, ClientError> {
        let key = QueryKey::new(TAGS_RESOURCE, String::new());
        if let Some(cached) = self.cache.get(&key) {
            return Ok(cached);
        }
        let fresh = self.client.list_tags().await?;
        self.cache.put(key, &fresh);
        Ok(fresh)
    }

    /// Create a prompt and invalidate the prompt collection.
    pub async fn create_prompt(&self, request: &CreatePromptRequest) -> Result<Prompt, ClientError> {
        let prompt = self.client.create_prompt(request).await?;
        self.cache.invalidate_resource(PROMPTS_RESOURCE);
        Ok(prompt)
    }

    /// Update a prompt and invalidate the collection plus the item entry.
    pub async fn update_prompt(
        &self,
        id: &str,
        request: &UpdatePromptRequest,
    ) -> Result<Prompt, ClientError> {
        let prompt = self.client.update_prompt(id, request).await?;
        self.cache.invalidate_resource(PROMPTS_RESOURCE);
        self.cache.invalidate(&Self::item_key(id));
        Ok(prompt)
    }

    /// Delete a prompt and invalidate the prompt collection.
    pub async fn delete_prompt(&self, id: &str) -> Result<MessageResponse, ClientError> {
        let response = self.client.delete_prompt(id).await?;
        self.cache.invalidate_resource(PROMPTS_RESOURCE);
        Ok(response)
    }

    /// Create a tag and invalidate the tag collection.
    pub async fn create_tag(&self, name: &str) -> Result<Tag, ClientError> {
        let tag = self.client.create_tag(name).await?;
        self.cache.invalidate_resource(TAGS_RESOURCE);
        Ok(tag)
    }
}
