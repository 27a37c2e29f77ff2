//! Prompt model and request/response bodies.

use serde::{Deserialize, Deserializer, Serialize};

use super::{Execution, ExecutionSummary, Tag};

/// A prompt with its tags and full execution history.
///
/// Returned by the single-prompt, create, and update endpoints. Timestamps
/// are RFC 3339 strings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prompt {
    pub id: String,
    pub name: String,
    pub content: String,
    pub system_prompt: Option<String>,
    pub description: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub tags: Vec<Tag>,
    pub executions: Vec<Execution>,
}

/// A prompt list item: tags plus at most the 5 most recent executions,
/// trimmed to id/rating/time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptSummary {
    pub id: String,
    pub name: String,
    pub content: String,
    pub system_prompt: Option<String>,
    pub description: Option<String>,
    pub created_at: String,
    pub updated_at: String,
    pub tags: Vec<Tag>,
    pub executions: Vec<ExecutionSummary>,
}

/// Response body for the prompt listing endpoint. `skip` and `limit` echo
/// the effective values after clamping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptListResponse {
    pub prompts: Vec<PromptSummary>,
    pub total: i64,
    pub skip: i64,
    pub limit: i64,
}

/// Request body for creating a new prompt.
///
/// `name` and `content` default to empty when absent so the handler can
/// answer a missing field with the same 400 `{error}` body as an empty
/// one, instead of a deserializer rejection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreatePromptRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Tag ids to associate; every id must reference an existing tag
    #[serde(default)]
    pub tag_ids: Vec<i64>,
}

/// Request body for partially updating a prompt.
///
/// Patch semantics are field-presence based: a field absent from the body
/// leaves the stored value untouched. `name` and `content` must be
/// non-empty when present. The nullable text fields use a double `Option`
/// so that an explicit `null` (or empty string) is distinguishable from an
/// absent field and clears the stored value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdatePromptRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub system_prompt: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "double_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub description: Option<Option<String>>,
    /// When present, replaces the full tag association set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tag_ids: Option<Vec<i64>>,
}

/// Wraps a present-but-possibly-null field in an outer `Some`, so absent
/// fields (outer `None`) can be told apart from explicit nulls.
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

/// Query parameters accepted by the prompt listing endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListPromptsQuery {
    #[serde(default)]
    pub skip: Option<i64>,
    #[serde(default)]
    pub limit: Option<i64>,
    #[serde(default)]
    pub search: Option<String>,
    /// Comma-separated tag names
    #[serde(default)]
    pub tags: Option<String>,
}

/// Normalized listing filter handed to the repository.
#[derive(Debug, Clone)]
pub struct PromptFilter {
    pub skip: i64,
    pub limit: i64,
    pub search: Option<String>,
    pub tag_names: Vec<String>,
}

impl ListPromptsQuery {
    /// Normalize raw query parameters: clamp pagination, drop empty search
    /// terms, split the comma-separated tag list.
    pub fn into_filter(self) -> PromptFilter {
        let skip = self.skip.unwrap_or(0).max(0);
        let limit = self.limit.unwrap_or(100).clamp(1, 1000);

        let search = self
            .search
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty());

        let tag_names = self
            .tags
            .map(|t| {
                t.split(',')
                    .map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        PromptFilter {
            skip,
            limit,
            search,
            tag_names,
        }
    }
}
