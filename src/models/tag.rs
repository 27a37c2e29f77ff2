//! Tag model for categorizing prompts.

use serde::{Deserialize, Serialize};

/// A reusable tag attachable to many prompts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Tag {
    pub id: i64,
    pub name: String,
}

/// A tag annotated with the number of prompts currently using it.
///
/// Returned by the tag listing endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagWithCount {
    pub id: i64,
    pub name: String,
    pub prompt_count: i64,
}

/// Request body for creating a new tag.
///
/// `name` defaults to empty when absent so a missing field gets the
/// handler's 400 `{error}` body rather than a deserializer rejection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTagRequest {
    #[serde(default)]
    pub name: String,
}
