//! Tag API endpoints.

use axum::{extract::State, http::StatusCode, Json};

use crate::errors::AppError;
use crate::models::{CreateTagRequest, Tag, TagWithCount};
use crate::AppState;

/// GET /api/v1/tags - List all tags with prompt counts, sorted by name.
pub async fn list_tags(State(state): State<AppState>) -> Result<Json<Vec<TagWithCount>>, AppError> {
    let tags = state.repo.list_tags().await?;
    Ok(Json(tags))
}

/// POST /api/v1/tags - Create a new tag.
pub async fn create_tag(
    State(state): State<AppState>,
    Json(request): Json<CreateTagRequest>,
) -> Result<(StatusCode, Json<Tag>), AppError> {
    if request.name.trim().is_empty() {
        return Err(AppError::Validation("name is required".to_string()));
    }

    let tag = state.repo.create_tag(&request.name).await?;
    Ok((StatusCode::CREATED, Json(tag)))
}
