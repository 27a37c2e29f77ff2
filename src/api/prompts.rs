//! Prompt API endpoints.

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};

use super::MessageResponse;
use crate::errors::AppError;
use crate::models::{
    CreatePromptRequest, ExecutionStats, ListPromptsQuery, Prompt, PromptListResponse,
    UpdatePromptRequest,
};
use crate::AppState;

/// GET /api/v1/prompts - List prompts with pagination, search, and tag
/// filtering.
pub async fn list_prompts(
    State(state): State<AppState>,
    Query(query): Query<ListPromptsQuery>,
) -> Result<Json<PromptListResponse>, AppError> {
    let filter = query.into_filter();
    let (prompts, total) = state.repo.list_prompts(&filter).await?;

    Ok(Json(PromptListResponse {
        prompts,
        total,
        skip: filter.skip,
        limit: filter.limit,
    }))
}

/// POST /api/v1/prompts - Create a new prompt.
pub async fn create_prompt(
    State(state): State<AppState>,
    Json(request): Json<CreatePromptRequest>,
) -> Result<(StatusCode, Json<Prompt>), AppError> {
    if request.name.trim().is_empty() || request.content.trim().is_empty() {
        return Err(AppError::Validation(
            "name and content are required".to_string(),
        ));
    }

    let prompt = state.repo.create_prompt(&request).await?;
    Ok((StatusCode::CREATED, Json(prompt)))
}

/// GET /api/v1/prompts/:id - Get a single prompt with its full execution
/// history.
pub async fn get_prompt(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Prompt>, AppError> {
    match state.repo.get_prompt(&id).await? {
        Some(prompt) => Ok(Json(prompt)),
        None => Err(AppError::NotFound("Prompt not found".to_string())),
    }
}

/// PUT /api/v1/prompts/:id - Partially update a prompt.
///
/// Absent fields are left untouched; `name` and `content` must be
/// non-empty when present.
pub async fn update_prompt(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(request): Json<UpdatePromptRequest>,
) -> Result<Json<Prompt>, AppError> {
    if let Some(name) = &request.name {
        if name.trim().is_empty() {
            return Err(AppError::Validation("name cannot be empty".to_string()));
        }
    }
    if let Some(content) = &request.content {
        if content.trim().is_empty() {
            return Err(AppError::Validation("content cannot be empty".to_string()));
        }
    }

    let prompt = state.repo.update_prompt(&id, &request).await?;
    Ok(Json(prompt))
}

/// DELETE /api/v1/prompts/:id - Delete a prompt and, by cascade, its tag
/// associations and executions.
pub async fn delete_prompt(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    state.repo.delete_prompt(&id).await?;
    Ok(Json(MessageResponse {
        message: "Prompt deleted successfully".to_string(),
    }))
}

/// GET /api/v1/prompts/:id/stats - Execution statistics for a prompt.
pub async fn get_prompt_stats(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ExecutionStats>, AppError> {
    let stats = state.repo.prompt_stats(&id).await?;
    Ok(Json(stats))
}
