//! Oro Prompt Library Backend
//!
//! A REST backend with SQLite persistence for managing reusable AI prompts,
//! plus a client toolkit (API client, query cache, search/filter state,
//! draft autosave) for building frontends on top of it.

pub mod api;
pub mod client;
pub mod config;
pub mod db;
pub mod errors;
pub mod models;

use std::sync::Arc;

use axum::{
    routing::{delete, get, post, put},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;
use db::Repository;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub repo: Arc<Repository>,
    pub config: Arc<Config>,
}

/// Create the application router with all routes.
pub fn create_router(state: AppState) -> Router {
    // CORS configuration
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // API routes
    let api_routes = Router::new()
        // Prompts
        .route("/prompts", get(api::list_prompts))
        .route("/prompts", post(api::create_prompt))
        .route("/prompts/{id}", get(api::get_prompt))
        .route("/prompts/{id}", put(api::update_prompt))
        .route("/prompts/{id}", delete(api::delete_prompt))
        .route("/prompts/{id}/stats", get(api::get_prompt_stats))
        // Tags
        .route("/tags", get(api::list_tags))
        .route("/tags", post(api::create_tag));

    // Health check lives outside the API prefix
    let health_routes = Router::new().route("/health", get(health_check));

    Router::new()
        .nest("/api/v1", api_routes)
        .merge(health_routes)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Health check endpoint.
async fn health_check() -> &'static str {
    "OK"
}

#[cfg(test)]
mod tests;
