//! REST API module.
//!
//! Contains all API routes and handlers following the frontend contract.
//! Every handler returns `Result<_, AppError>`; expected conditions
//! (missing fields, duplicate names, unknown ids) are checked explicitly
//! and mapped to structured error bodies, while store failures surface as
//! a generic 500.

mod prompts;
mod tags;

pub use prompts::*;
pub use tags::*;

use serde::{Deserialize, Serialize};

/// Plain message body, used by the delete endpoint.
#[derive(Debug, Serialize, Deserialize)]
pub struct MessageResponse {
    pub message: String,
}
