//! Execution records: logged outcomes of running a prompt.
//!
//! Executions are read-only on this API surface; they are written by the
//! runner that actually invokes prompts and consumed here for history and
//! statistics.

use serde::{Deserialize, Serialize};

/// A single logged prompt run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Execution {
    pub id: i64,
    /// Rating from 1-5, when the run was rated
    pub rating: Option<i64>,
    pub success: bool,
    pub notes: Option<String>,
    pub executed_at: String,
}

/// Trimmed execution embedded in prompt list items.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionSummary {
    pub id: i64,
    pub rating: Option<i64>,
    pub executed_at: String,
}

/// Aggregated execution statistics for one prompt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionStats {
    pub total_executions: i64,
    /// Average over rated executions, rounded to 2 decimals; null when no
    /// execution carries a rating
    pub average_rating: Option<f64>,
    /// successful / total, rounded to 2 decimals; 0 when there are no
    /// executions
    pub success_rate: f64,
    pub last_executed_at: Option<String>,
}
