//! Database repository for CRUD operations.
//!
//! Uses prepared statements and transactions for data integrity.

use chrono::Utc;
use sqlx::{Row, SqlitePool};

use crate::errors::AppError;
use crate::models::{
    CreatePromptRequest, Execution, ExecutionStats, ExecutionSummary, Prompt, PromptFilter,
    PromptSummary, Tag, TagWithCount, UpdatePromptRequest,
};

/// How many recent executions are embedded in each list item.
const LIST_EXECUTION_LIMIT: i64 = 5;

/// Database repository for all data operations.
#[derive(Clone)]
pub struct Repository {
    pool: SqlitePool,
}

impl Repository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    // ==================== PROMPT OPERATIONS ====================

    /// List prompts matching the filter, newest first, plus the filtered
    /// total count (ignoring pagination).
    ///
    /// The count query and the page query are independent reads and run
    /// concurrently.
    pub async fn list_prompts(
        &self,
        filter: &PromptFilter,
    ) -> Result<(Vec<PromptSummary>, i64), AppError> {
        let mut joins = String::new();
        let mut conditions: Vec<String> = Vec::new();

        if !filter.tag_names.is_empty() {
            joins.push_str(
                " JOIN prompt_tags pt ON pt.prompt_id = p.id JOIN tags t ON t.id = pt.tag_id",
            );
            let placeholders = vec!["?"; filter.tag_names.len()].join(", ");
            conditions.push(format!("t.name IN ({})", placeholders));
        }

        let search_pattern = filter.search.as_ref().map(|term| like_pattern(term));
        if search_pattern.is_some() {
            conditions.push(
                "(p.name LIKE ? ESCAPE '\\' OR p.content LIKE ? ESCAPE '\\' \
                 OR p.description LIKE ? ESCAPE '\\')"
                    .to_string(),
            );
        }

        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", conditions.join(" AND "))
        };

        let page_sql = format!(
            "SELECT DISTINCT p.id, p.name, p.content, p.system_prompt, p.description, \
                    p.created_at, p.updated_at \
             FROM prompts p{}{} \
             ORDER BY p.created_at DESC, p.id LIMIT ? OFFSET ?",
            joins, where_clause
        );
        let count_sql = format!(
            "SELECT COUNT(DISTINCT p.id) AS total FROM prompts p{}{}",
            joins, where_clause
        );

        let mut page_query = sqlx::query(&page_sql);
        let mut count_query = sqlx::query(&count_sql);
        for name in &filter.tag_names {
            page_query = page_query.bind(name);
            count_query = count_query.bind(name);
        }
        if let Some(pattern) = &search_pattern {
            page_query = page_query.bind(pattern).bind(pattern).bind(pattern);
            count_query = count_query.bind(pattern).bind(pattern).bind(pattern);
        }
        page_query = page_query.bind(filter.limit).bind(filter.skip);

        let (page_rows, count_row) = tokio::join!(
            page_query.fetch_all(&self.pool),
            count_query.fetch_one(&self.pool)
        );
        let page_rows = page_rows?;
        let total: i64 = count_row?.get("total");

        let mut prompts = Vec::with_capacity(page_rows.len());
        for row in &page_rows {
            let id: String = row.get("id");
            let tags = self.tags_for_prompt(&id).await?;
            let executions = self.recent_executions(&id).await?;
            prompts.push(PromptSummary {
                id,
                name: row.get("name"),
                content: row.get("content"),
                system_prompt: row.get("system_prompt"),
                description: row.get("description"),
                created_at: row.get("created_at"),
                updated_at: row.get("updated_at"),
                tags,
                executions,
            });
        }

        Ok((prompts, total))
    }

    /// Get a prompt by ID with its tags and full execution history.
    pub async fn get_prompt(&self, id: &str) -> Result<Option<Prompt>, AppError> {
        let row = sqlx::query(
            "SELECT id, name, content, system_prompt, description, created_at, updated_at \
             FROM prompts WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let tags = self.tags_for_prompt(id).await?;
        let executions = self.executions_for_prompt(id).await?;

        Ok(Some(Prompt {
            id: row.get("id"),
            name: row.get("name"),
            content: row.get("content"),
            system_prompt: row.get("system_prompt"),
            description: row.get("description"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
            tags,
            executions,
        }))
    }

    /// Create a new prompt and its initial tag associations.
    pub async fn create_prompt(&self, request: &CreatePromptRequest) -> Result<Prompt, AppError> {
        if self.prompt_id_by_name(&request.name).await?.is_some() {
            return Err(AppError::Conflict(
                "Prompt with this name already exists".to_string(),
            ));
        }
        self.verify_tag_ids(&request.tag_ids).await?;

        let id = uuid::Uuid::new_v4().to_string();
        let now = Utc::now().to_rfc3339();

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO prompts (id, name, content, system_prompt, description, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(&id)
        .bind(&request.name)
        .bind(&request.content)
        .bind(&request.system_prompt)
        .bind(&request.description)
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        for tag_id in &request.tag_ids {
            sqlx::query("INSERT OR IGNORE INTO prompt_tags (prompt_id, tag_id) VALUES (?, ?)")
                .bind(&id)
                .bind(tag_id)
                .execute(&mut *tx)
                .await?;
        }

        tx.commit().await?;

        self.get_prompt(&id)
            .await?
            .ok_or_else(|| AppError::Internal(format!("Prompt {} vanished after create", id)))
    }

    /// Apply a partial update. Only fields present in the patch change;
    /// when `tag_ids` is present the association set is replaced wholesale.
    pub async fn update_prompt(
        &self,
        id: &str,
        patch: &UpdatePromptRequest,
    ) -> Result<Prompt, AppError> {
        let existing = self
            .get_prompt(id)
            .await?
            .ok_or_else(|| AppError::NotFound("Prompt not found".to_string()))?;

        // Re-check uniqueness when the name actually changes
        if let Some(name) = &patch.name {
            if name != &existing.name && self.prompt_id_by_name(name).await?.is_some() {
                return Err(AppError::Conflict(
                    "Prompt with this name already exists".to_string(),
                ));
            }
        }
        if let Some(tag_ids) = &patch.tag_ids {
            self.verify_tag_ids(tag_ids).await?;
        }

        let now = Utc::now().to_rfc3339();
        let name = patch.name.as_ref().unwrap_or(&existing.name);
        let content = patch.content.as_ref().unwrap_or(&existing.content);
        let system_prompt = match &patch.system_prompt {
            Some(value) => value.clone(),
            None => existing.system_prompt.clone(),
        };
        let description = match &patch.description {
            Some(value) => value.clone(),
            None => existing.description.clone(),
        };

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "UPDATE prompts SET name = ?, content = ?, system_prompt = ?, description = ?, \
             updated_at = ? WHERE id = ?",
        )
        .bind(name)
        .bind(content)
        .bind(&system_prompt)
        .bind(&description)
        .bind(&now)
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if let Some(tag_ids) = &patch.tag_ids {
            sqlx::query("DELETE FROM prompt_tags WHERE prompt_id = ?")
                .bind(id)
                .execute(&mut *tx)
                .await?;
            for tag_id in tag_ids {
                sqlx::query("INSERT OR IGNORE INTO prompt_tags (prompt_id, tag_id) VALUES (?, ?)")
                    .bind(id)
                    .bind(tag_id)
                    .execute(&mut *tx)
                    .await?;
            }
        }

        tx.commit().await?;

        self.get_prompt(id)
            .await?
            .ok_or_else(|| AppError::Internal(format!("Prompt {} vanished after update", id)))
    }

    /// Delete a prompt. Tag associations and executions go with it via
    /// cascade.
    pub async fn delete_prompt(&self, id: &str) -> Result<(), AppError> {
        let result = sqlx::query("DELETE FROM prompts WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound("Prompt not found".to_string()));
        }

        Ok(())
    }

    /// Aggregate execution statistics for a prompt.
    pub async fn prompt_stats(&self, id: &str) -> Result<ExecutionStats, AppError> {
        let exists = sqlx::query("SELECT id FROM prompts WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        if exists.is_none() {
            return Err(AppError::NotFound("Prompt not found".to_string()));
        }

        // AVG skips NULL ratings; MAX gives the latest timestamp regardless
        // of row order
        let row = sqlx::query(
            "SELECT COUNT(*) AS total, \
                    COALESCE(SUM(success), 0) AS successes, \
                    AVG(rating) AS avg_rating, \
                    MAX(executed_at) AS last_executed \
             FROM executions WHERE prompt_id = ?",
        )
        .bind(id)
        .fetch_one(&self.pool)
        .await?;

        let total: i64 = row.get("total");
        let successes: i64 = row.get("successes");
        let avg_rating: Option<f64> = row.get("avg_rating");
        let last_executed: Option<String> = row.get("last_executed");

        let success_rate = if total > 0 {
            round2(successes as f64 / total as f64)
        } else {
            0.0
        };

        Ok(ExecutionStats {
            total_executions: total,
            average_rating: avg_rating.map(round2),
            success_rate,
            last_executed_at: last_executed,
        })
    }

    // ==================== TAG OPERATIONS ====================

    /// List all tags ordered by name, with per-tag prompt counts.
    pub async fn list_tags(&self) -> Result<Vec<TagWithCount>, AppError> {
        let rows = sqlx::query(
            "SELECT t.id, t.name, COUNT(pt.prompt_id) AS prompt_count \
             FROM tags t LEFT JOIN prompt_tags pt ON pt.tag_id = t.id \
             GROUP BY t.id, t.name ORDER BY t.name",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| TagWithCount {
                id: row.get("id"),
                name: row.get("name"),
                prompt_count: row.get("prompt_count"),
            })
            .collect())
    }

    /// Create a new tag.
    pub async fn create_tag(&self, name: &str) -> Result<Tag, AppError> {
        let existing = sqlx::query("SELECT id FROM tags WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        if existing.is_some() {
            return Err(AppError::Conflict(
                "Tag with this name already exists".to_string(),
            ));
        }

        let result = sqlx::query("INSERT INTO tags (name) VALUES (?)")
            .bind(name)
            .execute(&self.pool)
            .await?;

        Ok(Tag {
            id: result.last_insert_rowid(),
            name: name.to_string(),
        })
    }

    // ==================== HELPERS ====================

    async fn prompt_id_by_name(&self, name: &str) -> Result<Option<String>, AppError> {
        let row = sqlx::query("SELECT id FROM prompts WHERE name = ?")
            .bind(name)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|r| r.get("id")))
    }

    /// Reject tag ids that do not reference an existing tag.
    async fn verify_tag_ids(&self, tag_ids: &[i64]) -> Result<(), AppError> {
        for tag_id in tag_ids {
            let row = sqlx::query("SELECT id FROM tags WHERE id = ?")
                .bind(tag_id)
                .fetch_optional(&self.pool)
                .await?;
            if row.is_none() {
                return Err(AppError::Validation(format!(
                    "Tag with id {} does not exist",
                    tag_id
                )));
            }
        }
        Ok(())
    }

    async fn tags_for_prompt(&self, prompt_id: &str) -> Result<Vec<Tag>, AppError> {
        let rows = sqlx::query(
            "SELECT t.id, t.name FROM tags t \
             JOIN prompt_tags pt ON pt.tag_id = t.id \
             WHERE pt.prompt_id = ? ORDER BY t.name",
        )
        .bind(prompt_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| Tag {
                id: row.get("id"),
                name: row.get("name"),
            })
            .collect())
    }

    async fn executions_for_prompt(&self, prompt_id: &str) -> Result<Vec<Execution>, AppError> {
        let rows = sqlx::query(
            "SELECT id, rating, success, notes, executed_at FROM executions \
             WHERE prompt_id = ? ORDER BY executed_at DESC, id DESC",
        )
        .bind(prompt_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                let success: i64 = row.get("success");
                Execution {
                    id: row.get("id"),
                    rating: row.get("rating"),
                    success: success != 0,
                    notes: row.get("notes"),
                    executed_at: row.get("executed_at"),
                }
            })
            .collect())
    }

    async fn recent_executions(&self, prompt_id: &str) -> Result<Vec<ExecutionSummary>, AppError> {
        let rows = sqlx::query(
            "SELECT id, rating, executed_at FROM executions \
             WHERE prompt_id = ? ORDER BY executed_at DESC, id DESC LIMIT ?",
        )
        .bind(prompt_id)
        .bind(LIST_EXECUTION_LIMIT)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| ExecutionSummary {
                id: row.get("id"),
                rating: row.get("rating"),
                executed_at: row.get("executed_at"),
            })
            .collect())
    }
}

/// Round to two decimal places for the stats payload.
fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// Substring-match pattern for LIKE. Metacharacters in the term are
/// escaped so `%` and `_` match themselves.
fn like_pattern(term: &str) -> String {
    let escaped = term
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}
