//! Field and document review tracker.

use chrono::Utc;
use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::info;

use super::engine::load_request;
use crate::domain::transitions::active_review_state;
use crate::domain::{Actor, FieldReview, FieldStatus, FileRecord, FileStatus, Request, ReviewStage};
use crate::database::begin_write;
use crate::errors::{AppError, AppResult};
use crate::store::{self, reviews::FieldReviewUpsert};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldReviewInput {
    pub field_key: String,
    pub status: FieldStatus,
    pub comment: Option<String>,
}

#[derive(Clone)]
pub struct ReviewTracker {
    pool: SqlitePool,
}

fn normalize_comment(comment: Option<&str>) -> Option<&str> {
    comment.map(str::trim).filter(|c| !c.is_empty())
}

/// The reviewer's role must currently hold the request.
fn ensure_under_review(actor: Actor, request: &Request) -> AppResult<()> {
    match active_review_state(actor.role) {
        Some(state) if state == request.state => Ok(()),
        _ => Err(AppError::validation(format!(
            "request {} is {} and not under review by {}",
            request.id, request.state, actor.role
        ))),
    }
}

impl ReviewTracker {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn record_field_review(
        &self,
        request_id: i64,
        input: FieldReviewInput,
        actor: Actor,
    ) -> AppResult<FieldReview> {
        let mut recorded = self.record_field_reviews(request_id, vec![input], actor).await?;
        recorded
            .pop()
            .ok_or_else(|| AppError::Internal("field review was not recorded".to_string()))
    }

    /// Upserts a batch of field reviews in one transaction; all or nothing.
    pub async fn record_field_reviews(
        &self,
        request_id: i64,
        inputs: Vec<FieldReviewInput>,
        actor: Actor,
    ) -> AppResult<Vec<FieldReview>> {
        let stage = reviewer_stage(actor)?;
        if inputs.is_empty() {
            return Err(AppError::validation("no field reviews given"));
        }

        let mut tx = begin_write(&self.pool).await?;
        let request = load_request(&mut tx, request_id).await?;
        ensure_under_review(actor, &request)?;

        let existing = store::reviews::list(&mut tx, request_id, Some(stage)).await?;
        let answer_keys = request.answer_keys();
        let now = Utc::now();
        let mut recorded = Vec::with_capacity(inputs.len());

        for input in &inputs {
            let known = answer_keys.iter().any(|k| k == &input.field_key)
                || existing.iter().any(|r| r.field_key == input.field_key);
            if !known {
                return Err(AppError::validation(format!(
                    "unknown field '{}'",
                    input.field_key
                )));
            }

            let comment = normalize_comment(input.comment.as_deref());
            if input.status == FieldStatus::Observado && comment.is_none() {
                return Err(AppError::validation(format!(
                    "a comment is required to mark '{}' as OBSERVADO",
                    input.field_key
                )));
            }

            let review = store::reviews::upsert(
                &mut tx,
                FieldReviewUpsert {
                    request_id,
                    stage,
                    field_key: &input.field_key,
                    status: input.status,
                    comment,
                    reviewer_id: actor.id,
                    now,
                },
            )
            .await?;
            recorded.push(review);
        }

        tx.commit().await?;
        info!(request_id, %stage, count = recorded.len(), reviewer_id = actor.id, "Recorded field reviews");
        Ok(recorded)
    }

    pub async fn record_file_review(
        &self,
        file_id: i64,
        status: FileStatus,
        comment: Option<&str>,
        actor: Actor,
    ) -> AppResult<FileRecord> {
        if !actor.role.can_review_files() {
            return Err(AppError::forbidden(format!(
                "role {} cannot review documents",
                actor.role
            )));
        }
        let comment = normalize_comment(comment);
        if status == FileStatus::NoCumple && comment.is_none() {
            return Err(AppError::validation(
                "a comment is required to mark a document as NO_CUMPLE",
            ));
        }

        let mut tx = begin_write(&self.pool).await?;
        let file = store::files::fetch(&mut tx, file_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("file {file_id} not found")))?;
        let request = load_request(&mut tx, file.request_id).await?;
        ensure_under_review(actor, &request)?;

        let now = Utc::now();
        store::files::set_status(&mut tx, file_id, status, comment, now).await?;
        tx.commit().await?;

        info!(file_id, request_id = file.request_id, status = status.as_str(), "Recorded document review");
        Ok(FileRecord {
            status,
            comment: comment.map(str::to_string),
            reviewed_at: Some(now),
            ..file
        })
    }

    /// Staff-only view of the checklists.
    pub async fn field_reviews(
        &self,
        request_id: i64,
        stage: Option<ReviewStage>,
        actor: Actor,
    ) -> AppResult<Vec<FieldReview>> {
        if !actor.role.is_employee() {
            return Err(AppError::forbidden("only staff can read review checklists"));
        }
        let mut conn = self.pool.acquire().await?;
        load_request(&mut conn, request_id).await?;
        Ok(store::reviews::list(&mut conn, request_id, stage).await?)
    }
}

fn reviewer_stage(actor: Actor) -> AppResult<ReviewStage> {
    actor.role.review_stage().ok_or_else(|| {
        AppError::forbidden(format!("role {} does not review fields", actor.role))
    })
}
