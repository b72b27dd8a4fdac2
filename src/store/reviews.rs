use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use super::decode;
use crate::domain::{FieldReview, FieldStatus, ReviewStage};

fn map_row(row: &SqliteRow) -> Result<FieldReview, sqlx::Error> {
    let stage: String = row.try_get("stage")?;
    let status: String = row.try_get("status")?;
    Ok(FieldReview {
        id: row.try_get("id")?,
        request_id: row.try_get("request_id")?,
        stage: decode("stage", &stage)?,
        field_key: row.try_get("field_key")?,
        status: decode("status", &status)?,
        comment: row.try_get("comment")?,
        reviewer_id: row.try_get("reviewer_id")?,
        updated_at: row.try_get("updated_at")?,
    })
}

/// Creates a `PENDIENTE` row for every key that has none yet. Returns rows created.
pub async fn ensure_rows(
    conn: &mut SqliteConnection,
    request_id: i64,
    stage: ReviewStage,
    keys: &[String],
    now: DateTime<Utc>,
) -> Result<u64, sqlx::Error> {
    let mut created = 0;
    for key in keys {
        let result = sqlx::query(
            r#"
            INSERT OR IGNORE INTO field_reviews (request_id, stage, field_key, status, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(request_id)
        .bind(stage.as_str())
        .bind(key)
        .bind(FieldStatus::Pendiente.as_str())
        .bind(now)
        .execute(&mut *conn)
        .await?;
        created += result.rows_affected();
    }
    Ok(created)
}

#[derive(Debug, Clone)]
pub struct FieldReviewUpsert<'a> {
    pub request_id: i64,
    pub stage: ReviewStage,
    pub field_key: &'a str,
    pub status: FieldStatus,
    pub comment: Option<&'a str>,
    pub reviewer_id: i64,
    pub now: DateTime<Utc>,
}

pub async fn upsert(
    conn: &mut SqliteConnection,
    review: FieldReviewUpsert<'_>,
) -> Result<FieldReview, sqlx::Error> {
    let row = sqlx::query(
        r#"
        INSERT INTO field_reviews (request_id, stage, field_key, status, comment, reviewer_id, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        ON CONFLICT (request_id, stage, field_key) DO UPDATE SET
            status = excluded.status,
            comment = excluded.comment,
            reviewer_id = excluded.reviewer_id,
            updated_at = excluded.updated_at
        RETURNING id, request_id, stage, field_key, status, comment, reviewer_id, updated_at
        "#,
    )
    .bind(review.request_id)
    .bind(review.stage.as_str())
    .bind(review.field_key)
    .bind(review.status.as_str())
    .bind(review.comment)
    .bind(review.reviewer_id)
    .bind(review.now)
    .fetch_one(&mut *conn)
    .await?;

    map_row(&row)
}

pub async fn list(
    conn: &mut SqliteConnection,
    request_id: i64,
    stage: Option<ReviewStage>,
) -> Result<Vec<FieldReview>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT id, request_id, stage, field_key, status, comment, reviewer_id, updated_at
        FROM field_reviews
        WHERE request_id = ?1 AND (?2 IS NULL OR stage = ?2)
        ORDER BY stage ASC, field_key ASC
        "#,
    )
    .bind(request_id)
    .bind(stage.map(|s| s.as_str()))
    .fetch_all(&mut *conn)
    .await?;

    rows.iter().map(map_row).collect()
}

/// Sends observed fields back to `PENDIENTE` so the reviewer re-checks the correction.
pub async fn reset_observed(
    conn: &mut SqliteConnection,
    request_id: i64,
    stage: ReviewStage,
    now: DateTime<Utc>,
) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE field_reviews
        SET status = ?1, updated_at = ?2
        WHERE request_id = ?3 AND stage = ?4 AND status = ?5
        "#,
    )
    .bind(FieldStatus::Pendiente.as_str())
    .bind(now)
    .bind(request_id)
    .bind(stage.as_str())
    .bind(FieldStatus::Observado.as_str())
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected())
}

pub async fn delete(conn: &mut SqliteConnection, id: i64) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM field_reviews WHERE id = ?1")
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}
