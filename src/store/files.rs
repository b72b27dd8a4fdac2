use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use super::decode;
use crate::domain::{FileRecord, FileStatus};

const SELECT_FILE: &str = r#"
    SELECT id, request_id, document_type, original_name, content_type, size_bytes,
           storage_key, status, comment, uploaded_at, reviewed_at
    FROM files
"#;

fn map_row(row: &SqliteRow) -> Result<FileRecord, sqlx::Error> {
    let status: String = row.try_get("status")?;
    Ok(FileRecord {
        id: row.try_get("id")?,
        request_id: row.try_get("request_id")?,
        document_type: row.try_get("document_type")?,
        original_name: row.try_get("original_name")?,
        content_type: row.try_get("content_type")?,
        size_bytes: row.try_get("size_bytes")?,
        storage_key: row.try_get("storage_key")?,
        status: decode("status", &status)?,
        comment: row.try_get("comment")?,
        uploaded_at: row.try_get("uploaded_at")?,
        reviewed_at: row.try_get("reviewed_at")?,
    })
}

#[derive(Debug, Clone)]
pub struct NewFile<'a> {
    pub request_id: i64,
    pub document_type: &'a str,
    pub original_name: &'a str,
    pub content_type: &'a str,
    pub size_bytes: i64,
    pub storage_key: &'a str,
    pub now: DateTime<Utc>,
}

/// Removes the file of the same document type, if any, returning it so its bytes can be dropped.
pub async fn take_existing(
    conn: &mut SqliteConnection,
    request_id: i64,
    document_type: &str,
) -> Result<Option<FileRecord>, sqlx::Error> {
    let row = sqlx::query(&format!(
        "{SELECT_FILE} WHERE request_id = ?1 AND document_type = ?2"
    ))
    .bind(request_id)
    .bind(document_type)
    .fetch_optional(&mut *conn)
    .await?;

    let Some(existing) = row.as_ref().map(map_row).transpose()? else {
        return Ok(None);
    };

    sqlx::query("DELETE FROM files WHERE id = ?1")
        .bind(existing.id)
        .execute(&mut *conn)
        .await?;

    Ok(Some(existing))
}

pub async fn insert(conn: &mut SqliteConnection, new: NewFile<'_>) -> Result<FileRecord, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO files (request_id, document_type, original_name, content_type, size_bytes,
                           storage_key, status, uploaded_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(new.request_id)
    .bind(new.document_type)
    .bind(new.original_name)
    .bind(new.content_type)
    .bind(new.size_bytes)
    .bind(new.storage_key)
    .bind(FileStatus::PendienteRevision.as_str())
    .bind(new.now)
    .execute(&mut *conn)
    .await?;

    Ok(FileRecord {
        id: result.last_insert_rowid(),
        request_id: new.request_id,
        document_type: new.document_type.to_string(),
        original_name: new.original_name.to_string(),
        content_type: new.content_type.to_string(),
        size_bytes: new.size_bytes,
        storage_key: new.storage_key.to_string(),
        status: FileStatus::PendienteRevision,
        comment: None,
        uploaded_at: new.now,
        reviewed_at: None,
    })
}

pub async fn fetch(conn: &mut SqliteConnection, id: i64) -> Result<Option<FileRecord>, sqlx::Error> {
    let row = sqlx::query(&format!("{SELECT_FILE} WHERE id = ?1"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    row.as_ref().map(map_row).transpose()
}

pub async fn list_for_request(
    conn: &mut SqliteConnection,
    request_id: i64,
) -> Result<Vec<FileRecord>, sqlx::Error> {
    let rows = sqlx::query(&format!(
        "{SELECT_FILE} WHERE request_id = ?1 ORDER BY document_type ASC"
    ))
    .bind(request_id)
    .fetch_all(&mut *conn)
    .await?;

    rows.iter().map(map_row).collect()
}

pub async fn set_status(
    conn: &mut SqliteConnection,
    id: i64,
    status: FileStatus,
    comment: Option<&str>,
    now: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE files SET status = ?1, comment = ?2, reviewed_at = ?3 WHERE id = ?4")
        .bind(status.as_str())
        .bind(comment)
        .bind(now)
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}
