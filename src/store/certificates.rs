use chrono::{DateTime, Datelike, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use crate::domain::Certificate;

const SELECT_CERTIFICATE: &str = r#"
    SELECT c.id, c.request_id, c.resolution_number, c.issued_at, c.issued_by
    FROM certificates c
"#;

fn map_row(row: &SqliteRow) -> Result<Certificate, sqlx::Error> {
    Ok(Certificate {
        id: row.try_get("id")?,
        request_id: row.try_get("request_id")?,
        resolution_number: row.try_get("resolution_number")?,
        issued_at: row.try_get("issued_at")?,
        issued_by: row.try_get("issued_by")?,
    })
}

/// Next resolution number of the issuing year: `DNCD-2026-000001`.
pub async fn next_resolution_number(
    conn: &mut SqliteConnection,
    now: DateTime<Utc>,
) -> Result<String, sqlx::Error> {
    let prefix = format!("DNCD-{}-", now.year());
    let issued: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM certificates WHERE resolution_number LIKE ?1 || '%'",
    )
    .bind(&prefix)
    .fetch_one(&mut *conn)
    .await?;

    Ok(format!("{prefix}{:06}", issued + 1))
}

pub async fn insert(
    conn: &mut SqliteConnection,
    request_id: i64,
    resolution_number: &str,
    issued_by: i64,
    now: DateTime<Utc>,
) -> Result<Certificate, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO certificates (request_id, resolution_number, issued_at, issued_by)
        VALUES (?1, ?2, ?3, ?4)
        "#,
    )
    .bind(request_id)
    .bind(resolution_number)
    .bind(now)
    .bind(issued_by)
    .execute(&mut *conn)
    .await?;

    Ok(Certificate {
        id: result.last_insert_rowid(),
        request_id,
        resolution_number: resolution_number.to_string(),
        issued_at: now,
        issued_by,
    })
}

pub async fn fetch(conn: &mut SqliteConnection, id: i64) -> Result<Option<Certificate>, sqlx::Error> {
    let row = sqlx::query(&format!("{SELECT_CERTIFICATE} WHERE c.id = ?1"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    row.as_ref().map(map_row).transpose()
}

pub async fn fetch_by_request(
    conn: &mut SqliteConnection,
    request_id: i64,
) -> Result<Option<Certificate>, sqlx::Error> {
    let row = sqlx::query(&format!("{SELECT_CERTIFICATE} WHERE c.request_id = ?1"))
        .bind(request_id)
        .fetch_optional(&mut *conn)
        .await?;

    row.as_ref().map(map_row).transpose()
}

/// All certificates, or only those of one applicant's requests.
pub async fn list(
    conn: &mut SqliteConnection,
    applicant_id: Option<i64>,
) -> Result<Vec<Certificate>, sqlx::Error> {
    let rows = sqlx::query(&format!(
        r#"{SELECT_CERTIFICATE}
        JOIN requests r ON r.id = c.request_id
        WHERE (?1 IS NULL OR r.applicant_id = ?1)
        ORDER BY c.issued_at DESC, c.id DESC"#
    ))
    .bind(applicant_id)
    .fetch_all(&mut *conn)
    .await?;

    rows.iter().map(map_row).collect()
}
