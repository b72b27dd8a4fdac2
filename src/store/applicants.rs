use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use crate::domain::Applicant;

const SELECT_APPLICANT: &str = r#"
    SELECT id, full_name, email, document_id, phone, password_hash, created_at
    FROM applicants
"#;

fn map_row(row: &SqliteRow) -> Result<Applicant, sqlx::Error> {
    Ok(Applicant {
        id: row.try_get("id")?,
        full_name: row.try_get("full_name")?,
        email: row.try_get("email")?,
        document_id: row.try_get("document_id")?,
        phone: row.try_get("phone")?,
        password_hash: row.try_get("password_hash")?,
        created_at: row.try_get("created_at")?,
    })
}

#[derive(Debug, Clone)]
pub struct NewApplicant<'a> {
    pub full_name: &'a str,
    pub email: &'a str,
    pub document_id: &'a str,
    pub phone: Option<&'a str>,
    pub password_hash: &'a str,
    pub now: DateTime<Utc>,
}

pub async fn insert(conn: &mut SqliteConnection, new: NewApplicant<'_>) -> Result<Applicant, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO applicants (full_name, email, document_id, phone, password_hash, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6)
        "#,
    )
    .bind(new.full_name)
    .bind(new.email)
    .bind(new.document_id)
    .bind(new.phone)
    .bind(new.password_hash)
    .bind(new.now)
    .execute(&mut *conn)
    .await?;

    Ok(Applicant {
        id: result.last_insert_rowid(),
        full_name: new.full_name.to_string(),
        email: new.email.to_string(),
        document_id: new.document_id.to_string(),
        phone: new.phone.map(str::to_string),
        password_hash: new.password_hash.to_string(),
        created_at: new.now,
    })
}

pub async fn fetch(conn: &mut SqliteConnection, id: i64) -> Result<Option<Applicant>, sqlx::Error> {
    let row = sqlx::query(&format!("{SELECT_APPLICANT} WHERE id = ?1"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    row.as_ref().map(map_row).transpose()
}

pub async fn fetch_by_email(
    conn: &mut SqliteConnection,
    email: &str,
) -> Result<Option<Applicant>, sqlx::Error> {
    let row = sqlx::query(&format!("{SELECT_APPLICANT} WHERE email = ?1"))
        .bind(email)
        .fetch_optional(&mut *conn)
        .await?;

    row.as_ref().map(map_row).transpose()
}
