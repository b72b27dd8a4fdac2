use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Row, Sqlite, SqliteConnection};

use super::{decode, decode_json};
use crate::domain::{ProcedureType, Request, RequestState};

const SELECT_REQUEST: &str = r#"
    SELECT id, applicant_id, service_id, procedure_type, state, answers, amount,
           prior_permit, created_at, updated_at
    FROM requests
"#;

#[derive(Debug, Clone)]
pub struct NewRequest<'a> {
    pub applicant_id: i64,
    pub service_id: i64,
    pub procedure_type: ProcedureType,
    pub state: RequestState,
    pub answers: &'a serde_json::Value,
    pub amount: Decimal,
    pub prior_permit: Option<&'a str>,
    pub now: DateTime<Utc>,
}

fn map_row(row: &SqliteRow) -> Result<Request, sqlx::Error> {
    let procedure_type: String = row.try_get("procedure_type")?;
    let state: String = row.try_get("state")?;
    let answers: String = row.try_get("answers")?;
    let amount: String = row.try_get("amount")?;
    Ok(Request {
        id: row.try_get("id")?,
        applicant_id: row.try_get("applicant_id")?,
        service_id: row.try_get("service_id")?,
        procedure_type: decode("procedure_type", &procedure_type)?,
        state: decode("state", &state)?,
        answers: decode_json(&answers)?,
        amount: decode::<Decimal>("amount", &amount)?,
        prior_permit: row.try_get("prior_permit")?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

pub async fn insert(conn: &mut SqliteConnection, new: NewRequest<'_>) -> Result<i64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO requests (applicant_id, service_id, procedure_type, state, answers, amount,
                              prior_permit, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
        "#,
    )
    .bind(new.applicant_id)
    .bind(new.service_id)
    .bind(new.procedure_type.as_str())
    .bind(new.state.as_str())
    .bind(new.answers.to_string())
    .bind(new.amount.to_string())
    .bind(new.prior_permit)
    .bind(new.now)
    .execute(&mut *conn)
    .await?;

    Ok(result.last_insert_rowid())
}

pub async fn fetch(conn: &mut SqliteConnection, id: i64) -> Result<Option<Request>, sqlx::Error> {
    let row = sqlx::query(&format!("{SELECT_REQUEST} WHERE id = ?1"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    row.as_ref().map(map_row).transpose()
}

pub async fn update_state(
    conn: &mut SqliteConnection,
    id: i64,
    state: RequestState,
    now: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE requests SET state = ?1, updated_at = ?2 WHERE id = ?3")
        .bind(state.as_str())
        .bind(now)
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub async fn update_answers(
    conn: &mut SqliteConnection,
    id: i64,
    answers: &serde_json::Value,
    now: DateTime<Utc>,
) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE requests SET answers = ?1, updated_at = ?2 WHERE id = ?3")
        .bind(answers.to_string())
        .bind(now)
        .bind(id)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

pub async fn list_by_applicant(
    conn: &mut SqliteConnection,
    applicant_id: i64,
) -> Result<Vec<Request>, sqlx::Error> {
    let rows = sqlx::query(&format!(
        "{SELECT_REQUEST} WHERE applicant_id = ?1 ORDER BY created_at DESC, id DESC"
    ))
    .bind(applicant_id)
    .fetch_all(&mut *conn)
    .await?;

    rows.iter().map(map_row).collect()
}

/// Oldest first, so inboxes are worked in arrival order.
pub async fn list_by_states(
    conn: &mut SqliteConnection,
    states: &[RequestState],
) -> Result<Vec<Request>, sqlx::Error> {
    if states.is_empty() {
        return Ok(Vec::new());
    }

    let mut builder: QueryBuilder<Sqlite> = QueryBuilder::new(SELECT_REQUEST);
    builder.push(" WHERE state IN (");
    let mut separated = builder.separated(", ");
    for state in states {
        separated.push_bind(state.as_str());
    }
    separated.push_unseparated(") ORDER BY updated_at ASC, id ASC");

    let rows = builder.build().fetch_all(&mut *conn).await?;
    rows.iter().map(map_row).collect()
}
