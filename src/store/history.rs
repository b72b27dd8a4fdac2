use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use super::decode;
use crate::domain::{HistoryEvent, RequestState, Role};

#[derive(Debug, Clone)]
pub struct NewHistoryEvent<'a> {
    pub request_id: i64,
    pub previous_state: Option<RequestState>,
    pub next_state: RequestState,
    pub actor_id: i64,
    pub actor_role: Role,
    pub reason: &'a str,
    pub now: DateTime<Utc>,
}

fn map_row(row: &SqliteRow) -> Result<HistoryEvent, sqlx::Error> {
    let previous: Option<String> = row.try_get("previous_state")?;
    let next: String = row.try_get("next_state")?;
    let role: String = row.try_get("actor_role")?;
    Ok(HistoryEvent {
        id: row.try_get("id")?,
        request_id: row.try_get("request_id")?,
        previous_state: previous
            .as_deref()
            .map(|s| decode("previous_state", s))
            .transpose()?,
        next_state: decode("next_state", &next)?,
        actor_id: row.try_get("actor_id")?,
        actor_role: decode("actor_role", &role)?,
        reason: row.try_get("reason")?,
        created_at: row.try_get("created_at")?,
    })
}

/// Appends one event. History rows are never updated or deleted.
pub async fn append(
    conn: &mut SqliteConnection,
    event: NewHistoryEvent<'_>,
) -> Result<HistoryEvent, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO history_events (request_id, previous_state, next_state, actor_id,
                                    actor_role, reason, created_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
        "#,
    )
    .bind(event.request_id)
    .bind(event.previous_state.map(|s| s.as_str()))
    .bind(event.next_state.as_str())
    .bind(event.actor_id)
    .bind(event.actor_role.as_str())
    .bind(event.reason)
    .bind(event.now)
    .execute(&mut *conn)
    .await?;

    Ok(HistoryEvent {
        id: result.last_insert_rowid(),
        request_id: event.request_id,
        previous_state: event.previous_state,
        next_state: event.next_state,
        actor_id: event.actor_id,
        actor_role: event.actor_role,
        reason: event.reason.to_string(),
        created_at: event.now,
    })
}

pub async fn list_for_request(
    conn: &mut SqliteConnection,
    request_id: i64,
) -> Result<Vec<HistoryEvent>, sqlx::Error> {
    let rows = sqlx::query(
        r#"
        SELECT id, request_id, previous_state, next_state, actor_id, actor_role, reason, created_at
        FROM history_events
        WHERE request_id = ?1
        ORDER BY id ASC
        "#,
    )
    .bind(request_id)
    .fetch_all(&mut *conn)
    .await?;

    rows.iter().map(map_row).collect()
}
