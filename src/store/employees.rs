use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use super::decode;
use crate::domain::{Employee, Role};

const SELECT_EMPLOYEE: &str = r#"
    SELECT id, full_name, email, password_hash, role, active, created_at
    FROM employees
"#;

fn map_row(row: &SqliteRow) -> Result<Employee, sqlx::Error> {
    let role: String = row.try_get("role")?;
    Ok(Employee {
        id: row.try_get("id")?,
        full_name: row.try_get("full_name")?,
        email: row.try_get("email")?,
        password_hash: row.try_get("password_hash")?,
        role: decode("role", &role)?,
        active: row.try_get("active")?,
        created_at: row.try_get("created_at")?,
    })
}

#[derive(Debug, Clone)]
pub struct NewEmployee<'a> {
    pub full_name: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub role: Role,
    pub now: DateTime<Utc>,
}

pub async fn insert(conn: &mut SqliteConnection, new: NewEmployee<'_>) -> Result<i64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        INSERT INTO employees (full_name, email, password_hash, role, active, created_at)
        VALUES (?1, ?2, ?3, ?4, 1, ?5)
        "#,
    )
    .bind(new.full_name)
    .bind(new.email)
    .bind(new.password_hash)
    .bind(new.role.as_str())
    .bind(new.now)
    .execute(&mut *conn)
    .await?;

    Ok(result.last_insert_rowid())
}

/// Creates the account or, when the email exists, resets its name, password and role.
pub async fn upsert_by_email(
    conn: &mut SqliteConnection,
    new: NewEmployee<'_>,
) -> Result<i64, sqlx::Error> {
    let id: i64 = sqlx::query_scalar(
        r#"
        INSERT INTO employees (full_name, email, password_hash, role, active, created_at)
        VALUES (?1, ?2, ?3, ?4, 1, ?5)
        ON CONFLICT (email) DO UPDATE SET
            full_name = excluded.full_name,
            password_hash = excluded.password_hash,
            role = excluded.role,
            active = 1
        RETURNING id
        "#,
    )
    .bind(new.full_name)
    .bind(new.email)
    .bind(new.password_hash)
    .bind(new.role.as_str())
    .bind(new.now)
    .fetch_one(&mut *conn)
    .await?;

    Ok(id)
}

pub async fn fetch(conn: &mut SqliteConnection, id: i64) -> Result<Option<Employee>, sqlx::Error> {
    let row = sqlx::query(&format!("{SELECT_EMPLOYEE} WHERE id = ?1"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    row.as_ref().map(map_row).transpose()
}

pub async fn fetch_by_email(
    conn: &mut SqliteConnection,
    email: &str,
) -> Result<Option<Employee>, sqlx::Error> {
    let row = sqlx::query(&format!("{SELECT_EMPLOYEE} WHERE email = ?1"))
        .bind(email)
        .fetch_optional(&mut *conn)
        .await?;

    row.as_ref().map(map_row).transpose()
}

pub async fn list(conn: &mut SqliteConnection) -> Result<Vec<Employee>, sqlx::Error> {
    let rows = sqlx::query(&format!("{SELECT_EMPLOYEE} ORDER BY full_name ASC, id ASC"))
        .fetch_all(&mut *conn)
        .await?;

    rows.iter().map(map_row).collect()
}

#[derive(Debug, Clone, Default)]
pub struct EmployeeChanges<'a> {
    pub full_name: Option<&'a str>,
    pub email: Option<&'a str>,
    pub password_hash: Option<&'a str>,
    pub role: Option<Role>,
    pub active: Option<bool>,
}

/// Applies the present fields; returns false when no row matched.
pub async fn update(
    conn: &mut SqliteConnection,
    id: i64,
    changes: EmployeeChanges<'_>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE employees SET
            full_name = COALESCE(?1, full_name),
            email = COALESCE(?2, email),
            password_hash = COALESCE(?3, password_hash),
            role = COALESCE(?4, role),
            active = COALESCE(?5, active)
        WHERE id = ?6
        "#,
    )
    .bind(changes.full_name)
    .bind(changes.email)
    .bind(changes.password_hash)
    .bind(changes.role.map(|r| r.as_str()))
    .bind(changes.active)
    .bind(id)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() > 0)
}
