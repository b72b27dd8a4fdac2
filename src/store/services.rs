use rust_decimal::Decimal;
use sqlx::sqlite::SqliteRow;
use sqlx::{Row, SqliteConnection};

use super::decode;
use crate::domain::Service;

const SELECT_SERVICE: &str = r#"
    SELECT id, code, name, description, price, active
    FROM services
"#;

fn map_row(row: &SqliteRow) -> Result<Service, sqlx::Error> {
    let price: String = row.try_get("price")?;
    Ok(Service {
        id: row.try_get("id")?,
        code: row.try_get("code")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        price: decode::<Decimal>("price", &price)?,
        active: row.try_get("active")?,
    })
}

#[derive(Debug, Clone)]
pub struct NewService<'a> {
    pub code: &'a str,
    pub name: &'a str,
    pub description: Option<&'a str>,
    pub price: Decimal,
}

pub async fn insert(conn: &mut SqliteConnection, new: NewService<'_>) -> Result<Service, sqlx::Error> {
    let result = sqlx::query(
        "INSERT INTO services (code, name, description, price, active) VALUES (?1, ?2, ?3, ?4, 1)",
    )
    .bind(new.code)
    .bind(new.name)
    .bind(new.description)
    .bind(new.price.to_string())
    .execute(&mut *conn)
    .await?;

    Ok(Service {
        id: result.last_insert_rowid(),
        code: new.code.to_string(),
        name: new.name.to_string(),
        description: new.description.map(str::to_string),
        price: new.price,
        active: true,
    })
}

pub async fn fetch(conn: &mut SqliteConnection, id: i64) -> Result<Option<Service>, sqlx::Error> {
    let row = sqlx::query(&format!("{SELECT_SERVICE} WHERE id = ?1"))
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?;

    row.as_ref().map(map_row).transpose()
}

pub async fn list(
    conn: &mut SqliteConnection,
    include_inactive: bool,
) -> Result<Vec<Service>, sqlx::Error> {
    let rows = sqlx::query(&format!(
        "{SELECT_SERVICE} WHERE (?1 OR active = 1) ORDER BY name ASC, id ASC"
    ))
    .bind(include_inactive)
    .fetch_all(&mut *conn)
    .await?;

    rows.iter().map(map_row).collect()
}

#[derive(Debug, Clone, Default)]
pub struct ServiceChanges<'a> {
    pub code: Option<&'a str>,
    pub name: Option<&'a str>,
    pub description: Option<&'a str>,
    pub price: Option<Decimal>,
    pub active: Option<bool>,
}

pub async fn update(
    conn: &mut SqliteConnection,
    id: i64,
    changes: ServiceChanges<'_>,
) -> Result<bool, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE services SET
            code = COALESCE(?1, code),
            name = COALESCE(?2, name),
            description = COALESCE(?3, description),
            price = COALESCE(?4, price),
            active = COALESCE(?5, active)
        WHERE id = ?6
        "#,
    )
    .bind(changes.code)
    .bind(changes.name)
    .bind(changes.description)
    .bind(changes.price.map(|p| p.to_string()))
    .bind(changes.active)
    .bind(id)
    .execute(&mut *conn)
    .await?;

    Ok(result.rows_affected() > 0)
}
