//! Staff account administration.

use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Extension;
use chrono::Utc;
use serde::Deserialize;
use tracing::info;

use super::auth::MIN_PASSWORD_LEN;
use super::require_admin;
use crate::api::extract::{Json, Path};
use crate::api::response::{created, ok};
use crate::api::state::AppState;
use crate::auth::hash_password_async;
use crate::domain::{Actor, Role};
use crate::errors::{AppError, AppResult};
use crate::store::{
    self,
    employees::{EmployeeChanges, NewEmployee},
};
use crate::validation::{is_valid_email, normalize_email};

const DUPLICATE_EMAIL: &str = "an employee with this email already exists";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CreateEmployeeBody {
    full_name: String,
    email: String,
    password: String,
    role: Role,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct UpdateEmployeeBody {
    full_name: Option<String>,
    email: Option<String>,
    password: Option<String>,
    role: Option<Role>,
    active: Option<bool>,
}

fn check_role(role: Role) -> AppResult<()> {
    if !role.is_employee() {
        return Err(AppError::validation(format!("{role} is not a staff role")));
    }
    Ok(())
}

fn check_password(password: &str) -> AppResult<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::validation(format!(
            "password must have at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

/// GET /api/empleados
pub(crate) async fn handle_list(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
) -> AppResult<impl IntoResponse> {
    require_admin(actor)?;
    let mut conn = state.pool.acquire().await?;
    Ok(ok(store::employees::list(&mut conn).await?))
}

/// POST /api/empleados
pub(crate) async fn handle_create(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Json(body): Json<CreateEmployeeBody>,
) -> AppResult<impl IntoResponse> {
    require_admin(actor)?;
    check_role(body.role)?;
    check_password(&body.password)?;
    let email = normalize_email(&body.email);
    if !is_valid_email(&email) {
        return Err(AppError::validation("invalid email address"));
    }
    let full_name = body.full_name.trim();
    if full_name.is_empty() {
        return Err(AppError::validation("full name is required"));
    }

    let password_hash = hash_password_async(body.password.clone()).await?;
    let mut conn = state.pool.acquire().await?;
    let id = store::employees::insert(
        &mut conn,
        NewEmployee {
            full_name,
            email: &email,
            password_hash: &password_hash,
            role: body.role,
            now: Utc::now(),
        },
    )
    .await
    .map_err(|e| AppError::from_unique_violation(e, DUPLICATE_EMAIL))?;

    let employee = store::employees::fetch(&mut conn, id)
        .await?
        .ok_or_else(|| AppError::Internal(format!("employee {id} vanished after insert")))?;
    info!(employee_id = id, role = %employee.role, admin_id = actor.id, "Employee created");
    Ok(created(employee))
}

/// GET /api/empleados/{id}
pub(crate) async fn handle_get(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    require_admin(actor)?;
    let mut conn = state.pool.acquire().await?;
    let employee = store::employees::fetch(&mut conn, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("employee {id} not found")))?;
    Ok(ok(employee))
}

/// PUT /api/empleados/{id}
pub(crate) async fn handle_update(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateEmployeeBody>,
) -> AppResult<impl IntoResponse> {
    require_admin(actor)?;
    if let Some(role) = body.role {
        check_role(role)?;
    }
    let email = body.email.as_deref().map(normalize_email);
    if let Some(email) = &email {
        if !is_valid_email(email) {
            return Err(AppError::validation("invalid email address"));
        }
    }
    let password_hash = match &body.password {
        Some(password) => {
            check_password(password)?;
            Some(hash_password_async(password.clone()).await?)
        }
        None => None,
    };

    let mut conn = state.pool.acquire().await?;
    let updated = store::employees::update(
        &mut conn,
        id,
        EmployeeChanges {
            full_name: body.full_name.as_deref().map(str::trim).filter(|n| !n.is_empty()),
            email: email.as_deref(),
            password_hash: password_hash.as_deref(),
            role: body.role,
            active: body.active,
        },
    )
    .await
    .map_err(|e| AppError::from_unique_violation(e, DUPLICATE_EMAIL))?;
    if !updated {
        return Err(AppError::not_found(format!("employee {id} not found")));
    }

    let employee = store::employees::fetch(&mut conn, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("employee {id} not found")))?;
    info!(employee_id = id, admin_id = actor.id, "Employee updated");
    Ok(ok(employee))
}

/// DELETE /api/empleados/{id}
///
/// Deactivates the account; history keeps pointing at it.
pub(crate) async fn handle_deactivate(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    require_admin(actor)?;
    if id == actor.id {
        return Err(AppError::validation("administrators cannot deactivate themselves"));
    }
    let mut conn = state.pool.acquire().await?;
    let updated = store::employees::update(
        &mut conn,
        id,
        EmployeeChanges {
            active: Some(false),
            ..Default::default()
        },
    )
    .await?;
    if !updated {
        return Err(AppError::not_found(format!("employee {id} not found")));
    }

    info!(employee_id = id, admin_id = actor.id, "Employee deactivated");
    Ok(ok(serde_json::json!({ "id": id, "active": false })))
}
