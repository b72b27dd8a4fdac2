//! Registration, login and the current session.

use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Extension;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::extract::Json;
use crate::api::response::{created, ok};
use crate::api::state::AppState;
use crate::auth::{hash_password_async, verify_password_async, Claims};
use crate::domain::Role;
use crate::errors::{AppError, AppResult};
use crate::store::{self, applicants::NewApplicant};
use crate::validation::{is_valid_document_id, is_valid_email, normalize_email};

pub(crate) const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct RegisterBody {
    full_name: String,
    email: String,
    document_id: String,
    phone: Option<String>,
    password: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct LoginBody {
    email: String,
    password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct SessionUser {
    id: i64,
    full_name: String,
    email: String,
    role: Role,
}

#[derive(Debug, Serialize)]
pub(crate) struct Session {
    token: String,
    user: SessionUser,
}

fn invalid_credentials() -> AppError {
    AppError::Unauthorized("invalid email or password".to_string())
}

fn session(state: &AppState, user: SessionUser) -> AppResult<Session> {
    let token = state.tokens.issue(user.id, user.role, &user.full_name)?;
    Ok(Session { token, user })
}

/// POST /api/auth/registro-solicitante
pub(crate) async fn handle_register(
    State(state): State<Arc<AppState>>,
    Json(body): Json<RegisterBody>,
) -> AppResult<impl IntoResponse> {
    let email = normalize_email(&body.email);
    let full_name = body.full_name.trim();
    let document_id = body.document_id.trim();
    if full_name.is_empty() {
        return Err(AppError::validation("full name is required"));
    }
    if !is_valid_email(&email) {
        return Err(AppError::validation("invalid email address"));
    }
    if !is_valid_document_id(document_id) {
        return Err(AppError::validation("invalid cédula or RNC"));
    }
    if body.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AppError::validation(format!(
            "password must have at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    let password_hash = hash_password_async(body.password.clone()).await?;
    let mut conn = state.pool.acquire().await?;
    let applicant = store::applicants::insert(
        &mut conn,
        NewApplicant {
            full_name,
            email: &email,
            document_id,
            phone: body.phone.as_deref().map(str::trim).filter(|p| !p.is_empty()),
            password_hash: &password_hash,
            now: Utc::now(),
        },
    )
    .await
    .map_err(|e| AppError::from_unique_violation(e, "an account with this email already exists"))?;

    info!(applicant_id = applicant.id, "Applicant registered");
    let session = session(
        &state,
        SessionUser {
            id: applicant.id,
            full_name: applicant.full_name,
            email: applicant.email,
            role: Role::Solicitante,
        },
    )?;
    Ok(created(session))
}

/// POST /api/auth/login-solicitante
pub(crate) async fn handle_login_applicant(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LoginBody>,
) -> AppResult<impl IntoResponse> {
    let applicant = {
        let mut conn = state.pool.acquire().await?;
        store::applicants::fetch_by_email(&mut conn, &normalize_email(&body.email)).await?
    }
    .ok_or_else(invalid_credentials)?;
    if !verify_password_async(body.password, applicant.password_hash.clone()).await? {
        return Err(invalid_credentials());
    }

    info!(applicant_id = applicant.id, "Applicant logged in");
    let session = session(
        &state,
        SessionUser {
            id: applicant.id,
            full_name: applicant.full_name,
            email: applicant.email,
            role: Role::Solicitante,
        },
    )?;
    Ok(ok(session))
}

/// POST /api/auth/login-empleado
pub(crate) async fn handle_login_employee(
    State(state): State<Arc<AppState>>,
    Json(body): Json<LoginBody>,
) -> AppResult<impl IntoResponse> {
    let employee = {
        let mut conn = state.pool.acquire().await?;
        store::employees::fetch_by_email(&mut conn, &normalize_email(&body.email)).await?
    }
    .filter(|e| e.active)
    .ok_or_else(invalid_credentials)?;
    if !verify_password_async(body.password, employee.password_hash.clone()).await? {
        return Err(invalid_credentials());
    }

    info!(employee_id = employee.id, role = %employee.role, "Employee logged in");
    let session = session(
        &state,
        SessionUser {
            id: employee.id,
            full_name: employee.full_name,
            email: employee.email,
            role: employee.role,
        },
    )?;
    Ok(ok(session))
}

/// GET /api/auth/me
pub(crate) async fn handle_me(
    State(state): State<Arc<AppState>>,
    Extension(claims): Extension<Claims>,
) -> AppResult<impl IntoResponse> {
    let mut conn = state.pool.acquire().await?;
    let user = if claims.role == Role::Solicitante {
        store::applicants::fetch(&mut conn, claims.sub)
            .await?
            .map(|a| SessionUser {
                id: a.id,
                full_name: a.full_name,
                email: a.email,
                role: Role::Solicitante,
            })
    } else {
        store::employees::fetch(&mut conn, claims.sub)
            .await?
            .filter(|e| e.active)
            .map(|e| SessionUser {
                id: e.id,
                full_name: e.full_name,
                email: e.email,
                role: e.role,
            })
    };

    user.map(ok)
        .ok_or_else(|| AppError::Unauthorized("account no longer exists".to_string()))
}
