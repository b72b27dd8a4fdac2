//! Route handlers, one module per resource.

pub(crate) mod auth;
pub(crate) mod certificates;
pub(crate) mod employees;
pub(crate) mod files;
pub(crate) mod health;
pub(crate) mod requests;
pub(crate) mod services;

use axum::response::IntoResponse;

use crate::domain::{Actor, Role};
use crate::errors::{AppError, AppResult};

/// Fallback handler for unmatched routes.
pub(crate) async fn handle_not_found() -> impl IntoResponse {
    AppError::not_found("not found")
}

pub(crate) fn require_employee(actor: Actor) -> AppResult<()> {
    if !actor.role.is_employee() {
        return Err(AppError::forbidden("staff only"));
    }
    Ok(())
}

pub(crate) fn require_admin(actor: Actor) -> AppResult<()> {
    if actor.role != Role::Admin {
        return Err(AppError::forbidden("administrators only"));
    }
    Ok(())
}
