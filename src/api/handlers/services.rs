//! Service catalog.

use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Extension;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::info;

use super::require_admin;
use crate::api::extract::{Json, Path};
use crate::api::response::{created, ok};
use crate::api::state::AppState;
use crate::domain::Actor;
use crate::errors::{AppError, AppResult};
use crate::store::{
    self,
    services::{NewService, ServiceChanges},
};

const DUPLICATE_CODE: &str = "a service with this code already exists";

#[derive(Debug, Deserialize)]
pub(crate) struct CreateServiceBody {
    code: String,
    name: String,
    description: Option<String>,
    price: Decimal,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UpdateServiceBody {
    code: Option<String>,
    name: Option<String>,
    description: Option<String>,
    price: Option<Decimal>,
    active: Option<bool>,
}

fn check_price(price: Decimal) -> AppResult<()> {
    if price.is_sign_negative() {
        return Err(AppError::validation("price cannot be negative"));
    }
    Ok(())
}

/// GET /api/servicios
pub(crate) async fn handle_list(State(state): State<Arc<AppState>>) -> AppResult<impl IntoResponse> {
    let mut conn = state.pool.acquire().await?;
    Ok(ok(store::services::list(&mut conn, false).await?))
}

/// POST /api/servicios
pub(crate) async fn handle_create(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Json(body): Json<CreateServiceBody>,
) -> AppResult<impl IntoResponse> {
    require_admin(actor)?;
    let code = body.code.trim();
    let name = body.name.trim();
    if code.is_empty() || name.is_empty() {
        return Err(AppError::validation("code and name are required"));
    }
    check_price(body.price)?;

    let mut conn = state.pool.acquire().await?;
    let service = store::services::insert(
        &mut conn,
        NewService {
            code,
            name,
            description: body.description.as_deref(),
            price: body.price,
        },
    )
    .await
    .map_err(|e| AppError::from_unique_violation(e, DUPLICATE_CODE))?;

    info!(service_id = service.id, code = %service.code, "Service created");
    Ok(created(service))
}

/// PUT /api/servicios/{id}
pub(crate) async fn handle_update(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateServiceBody>,
) -> AppResult<impl IntoResponse> {
    require_admin(actor)?;
    if let Some(price) = body.price {
        check_price(price)?;
    }

    let mut conn = state.pool.acquire().await?;
    let updated = store::services::update(
        &mut conn,
        id,
        ServiceChanges {
            code: body.code.as_deref().map(str::trim).filter(|c| !c.is_empty()),
            name: body.name.as_deref().map(str::trim).filter(|n| !n.is_empty()),
            description: body.description.as_deref(),
            price: body.price,
            active: body.active,
        },
    )
    .await
    .map_err(|e| AppError::from_unique_violation(e, DUPLICATE_CODE))?;
    if !updated {
        return Err(AppError::not_found(format!("service {id} not found")));
    }

    let service = store::services::fetch(&mut conn, id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("service {id} not found")))?;
    Ok(ok(service))
}

/// DELETE /api/servicios/{id}
///
/// Deactivates; existing requests keep their service.
pub(crate) async fn handle_deactivate(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    require_admin(actor)?;
    let mut conn = state.pool.acquire().await?;
    let updated = store::services::update(
        &mut conn,
        id,
        ServiceChanges {
            active: Some(false),
            ..Default::default()
        },
    )
    .await?;
    if !updated {
        return Err(AppError::not_found(format!("service {id} not found")));
    }

    info!(service_id = id, "Service deactivated");
    Ok(ok(serde_json::json!({ "id": id, "active": false })))
}
