use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Extension;

use crate::api::extract::Path;
use crate::api::response::ok;
use crate::api::state::AppState;
use crate::domain::Actor;
use crate::errors::AppResult;

/// GET /api/certificados
pub(crate) async fn handle_list(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
) -> AppResult<impl IntoResponse> {
    Ok(ok(state.engine.certificates(actor).await?))
}

/// GET /api/certificados/{id}
pub(crate) async fn handle_get(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    Ok(ok(state.engine.certificate(id, actor).await?))
}
