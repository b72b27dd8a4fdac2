//! `/api/solicitudes` routes.

use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Extension;
use serde::Deserialize;

use super::require_employee;
use crate::api::extract::{Json, Path, Query};
use crate::api::response::{created, ok};
use crate::api::state::AppState;
use crate::domain::{Actor, RequestState, ReviewStage};
use crate::errors::AppResult;
use crate::workflow::{FieldReviewInput, NewRequestInput, OpenOutcome};

#[derive(Debug, Deserialize)]
pub(crate) struct ListQuery {
    estado: Option<RequestState>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CorrectionBody {
    answers: serde_json::Value,
}

#[derive(Debug, Deserialize)]
pub(crate) struct TransitionBody {
    state: RequestState,
    #[serde(default)]
    reason: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StageQuery {
    etapa: Option<ReviewStage>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FieldReviewBatch {
    reviews: Vec<FieldReviewInput>,
}

/// GET /api/solicitudes
pub(crate) async fn handle_list(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Query(query): Query<ListQuery>,
) -> AppResult<impl IntoResponse> {
    let requests = state.engine.list(actor, query.estado).await?;
    Ok(ok(requests))
}

/// POST /api/solicitudes
pub(crate) async fn handle_create(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Json(input): Json<NewRequestInput>,
) -> AppResult<impl IntoResponse> {
    let request = state.wizard.create(actor, input).await?;
    Ok(created(request))
}

/// GET /api/solicitudes/{id}
///
/// Staff opening a request may take it into review; applicants just view it.
pub(crate) async fn handle_get(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    let outcome = if actor.role.is_employee() {
        state.engine.open(id, actor).await?
    } else {
        OpenOutcome {
            detail: state.engine.detail(id, actor).await?,
            auto_transition: None,
            warning: None,
        }
    };
    Ok(ok(outcome))
}

/// PUT /api/solicitudes/{id}
pub(crate) async fn handle_correct(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i64>,
    Json(body): Json<CorrectionBody>,
) -> AppResult<impl IntoResponse> {
    let outcome = state.wizard.correct(actor, id, body.answers).await?;
    Ok(ok(outcome))
}

/// POST /api/solicitudes/{id}/estado
pub(crate) async fn handle_transition(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i64>,
    Json(body): Json<TransitionBody>,
) -> AppResult<impl IntoResponse> {
    require_employee(actor)?;
    let outcome = state
        .engine
        .transition(id, body.state, actor, &body.reason)
        .await?;
    Ok(ok(outcome))
}

/// GET /api/solicitudes/{id}/historial
pub(crate) async fn handle_history(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    let history = state.engine.history(id, actor).await?;
    Ok(ok(history))
}

/// GET /api/solicitudes/{id}/revision-campos
pub(crate) async fn handle_field_reviews(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i64>,
    Query(query): Query<StageQuery>,
) -> AppResult<impl IntoResponse> {
    let reviews = state.reviews.field_reviews(id, query.etapa, actor).await?;
    Ok(ok(reviews))
}

/// PUT /api/solicitudes/{id}/revision-campos
pub(crate) async fn handle_record_field_reviews(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i64>,
    Json(body): Json<FieldReviewBatch>,
) -> AppResult<impl IntoResponse> {
    let recorded = state
        .reviews
        .record_field_reviews(id, body.reviews, actor)
        .await?;
    Ok(ok(recorded))
}

/// GET /api/solicitudes/{id}/archivos
pub(crate) async fn handle_files(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    let files = state.documents.list(actor, id).await?;
    Ok(ok(files))
}

/// GET /api/solicitudes/{id}/certificado
pub(crate) async fn handle_certificate(
    State(state): State<Arc<AppState>>,
    Extension(actor): Extension<Actor>,
    Path(id): Path<i64>,
) -> AppResult<impl IntoResponse> {
    let certificate = state.engine.certificate_for_request(id, actor).await?;
    Ok(ok(certificate))
}
