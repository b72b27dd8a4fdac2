//! Applies state transitions against the store.
//!
//! Every transition runs in one transaction: the request row is re-read, the
//! static table and the gates are checked against that fresh copy, then the new
//! state, the history event and (for issuance) the certificate are written
//! together.

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::{SqliteConnection, SqlitePool};
use std::sync::Arc;
use tracing::{info, warn, Instrument};

use super::gates::{self, GateContext};
use super::ensure_can_view;
use crate::domain::transitions::{self, Denial};
use crate::domain::{
    Actor, Certificate, FieldReview, FileRecord, HistoryEvent, Request, RequestState, Role,
};
use crate::database::begin_write;
use crate::errors::{AppError, AppResult};
use crate::observability::WorkflowMetrics;
use crate::store::{self, history::NewHistoryEvent};
use crate::telemetry::create_workflow_span;

/// Result of one applied transition.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionOutcome {
    pub request: Request,
    pub event: HistoryEvent,
    pub certificate: Option<Certificate>,
}

/// Everything the review screen shows for one request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestDetail {
    pub request: Request,
    pub history: Vec<HistoryEvent>,
    pub field_reviews: Vec<FieldReview>,
    pub files: Vec<FileRecord>,
    pub certificate: Option<Certificate>,
    /// Targets the viewer may choose from the current state.
    pub available_transitions: Vec<RequestState>,
}

/// Detail plus what happened when a reviewer opened the request.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenOutcome {
    #[serde(flatten)]
    pub detail: RequestDetail,
    pub auto_transition: Option<HistoryEvent>,
    /// Set when the automatic "in review" transition failed; viewing still succeeds.
    pub warning: Option<String>,
}

#[derive(Clone)]
pub struct WorkflowEngine {
    pool: SqlitePool,
    metrics: Arc<WorkflowMetrics>,
}

impl WorkflowEngine {
    pub fn new(pool: SqlitePool, metrics: Arc<WorkflowMetrics>) -> Self {
        Self { pool, metrics }
    }

    pub fn metrics(&self) -> &WorkflowMetrics {
        &self.metrics
    }

    /// Move `request_id` to `target` on behalf of `actor`.
    pub async fn transition(
        &self,
        request_id: i64,
        target: RequestState,
        actor: Actor,
        reason: &str,
    ) -> AppResult<TransitionOutcome> {
        let span = create_workflow_span("transition", Some(request_id), Some(actor.role.as_str()));
        async {
            let result = self.transition_in_tx(request_id, target, actor, reason).await;
            match &result {
                Ok(outcome) => {
                    self.metrics.record_applied();
                    if outcome.certificate.is_some() {
                        self.metrics.record_certificate();
                    }
                }
                Err(
                    AppError::Forbidden(_)
                    | AppError::InvalidTransition { .. }
                    | AppError::Validation(_),
                ) => {
                    self.metrics.record_rejected();
                }
                Err(_) => {}
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn transition_in_tx(
        &self,
        request_id: i64,
        target: RequestState,
        actor: Actor,
        reason: &str,
    ) -> AppResult<TransitionOutcome> {
        let mut tx = begin_write(&self.pool).await?;
        let request = load_request(&mut tx, request_id).await?;
        let now = Utc::now();
        let (event, certificate) =
            apply_transition(&mut tx, &request, target, actor, reason, now).await?;
        tx.commit().await?;

        Ok(TransitionOutcome {
            request: Request {
                state: target,
                updated_at: now,
                ..request
            },
            event,
            certificate,
        })
    }

    /// A staff member opens a request: lazily creates their checklist and, when the
    /// request waits on their role, takes it into review.
    pub async fn open(&self, request_id: i64, actor: Actor) -> AppResult<OpenOutcome> {
        if !actor.role.is_employee() {
            return Err(AppError::forbidden("only staff can open requests for review"));
        }

        let request = {
            let mut tx = begin_write(&self.pool).await?;
            let request = load_request(&mut tx, request_id).await?;
            if let Some(stage) = actor.role.review_stage() {
                let created = store::reviews::ensure_rows(
                    &mut tx,
                    request.id,
                    stage,
                    &request.answer_keys(),
                    Utc::now(),
                )
                .await?;
                if created > 0 {
                    info!(request_id, %stage, created, "Created review checklist");
                }
            }
            tx.commit().await?;
            request
        };

        let mut auto_transition = None;
        let mut warning = None;
        if let Some(auto) = transitions::auto_transition_on_open(actor.role, request.state) {
            match self.transition(request.id, auto.to, actor, auto.reason).await {
                Ok(outcome) => {
                    self.metrics.record_auto_transition();
                    auto_transition = Some(outcome.event);
                }
                Err(e) => {
                    self.metrics.record_auto_transition_failure();
                    warn!(request_id, error = %e, "Automatic review transition failed");
                    warning = Some(format!("could not take the request into review: {e}"));
                }
            }
        }

        let detail = self.detail(request_id, actor).await?;
        Ok(OpenOutcome {
            detail,
            auto_transition,
            warning,
        })
    }

    /// Read-only view; applicants only see their own requests.
    pub async fn detail(&self, request_id: i64, actor: Actor) -> AppResult<RequestDetail> {
        let mut conn = self.pool.acquire().await?;
        let request = load_request(&mut conn, request_id).await?;
        ensure_can_view(actor, &request)?;

        let history = store::history::list_for_request(&mut conn, request_id).await?;
        let field_reviews = if actor.role.is_employee() {
            store::reviews::list(&mut conn, request_id, None).await?
        } else {
            Vec::new()
        };
        let files = store::files::list_for_request(&mut conn, request_id).await?;
        let certificate = store::certificates::fetch_by_request(&mut conn, request_id).await?;
        let available_transitions = transitions::available_targets(actor.role, request.state);

        Ok(RequestDetail {
            request,
            history,
            field_reviews,
            files,
            certificate,
            available_transitions,
        })
    }

    pub async fn history(&self, request_id: i64, actor: Actor) -> AppResult<Vec<HistoryEvent>> {
        let mut conn = self.pool.acquire().await?;
        let request = load_request(&mut conn, request_id).await?;
        ensure_can_view(actor, &request)?;
        Ok(store::history::list_for_request(&mut conn, request_id).await?)
    }

    /// Applicants get their own requests; staff get their inbox, or one state when filtered.
    pub async fn list(&self, actor: Actor, state: Option<RequestState>) -> AppResult<Vec<Request>> {
        let mut conn = self.pool.acquire().await?;
        let requests = match actor.role {
            Role::Solicitante => {
                let mut own = store::requests::list_by_applicant(&mut conn, actor.id).await?;
                if let Some(state) = state {
                    own.retain(|r| r.state == state);
                }
                own
            }
            Role::Admin => {
                let states = state.map(|s| vec![s]).unwrap_or_else(|| RequestState::ALL.to_vec());
                store::requests::list_by_states(&mut conn, &states).await?
            }
            role => {
                let states = match state {
                    Some(s) => vec![s],
                    None => transitions::inbox_states(role),
                };
                store::requests::list_by_states(&mut conn, &states).await?
            }
        };
        Ok(requests)
    }

    pub async fn certificate_for_request(
        &self,
        request_id: i64,
        actor: Actor,
    ) -> AppResult<Certificate> {
        let mut conn = self.pool.acquire().await?;
        let request = load_request(&mut conn, request_id).await?;
        ensure_can_view(actor, &request)?;
        store::certificates::fetch_by_request(&mut conn, request_id)
            .await?
            .ok_or_else(|| {
                AppError::not_found(format!("request {request_id} has no certificate"))
            })
    }

    pub async fn certificate(&self, certificate_id: i64, actor: Actor) -> AppResult<Certificate> {
        let mut conn = self.pool.acquire().await?;
        let certificate = store::certificates::fetch(&mut conn, certificate_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("certificate {certificate_id} not found")))?;
        let request = load_request(&mut conn, certificate.request_id).await?;
        ensure_can_view(actor, &request)?;
        Ok(certificate)
    }

    /// Applicants list their own certificates; staff list all.
    pub async fn certificates(&self, actor: Actor) -> AppResult<Vec<Certificate>> {
        let mut conn = self.pool.acquire().await?;
        let applicant = (actor.role == Role::Solicitante).then_some(actor.id);
        Ok(store::certificates::list(&mut conn, applicant).await?)
    }
}

pub(crate) async fn load_request(conn: &mut SqliteConnection, request_id: i64) -> AppResult<Request> {
    store::requests::fetch(conn, request_id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("request {request_id} not found")))
}

/// Checks and writes one transition on an open transaction. Callers commit.
pub(crate) async fn apply_transition(
    conn: &mut SqliteConnection,
    request: &Request,
    target: RequestState,
    actor: Actor,
    reason: &str,
    now: DateTime<Utc>,
) -> AppResult<(HistoryEvent, Option<Certificate>)> {
    match transitions::check(actor.role, request.state, target) {
        Ok(()) => {}
        Err(Denial::RoleNotPermitted) => {
            return Err(AppError::forbidden(format!(
                "role {} cannot move requests to {target}",
                actor.role
            )));
        }
        Err(Denial::Unreachable) => {
            return Err(AppError::InvalidTransition {
                from: request.state,
                to: target,
            });
        }
    }

    if actor.role == Role::Solicitante && request.applicant_id != actor.id {
        return Err(AppError::forbidden("the request belongs to another applicant"));
    }

    let field_reviews = store::reviews::list(conn, request.id, None).await?;
    let files = store::files::list_for_request(conn, request.id).await?;
    let reason = reason.trim();
    gates::check(
        target,
        &GateContext {
            reason,
            field_reviews: &field_reviews,
            files: &files,
        },
    )
    .map_err(AppError::Validation)?;

    store::requests::update_state(conn, request.id, target, now).await?;
    let event = store::history::append(
        conn,
        NewHistoryEvent {
            request_id: request.id,
            previous_state: Some(request.state),
            next_state: target,
            actor_id: actor.id,
            actor_role: actor.role,
            reason,
            now,
        },
    )
    .await?;

    let certificate = if target == RequestState::CertificadoEmitido {
        let resolution_number = store::certificates::next_resolution_number(conn, now).await?;
        let certificate =
            store::certificates::insert(conn, request.id, &resolution_number, actor.id, now).await?;
        info!(request_id = request.id, resolution_number = %certificate.resolution_number, "Certificate issued");
        Some(certificate)
    } else {
        None
    };

    info!(
        request_id = request.id,
        from = %request.state,
        to = %target,
        actor_id = actor.id,
        actor_role = %actor.role,
        "Request transitioned"
    );

    Ok((event, certificate))
}
