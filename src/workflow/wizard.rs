//! Request creation and correction on behalf of applicants.

use chrono::Utc;
use serde::Deserialize;
use sqlx::SqlitePool;
use tracing::info;

use super::engine::{apply_transition, load_request, TransitionOutcome};
use crate::domain::transitions::{CORRECTION_RESUBMITTED, REQUEST_CREATED};
use crate::domain::{
    models::answer_keys, Actor, ProcedureType, Request, RequestState, ReviewStage, Role,
};
use crate::database::begin_write;
use crate::errors::{AppError, AppResult};
use crate::store::{self, history::NewHistoryEvent, requests::NewRequest};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRequestInput {
    pub service_id: i64,
    pub procedure_type: ProcedureType,
    pub answers: serde_json::Value,
    pub prior_permit: Option<String>,
}

#[derive(Clone)]
pub struct RequestWizard {
    pool: SqlitePool,
}

fn ensure_applicant(actor: Actor) -> AppResult<()> {
    if actor.role != Role::Solicitante {
        return Err(AppError::forbidden("only applicants can file requests"));
    }
    Ok(())
}

fn validate_answers(answers: &serde_json::Value) -> AppResult<()> {
    match answers.as_object() {
        Some(map) if !map.is_empty() => Ok(()),
        Some(_) => Err(AppError::validation("answers must not be empty")),
        None => Err(AppError::validation("answers must be a JSON object")),
    }
}

impl RequestWizard {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Files a new request in `CREADA` with an empty Ventanilla checklist.
    pub async fn create(&self, actor: Actor, input: NewRequestInput) -> AppResult<Request> {
        ensure_applicant(actor)?;
        validate_answers(&input.answers)?;

        let prior_permit = input
            .prior_permit
            .as_deref()
            .map(str::trim)
            .filter(|p| !p.is_empty());
        if input.procedure_type.requires_prior_permit() && prior_permit.is_none() {
            return Err(AppError::validation(format!(
                "{} requests must reference the prior permit (CIDC)",
                input.procedure_type.as_str()
            )));
        }

        let mut tx = begin_write(&self.pool).await?;
        let service = store::services::fetch(&mut tx, input.service_id)
            .await?
            .filter(|s| s.active)
            .ok_or_else(|| AppError::not_found(format!("service {} not found", input.service_id)))?;

        let now = Utc::now();
        let id = store::requests::insert(
            &mut tx,
            NewRequest {
                applicant_id: actor.id,
                service_id: service.id,
                procedure_type: input.procedure_type,
                state: RequestState::Creada,
                answers: &input.answers,
                amount: service.price,
                prior_permit,
                now,
            },
        )
        .await?;

        store::history::append(
            &mut tx,
            NewHistoryEvent {
                request_id: id,
                previous_state: None,
                next_state: RequestState::Creada,
                actor_id: actor.id,
                actor_role: actor.role,
                reason: REQUEST_CREATED,
                now,
            },
        )
        .await?;

        store::reviews::ensure_rows(
            &mut tx,
            id,
            ReviewStage::Ventanilla,
            &answer_keys(&input.answers),
            now,
        )
        .await?;

        let request = load_request(&mut tx, id).await?;
        tx.commit().await?;

        info!(request_id = id, applicant_id = actor.id, service = %service.code, "Request created");
        Ok(request)
    }

    /// Resubmits a returned request with corrected answers. History is kept.
    pub async fn correct(
        &self,
        actor: Actor,
        request_id: i64,
        answers: serde_json::Value,
    ) -> AppResult<TransitionOutcome> {
        ensure_applicant(actor)?;
        validate_answers(&answers)?;

        let mut tx = begin_write(&self.pool).await?;
        let request = load_request(&mut tx, request_id).await?;
        if request.applicant_id != actor.id {
            return Err(AppError::forbidden("the request belongs to another applicant"));
        }
        if request.state != RequestState::DevueltaVentanilla {
            return Err(AppError::InvalidTransition {
                from: request.state,
                to: RequestState::Creada,
            });
        }

        let now = Utc::now();
        let keys = answer_keys(&answers);
        store::requests::update_answers(&mut tx, request_id, &answers, now).await?;

        // Fields dropped from the answers leave the checklist
        for review in store::reviews::list(&mut tx, request_id, None).await? {
            if !keys.contains(&review.field_key) {
                store::reviews::delete(&mut tx, review.id).await?;
            }
        }
        let reset =
            store::reviews::reset_observed(&mut tx, request_id, ReviewStage::Ventanilla, now)
                .await?;
        store::reviews::ensure_rows(&mut tx, request_id, ReviewStage::Ventanilla, &keys, now)
            .await?;

        let (event, certificate) = apply_transition(
            &mut tx,
            &request,
            RequestState::Creada,
            actor,
            CORRECTION_RESUBMITTED,
            now,
        )
        .await?;
        tx.commit().await?;

        info!(request_id, reset, "Request corrected and resubmitted");
        Ok(TransitionOutcome {
            request: Request {
                state: RequestState::Creada,
                answers,
                updated_at: now,
                ..request
            },
            event,
            certificate,
        })
    }
}
