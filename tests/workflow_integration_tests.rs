//! End-to-end workflow tests against an in-memory database.

mod fixtures;

use chrono::{Datelike, Utc};
use serde_json::json;

use controlled_permits::domain::transitions::{
    self, CORRECTION_RESUBMITTED, MANAGER_REVIEW_STARTED, RECEPTION_STARTED, REQUEST_CREATED,
    TECHNICAL_REVIEW_STARTED,
};
use controlled_permits::domain::{FieldStatus, ProcedureType, RequestState, ReviewStage, Role};
use controlled_permits::errors::AppError;
use controlled_permits::workflow::{FieldReviewInput, NewRequestInput};
use fixtures::TestEnv;

#[tokio::test]
async fn test_create_records_creation_event_and_checklist() {
    let env = TestEnv::new().await;
    let request = env.create_request().await;

    assert_eq!(request.state, RequestState::Creada);
    assert_eq!(request.amount, env.service.price);
    assert_eq!(request.answers, TestEnv::sample_answers());

    let detail = env
        .state
        .engine
        .detail(request.id, env.applicant)
        .await
        .unwrap();
    assert_eq!(detail.request.answers, TestEnv::sample_answers());
    assert_eq!(detail.history.len(), 1);
    assert_eq!(detail.history[0].previous_state, None);
    assert_eq!(detail.history[0].next_state, RequestState::Creada);
    assert_eq!(detail.history[0].reason, REQUEST_CREATED);
    // Applicants do not see the internal checklist
    assert!(detail.field_reviews.is_empty());

    let checklist = env
        .state
        .reviews
        .field_reviews(request.id, Some(ReviewStage::Ventanilla), env.staff.ventanilla)
        .await
        .unwrap();
    assert_eq!(checklist.len(), 3);
    assert!(checklist.iter().all(|r| r.status == FieldStatus::Pendiente));
}

#[tokio::test]
async fn test_create_validates_input() {
    let env = TestEnv::new().await;
    let wizard = &env.state.wizard;

    let empty = wizard
        .create(
            env.applicant,
            NewRequestInput {
                service_id: env.service.id,
                procedure_type: ProcedureType::Nueva,
                answers: json!({}),
                prior_permit: None,
            },
        )
        .await;
    assert!(matches!(empty, Err(AppError::Validation(_))));

    let renewal_without_permit = wizard
        .create(
            env.applicant,
            NewRequestInput {
                service_id: env.service.id,
                procedure_type: ProcedureType::Renovacion,
                answers: TestEnv::sample_answers(),
                prior_permit: Some("  ".to_string()),
            },
        )
        .await;
    assert!(matches!(renewal_without_permit, Err(AppError::Validation(_))));

    let unknown_service = wizard
        .create(
            env.applicant,
            NewRequestInput {
                service_id: 9999,
                procedure_type: ProcedureType::Nueva,
                answers: TestEnv::sample_answers(),
                prior_permit: None,
            },
        )
        .await;
    assert!(matches!(unknown_service, Err(AppError::NotFound(_))));

    let by_staff = wizard
        .create(
            env.staff.ventanilla,
            NewRequestInput {
                service_id: env.service.id,
                procedure_type: ProcedureType::Nueva,
                answers: TestEnv::sample_answers(),
                prior_permit: None,
            },
        )
        .await;
    assert!(matches!(by_staff, Err(AppError::Forbidden(_))));
}

#[tokio::test]
async fn test_ventanilla_open_auto_transitions_with_default_reason() {
    let env = TestEnv::new().await;
    let request = env.create_request().await;

    let outcome = env
        .state
        .engine
        .open(request.id, env.staff.ventanilla)
        .await
        .unwrap();

    let event = outcome.auto_transition.expect("auto transition");
    assert_eq!(event.previous_state, Some(RequestState::Creada));
    assert_eq!(event.next_state, RequestState::EnVentanilla);
    assert_eq!(event.reason, RECEPTION_STARTED);
    assert_eq!(event.actor_role, Role::Ventanilla);
    assert!(outcome.warning.is_none());
    assert_eq!(outcome.detail.request.state, RequestState::EnVentanilla);
    assert_eq!(outcome.detail.history.len(), 2);

    // A second open is a plain view
    let again = env
        .state
        .engine
        .open(request.id, env.staff.ventanilla)
        .await
        .unwrap();
    assert!(again.auto_transition.is_none());
    assert_eq!(again.detail.history.len(), 2);
    assert_eq!(env.state.engine.metrics().get_stats().auto_transitions, 1);
}

#[tokio::test]
async fn test_failed_auto_transition_still_returns_the_view() {
    let env = TestEnv::new().await;
    let request = env.create_request().await;

    sqlx::query(
        "CREATE TRIGGER block_reception BEFORE UPDATE OF state ON requests \
         WHEN NEW.state = 'EN_VENTANILLA' \
         BEGIN SELECT RAISE(ABORT, 'reception is closed'); END",
    )
    .execute(env.db.pool())
    .await
    .unwrap();

    let outcome = env
        .state
        .engine
        .open(request.id, env.staff.ventanilla)
        .await
        .unwrap();

    assert!(outcome.auto_transition.is_none());
    let warning = outcome.warning.expect("warning");
    assert!(warning.starts_with("could not take the request into review"));
    assert_eq!(outcome.detail.request.state, RequestState::Creada);
    assert_eq!(outcome.detail.history.len(), 1);
    // The checklist is still created for the reviewer
    assert_eq!(outcome.detail.field_reviews.len(), 3);

    let stats = env.state.engine.metrics().get_stats();
    assert_eq!(stats.auto_transition_failures, 1);
    assert_eq!(stats.auto_transitions, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_racing_transitions_have_one_winner() {
    let env = TestEnv::file_backed().await;

    for _ in 0..10 {
        let request_id = env.create_request().await.id;
        let racers: Vec<_> = (0..2)
            .map(|_| {
                let state = env.state.clone();
                let actor = env.staff.ventanilla;
                tokio::spawn(async move {
                    state
                        .engine
                        .transition(request_id, RequestState::EnVentanilla, actor, "")
                        .await
                })
            })
            .collect();

        let mut applied = 0;
        let mut lost = 0;
        for racer in racers {
            match racer.await.unwrap() {
                Ok(_) => applied += 1,
                Err(AppError::InvalidTransition {
                    from: RequestState::EnVentanilla,
                    to: RequestState::EnVentanilla,
                }) => lost += 1,
                Err(e) => panic!("unexpected error: {e}"),
            }
        }
        assert_eq!((applied, lost), (1, 1));

        let history = env
            .state
            .engine
            .history(request_id, env.staff.ventanilla)
            .await
            .unwrap();
        assert_eq!(history.len(), 2);
    }

    let stats = env.state.engine.metrics().get_stats();
    assert_eq!(stats.transitions_applied, 10);
    assert_eq!(stats.transitions_rejected, 10);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_issuance_numbers_certificates_sequentially() {
    let env = TestEnv::file_backed().await;
    let mut request_ids = Vec::new();
    for _ in 0..2 {
        let request = env.request_at_direccion().await;
        env.state
            .engine
            .transition(request.id, RequestState::EnDncd, env.staff.direccion, "Aprobado")
            .await
            .unwrap();
        request_ids.push(request.id);
    }

    let issuers: Vec<_> = request_ids
        .into_iter()
        .map(|request_id| {
            let state = env.state.clone();
            let actor = env.staff.dncd;
            tokio::spawn(async move {
                state
                    .engine
                    .transition(request_id, RequestState::CertificadoEmitido, actor, "")
                    .await
            })
        })
        .collect();

    let mut numbers = Vec::new();
    for issuer in issuers {
        let outcome = issuer.await.unwrap().unwrap();
        numbers.push(outcome.certificate.expect("certificate").resolution_number);
    }
    numbers.sort();
    let year = Utc::now().year();
    assert_eq!(
        numbers,
        vec![format!("DNCD-{year}-000001"), format!("DNCD-{year}-000002")]
    );
}

#[tokio::test]
async fn test_validation_requires_complete_checklist() {
    let env = TestEnv::new().await;
    let request = env.create_request().await;
    let engine = &env.state.engine;
    engine.open(request.id, env.staff.ventanilla).await.unwrap();

    let result = engine
        .transition(request.id, RequestState::Validada, env.staff.ventanilla, "")
        .await;
    assert!(matches!(result, Err(AppError::Validation(_))));

    env.review_all(request.id, env.staff.ventanilla, FieldStatus::Cumple)
        .await;
    let outcome = engine
        .transition(request.id, RequestState::Validada, env.staff.ventanilla, "")
        .await
        .unwrap();
    assert_eq!(outcome.request.state, RequestState::Validada);
}

#[tokio::test]
async fn test_technician_cannot_finish_with_pending_upc_fields() {
    let env = TestEnv::new().await;
    let request = env.validated_request().await;
    let engine = &env.state.engine;

    let opened = engine.open(request.id, env.staff.tecnico).await.unwrap();
    assert_eq!(
        opened.auto_transition.map(|e| e.reason),
        Some(TECHNICAL_REVIEW_STARTED.to_string())
    );
    assert_eq!(opened.detail.request.state, RequestState::EnUpc);

    // Ventanilla's complete checklist does not count for UPC
    let result = engine
        .transition(request.id, RequestState::EnRevisionUpc, env.staff.tecnico, "")
        .await;
    assert!(matches!(result, Err(AppError::Validation(_))));

    let detail = engine.detail(request.id, env.staff.tecnico).await.unwrap();
    assert_eq!(detail.request.state, RequestState::EnUpc);
}

#[tokio::test]
async fn test_full_pipeline_issues_certificate() {
    let env = TestEnv::new().await;
    let request = env.request_at_direccion().await;
    let engine = &env.state.engine;
    assert_eq!(request.state, RequestState::EnDireccion);

    engine
        .transition(request.id, RequestState::EnDncd, env.staff.direccion, "Aprobado")
        .await
        .unwrap();
    let issued = engine
        .transition(request.id, RequestState::CertificadoEmitido, env.staff.dncd, "")
        .await
        .unwrap();

    let certificate = issued.certificate.expect("certificate");
    assert_eq!(certificate.request_id, request.id);
    assert_eq!(certificate.issued_by, env.staff.dncd.id);
    assert_eq!(
        certificate.resolution_number,
        format!("DNCD-{}-000001", Utc::now().year())
    );

    let fetched = engine
        .certificate_for_request(request.id, env.applicant)
        .await
        .unwrap();
    assert_eq!(fetched.id, certificate.id);
    assert_eq!(fetched.resolution_number, certificate.resolution_number);
    assert_eq!(engine.certificates(env.applicant).await.unwrap().len(), 1);
    assert!(engine.certificates(env.other_applicant).await.unwrap().is_empty());

    // Terminal: nothing leaves CERTIFICADO_EMITIDO
    let after = engine
        .transition(request.id, RequestState::EnDncd, env.staff.direccion, "x")
        .await;
    assert!(matches!(after, Err(AppError::InvalidTransition { .. })));

    let stats = engine.metrics().get_stats();
    assert_eq!(stats.certificates_issued, 1);
}

#[tokio::test]
async fn test_history_edges_belong_to_actor_role() {
    let env = TestEnv::new().await;
    let request = env.request_at_direccion().await;
    let engine = &env.state.engine;
    engine
        .transition(request.id, RequestState::DevueltaUpc, env.staff.direccion, "Falta firma")
        .await
        .unwrap();

    let history = engine.history(request.id, env.staff.admin).await.unwrap();
    assert_eq!(history[0].previous_state, None);
    for event in &history[1..] {
        let from = event.previous_state.expect("previous state");
        assert!(
            transitions::is_permitted(event.actor_role, from, event.next_state),
            "{} {} -> {}",
            event.actor_role,
            from,
            event.next_state
        );
    }
    assert!(history
        .iter()
        .any(|e| e.reason == MANAGER_REVIEW_STARTED && e.actor_role == Role::EncargadoUpc));
    assert_eq!(history.last().map(|e| e.reason.as_str()), Some("Falta firma"));
}

#[tokio::test]
async fn test_role_and_state_denials() {
    let env = TestEnv::new().await;
    let request = env.create_request().await;
    let engine = &env.state.engine;

    let forbidden = engine
        .transition(request.id, RequestState::EnDncd, env.staff.ventanilla, "")
        .await;
    assert!(matches!(forbidden, Err(AppError::Forbidden(_))));

    let invalid = engine
        .transition(request.id, RequestState::Validada, env.staff.ventanilla, "")
        .await;
    assert!(matches!(invalid, Err(AppError::InvalidTransition { .. })));

    let missing = engine
        .transition(9999, RequestState::EnVentanilla, env.staff.ventanilla, "")
        .await;
    assert!(matches!(missing, Err(AppError::NotFound(_))));

    assert_eq!(engine.metrics().get_stats().transitions_rejected, 2);
}

#[tokio::test]
async fn test_devolution_needs_reason_and_observed_field() {
    let env = TestEnv::new().await;
    let request = env.create_request().await;
    let engine = &env.state.engine;
    engine.open(request.id, env.staff.ventanilla).await.unwrap();

    let no_observation = engine
        .transition(
            request.id,
            RequestState::DevueltaVentanilla,
            env.staff.ventanilla,
            "Corregir RNC",
        )
        .await;
    assert!(matches!(no_observation, Err(AppError::Validation(_))));

    env.state
        .reviews
        .record_field_review(
            request.id,
            FieldReviewInput {
                field_key: "rnc".to_string(),
                status: FieldStatus::Observado,
                comment: Some("El RNC no coincide con la DGII".to_string()),
            },
            env.staff.ventanilla,
        )
        .await
        .unwrap();

    let no_reason = engine
        .transition(request.id, RequestState::DevueltaVentanilla, env.staff.ventanilla, "   ")
        .await;
    assert!(matches!(no_reason, Err(AppError::Validation(_))));

    let returned = engine
        .transition(
            request.id,
            RequestState::DevueltaVentanilla,
            env.staff.ventanilla,
            "Corregir RNC",
        )
        .await
        .unwrap();
    assert_eq!(returned.request.state, RequestState::DevueltaVentanilla);
    assert_eq!(returned.event.reason, "Corregir RNC");
}

#[tokio::test]
async fn test_correction_resets_observed_fields_and_resubmits() {
    let env = TestEnv::new().await;
    let request = env.create_request().await;
    let engine = &env.state.engine;
    engine.open(request.id, env.staff.ventanilla).await.unwrap();
    env.review_all(request.id, env.staff.ventanilla, FieldStatus::Observado)
        .await;
    engine
        .transition(
            request.id,
            RequestState::DevueltaVentanilla,
            env.staff.ventanilla,
            "Datos incompletos",
        )
        .await
        .unwrap();

    // Only the owner may correct
    let intruder = env
        .state
        .wizard
        .correct(env.other_applicant, request.id, TestEnv::sample_answers())
        .await;
    assert!(matches!(intruder, Err(AppError::Forbidden(_))));

    let corrected = json!({
        "razon_social": "Farmacia Los Prados SRL",
        "rnc": "130123457",
        "telefono": "809-555-0101",
    });
    let outcome = env
        .state
        .wizard
        .correct(env.applicant, request.id, corrected.clone())
        .await
        .unwrap();
    assert_eq!(outcome.request.state, RequestState::Creada);
    assert_eq!(outcome.event.reason, CORRECTION_RESUBMITTED);
    assert_eq!(outcome.event.actor_role, Role::Solicitante);

    let checklist = env
        .state
        .reviews
        .field_reviews(request.id, Some(ReviewStage::Ventanilla), env.staff.ventanilla)
        .await
        .unwrap();
    let mut keys: Vec<&str> = checklist.iter().map(|r| r.field_key.as_str()).collect();
    keys.sort();
    assert_eq!(keys, vec!["razon_social", "rnc", "telefono"]);
    assert!(checklist.iter().all(|r| r.status == FieldStatus::Pendiente));

    let history = engine.history(request.id, env.applicant).await.unwrap();
    assert_eq!(history.len(), 4);

    // A second correction is refused: the request is no longer returned
    let again = env
        .state
        .wizard
        .correct(env.applicant, request.id, corrected)
        .await;
    assert!(matches!(again, Err(AppError::InvalidTransition { .. })));
}

#[tokio::test]
async fn test_upc_devolution_loops_back_to_technician() {
    let env = TestEnv::new().await;
    let request = env.request_at_direccion().await;
    let engine = &env.state.engine;

    let no_reason = engine
        .transition(request.id, RequestState::Rechazada, env.staff.direccion, "")
        .await;
    assert!(matches!(no_reason, Err(AppError::Validation(_))));

    engine
        .transition(request.id, RequestState::DevueltaUpc, env.staff.direccion, "Revisar inventario")
        .await
        .unwrap();
    let reopened = engine.open(request.id, env.staff.tecnico).await.unwrap();
    assert_eq!(reopened.detail.request.state, RequestState::EnUpc);
}

#[tokio::test]
async fn test_applicant_only_sees_own_requests() {
    let env = TestEnv::new().await;
    let request = env.create_request().await;
    let engine = &env.state.engine;

    let denied = engine.detail(request.id, env.other_applicant).await;
    assert!(matches!(denied, Err(AppError::Forbidden(_))));

    assert_eq!(engine.list(env.applicant, None).await.unwrap().len(), 1);
    assert!(engine.list(env.other_applicant, None).await.unwrap().is_empty());

    let inbox = engine.list(env.staff.ventanilla, None).await.unwrap();
    assert_eq!(inbox.len(), 1);
    assert!(engine.list(env.staff.dncd, None).await.unwrap().is_empty());
}
