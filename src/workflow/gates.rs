//! Preconditions checked before a transition is committed.

use crate::domain::{FieldReview, FieldStatus, FileRecord, FileStatus, RequestState, ReviewStage};

/// Everything the gates look at, loaded inside the transition's transaction.
#[derive(Debug, Clone, Copy)]
pub struct GateContext<'a> {
    pub reason: &'a str,
    pub field_reviews: &'a [FieldReview],
    pub files: &'a [FileRecord],
}

/// Checklist that must be complete before advancing to `to`.
pub fn required_checklist(to: RequestState) -> Option<ReviewStage> {
    match to {
        RequestState::Validada => Some(ReviewStage::Ventanilla),
        RequestState::EnRevisionUpc | RequestState::EnDireccion => Some(ReviewStage::Upc),
        _ => None,
    }
}

pub fn requires_compliant_files(to: RequestState) -> bool {
    matches!(to, RequestState::Validada | RequestState::EnRevisionUpc)
}

/// Returns the first unmet condition as a user-facing message.
pub fn check(to: RequestState, ctx: &GateContext<'_>) -> Result<(), String> {
    if to.is_devolution() && ctx.reason.trim().is_empty() {
        return Err(format!("a reason is required to move the request to {to}"));
    }

    if to == RequestState::DevueltaVentanilla {
        let observed = ctx
            .field_reviews
            .iter()
            .filter(|r| r.stage == ReviewStage::Ventanilla)
            .any(|r| r.status == FieldStatus::Observado);
        if !observed {
            return Err("at least one field must be marked OBSERVADO before returning the request".to_string());
        }
    }

    if let Some(stage) = required_checklist(to) {
        let rows: Vec<&FieldReview> = ctx
            .field_reviews
            .iter()
            .filter(|r| r.stage == stage)
            .collect();
        if rows.is_empty() {
            return Err(format!("the {stage} checklist has not been started"));
        }
        let pending: Vec<&str> = rows
            .iter()
            .filter(|r| r.status == FieldStatus::Pendiente)
            .map(|r| r.field_key.as_str())
            .collect();
        if !pending.is_empty() {
            return Err(format!(
                "{} field(s) still PENDIENTE in the {stage} checklist: {}",
                pending.len(),
                pending.join(", ")
            ));
        }
    }

    if requires_compliant_files(to) {
        let failing: Vec<&str> = ctx
            .files
            .iter()
            .filter(|f| f.status != FileStatus::Cumple)
            .map(|f| f.document_type.as_str())
            .collect();
        if !failing.is_empty() {
            return Err(format!(
                "all documents must be CUMPLE; not compliant: {}",
                failing.join(", ")
            ));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn field(stage: ReviewStage, key: &str, status: FieldStatus) -> FieldReview {
        FieldReview {
            id: 0,
            request_id: 1,
            stage,
            field_key: key.to_string(),
            status,
            comment: None,
            reviewer_id: None,
            updated_at: Utc::now(),
        }
    }

    fn file(document_type: &str, status: FileStatus) -> FileRecord {
        FileRecord {
            id: 0,
            request_id: 1,
            document_type: document_type.to_string(),
            original_name: format!("{document_type}.pdf"),
            content_type: "application/pdf".to_string(),
            size_bytes: 10,
            storage_key: "k".to_string(),
            status,
            comment: None,
            uploaded_at: Utc::now(),
            reviewed_at: None,
        }
    }

    fn ctx<'a>(reason: &'a str, fields: &'a [FieldReview], files: &'a [FileRecord]) -> GateContext<'a> {
        GateContext {
            reason,
            field_reviews: fields,
            files,
        }
    }

    #[test]
    fn test_validation_blocked_by_pending_field() {
        let fields = vec![
            field(ReviewStage::Ventanilla, "nombre", FieldStatus::Cumple),
            field(ReviewStage::Ventanilla, "direccion", FieldStatus::Pendiente),
        ];
        let err = check(RequestState::Validada, &ctx("", &fields, &[])).unwrap_err();
        assert!(err.contains("direccion"));
    }

    #[test]
    fn test_validation_blocked_by_non_compliant_file() {
        let fields = vec![field(ReviewStage::Ventanilla, "nombre", FieldStatus::Cumple)];
        let files = vec![file("cedula", FileStatus::PendienteRevision)];
        assert!(check(RequestState::Validada, &ctx("", &fields, &files)).is_err());

        let files = vec![file("cedula", FileStatus::Cumple)];
        assert!(check(RequestState::Validada, &ctx("", &fields, &files)).is_ok());
    }

    #[test]
    fn test_empty_checklist_blocks_advance() {
        assert!(check(RequestState::EnRevisionUpc, &ctx("", &[], &[])).is_err());
    }

    #[test]
    fn test_stages_are_independent() {
        // Ventanilla finished, UPC still pending
        let fields = vec![
            field(ReviewStage::Ventanilla, "nombre", FieldStatus::Cumple),
            field(ReviewStage::Upc, "nombre", FieldStatus::Pendiente),
        ];
        assert!(check(RequestState::Validada, &ctx("", &fields, &[])).is_ok());
        assert!(check(RequestState::EnRevisionUpc, &ctx("", &fields, &[])).is_err());
    }

    #[test]
    fn test_ventanilla_devolution_needs_reason_and_observation() {
        let observed = vec![field(ReviewStage::Ventanilla, "nombre", FieldStatus::Observado)];
        let clean = vec![field(ReviewStage::Ventanilla, "nombre", FieldStatus::Cumple)];

        assert!(check(RequestState::DevueltaVentanilla, &ctx("  ", &observed, &[])).is_err());
        assert!(check(RequestState::DevueltaVentanilla, &ctx("Falta firma", &clean, &[])).is_err());
        assert!(check(RequestState::DevueltaVentanilla, &ctx("Falta firma", &observed, &[])).is_ok());
    }

    #[test]
    fn test_denial_needs_motive_only() {
        assert!(check(RequestState::Denegada, &ctx("", &[], &[])).is_err());
        assert!(check(RequestState::Denegada, &ctx("No cumple requisitos", &[], &[])).is_ok());
        assert!(check(RequestState::Rechazada, &ctx("Sin motivo", &[], &[])).is_ok());
    }

    #[test]
    fn test_direction_handoff_needs_upc_checklist_only() {
        let fields = vec![field(ReviewStage::Upc, "nombre", FieldStatus::Observado)];
        let files = vec![file("cedula", FileStatus::NoCumple)];
        assert!(check(RequestState::EnDireccion, &ctx("", &fields, &files)).is_ok());
    }
}
