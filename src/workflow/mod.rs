//! Request lifecycle services built on the store.

pub mod documents;
pub mod engine;
pub mod gates;
pub mod review;
pub mod wizard;

pub use documents::{DocumentService, NewUpload};
pub use engine::{OpenOutcome, RequestDetail, TransitionOutcome, WorkflowEngine};
pub use review::{FieldReviewInput, ReviewTracker};
pub use wizard::{NewRequestInput, RequestWizard};

use crate::domain::{Actor, Request, Role};
use crate::errors::{AppError, AppResult};

/// Staff see every request; applicants only their own.
pub(crate) fn ensure_can_view(actor: Actor, request: &Request) -> AppResult<()> {
    if actor.role == Role::Solicitante && request.applicant_id != actor.id {
        return Err(AppError::forbidden("the request belongs to another applicant"));
    }
    Ok(())
}
