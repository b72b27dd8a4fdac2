// Permit workflow domain: states, roles, review flags and the transition table

pub mod models;
pub mod review;
pub mod roles;
pub mod states;
pub mod transitions;

pub use models::{
    Applicant, Certificate, Employee, FieldReview, FileRecord, HistoryEvent, ProcedureType,
    Request, Service,
};
pub use review::{FieldStatus, FileStatus, ReviewStage};
pub use roles::{Actor, Role};
pub use states::{ParseEnumError, RequestState};
pub use transitions::{AutoTransition, Denial, TransitionRule, TRANSITION_TABLE};
