use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::review::{FieldStatus, FileStatus, ReviewStage};
use super::roles::Role;
use super::states::{ParseEnumError, RequestState};

/// Kind of procedure the applicant files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProcedureType {
    Nueva,
    Renovacion,
    Modificacion,
}

impl ProcedureType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProcedureType::Nueva => "NUEVA",
            ProcedureType::Renovacion => "RENOVACION",
            ProcedureType::Modificacion => "MODIFICACION",
        }
    }

    /// Renewals and modifications refer to an existing permit (CIDC).
    pub fn requires_prior_permit(&self) -> bool {
        !matches!(self, ProcedureType::Nueva)
    }
}

impl FromStr for ProcedureType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NUEVA" => Ok(ProcedureType::Nueva),
            "RENOVACION" => Ok(ProcedureType::Renovacion),
            "MODIFICACION" => Ok(ProcedureType::Modificacion),
            other => Err(ParseEnumError {
                kind: "procedure type",
                value: other.to_string(),
            }),
        }
    }
}

/// A permit request (`Solicitud`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Request {
    pub id: i64,
    pub applicant_id: i64,
    pub service_id: i64,
    pub procedure_type: ProcedureType,
    pub state: RequestState,
    pub answers: serde_json::Value,
    pub amount: Decimal,
    pub prior_permit: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Request {
    /// Keys of the answer blob, each one a reviewable form field.
    pub fn answer_keys(&self) -> Vec<String> {
        answer_keys(&self.answers)
    }
}

pub fn answer_keys(answers: &serde_json::Value) -> Vec<String> {
    answers
        .as_object()
        .map(|map| map.keys().cloned().collect())
        .unwrap_or_default()
}

/// One row of the append-only audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryEvent {
    pub id: i64,
    pub request_id: i64,
    pub previous_state: Option<RequestState>,
    pub next_state: RequestState,
    pub actor_id: i64,
    pub actor_role: Role,
    pub reason: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldReview {
    pub id: i64,
    pub request_id: i64,
    pub stage: ReviewStage,
    pub field_key: String,
    pub status: FieldStatus,
    pub comment: Option<String>,
    pub reviewer_id: Option<i64>,
    pub updated_at: DateTime<Utc>,
}

/// Metadata of an uploaded document. The bytes live in the file store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileRecord {
    pub id: i64,
    pub request_id: i64,
    pub document_type: String,
    pub original_name: String,
    pub content_type: String,
    pub size_bytes: i64,
    #[serde(skip_serializing, default)]
    pub storage_key: String,
    pub status: FileStatus,
    pub comment: Option<String>,
    pub uploaded_at: DateTime<Utc>,
    pub reviewed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Certificate {
    pub id: i64,
    pub request_id: i64,
    pub resolution_number: String,
    pub issued_at: DateTime<Utc>,
    pub issued_by: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Employee {
    pub id: i64,
    pub full_name: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub role: Role,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Applicant {
    pub id: i64,
    pub full_name: String,
    pub email: String,
    pub document_id: String,
    pub phone: Option<String>,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// A permit type offered by the ministry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Service {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub description: Option<String>,
    pub price: Decimal,
    pub active: bool,
}
