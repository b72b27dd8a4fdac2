use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::states::ParseEnumError;

/// Compliance flag on a reported form field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldStatus {
    Cumple,
    Observado,
    Pendiente,
}

impl FieldStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FieldStatus::Cumple => "CUMPLE",
            FieldStatus::Observado => "OBSERVADO",
            FieldStatus::Pendiente => "PENDIENTE",
        }
    }
}

impl FromStr for FieldStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CUMPLE" => Ok(FieldStatus::Cumple),
            "OBSERVADO" => Ok(FieldStatus::Observado),
            "PENDIENTE" => Ok(FieldStatus::Pendiente),
            other => Err(ParseEnumError {
                kind: "field status",
                value: other.to_string(),
            }),
        }
    }
}

/// Compliance flag on an uploaded document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FileStatus {
    Cumple,
    NoCumple,
    PendienteRevision,
}

impl FileStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileStatus::Cumple => "CUMPLE",
            FileStatus::NoCumple => "NO_CUMPLE",
            FileStatus::PendienteRevision => "PENDIENTE_REVISION",
        }
    }
}

impl FromStr for FileStatus {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CUMPLE" => Ok(FileStatus::Cumple),
            "NO_CUMPLE" => Ok(FileStatus::NoCumple),
            "PENDIENTE_REVISION" => Ok(FileStatus::PendienteRevision),
            other => Err(ParseEnumError {
                kind: "file status",
                value: other.to_string(),
            }),
        }
    }
}

/// Review unit owning a checklist. Ventanilla and UPC review the same fields independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewStage {
    Ventanilla,
    Upc,
}

impl ReviewStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewStage::Ventanilla => "VENTANILLA",
            ReviewStage::Upc => "UPC",
        }
    }
}

impl fmt::Display for ReviewStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReviewStage {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "VENTANILLA" => Ok(ReviewStage::Ventanilla),
            "UPC" => Ok(ReviewStage::Upc),
            other => Err(ParseEnumError {
                kind: "review stage",
                value: other.to_string(),
            }),
        }
    }
}
