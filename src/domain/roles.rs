use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use super::review::ReviewStage;
use super::states::ParseEnumError;

/// Actor role. `Solicitante` is the applicant; every other role is staff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Solicitante,
    Ventanilla,
    TecnicoUpc,
    EncargadoUpc,
    Direccion,
    Dncd,
    Admin,
}

impl Role {
    pub const ALL: [Role; 7] = [
        Role::Solicitante,
        Role::Ventanilla,
        Role::TecnicoUpc,
        Role::EncargadoUpc,
        Role::Direccion,
        Role::Dncd,
        Role::Admin,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Solicitante => "SOLICITANTE",
            Role::Ventanilla => "VENTANILLA",
            Role::TecnicoUpc => "TECNICO_UPC",
            Role::EncargadoUpc => "ENCARGADO_UPC",
            Role::Direccion => "DIRECCION",
            Role::Dncd => "DNCD",
            Role::Admin => "ADMIN",
        }
    }

    pub fn is_employee(&self) -> bool {
        !matches!(self, Role::Solicitante)
    }

    /// Checklist the role fills in, if it reviews fields at all.
    pub fn review_stage(&self) -> Option<ReviewStage> {
        match self {
            Role::Ventanilla => Some(ReviewStage::Ventanilla),
            Role::TecnicoUpc | Role::EncargadoUpc => Some(ReviewStage::Upc),
            _ => None,
        }
    }

    pub fn can_review_files(&self) -> bool {
        matches!(self, Role::Ventanilla | Role::TecnicoUpc)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .iter()
            .copied()
            .find(|role| role.as_str() == s)
            .ok_or_else(|| ParseEnumError {
                kind: "role",
                value: s.to_string(),
            })
    }
}

/// Authenticated actor performing a workflow operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    pub id: i64,
    pub role: Role,
}

impl Actor {
    pub fn new(id: i64, role: Role) -> Self {
        Self { id, role }
    }
}
