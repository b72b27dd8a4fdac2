use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Workflow state of a permit request (`Estado`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestState {
    Creada,
    EnVentanilla,
    Validada,
    DevueltaVentanilla,
    EnUpc,
    EnRevisionUpc,
    EnEncargadoUpc,
    DevueltaUpc,
    Denegada,
    EnDireccion,
    Rechazada,
    EnDncd,
    CertificadoEmitido,
}

impl RequestState {
    pub const ALL: [RequestState; 13] = [
        RequestState::Creada,
        RequestState::EnVentanilla,
        RequestState::Validada,
        RequestState::DevueltaVentanilla,
        RequestState::EnUpc,
        RequestState::EnRevisionUpc,
        RequestState::EnEncargadoUpc,
        RequestState::DevueltaUpc,
        RequestState::Denegada,
        RequestState::EnDireccion,
        RequestState::Rechazada,
        RequestState::EnDncd,
        RequestState::CertificadoEmitido,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            RequestState::Creada => "CREADA",
            RequestState::EnVentanilla => "EN_VENTANILLA",
            RequestState::Validada => "VALIDADA",
            RequestState::DevueltaVentanilla => "DEVUELTA_VENTANILLA",
            RequestState::EnUpc => "EN_UPC",
            RequestState::EnRevisionUpc => "EN_REVISION_UPC",
            RequestState::EnEncargadoUpc => "EN_ENCARGADO_UPC",
            RequestState::DevueltaUpc => "DEVUELTA_UPC",
            RequestState::Denegada => "DENEGADA",
            RequestState::EnDireccion => "EN_DIRECCION",
            RequestState::Rechazada => "RECHAZADA",
            RequestState::EnDncd => "EN_DNCD",
            RequestState::CertificadoEmitido => "CERTIFICADO_EMITIDO",
        }
    }

    /// No transition leaves a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RequestState::Denegada | RequestState::Rechazada | RequestState::CertificadoEmitido
        )
    }

    /// States that send the request backwards or end it; all of them need a motive.
    pub fn is_devolution(&self) -> bool {
        matches!(
            self,
            RequestState::DevueltaVentanilla
                | RequestState::DevueltaUpc
                | RequestState::Denegada
                | RequestState::Rechazada
        )
    }
}

impl fmt::Display for RequestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown value '{value}' for {kind}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl FromStr for RequestState {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        RequestState::ALL
            .iter()
            .copied()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| ParseEnumError {
                kind: "request state",
                value: s.to_string(),
            })
    }
}
