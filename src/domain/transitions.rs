//! Static permitted-transition table.
//!
//! Every state change a request can undergo is listed here once, keyed by the
//! role allowed to perform it. The engine never moves a request along an edge
//! that is not in [`TRANSITION_TABLE`].

use super::roles::Role;
use super::states::RequestState;
use super::states::RequestState::*;

pub const RECEPTION_STARTED: &str = "Recepción iniciada en ventanilla";
pub const TECHNICAL_REVIEW_STARTED: &str = "Revisión técnica iniciada en UPC";
pub const MANAGER_REVIEW_STARTED: &str = "Revisión iniciada por encargado UPC";
pub const CORRECTION_RESUBMITTED: &str = "Solicitud corregida por el solicitante";
pub const REQUEST_CREATED: &str = "Solicitud creada";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionRule {
    pub role: Role,
    pub from: RequestState,
    pub to: RequestState,
}

const fn rule(role: Role, from: RequestState, to: RequestState) -> TransitionRule {
    TransitionRule { role, from, to }
}

pub const TRANSITION_TABLE: &[TransitionRule] = &[
    rule(Role::Ventanilla, Creada, EnVentanilla),
    rule(Role::Ventanilla, DevueltaVentanilla, EnVentanilla),
    rule(Role::Ventanilla, EnVentanilla, Validada),
    rule(Role::Ventanilla, EnVentanilla, DevueltaVentanilla),
    rule(Role::Solicitante, DevueltaVentanilla, Creada),
    rule(Role::TecnicoUpc, Validada, EnUpc),
    rule(Role::TecnicoUpc, DevueltaUpc, EnUpc),
    rule(Role::TecnicoUpc, EnUpc, EnRevisionUpc),
    rule(Role::EncargadoUpc, EnRevisionUpc, EnEncargadoUpc),
    rule(Role::EncargadoUpc, EnEncargadoUpc, EnDireccion),
    rule(Role::EncargadoUpc, EnEncargadoUpc, DevueltaUpc),
    rule(Role::EncargadoUpc, EnEncargadoUpc, Denegada),
    rule(Role::Direccion, EnDireccion, EnDncd),
    rule(Role::Direccion, EnDireccion, Rechazada),
    rule(Role::Direccion, EnDireccion, DevueltaUpc),
    rule(Role::Dncd, EnDncd, CertificadoEmitido),
];

/// Why the table refuses an edge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Denial {
    /// The role never reaches the target state.
    RoleNotPermitted,
    /// The role reaches the target, but not from the current state.
    Unreachable,
}

pub fn rules_for(role: Role) -> impl Iterator<Item = &'static TransitionRule> {
    TRANSITION_TABLE.iter().filter(move |r| r.role == role)
}

pub fn is_permitted(role: Role, from: RequestState, to: RequestState) -> bool {
    rules_for(role).any(|r| r.from == from && r.to == to)
}

pub fn check(role: Role, from: RequestState, to: RequestState) -> Result<(), Denial> {
    if !rules_for(role).any(|r| r.to == to) {
        return Err(Denial::RoleNotPermitted);
    }
    if from.is_terminal() || !is_permitted(role, from, to) {
        return Err(Denial::Unreachable);
    }
    Ok(())
}

/// Targets the role may move a request to from `from`.
pub fn available_targets(role: Role, from: RequestState) -> Vec<RequestState> {
    rules_for(role)
        .filter(|r| r.from == from)
        .map(|r| r.to)
        .collect()
}

/// The "take it into review" move fired when a reviewer opens a waiting request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AutoTransition {
    pub to: RequestState,
    pub reason: &'static str,
}

pub fn auto_transition_on_open(role: Role, state: RequestState) -> Option<AutoTransition> {
    match (role, state) {
        (Role::Ventanilla, Creada | DevueltaVentanilla) => Some(AutoTransition {
            to: EnVentanilla,
            reason: RECEPTION_STARTED,
        }),
        (Role::TecnicoUpc, Validada | DevueltaUpc) => Some(AutoTransition {
            to: EnUpc,
            reason: TECHNICAL_REVIEW_STARTED,
        }),
        (Role::EncargadoUpc, EnRevisionUpc) => Some(AutoTransition {
            to: EnEncargadoUpc,
            reason: MANAGER_REVIEW_STARTED,
        }),
        _ => None,
    }
}

/// State in which a reviewing role may record field or file reviews. Roles
/// without a checklist never record reviews.
pub fn active_review_state(role: Role) -> Option<RequestState> {
    match role {
        Role::Ventanilla => Some(EnVentanilla),
        Role::TecnicoUpc => Some(EnUpc),
        Role::EncargadoUpc => Some(EnEncargadoUpc),
        _ => None,
    }
}

/// States listed in a staff member's inbox: everything they can act on.
pub fn inbox_states(role: Role) -> Vec<RequestState> {
    let mut states: Vec<RequestState> = Vec::new();
    for r in rules_for(role) {
        if !states.contains(&r.from) {
            states.push(r.from);
        }
    }
    states
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ventanilla_pipeline_edges() {
        assert!(is_permitted(Role::Ventanilla, Creada, EnVentanilla));
        assert!(is_permitted(Role::Ventanilla, EnVentanilla, Validada));
        assert!(is_permitted(Role::Ventanilla, EnVentanilla, DevueltaVentanilla));
        assert!(!is_permitted(Role::Ventanilla, Creada, Validada));
    }

    #[test]
    fn test_role_without_target_is_forbidden() {
        assert_eq!(
            check(Role::Ventanilla, EnVentanilla, EnDireccion),
            Err(Denial::RoleNotPermitted)
        );
        assert_eq!(
            check(Role::TecnicoUpc, EnDncd, CertificadoEmitido),
            Err(Denial::RoleNotPermitted)
        );
        assert_eq!(check(Role::Admin, Creada, EnVentanilla), Err(Denial::RoleNotPermitted));
    }

    #[test]
    fn test_unreachable_target_is_invalid() {
        assert_eq!(
            check(Role::Direccion, EnUpc, EnDncd),
            Err(Denial::Unreachable)
        );
        assert_eq!(
            check(Role::Ventanilla, CertificadoEmitido, EnVentanilla),
            Err(Denial::Unreachable)
        );
    }

    #[test]
    fn test_exclusive_targets() {
        let reachers = |to: RequestState| -> Vec<Role> {
            let mut roles: Vec<Role> = TRANSITION_TABLE
                .iter()
                .filter(|r| r.to == to)
                .map(|r| r.role)
                .collect();
            roles.dedup();
            roles
        };
        assert_eq!(reachers(EnDireccion), vec![Role::EncargadoUpc]);
        assert_eq!(reachers(Denegada), vec![Role::EncargadoUpc]);
        assert_eq!(reachers(EnDncd), vec![Role::Direccion]);
        assert_eq!(reachers(Rechazada), vec![Role::Direccion]);
        assert_eq!(reachers(CertificadoEmitido), vec![Role::Dncd]);
    }

    #[test]
    fn test_no_edge_leaves_terminal_state() {
        assert!(TRANSITION_TABLE.iter().all(|r| !r.from.is_terminal()));
    }

    #[test]
    fn test_auto_transitions_follow_table() {
        for role in Role::ALL {
            for state in RequestState::ALL {
                if let Some(auto) = auto_transition_on_open(role, state) {
                    assert!(is_permitted(role, state, auto.to), "{role} {state}");
                }
            }
        }
        assert_eq!(
            auto_transition_on_open(Role::Ventanilla, Creada).map(|a| a.reason),
            Some(RECEPTION_STARTED)
        );
        assert_eq!(auto_transition_on_open(Role::Direccion, EnDireccion), None);
    }

    #[test]
    fn test_only_checklist_roles_review() {
        for role in Role::ALL {
            assert_eq!(
                active_review_state(role).is_some(),
                role.review_stage().is_some(),
                "{role}"
            );
        }
    }

    #[test]
    fn test_inbox_states() {
        assert_eq!(
            inbox_states(Role::Ventanilla),
            vec![Creada, DevueltaVentanilla, EnVentanilla]
        );
        assert_eq!(inbox_states(Role::Dncd), vec![EnDncd]);
        assert!(inbox_states(Role::Admin).is_empty());
    }
}
