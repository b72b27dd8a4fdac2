//! Bearer token authentication.

use std::sync::Arc;

use axum::extract::{Request, State};
use axum::http::{header, Method};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use super::state::AppState;
use crate::auth::{AuthError, Claims, TokenIssuer};
use crate::errors::AppError;
use crate::store;

/// Routes reachable without a token.
fn is_public(method: &Method, path: &str) -> bool {
    match path {
        "/health"
        | "/api/auth/registro-solicitante"
        | "/api/auth/login-solicitante"
        | "/api/auth/login-empleado" => true,
        "/api/servicios" => method == Method::GET,
        _ => false,
    }
}

/// Verifies the bearer token and stores its [`Claims`](crate::auth::Claims) in the
/// request extensions for handlers to extract.
///
/// Staff tokens are checked against the employee row on every request, so a
/// deactivated account or a changed role takes effect before the token expires.
pub(crate) async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    mut request: Request,
    next: Next,
) -> Response {
    if is_public(request.method(), request.uri().path()) {
        return next.run(request).await;
    }

    let header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    match authenticate(&state, header).await {
        Ok(claims) => {
            request.extensions_mut().insert(claims.actor());
            request.extensions_mut().insert(claims);
            next.run(request).await
        }
        Err(e) => e.into_response(),
    }
}

async fn authenticate(state: &AppState, header: Option<&str>) -> Result<Claims, AppError> {
    let mut claims = TokenIssuer::bearer(header)
        .and_then(|token| state.tokens.verify(token))
        .map_err(|e| {
            let message = match e {
                AuthError::MissingToken => "authentication required",
                AuthError::Expired => "session expired",
                other => {
                    tracing::debug!(error = %other, "Rejected token");
                    "invalid token"
                }
            };
            AppError::Unauthorized(message.to_string())
        })?;

    if claims.role.is_employee() {
        let mut conn = state.pool.acquire().await?;
        let employee = store::employees::fetch(&mut conn, claims.sub)
            .await?
            .filter(|e| e.active)
            .ok_or_else(|| {
                tracing::info!(employee_id = claims.sub, "Token for inactive or missing employee");
                AppError::Unauthorized("account is inactive".to_string())
            })?;
        claims.role = employee.role;
    }

    Ok(claims)
}
