//! HTTP JSON API.
//!
//! Every route except `/health`, the login/registration endpoints and the
//! public service catalog requires `Authorization: Bearer <jwt>`.
//!
//! Endpoints:
//! - POST /api/auth/registro-solicitante, /login-solicitante, /login-empleado
//! - GET  /api/auth/me
//! - GET|POST /api/solicitudes
//! - GET|PUT  /api/solicitudes/{id}            (staff GET may take it into review)
//! - POST     /api/solicitudes/{id}/estado
//! - GET      /api/solicitudes/{id}/historial
//! - GET|PUT  /api/solicitudes/{id}/revision-campos
//! - GET      /api/solicitudes/{id}/archivos, /certificado
//! - POST     /api/archivos                    (base64 JSON body)
//! - GET      /api/archivos/{id}               (raw bytes)
//! - PUT      /api/archivos/{id}/revision
//! - GET|POST /api/empleados, GET|PUT|DELETE /api/empleados/{id}
//! - GET|POST /api/servicios, PUT|DELETE /api/servicios/{id}
//! - GET      /api/certificados, /api/certificados/{id}
//! - GET      /health

pub mod extract;
mod handlers;
mod middleware;
pub mod response;
pub mod state;

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use axum::body::Body;
use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderValue, Method, Request};
use axum::routing::{get, post, put};
use axum::{middleware as axum_middleware, Router};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;

use self::handlers::{
    auth, certificates, employees, files, handle_not_found, health, requests, services,
};
use self::middleware::auth_middleware;
pub use self::state::AppState;
use crate::telemetry::generate_correlation_id;

/// Room for the JSON wrapper around a base64 upload.
const BODY_OVERHEAD: usize = 64 * 1024;

fn cors_layer(origin: Option<&str>) -> Result<CorsLayer> {
    let allow_origin = match origin {
        Some(origin) => AllowOrigin::exact(
            HeaderValue::from_str(origin).with_context(|| format!("invalid CORS origin '{origin}'"))?,
        ),
        None => AllowOrigin::from(Any),
    };
    Ok(CorsLayer::new()
        .allow_origin(allow_origin)
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
        .allow_headers(Any))
}

/// Assemble the router with auth, CORS, tracing and body-size layers.
pub fn build_router(state: Arc<AppState>, cors_origin: Option<&str>) -> Result<Router> {
    // base64 inflates uploads by 4/3
    let body_limit = state.max_upload_bytes / 3 * 4 + BODY_OVERHEAD;

    let api = Router::new()
        .route("/auth/registro-solicitante", post(auth::handle_register))
        .route("/auth/login-solicitante", post(auth::handle_login_applicant))
        .route("/auth/login-empleado", post(auth::handle_login_employee))
        .route("/auth/me", get(auth::handle_me))
        .route(
            "/solicitudes",
            get(requests::handle_list).post(requests::handle_create),
        )
        .route(
            "/solicitudes/{id}",
            get(requests::handle_get).put(requests::handle_correct),
        )
        .route("/solicitudes/{id}/estado", post(requests::handle_transition))
        .route("/solicitudes/{id}/historial", get(requests::handle_history))
        .route(
            "/solicitudes/{id}/revision-campos",
            get(requests::handle_field_reviews).put(requests::handle_record_field_reviews),
        )
        .route("/solicitudes/{id}/archivos", get(requests::handle_files))
        .route("/solicitudes/{id}/certificado", get(requests::handle_certificate))
        .route("/archivos", post(files::handle_upload))
        .route("/archivos/{id}", get(files::handle_download))
        .route("/archivos/{id}/revision", put(files::handle_review))
        .route(
            "/empleados",
            get(employees::handle_list).post(employees::handle_create),
        )
        .route(
            "/empleados/{id}",
            get(employees::handle_get)
                .put(employees::handle_update)
                .delete(employees::handle_deactivate),
        )
        .route(
            "/servicios",
            get(services::handle_list).post(services::handle_create),
        )
        .route(
            "/servicios/{id}",
            put(services::handle_update).delete(services::handle_deactivate),
        )
        .route("/certificados", get(certificates::handle_list))
        .route("/certificados/{id}", get(certificates::handle_get));

    let trace = TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
        tracing::info_span!(
            "http_request",
            method = %request.method(),
            uri = %request.uri(),
            correlation_id = %generate_correlation_id(),
        )
    });

    Ok(Router::new()
        .route("/health", get(health::handle_health))
        .nest("/api", api)
        .fallback(handle_not_found)
        .layer(axum_middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ))
        .layer(cors_layer(cors_origin)?)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(trace)
        .with_state(state))
}

/// Serve until SIGINT/SIGTERM.
pub async fn start_server(
    state: Arc<AppState>,
    addr: SocketAddr,
    cors_origin: Option<&str>,
) -> Result<()> {
    let app = build_router(state, cors_origin)?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!(%addr, "Permits API listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(crate::shutdown::shutdown_signal())
        .await?;

    info!("Server shut down");
    Ok(())
}
