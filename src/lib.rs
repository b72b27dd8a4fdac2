// Controlled-substances permit workflow
// Exposes the workflow services and the HTTP API for the binary and tests

pub mod api;
pub mod auth;
pub mod cli;
pub mod config;
pub mod database;
pub mod domain;
pub mod errors;
pub mod observability;
pub mod shutdown;
pub mod storage;
pub mod store;
pub mod telemetry;
pub mod validation;
pub mod workflow;

// Re-export key types for easy access
pub use api::{build_router, start_server, AppState};
pub use auth::{Claims, TokenIssuer};
pub use config::{config, PermitsConfig};
pub use database::DatabaseManager;
pub use domain::{Actor, RequestState, Role};
pub use errors::{AppError, AppResult};
pub use observability::{WorkflowMetrics, WorkflowStats};
pub use storage::{FileStore, LocalFileStore};
pub use telemetry::{create_workflow_span, generate_correlation_id, init_telemetry, shutdown_telemetry};
pub use workflow::{DocumentService, RequestWizard, ReviewTracker, WorkflowEngine};
