//! Shared application state.

use sqlx::SqlitePool;
use std::sync::Arc;

use crate::auth::TokenIssuer;
use crate::observability::WorkflowMetrics;
use crate::storage::FileStore;
use crate::workflow::{DocumentService, RequestWizard, ReviewTracker, WorkflowEngine};

/// Services shared across request handlers.
pub struct AppState {
    pub pool: SqlitePool,
    pub engine: WorkflowEngine,
    pub reviews: ReviewTracker,
    pub wizard: RequestWizard,
    pub documents: DocumentService,
    pub tokens: TokenIssuer,
    pub metrics: Arc<WorkflowMetrics>,
    /// Largest accepted document, used to size the body limit.
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(
        pool: SqlitePool,
        store: Arc<dyn FileStore>,
        tokens: TokenIssuer,
        max_upload_bytes: usize,
    ) -> Self {
        let metrics = Arc::new(WorkflowMetrics::new());
        Self {
            engine: WorkflowEngine::new(pool.clone(), metrics.clone()),
            reviews: ReviewTracker::new(pool.clone()),
            wizard: RequestWizard::new(pool.clone()),
            documents: DocumentService::new(pool.clone(), store, max_upload_bytes),
            pool,
            tokens,
            metrics,
            max_upload_bytes,
        }
    }
}
