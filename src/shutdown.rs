use std::time::Duration;
use tokio::time::timeout;
use tracing::{info, warn};

use crate::database::DatabaseManager;
use crate::observability::WorkflowMetrics;

/// Resolves on Ctrl+C or, on Unix, SIGTERM.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    info!("Received shutdown signal");
}

/// Final bookkeeping once the server has stopped accepting requests.
pub async fn shutdown_all_services(database: &DatabaseManager, metrics: &WorkflowMetrics) {
    info!("Initiating graceful shutdown...");

    metrics.log_stats();

    if timeout(Duration::from_secs(5), database.shutdown()).await.is_err() {
        warn!("Timeout waiting for database connections to close");
    }

    info!("Graceful shutdown completed");
}
