use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::info;

/// Workflow counters since process start
#[derive(Debug, Default)]
pub struct WorkflowMetrics {
    pub transitions_applied: AtomicU64,
    pub transitions_rejected: AtomicU64,
    pub auto_transitions: AtomicU64,
    pub auto_transition_failures: AtomicU64,
    pub certificates_issued: AtomicU64,
}

impl WorkflowMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_applied(&self) {
        self.transitions_applied.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_rejected(&self) {
        self.transitions_rejected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_auto_transition(&self) {
        self.auto_transitions.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_auto_transition_failure(&self) {
        self.auto_transition_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_certificate(&self) {
        self.certificates_issued.fetch_add(1, Ordering::Relaxed);
    }

    pub fn get_stats(&self) -> WorkflowStats {
        WorkflowStats {
            transitions_applied: self.transitions_applied.load(Ordering::Relaxed),
            transitions_rejected: self.transitions_rejected.load(Ordering::Relaxed),
            auto_transitions: self.auto_transitions.load(Ordering::Relaxed),
            auto_transition_failures: self.auto_transition_failures.load(Ordering::Relaxed),
            certificates_issued: self.certificates_issued.load(Ordering::Relaxed),
        }
    }

    pub fn log_stats(&self) {
        let stats = self.get_stats();
        info!(
            transitions_applied = stats.transitions_applied,
            transitions_rejected = stats.transitions_rejected,
            auto_transitions = stats.auto_transitions,
            auto_transition_failures = stats.auto_transition_failures,
            certificates_issued = stats.certificates_issued,
            "Workflow metrics"
        );
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkflowStats {
    pub transitions_applied: u64,
    pub transitions_rejected: u64,
    pub auto_transitions: u64,
    pub auto_transition_failures: u64,
    pub certificates_issued: u64,
}
