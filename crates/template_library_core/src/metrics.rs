//! Metrics recording for workflow transitions.

use prometheus::{IntCounterVec, Opts, Registry};

use crate::errors::Operation;
use crate::notifications::NotificationKind;

#[cfg(test)]
#[path = "metrics_tests.rs"]
mod tests;

/// Records what the approval workflow does.
///
/// All implementations must be thread-safe.
pub trait WorkflowMetrics: Send + Sync {
    /// Records the outcome of one operation, e.g. `success` or an error's outcome label.
    fn record_transition(&self, operation: Operation, outcome: &str);

    /// Records a notification that could not be delivered.
    fn record_notification_failure(&self, kind: NotificationKind);

    /// Records how many times an operation's transaction was retried after conflicts.
    fn record_transaction_retries(&self, operation: Operation, retries: u32);
}

/// Prometheus metrics collector for the workflow.
///
/// # Metrics
/// - `template_library_transitions_total` (Counter, by `operation` and `outcome`)
/// - `template_library_notification_failures_total` (Counter, by `kind`)
/// - `template_library_transaction_retries_total` (Counter, by `operation`)
pub struct PrometheusWorkflowMetrics {
    transitions: IntCounterVec,
    notification_failures: IntCounterVec,
    transaction_retries: IntCounterVec,
}

impl PrometheusWorkflowMetrics {
    /// Creates the collectors and registers them with `registry`.
    ///
    /// # Errors
    ///
    /// Returns the registry error if a metric with the same name is already registered.
    pub fn new(registry: &Registry) -> Result<Self, prometheus::Error> {
        let transitions = IntCounterVec::new(
            Opts::new(
                "template_library_transitions_total",
                "Template library operations by outcome",
            ),
            &["operation", "outcome"],
        )?;
        let notification_failures = IntCounterVec::new(
            Opts::new(
                "template_library_notification_failures_total",
                "Notifications that could not be delivered",
            ),
            &["kind"],
        )?;
        let transaction_retries = IntCounterVec::new(
            Opts::new(
                "template_library_transaction_retries_total",
                "Transaction attempts repeated after write conflicts",
            ),
            &["operation"],
        )?;

        registry.register(Box::new(transitions.clone()))?;
        registry.register(Box::new(notification_failures.clone()))?;
        registry.register(Box::new(transaction_retries.clone()))?;

        Ok(Self {
            transitions,
            notification_failures,
            transaction_retries,
        })
    }
}

impl WorkflowMetrics for PrometheusWorkflowMetrics {
    fn record_transition(&self, operation: Operation, outcome: &str) {
        self.transitions
            .with_label_values(&[operation.as_str(), outcome])
            .inc();
    }

    fn record_notification_failure(&self, kind: NotificationKind) {
        self.notification_failures
            .with_label_values(&[kind.as_str()])
            .inc();
    }

    fn record_transaction_retries(&self, operation: Operation, retries: u32) {
        if retries > 0 {
            self.transaction_retries
                .with_label_values(&[operation.as_str()])
                .inc_by(u64::from(retries));
        }
    }
}

/// Metrics implementation that records nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpWorkflowMetrics;

impl WorkflowMetrics for NoOpWorkflowMetrics {
    fn record_transition(&self, _operation: Operation, _outcome: &str) {}
    fn record_notification_failure(&self, _kind: NotificationKind) {}
    fn record_transaction_retries(&self, _operation: Operation, _retries: u32) {}
}
