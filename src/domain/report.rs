//! Summary of one confirm-and-notify run.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::response::PushMessageResult;

/// What a pipeline run produced
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowReport {
    /// Unique identifier for this run
    pub run_id: Uuid,

    /// Number of orders submitted
    pub order_count: usize,

    /// Orders confirmed and pushed (delivered or not)
    pub confirmed: usize,

    /// Push notifications that still failed after the retry budget
    pub failed_pushes: Vec<PushMessageResult>,

    /// Units that failed outright (e.g. interrupted), as `order_id -> error`
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub unit_failures: Vec<UnitFailure>,

    /// When the run started
    pub started_at: DateTime<Utc>,

    /// When every unit had finished
    pub completed_at: Option<DateTime<Utc>>,
}

/// A unit of work that ended in a fault instead of a result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitFailure {
    pub order_id: String,
    pub error: String,
}

impl WorkflowReport {
    /// Start a report for a run over `order_count` orders
    pub fn new(order_count: usize) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            order_count,
            confirmed: 0,
            failed_pushes: Vec::new(),
            unit_failures: Vec::new(),
            started_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Record the outcome of one order's push
    pub fn record_push(&mut self, result: PushMessageResult) {
        self.confirmed += 1;
        if !result.success {
            self.failed_pushes.push(result);
        }
    }

    /// Record a unit that never produced a push result
    pub fn record_failure(&mut self, order_id: impl Into<String>, error: impl Into<String>) {
        self.unit_failures.push(UnitFailure {
            order_id: order_id.into(),
            error: error.into(),
        });
    }

    /// Mark the run as finished
    pub fn finish(&mut self) {
        self.completed_at = Some(Utc::now());
    }

    /// Identifiers of orders whose push notification failed
    pub fn failed_order_ids(&self) -> Vec<&str> {
        self.failed_pushes.iter().map(|r| r.order_id.as_str()).collect()
    }

    pub fn is_finished(&self) -> bool {
        self.completed_at.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn push(order_id: &str, success: bool) -> PushMessageResult {
        PushMessageResult {
            order_id: order_id.to_string(),
            success,
            attempts: if success { 1 } else { 3 },
        }
    }

    #[test]
    fn test_only_failed_pushes_are_kept() {
        let mut report = WorkflowReport::new(3);
        report.record_push(push("OD-1", true));
        report.record_push(push("OD-2", false));
        report.record_push(push("OD-3", true));
        report.finish();

        assert_eq!(report.confirmed, 3);
        assert_eq!(report.failed_order_ids(), vec!["OD-2"]);
        assert!(report.is_finished());
    }

    #[test]
    fn test_unit_failure_is_not_counted_as_confirmed() {
        let mut report = WorkflowReport::new(2);
        report.record_push(push("OD-1", false));
        report.record_failure("OD-2", "order OD-2 not confirmed after 2 attempts");

        assert_eq!(report.confirmed, 1);
        assert_eq!(report.failed_order_ids(), vec!["OD-1"]);
        assert_eq!(report.unit_failures[0].order_id, "OD-2");
    }

    #[test]
    fn test_report_serialization() {
        let mut report = WorkflowReport::new(1);
        report.record_push(push("OD-9", false));

        let json = serde_json::to_string(&report).unwrap();
        let parsed: WorkflowReport = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.run_id, report.run_id);
        assert_eq!(parsed.failed_pushes, report.failed_pushes);
        assert!(!json.contains("unit_failures"));
    }
}
