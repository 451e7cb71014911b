//! `MechResult` (spec.md §4.E step 6): the outcome of one `runMECH` call.

use mech_domain::history::HistoryItem;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MechResult {
    Complete {
        result: Value,
        history: Vec<HistoryItem>,
        duration_sec: f64,
        total_cost: f64,
    },
    FatalError {
        error: String,
        history: Vec<HistoryItem>,
        duration_sec: f64,
        total_cost: f64,
    },
}

impl MechResult {
    pub fn duration_sec(&self) -> f64 {
        match self {
            MechResult::Complete { duration_sec, .. } | MechResult::FatalError { duration_sec, .. } => *duration_sec,
        }
    }

    pub fn total_cost(&self) -> f64 {
        match self {
            MechResult::Complete { total_cost, .. } | MechResult::FatalError { total_cost, .. } => *total_cost,
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, MechResult::FatalError { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_complete_with_status_tag() {
        let r = MechResult::Complete { result: Value::String("done".into()), history: vec![], duration_sec: 1.5, total_cost: 0.02 };
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["status"], "complete");
        assert_eq!(json["result"], "done");
    }

    #[test]
    fn serializes_fatal_error_with_status_tag() {
        let r = MechResult::FatalError { error: "boom".into(), history: vec![], duration_sec: 0.1, total_cost: 0.0 };
        let json = serde_json::to_value(&r).unwrap();
        assert_eq!(json["status"], "fatal_error");
        assert_eq!(json["error"], "boom");
        assert!(r.is_fatal());
    }

    #[test]
    fn accessors_read_common_fields() {
        let r = MechResult::Complete { result: Value::Null, history: vec![], duration_sec: 3.0, total_cost: 1.0 };
        assert_eq!(r.duration_sec(), 3.0);
        assert_eq!(r.total_cost(), 1.0);
        assert!(!r.is_fatal());
    }
}
