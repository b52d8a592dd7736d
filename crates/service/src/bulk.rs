//! Per-item reporting for bulk updates.

use serde::Serialize;
use uuid::Uuid;

use crate::errors::ServiceError;

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct BulkItemResult {
    pub id: Uuid,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl BulkItemResult {
    pub fn ok(id: Uuid) -> Self { Self { id, success: true, error: None } }

    pub fn failed(id: Uuid, err: &ServiceError) -> Self { Self { id, success: false, error: Some(err.to_string()) } }
}

/// Results in request order. Callers must inspect `success` per item.
#[derive(Clone, Debug, Serialize)]
pub struct BulkOutcome {
    pub results: Vec<BulkItemResult>,
    pub succeeded: usize,
    pub failed: usize,
}

impl BulkOutcome {
    pub fn new(results: Vec<BulkItemResult>) -> Self {
        let succeeded = results.iter().filter(|r| r.success).count();
        Self { failed: results.len() - succeeded, succeeded, results }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn outcome_counts_and_serializes() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let out = BulkOutcome::new(vec![BulkItemResult::ok(a), BulkItemResult::failed(b, &ServiceError::not_found("Deal"))]);
        assert_eq!((out.succeeded, out.failed), (1, 1));
        let v = serde_json::to_value(&out).unwrap();
        assert_eq!(v["results"][1]["error"], "Deal not found");
        assert!(v["results"][0].get("error").is_none());
    }
}
