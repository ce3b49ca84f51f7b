use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::raw::{RawCandidate, RawJob};

/// Score a candidate against a job, both taken from the loaded dataset
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct PredictRequest {
    #[validate(length(min = 1))]
    #[serde(alias = "candidate_id", rename = "candidateId")]
    pub candidate_id: String,
    #[validate(length(min = 1))]
    #[serde(alias = "job_id", rename = "jobId")]
    pub job_id: String,
    /// Observed outcome status, used for monitoring only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome: Option<String>,
}

/// Score records supplied inline, in raw export form
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PredictWithDataRequest {
    pub candidate: RawCandidate,
    pub job: RawJob,
}

/// Score several dataset pairings and log them as one monitoring batch
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct BatchPredictRequest {
    #[validate(length(min = 2, max = 1000))]
    pub pairs: Vec<PredictRequest>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_predict_request_accepts_both_casings() {
        let camel: PredictRequest = serde_json::from_str(r#"{"candidateId": "C1", "jobId": "J1"}"#).unwrap();
        let snake: PredictRequest = serde_json::from_str(r#"{"candidate_id": "C1", "job_id": "J1"}"#).unwrap();
        assert_eq!(camel.candidate_id, snake.candidate_id);
        assert!(camel.validate().is_ok());
    }

    #[test]
    fn test_empty_ids_fail_validation() {
        let req: PredictRequest = serde_json::from_str(r#"{"candidateId": "", "jobId": "J1"}"#).unwrap();
        assert!(req.validate().is_err());
    }

    #[test]
    fn test_batch_needs_two_pairs() {
        let req: BatchPredictRequest =
            serde_json::from_str(r#"{"pairs": [{"candidateId": "C1", "jobId": "J1"}]}"#).unwrap();
        assert!(req.validate().is_err());
    }
}
