use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::{FeatureImportance, MatchAssessment, TrainingMetrics};

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: DateTime<Utc>,
    pub model_loaded: bool,
}

/// Score, confidence and recommendation for one pairing
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchResponse {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub candidate_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub job_id: Option<String>,
    #[serde(flatten)]
    pub assessment: MatchAssessment,
}

/// Batch results plus the monitoring verdict for the batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchPredictResponse {
    pub results: Vec<MatchResponse>,
    pub drift_alert: bool,
    pub max_drift_score: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prediction_drift: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelInfoResponse {
    pub model_type: String,
    pub is_trained: bool,
    pub model_id: Uuid,
    pub trained_at: DateTime<Utc>,
    pub feature_names: Vec<String>,
    pub feature_importance: Vec<FeatureImportance>,
    pub metrics: TrainingMetrics,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}
