use actix_web::{web, HttpResponse, Responder};
use std::sync::Arc;
use validator::Validate;

use crate::core::{DriftDetector, FeatureEngineer, MatchError, Matcher};
use crate::models::{
    BatchPredictRequest, BatchPredictResponse, ErrorResponse, FeatureRow, HealthResponse, Label, MatchResponse,
    ModelInfoResponse, PredictRequest, PredictWithDataRequest,
};
use crate::services::{ArtifactStore, Dataset};

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub matcher: Arc<Matcher>,
    pub engineer: Arc<FeatureEngineer>,
    pub dataset: Arc<Dataset>,
    pub drift: Arc<tokio::sync::Mutex<DriftDetector>>,
    /// Where the monitoring log is persisted; `None` keeps it in memory
    pub store: Option<Arc<ArtifactStore>>,
}

/// Configure all prediction and monitoring routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/health", web::get().to(health_check))
        .route("/predict", web::post().to(predict))
        .route("/predict_with_data", web::post().to(predict_with_data))
        .route("/predict/batch", web::post().to(predict_batch))
        .route("/model/info", web::get().to(model_info))
        .route("/monitoring/drift", web::get().to(drift_status));
}

fn error_response(status_code: u16, error: &str, message: impl Into<String>) -> HttpResponse {
    let body = ErrorResponse {
        error: error.to_string(),
        message: message.into(),
        status_code,
    };
    match status_code {
        400 => HttpResponse::BadRequest().json(body),
        404 => HttpResponse::NotFound().json(body),
        503 => HttpResponse::ServiceUnavailable().json(body),
        _ => HttpResponse::InternalServerError().json(body),
    }
}

fn match_error_response(err: &MatchError) -> HttpResponse {
    match err {
        MatchError::State(_) => error_response(503, "Model not ready", err.to_string()),
        MatchError::Validation(_) => error_response(400, "Invalid input", err.to_string()),
    }
}

fn model_not_loaded() -> HttpResponse {
    error_response(503, "Model not loaded", "Model not loaded or trained")
}

/// Look up both records of a dataset pairing and score them
fn dataset_row(state: &AppState, req: &PredictRequest) -> Result<FeatureRow, HttpResponse> {
    let candidate = state.dataset.candidate(&req.candidate_id).ok_or_else(|| {
        error_response(404, "Not found", format!("Candidate {} not found", req.candidate_id))
    })?;
    let job = state
        .dataset
        .job(&req.job_id)
        .ok_or_else(|| error_response(404, "Not found", format!("Job {} not found", req.job_id)))?;

    Ok(state.engineer.score_pair(candidate, job, req.outcome.as_deref().unwrap_or_default()))
}

fn assess(state: &AppState, rows: &[FeatureRow]) -> Result<Vec<MatchResponse>, MatchError> {
    let matrix = state.engineer.transform_rows(rows)?;
    rows.iter()
        .enumerate()
        .map(|(i, row)| {
            Ok(MatchResponse {
                candidate_id: Some(row.candidate_id.clone()),
                job_id: Some(row.job_id.clone()),
                assessment: state.matcher.evaluate_confidence(&matrix.take_rows(&[i]))?,
            })
        })
        .collect()
}

/// Health check endpoint
async fn health_check(state: web::Data<AppState>) -> impl Responder {
    let model_loaded = state.matcher.is_trained() && state.engineer.normalizer().is_fitted();
    let status = if model_loaded { "healthy" } else { "degraded" };

    HttpResponse::Ok().json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
        model_loaded,
    })
}

/// Predict endpoint
///
/// POST /api/v1/predict
///
/// Request body:
/// ```json
/// {
///   "candidateId": "string",
///   "jobId": "string"
/// }
/// ```
async fn predict(state: web::Data<AppState>, req: web::Json<PredictRequest>) -> impl Responder {
    if !state.matcher.is_trained() {
        return model_not_loaded();
    }
    if let Err(errors) = req.validate() {
        return error_response(400, "Validation failed", errors.to_string());
    }

    let row = match dataset_row(&state, &req) {
        Ok(row) => row,
        Err(response) => return response,
    };

    match assess(&state, &[row]) {
        Ok(mut results) if !results.is_empty() => {
            let result = results.swap_remove(0);
            tracing::info!(
                candidate_id = %req.candidate_id,
                job_id = %req.job_id,
                match_score = result.assessment.match_score,
                "Prediction served"
            );
            HttpResponse::Ok().json(result)
        }
        Ok(_) => error_response(500, "Prediction failed", "no prediction produced"),
        Err(e) => {
            tracing::error!("Prediction error: {}", e);
            match_error_response(&e)
        }
    }
}

/// Predict with inline records
///
/// POST /api/v1/predict_with_data
///
/// Records use the raw export fields (English or Portuguese names).
async fn predict_with_data(state: web::Data<AppState>, req: web::Json<PredictWithDataRequest>) -> impl Responder {
    if !state.matcher.is_trained() {
        return model_not_loaded();
    }

    let req = req.into_inner();
    let candidate = match req.candidate.into_record(None) {
        Ok(candidate) => candidate,
        Err(e) => return match_error_response(&e),
    };
    let job = match req.job.into_record(None) {
        Ok(job) => job,
        Err(e) => return match_error_response(&e),
    };

    let row = state.engineer.score_pair(&candidate, &job, "");
    match assess(&state, &[row]) {
        Ok(mut results) if !results.is_empty() => HttpResponse::Ok().json(results.swap_remove(0)),
        Ok(_) => error_response(500, "Prediction failed", "no prediction produced"),
        Err(e) => {
            tracing::error!("Prediction error: {}", e);
            match_error_response(&e)
        }
    }
}

/// Batch predict endpoint
///
/// POST /api/v1/predict/batch
///
/// Scores every pairing, logs the batch with the drift detector and
/// persists the monitoring log. Outcomes are recorded only when every
/// pair carries one.
async fn predict_batch(state: web::Data<AppState>, req: web::Json<BatchPredictRequest>) -> impl Responder {
    if !state.matcher.is_trained() {
        return model_not_loaded();
    }
    if let Err(errors) = req.validate() {
        return error_response(400, "Validation failed", errors.to_string());
    }

    let mut rows = Vec::with_capacity(req.pairs.len());
    for pair in &req.pairs {
        if let Err(errors) = pair.validate() {
            return error_response(400, "Validation failed", errors.to_string());
        }
        match dataset_row(&state, pair) {
            Ok(row) => rows.push(row),
            Err(response) => return response,
        }
    }

    let results = match assess(&state, &rows) {
        Ok(results) => results,
        Err(e) => {
            tracing::error!("Batch prediction error: {}", e);
            return match_error_response(&e);
        }
    };

    let outcomes: Option<Vec<Label>> = req
        .pairs
        .iter()
        .map(|pair| pair.outcome.as_deref().map(|status| state.engineer.vocabulary().label(status)))
        .collect();

    let matrix = match state.engineer.transform_rows(&rows) {
        Ok(matrix) => matrix,
        Err(e) => return match_error_response(&e),
    };
    let predictions: Vec<f64> = results.iter().map(|r| r.assessment.match_score).collect();

    // The guard is held until the log is on disk so saves land in log order
    let mut drift = state.drift.lock().await;
    let entry = match drift.log(&matrix, &predictions, outcomes.as_deref()) {
        Ok(entry) => entry,
        Err(e) => return match_error_response(&e),
    };

    if let Some(store) = state.store.clone() {
        let entries = drift.entries().to_vec();
        match web::block(move || store.save_monitoring(&entries)).await {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => tracing::warn!(error = %e, "Failed to persist monitoring log"),
            Err(e) => tracing::warn!(error = %e, "Monitoring persistence task failed"),
        }
    }
    drop(drift);

    tracing::info!(
        pairs = results.len(),
        drift_alert = entry.drift_alert,
        "Batch prediction served"
    );

    HttpResponse::Ok().json(BatchPredictResponse {
        results,
        drift_alert: entry.drift_alert,
        max_drift_score: entry.max_drift(),
        prediction_drift: entry.prediction_drift,
    })
}

/// Model metadata endpoint
async fn model_info(state: web::Data<AppState>) -> impl Responder {
    let Some(trained) = state.matcher.trained() else {
        return model_not_loaded();
    };

    HttpResponse::Ok().json(ModelInfoResponse {
        model_type: "RandomForestClassifier".to_string(),
        is_trained: true,
        model_id: trained.model_id,
        trained_at: trained.trained_at,
        feature_names: trained.feature_names.clone(),
        feature_importance: trained.feature_importance.clone(),
        metrics: trained.metrics.clone(),
    })
}

/// Drift monitoring endpoint
async fn drift_status(state: web::Data<AppState>) -> impl Responder {
    let drift = state.drift.lock().await;
    HttpResponse::Ok().json(drift.summary())
}
