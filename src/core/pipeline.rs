use tracing::info;

use crate::core::error::Result;
use crate::core::features::FeatureEngineer;
use crate::core::forest::Classifier;
use crate::core::matcher::{Matcher, TrainingMetrics};
use crate::models::{ApplicationRecord, CandidateRecord, FeatureMatrix, JobRecord};

/// Baseline handed to the drift detector after training
#[derive(Debug, Clone, PartialEq)]
pub struct ReferenceSnapshot {
    /// Normalized training matrix
    pub features: FeatureMatrix,
    /// Positive-class probability per training row
    pub predictions: Vec<f64>,
}

#[derive(Debug, Clone)]
pub struct TrainingOutcome {
    pub metrics: TrainingMetrics,
    pub reference: ReferenceSnapshot,
}

/// Prepare features, train the matcher and capture the drift baseline
pub fn train_pipeline<C: Classifier + Clone>(
    engineer: &mut FeatureEngineer,
    matcher: &mut Matcher<C>,
    jobs: &[JobRecord],
    candidates: &[CandidateRecord],
    applications: &[ApplicationRecord],
) -> Result<TrainingOutcome> {
    info!(
        jobs = jobs.len(),
        candidates = candidates.len(),
        applications = applications.len(),
        "Starting training pipeline"
    );

    let (features, labels) = engineer.prepare_training_data(jobs, candidates, applications)?;
    let metrics = matcher.train(&features, &labels)?;
    let reference = reference_snapshot(matcher, features)?;

    info!(
        roc_auc = metrics.roc_auc,
        cv_mean_auc = metrics.cv_mean_auc,
        "Training pipeline finished"
    );
    Ok(TrainingOutcome { metrics, reference })
}

/// Score `features` with a trained matcher to form a drift baseline
pub fn reference_snapshot<C: Classifier + Clone>(
    matcher: &Matcher<C>,
    features: FeatureMatrix,
) -> Result<ReferenceSnapshot> {
    let predictions = matcher.predict_proba(&features)?.into_iter().map(|p| p[1]).collect();
    Ok(ReferenceSnapshot { features, predictions })
}
