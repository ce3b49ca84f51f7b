//! Distribution drift between the training reference and served batches.
//!
//! Drift for one distribution is the mean of the absolute mean shift and
//! the absolute spread change, both scaled by the reference spread:
//! `((|Δmean| + |Δstd|) / (ref_std + ε)) / 2`.
//!
//! Every `std` here, in the reference and in logged `feature_stats`, is the
//! population standard deviation (divide by `n`, not `n - 1`), the same
//! statistic the normalizer uses.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{info, warn};

use crate::core::error::{MatchError, Result};
use crate::core::stats::DistributionSummary;
use crate::models::{FeatureMatrix, Label};

/// Guards the division when the reference distribution is constant
pub const EPSILON: f64 = 1e-8;

pub const DEFAULT_DRIFT_THRESHOLD: f64 = 0.1;

/// Drift score of `current` against `reference`
pub fn drift_score(reference: &DistributionSummary, current: &DistributionSummary) -> f64 {
    let mean_drift = (current.mean - reference.mean).abs() / (reference.std + EPSILON);
    let std_drift = (current.std - reference.std).abs() / (reference.std + EPSILON);
    (mean_drift + std_drift) / 2.0
}

fn column_summaries(matrix: &FeatureMatrix) -> BTreeMap<String, DistributionSummary> {
    matrix
        .columns()
        .iter()
        .enumerate()
        .filter_map(|(i, name)| DistributionSummary::of(&matrix.column(i)).map(|s| (name.clone(), s)))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OutcomeStats {
    /// Share of positive outcomes
    pub mean: f64,
    /// Share of predictions (positive when p > 0.5) agreeing with the outcome
    pub accuracy: f64,
}

/// One logged production batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitoringEntry {
    pub timestamp: DateTime<Utc>,
    pub n_samples: usize,
    pub feature_stats: BTreeMap<String, DistributionSummary>,
    pub prediction_stats: DistributionSummary,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub outcome_stats: Option<OutcomeStats>,
    pub feature_drift: BTreeMap<String, f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prediction_drift: Option<f64>,
    pub drift_alert: bool,
}

impl MonitoringEntry {
    pub fn max_drift(&self) -> f64 {
        self.feature_drift.values().copied().fold(0.0, f64::max)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum DriftSummary {
    NoData {
        message: String,
    },
    Latest {
        last_check: DateTime<Utc>,
        samples_processed: usize,
        drift_detected: bool,
        feature_drift_scores: BTreeMap<String, f64>,
        max_drift_score: f64,
        total_monitoring_entries: usize,
    },
}

/// Tracks a reference distribution and an append-only monitoring log
#[derive(Debug, Clone)]
pub struct DriftDetector {
    reference: Option<BTreeMap<String, DistributionSummary>>,
    reference_predictions: Option<DistributionSummary>,
    threshold: f64,
    entries: Vec<MonitoringEntry>,
}

impl Default for DriftDetector {
    fn default() -> Self {
        Self::new(DEFAULT_DRIFT_THRESHOLD)
    }
}

impl DriftDetector {
    pub fn new(threshold: f64) -> Self {
        Self {
            reference: None,
            reference_predictions: None,
            threshold,
            entries: Vec::new(),
        }
    }

    /// Replace the log, e.g. with entries restored from disk
    pub fn with_entries(mut self, entries: Vec<MonitoringEntry>) -> Self {
        self.entries = entries;
        self
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    pub fn entries(&self) -> &[MonitoringEntry] {
        &self.entries
    }

    pub fn has_reference(&self) -> bool {
        self.reference.is_some()
    }

    /// Replace the feature baseline
    pub fn set_reference(&mut self, matrix: &FeatureMatrix) -> Result<()> {
        if matrix.is_empty() {
            return Err(MatchError::validation("reference batch is empty"));
        }
        self.reference = Some(column_summaries(matrix));
        info!("Reference data set with {} samples", matrix.len());
        Ok(())
    }

    pub fn set_reference_predictions(&mut self, predictions: &[f64]) -> Result<()> {
        let summary = DistributionSummary::of(predictions)
            .ok_or_else(|| MatchError::validation("reference predictions are empty"))?;
        self.reference_predictions = Some(summary);
        Ok(())
    }

    /// Drift per column shared with the reference; empty without one
    pub fn feature_drift(&self, current: &FeatureMatrix) -> BTreeMap<String, f64> {
        let Some(reference) = &self.reference else {
            warn!("No reference data set for drift detection");
            return BTreeMap::new();
        };

        column_summaries(current)
            .into_iter()
            .filter_map(|(name, summary)| {
                reference
                    .get(&name)
                    .map(|baseline| (name, drift_score(baseline, &summary)))
            })
            .collect()
    }

    /// Drift of a prediction batch against `reference`, or the stored baseline
    ///
    /// 0.0 when neither is available.
    pub fn prediction_drift(&self, predictions: &[f64], reference: Option<&[f64]>) -> f64 {
        let baseline = match reference {
            Some(values) => DistributionSummary::of(values),
            None => self.reference_predictions,
        };

        match (baseline, DistributionSummary::of(predictions)) {
            (Some(baseline), Some(current)) => drift_score(&baseline, &current),
            (None, _) => {
                warn!("No reference predictions for drift detection");
                0.0
            }
            _ => 0.0,
        }
    }

    /// Summarize a served batch, score its drift and append it to the log
    pub fn log(
        &mut self,
        features: &FeatureMatrix,
        predictions: &[f64],
        outcomes: Option<&[Label]>,
    ) -> Result<MonitoringEntry> {
        if features.is_empty() {
            return Err(MatchError::validation("cannot log an empty batch"));
        }
        if predictions.len() != features.len() {
            return Err(MatchError::validation(format!(
                "{} rows but {} predictions",
                features.len(),
                predictions.len()
            )));
        }
        if let Some(outcomes) = outcomes {
            if outcomes.len() != predictions.len() {
                return Err(MatchError::validation(format!(
                    "{} predictions but {} outcomes",
                    predictions.len(),
                    outcomes.len()
                )));
            }
        }

        let prediction_stats = DistributionSummary::of(predictions)
            .ok_or_else(|| MatchError::validation("cannot log an empty batch"))?;

        let outcome_stats = outcomes.map(|outcomes| {
            let n = outcomes.len() as f64;
            let positives = outcomes.iter().filter(|l| l.is_positive()).count() as f64;
            let agreeing = outcomes
                .iter()
                .zip(predictions)
                .filter(|(outcome, p)| outcome.is_positive() == (**p > 0.5))
                .count() as f64;
            OutcomeStats {
                mean: positives / n,
                accuracy: agreeing / n,
            }
        });

        let feature_drift = self.feature_drift(features);
        let prediction_drift = self
            .reference_predictions
            .map(|baseline| drift_score(&baseline, &prediction_stats));

        let entry = MonitoringEntry {
            timestamp: Utc::now(),
            n_samples: features.len(),
            feature_stats: column_summaries(features),
            prediction_stats,
            outcome_stats,
            feature_drift,
            prediction_drift,
            drift_alert: false,
        };
        let max_drift = entry.max_drift();
        let entry = MonitoringEntry {
            drift_alert: max_drift > self.threshold,
            ..entry
        };

        if entry.drift_alert {
            warn!(max_drift = max_drift, threshold = self.threshold, "Drift detected! Max drift score: {:.3}", max_drift);
        }

        self.entries.push(entry.clone());
        Ok(entry)
    }

    /// Latest entry's key figures, or an explicit no-data result
    pub fn summary(&self) -> DriftSummary {
        match self.entries.last() {
            None => DriftSummary::NoData {
                message: "No monitoring data available".to_string(),
            },
            Some(latest) => DriftSummary::Latest {
                last_check: latest.timestamp,
                samples_processed: latest.n_samples,
                drift_detected: latest.drift_alert,
                feature_drift_scores: latest.feature_drift.clone(),
                max_drift_score: latest.max_drift(),
                total_monitoring_entries: self.entries.len(),
            },
        }
    }
}
