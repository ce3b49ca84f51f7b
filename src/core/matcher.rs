use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{info, warn};
use uuid::Uuid;

use crate::core::error::{MatchError, Result};
use crate::core::forest::{Classifier, ForestParams, RandomForest};
use crate::core::metrics::{accuracy, class_counts, roc_auc, shuffle_split, stratified_folds, stratified_split};
use crate::core::stats::{mean, std_dev};
use crate::models::{FeatureMatrix, Label};

/// Fewer rows than this cannot be trained on at all
pub const MIN_TRAINING_ROWS: usize = 2;

/// Below this size the whole set doubles as train and holdout
pub const MIN_ROWS_FOR_SPLIT: usize = 10;

/// Below this size cross-validation is replaced by the holdout AUC
pub const MIN_ROWS_FOR_CV: usize = 6;

pub const MAX_CV_FOLDS: usize = 3;

/// Share of rows held out for evaluation
pub const TEST_FRACTION: f64 = 0.2;

/// Number of top-ranked features reported as key factors
pub const KEY_FACTOR_COUNT: usize = 3;

/// Degradations applied because the dataset was too small
///
/// These never fail training; they are reported in [`TrainingMetrics`]
/// and logged as warnings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TrainingWarning {
    /// Too few rows to split; holdout metrics are computed on the training set
    TinyDatasetHoldout { samples: usize },
    /// A class had fewer than two members, so the split ignored labels
    UnstratifiedSplit { smallest_class: usize },
    /// Cross-validation skipped; the holdout ROC-AUC stands in as a single fold
    CrossValidationSkipped { folds: usize, samples: usize },
    /// Holdout contained one class only; ROC-AUC reported at chance level
    UndefinedHoldoutAuc,
    /// A cross-validation fold contained one class only and was dropped
    UndefinedFoldAuc { fold: usize },
}

impl fmt::Display for TrainingWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TinyDatasetHoldout { samples } => {
                write!(f, "only {} samples; evaluating on the training set", samples)
            }
            Self::UnstratifiedSplit { smallest_class } => {
                write!(f, "smallest class has {} member(s); split is not stratified", smallest_class)
            }
            Self::CrossValidationSkipped { folds, samples } => write!(
                f,
                "dataset too small for cross-validation ({} usable folds, {} samples); using holdout AUC",
                folds, samples
            ),
            Self::UndefinedHoldoutAuc => write!(f, "holdout has a single class; ROC-AUC set to 0.5"),
            Self::UndefinedFoldAuc { fold } => write!(f, "fold {} has a single class; skipped", fold),
        }
    }
}

/// Evaluation results of one training run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingMetrics {
    pub train_accuracy: f64,
    pub test_accuracy: f64,
    pub cv_mean_auc: f64,
    pub cv_std_auc: f64,
    pub roc_auc: f64,
    pub cv_folds: usize,
    /// True when the CV figures are the holdout ROC-AUC proxy
    pub cv_is_proxy: bool,
    pub holdout_is_training_set: bool,
    pub train_samples: usize,
    pub test_samples: usize,
    #[serde(default)]
    pub warnings: Vec<TrainingWarning>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: String,
    pub importance: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    HighMatch,
    MediumMatch,
    LowMatch,
}

impl Recommendation {
    pub fn from_scores(match_score: f64, confidence: f64) -> Self {
        if match_score >= 0.7 && confidence >= 0.4 {
            Self::HighMatch
        } else if match_score >= 0.5 && confidence >= 0.2 {
            Self::MediumMatch
        } else {
            Self::LowMatch
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HighMatch => "high_match",
            Self::MediumMatch => "medium_match",
            Self::LowMatch => "low_match",
        }
    }
}

/// Interpreted prediction for one candidate-job pairing
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchAssessment {
    pub match_score: f64,
    pub confidence: f64,
    pub recommendation: Recommendation,
    pub key_factors: Vec<String>,
}

/// A fitted classifier with everything needed to serve it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainedClassifier<C> {
    pub model_id: Uuid,
    pub trained_at: DateTime<Utc>,
    pub feature_names: Vec<String>,
    /// Ranked, most important first
    pub feature_importance: Vec<FeatureImportance>,
    pub metrics: TrainingMetrics,
    pub classifier: C,
}

/// Trains, evaluates and serves a match classifier
///
/// # Lifecycle
/// 1. `train` fits a fresh copy of the untrained template
/// 2. `predict`, `predict_proba` and `evaluate_confidence` serve it
///
/// Serving before training fails with a state error.
#[derive(Debug, Clone)]
pub struct Matcher<C = RandomForest> {
    template: C,
    seed: u64,
    trained: Option<TrainedClassifier<C>>,
}

impl Matcher<RandomForest> {
    pub fn new(params: ForestParams) -> Self {
        Self::with_classifier(RandomForest::new(params), params.random_state)
    }
}

impl Default for Matcher<RandomForest> {
    fn default() -> Self {
        Self::new(ForestParams::default())
    }
}

impl<C: Classifier + Clone> Matcher<C> {
    /// Use an arbitrary untrained classifier; `seed` drives the holdout split
    pub fn with_classifier(template: C, seed: u64) -> Self {
        Self {
            template,
            seed,
            trained: None,
        }
    }

    pub fn is_trained(&self) -> bool {
        self.trained.is_some()
    }

    pub fn trained(&self) -> Option<&TrainedClassifier<C>> {
        self.trained.as_ref()
    }

    pub fn feature_names(&self) -> Option<&[String]> {
        self.trained.as_ref().map(|t| t.feature_names.as_slice())
    }

    /// Install a previously trained classifier (e.g. restored from disk)
    pub fn restore(&mut self, trained: TrainedClassifier<C>) -> Result<()> {
        if trained.feature_names.is_empty() {
            return Err(MatchError::validation("trained classifier has no feature names"));
        }
        if trained.feature_importance.len() != trained.feature_names.len() {
            return Err(MatchError::validation(
                "feature importance does not cover every trained feature",
            ));
        }
        trained.classifier.check_restored(trained.feature_names.len())?;
        info!(model_id = %trained.model_id, "restored trained classifier");
        self.trained = Some(trained);
        Ok(())
    }

    /// Train on `features` with one label per row
    pub fn train(&mut self, features: &FeatureMatrix, labels: &[Label]) -> Result<TrainingMetrics> {
        let n = features.len();
        if n < MIN_TRAINING_ROWS {
            return Err(MatchError::validation(format!(
                "need at least {} rows to train, got {}",
                MIN_TRAINING_ROWS, n
            )));
        }
        if labels.len() != n {
            return Err(MatchError::validation(format!("{} rows but {} labels", n, labels.len())));
        }

        info!("Starting model training on {} samples", n);

        let rows = features.rows();
        let counts = class_counts(labels);
        let mut warnings = Vec::new();

        let (train_idx, test_idx, holdout_is_training_set) = if n < MIN_ROWS_FOR_SPLIT {
            warnings.push(TrainingWarning::TinyDatasetHoldout { samples: n });
            let all: Vec<usize> = (0..n).collect();
            (all.clone(), all, true)
        } else if counts.iter().all(|&c| c >= 2) {
            let (train, test) = stratified_split(labels, TEST_FRACTION, self.seed);
            (train, test, false)
        } else {
            let smallest = counts.iter().copied().min().unwrap_or(0);
            warnings.push(TrainingWarning::UnstratifiedSplit { smallest_class: smallest });
            let (train, test) = shuffle_split(n, TEST_FRACTION, self.seed);
            (train, test, false)
        };

        let x_train = pick_rows(rows, &train_idx);
        let y_train = pick_labels(labels, &train_idx);
        let x_test = pick_rows(rows, &test_idx);
        let y_test = pick_labels(labels, &test_idx);

        let mut classifier = self.template.clone();
        classifier.fit(&x_train, &y_train)?;

        let train_accuracy = accuracy(&y_train, &classifier.predict(&x_train)?);
        let test_accuracy = accuracy(&y_test, &classifier.predict(&x_test)?);

        let test_scores = positive_scores(&classifier.predict_proba(&x_test)?);
        let roc_auc = roc_auc(&y_test, &test_scores).unwrap_or_else(|| {
            warnings.push(TrainingWarning::UndefinedHoldoutAuc);
            0.5
        });

        let feature_importance = rank_importance(features.columns(), &classifier.feature_importance()?);

        let present: Vec<usize> = counts.iter().copied().filter(|&c| c > 0).collect();
        let smallest = present.iter().copied().min().unwrap_or(0);
        let folds = MAX_CV_FOLDS.min(smallest).min(n);

        let mut cv_scores = Vec::new();
        if present.len() < 2 || folds < 2 || n < MIN_ROWS_FOR_CV {
            warnings.push(TrainingWarning::CrossValidationSkipped { folds, samples: n });
        } else {
            cv_scores = self.cross_validate(rows, labels, folds, &mut warnings)?;
        }

        let cv_is_proxy = cv_scores.is_empty();
        if cv_is_proxy {
            cv_scores.push(roc_auc);
        }

        for warning in &warnings {
            warn!("{}", warning);
        }

        let metrics = TrainingMetrics {
            train_accuracy,
            test_accuracy,
            cv_mean_auc: mean(&cv_scores),
            cv_std_auc: std_dev(&cv_scores),
            roc_auc,
            cv_folds: cv_scores.len(),
            cv_is_proxy,
            holdout_is_training_set,
            train_samples: train_idx.len(),
            test_samples: test_idx.len(),
            warnings,
        };

        info!("Model training completed. Test AUC: {:.3}", metrics.roc_auc);
        for item in feature_importance.iter().take(KEY_FACTOR_COUNT) {
            info!("  {}: {:.3}", item.feature, item.importance);
        }

        self.trained = Some(TrainedClassifier {
            model_id: Uuid::new_v4(),
            trained_at: Utc::now(),
            feature_names: features.columns().to_vec(),
            feature_importance,
            metrics: metrics.clone(),
            classifier,
        });

        Ok(metrics)
    }

    fn cross_validate(
        &self,
        rows: &[Vec<f64>],
        labels: &[Label],
        folds: usize,
        warnings: &mut Vec<TrainingWarning>,
    ) -> Result<Vec<f64>> {
        let mut scores = Vec::with_capacity(folds);

        for (fold, test_idx) in stratified_folds(labels, folds).into_iter().enumerate() {
            let train_idx: Vec<usize> = (0..rows.len()).filter(|i| test_idx.binary_search(i).is_err()).collect();

            let mut classifier = self.template.clone();
            classifier.fit(&pick_rows(rows, &train_idx), &pick_labels(labels, &train_idx))?;

            let proba = classifier.predict_proba(&pick_rows(rows, &test_idx))?;
            match roc_auc(&pick_labels(labels, &test_idx), &positive_scores(&proba)) {
                Some(score) => scores.push(score),
                None => warnings.push(TrainingWarning::UndefinedFoldAuc { fold }),
            }
        }

        tracing::debug!(folds, ?scores, "cross-validation finished");
        Ok(scores)
    }

    fn require_trained(&self) -> Result<&TrainedClassifier<C>> {
        self.trained
            .as_ref()
            .ok_or_else(|| MatchError::state("model must be trained before predict"))
    }

    pub fn predict(&self, features: &FeatureMatrix) -> Result<Vec<Label>> {
        let trained = self.require_trained()?;
        let aligned = features.select(&trained.feature_names)?;
        trained.classifier.predict(aligned.rows())
    }

    /// `[P(negative), P(positive)]` per row
    pub fn predict_proba(&self, features: &FeatureMatrix) -> Result<Vec<[f64; 2]>> {
        let trained = self.require_trained()?;
        let aligned = features.select(&trained.feature_names)?;
        trained.classifier.predict_proba(aligned.rows())
    }

    /// Positive-class probability of the first row
    pub fn match_score(&self, features: &FeatureMatrix) -> Result<f64> {
        let proba = self.predict_proba(features)?;
        proba
            .first()
            .map(|p| p[1])
            .ok_or_else(|| MatchError::validation("cannot score an empty batch"))
    }

    /// Score the first row and interpret it
    ///
    /// Confidence is the distance from the decision boundary scaled to
    /// [0,1]; key factors are the top features by training importance.
    pub fn evaluate_confidence(&self, features: &FeatureMatrix) -> Result<MatchAssessment> {
        let match_score = self.match_score(features)?;
        let confidence = ((match_score - 0.5).abs() * 2.0).min(1.0);

        let key_factors = self
            .require_trained()?
            .feature_importance
            .iter()
            .take(KEY_FACTOR_COUNT)
            .map(|f| f.feature.clone())
            .collect();

        Ok(MatchAssessment {
            match_score,
            confidence,
            recommendation: Recommendation::from_scores(match_score, confidence),
            key_factors,
        })
    }

    /// Features ranked by importance, most important first
    pub fn feature_importance(&self) -> Result<&[FeatureImportance]> {
        Ok(&self.require_trained()?.feature_importance)
    }
}

fn pick_rows(rows: &[Vec<f64>], indices: &[usize]) -> Vec<Vec<f64>> {
    indices.iter().map(|&i| rows[i].clone()).collect()
}

fn pick_labels(labels: &[Label], indices: &[usize]) -> Vec<Label> {
    indices.iter().map(|&i| labels[i]).collect()
}

fn positive_scores(proba: &[[f64; 2]]) -> Vec<f64> {
    proba.iter().map(|p| p[1]).collect()
}

fn rank_importance(columns: &[String], importance: &[f64]) -> Vec<FeatureImportance> {
    let mut ranked: Vec<FeatureImportance> = columns
        .iter()
        .zip(importance)
        .map(|(feature, &importance)| FeatureImportance {
            feature: feature.clone(),
            importance,
        })
        .collect();

    ranked.sort_by(|a, b| {
        b.importance
            .partial_cmp(&a.importance)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_forest() -> Matcher {
        Matcher::new(ForestParams {
            n_estimators: 20,
            ..Default::default()
        })
    }

    /// Two informative columns and one constant column
    fn dataset(n: usize) -> (FeatureMatrix, Vec<Label>) {
        let mut rows = Vec::new();
        let mut labels = Vec::new();
        for i in 0..n {
            let positive = i % 2 == 0;
            let signal = if positive { 1.0 } else { -1.0 };
            rows.push(vec![signal + (i % 3) as f64 * 0.1, signal * 0.5, 0.0]);
            labels.push(if positive { Label::Positive } else { Label::Negative });
        }
        let columns = vec!["signal".to_string(), "echo".to_string(), "constant".to_string()];
        (FeatureMatrix::new(columns, rows).unwrap(), labels)
    }

    #[test]
    fn test_predict_before_train_is_state_error() {
        let matcher = small_forest();
        let (x, _) = dataset(4);

        assert!(!matcher.is_trained());
        assert!(matcher.predict(&x).unwrap_err().is_state());
        assert!(matcher.predict_proba(&x).unwrap_err().is_state());
        assert!(matcher.evaluate_confidence(&x).unwrap_err().is_state());
        assert!(matcher.feature_importance().unwrap_err().is_state());
    }

    #[test]
    fn test_train_requires_two_rows_and_matching_labels() {
        let mut matcher = small_forest();
        let (x, y) = dataset(1);
        assert!(matcher.train(&x, &y).unwrap_err().is_validation());

        let (x, y) = dataset(6);
        assert!(matcher.train(&x, &y[..5]).unwrap_err().is_validation());
    }

    #[test]
    fn test_tiny_dataset_uses_full_set_and_cv_proxy() {
        let mut matcher = small_forest();
        let (x, y) = dataset(4);
        let metrics = matcher.train(&x, &y).unwrap();

        assert!(metrics.holdout_is_training_set);
        assert!(metrics.cv_is_proxy);
        assert_eq!(metrics.cv_folds, 1);
        assert_eq!(metrics.cv_mean_auc, metrics.roc_auc);
        assert_eq!(metrics.cv_std_auc, 0.0);
        assert!(metrics
            .warnings
            .iter()
            .any(|w| matches!(w, TrainingWarning::CrossValidationSkipped { .. })));
    }

    #[test]
    fn test_train_with_split_and_cross_validation() {
        let mut matcher = small_forest();
        let (x, y) = dataset(30);
        let metrics = matcher.train(&x, &y).unwrap();

        assert!(matcher.is_trained());
        assert!(!metrics.holdout_is_training_set);
        assert_eq!(metrics.test_samples, 6);
        assert_eq!(metrics.train_samples, 24);
        assert!(!metrics.cv_is_proxy);
        assert_eq!(metrics.cv_folds, 3);
        assert!(metrics.roc_auc > 0.9);
        assert!(metrics.test_accuracy > 0.8);

        let total: f64 = matcher.feature_importance().unwrap().iter().map(|f| f.importance).sum();
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_single_class_training_degrades() {
        let mut matcher = small_forest();
        let x = FeatureMatrix::new(vec!["a".to_string()], (0..12).map(|i| vec![i as f64]).collect()).unwrap();
        let y = vec![Label::Negative; 12];
        let metrics = matcher.train(&x, &y).unwrap();

        assert!(metrics.cv_is_proxy);
        assert_eq!(metrics.roc_auc, 0.5);
        assert!(metrics.warnings.contains(&TrainingWarning::UndefinedHoldoutAuc));
    }

    #[test]
    fn test_evaluate_confidence_tiers() {
        let mut matcher = small_forest();
        let (x, y) = dataset(30);
        matcher.train(&x, &y).unwrap();

        let assessment = matcher.evaluate_confidence(&x.take_rows(&[0])).unwrap();
        assert!((0.0..=1.0).contains(&assessment.match_score));
        assert!((0.0..=1.0).contains(&assessment.confidence));
        assert_eq!(
            assessment.recommendation,
            Recommendation::from_scores(assessment.match_score, assessment.confidence)
        );
        assert_eq!(assessment.key_factors.len(), KEY_FACTOR_COUNT);
        assert!(assessment.match_score > 0.5);
    }

    #[test]
    fn test_recommendation_thresholds() {
        assert_eq!(Recommendation::from_scores(0.9, 0.8), Recommendation::HighMatch);
        assert_eq!(Recommendation::from_scores(0.7, 0.4), Recommendation::HighMatch);
        assert_eq!(Recommendation::from_scores(0.65, 0.3), Recommendation::MediumMatch);
        assert_eq!(Recommendation::from_scores(0.55, 0.1), Recommendation::LowMatch);
        assert_eq!(Recommendation::from_scores(0.2, 0.6), Recommendation::LowMatch);
        assert_eq!(Recommendation::HighMatch.as_str(), "high_match");
    }

    #[test]
    fn test_predict_validates_columns() {
        let mut matcher = small_forest();
        let (x, y) = dataset(12);
        matcher.train(&x, &y).unwrap();

        let wrong = FeatureMatrix::new(vec!["signal".to_string()], vec![vec![1.0]]).unwrap();
        assert!(matcher.predict(&wrong).unwrap_err().is_validation());

        let empty = x.take_rows(&[]);
        assert!(matcher.match_score(&empty).unwrap_err().is_validation());
    }

    #[test]
    fn test_restore_round_trips_trained_state() {
        let mut matcher = small_forest();
        let (x, y) = dataset(12);
        matcher.train(&x, &y).unwrap();
        let trained = matcher.trained().unwrap().clone();

        let mut restored = small_forest();
        restored.restore(trained).unwrap();
        assert_eq!(restored.predict_proba(&x).unwrap(), matcher.predict_proba(&x).unwrap());
    }

    #[test]
    fn test_restore_rejects_corrupt_trees() {
        let mut matcher = small_forest();
        let (x, y) = dataset(12);
        matcher.train(&x, &y).unwrap();
        let trained = matcher.trained().unwrap().clone();

        let mut json = serde_json::to_value(&trained).unwrap();
        let split = json["classifier"]["trees"]
            .as_array_mut()
            .unwrap()
            .iter_mut()
            .flat_map(|tree| tree["nodes"].as_array_mut().unwrap().iter_mut())
            .find(|n| n.get("Split").is_some())
            .unwrap();
        split["Split"]["left"] = serde_json::json!(10_000);
        let corrupt: TrainedClassifier<RandomForest> = serde_json::from_value(json).unwrap();

        let mut restored = small_forest();
        assert!(restored.restore(corrupt).unwrap_err().is_validation());
        assert!(!restored.is_trained());

        let mut json = serde_json::to_value(&trained).unwrap();
        json["classifier"]["n_features"] = serde_json::json!(trained.feature_names.len() + 3);
        let wide: TrainedClassifier<RandomForest> = serde_json::from_value(json).unwrap();
        assert!(restored.restore(wide).unwrap_err().is_validation());
    }
}
