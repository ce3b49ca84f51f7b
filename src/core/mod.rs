// Core matching engine exports
pub mod drift;
pub mod error;
pub mod features;
pub mod forest;
pub mod matcher;
pub mod metrics;
pub mod normalizer;
pub mod pipeline;
pub mod scoring;
pub mod stats;

pub use drift::{DriftDetector, DriftSummary, MonitoringEntry, OutcomeStats};
pub use error::{MatchError, Result};
pub use features::{FeatureEngineer, StatusVocabulary};
pub use forest::{Classifier, ForestParams, RandomForest};
pub use matcher::{
    FeatureImportance, MatchAssessment, Matcher, Recommendation, TrainedClassifier, TrainingMetrics, TrainingWarning,
};
pub use normalizer::Normalizer;
pub use pipeline::{reference_snapshot, train_pipeline, ReferenceSnapshot, TrainingOutcome};
pub use scoring::DomainKeywords;
pub use stats::DistributionSummary;
