//! Talent Match - candidate/job matching with drift monitoring
//!
//! Scores candidate-job pairings on seven attribute dimensions, trains a
//! random forest on historical application outcomes and tracks how served
//! traffic drifts away from the training distribution.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use core::{DriftDetector, FeatureEngineer, MatchError, Matcher, RandomForest};
pub use models::{ApplicationRecord, CandidateRecord, FeatureMatrix, FeatureRow, JobRecord, Label};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_exports() {
        let matcher = Matcher::default();
        assert!(!matcher.is_trained());
        assert!(!FeatureEngineer::default().normalizer().is_fitted());
    }
}
