use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::core::{Classifier, MatchError, Matcher, MonitoringEntry, Normalizer, TrainedClassifier};

pub const MATCHER_FILE: &str = "matcher.json";
pub const NORMALIZER_FILE: &str = "normalizer.json";
pub const MONITORING_FILE: &str = "monitoring.json";

/// Errors that can occur with artifact persistence
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("Artifact not found: {0}")]
    NotFound(PathBuf),

    #[error(transparent)]
    Match(#[from] MatchError),
}

/// JSON artifacts of a trained matching pipeline
///
/// Layout under the artifacts directory:
/// - `matcher.json`: trained classifier, feature order, importance and metrics
/// - `normalizer.json`: fitted normalizer
/// - `monitoring.json`: monitoring log
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    dir: PathBuf,
}

impl ArtifactStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// True when both the model and the normalizer are on disk
    pub fn has_model(&self) -> bool {
        self.path(MATCHER_FILE).is_file() && self.path(NORMALIZER_FILE).is_file()
    }

    fn path(&self, file: &str) -> PathBuf {
        self.dir.join(file)
    }

    fn write<T: Serialize>(&self, file: &str, value: &T) -> Result<PathBuf, StoreError> {
        std::fs::create_dir_all(&self.dir)?;
        let path = self.path(file);
        // Readers never see a truncated artifact
        let staging = self.path(&format!("{}.tmp", file));
        std::fs::write(&staging, serde_json::to_vec_pretty(value)?)?;
        std::fs::rename(&staging, &path)?;
        tracing::debug!("Saved {}", path.display());
        Ok(path)
    }

    fn read<T: DeserializeOwned>(&self, file: &str) -> Result<T, StoreError> {
        let path = self.path(file);
        if !path.is_file() {
            return Err(StoreError::NotFound(path));
        }
        let bytes = std::fs::read(&path)?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    pub fn save_matcher<C>(&self, matcher: &Matcher<C>) -> Result<PathBuf, StoreError>
    where
        C: Classifier + Clone + Serialize,
    {
        let trained = matcher
            .trained()
            .ok_or_else(|| MatchError::state("cannot save a matcher before it is trained"))?;
        let path = self.write(MATCHER_FILE, trained)?;
        tracing::info!(model_id = %trained.model_id, "Model saved to {}", path.display());
        Ok(path)
    }

    pub fn load_trained<C: DeserializeOwned>(&self) -> Result<TrainedClassifier<C>, StoreError> {
        let trained: TrainedClassifier<C> = self.read(MATCHER_FILE)?;
        tracing::info!(model_id = %trained.model_id, "Model loaded from {}", self.dir.display());
        Ok(trained)
    }

    /// Restore the saved model into `matcher`
    pub fn load_matcher<C>(&self, matcher: &mut Matcher<C>) -> Result<(), StoreError>
    where
        C: Classifier + Clone + DeserializeOwned,
    {
        matcher.restore(self.load_trained()?)?;
        Ok(())
    }

    pub fn save_normalizer(&self, normalizer: &Normalizer) -> Result<PathBuf, StoreError> {
        if !normalizer.is_fitted() {
            return Err(MatchError::state("cannot save a normalizer before it is fitted").into());
        }
        self.write(NORMALIZER_FILE, normalizer)
    }

    pub fn load_normalizer(&self) -> Result<Normalizer, StoreError> {
        self.read(NORMALIZER_FILE)
    }

    pub fn save_monitoring(&self, entries: &[MonitoringEntry]) -> Result<PathBuf, StoreError> {
        let path = self.write(MONITORING_FILE, &entries)?;
        tracing::info!("Monitoring data saved to {}", path.display());
        Ok(path)
    }

    /// Saved monitoring log; a missing file is an empty log
    pub fn load_monitoring(&self) -> Result<Vec<MonitoringEntry>, StoreError> {
        match self.read(MONITORING_FILE) {
            Err(StoreError::NotFound(path)) => {
                tracing::warn!("Monitoring file not found: {}", path.display());
                Ok(Vec::new())
            }
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{DriftDetector, ForestParams, RandomForest};
    use crate::models::{FeatureMatrix, Label};

    fn trained_matcher() -> (Matcher, FeatureMatrix) {
        let rows: Vec<Vec<f64>> = (0..12).map(|i| vec![(i % 2) as f64, i as f64]).collect();
        let labels: Vec<Label> = (0..12).map(|i| Label::from_index(i % 2)).collect();
        let features = FeatureMatrix::new(vec!["a".to_string(), "b".to_string()], rows).unwrap();

        let mut matcher = Matcher::new(ForestParams {
            n_estimators: 5,
            ..Default::default()
        });
        matcher.train(&features, &labels).unwrap();
        (matcher, features)
    }

    #[test]
    fn test_save_untrained_matcher_is_state_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let err = store.save_matcher(&Matcher::default()).unwrap_err();
        assert!(matches!(err, StoreError::Match(ref e) if e.is_state()));
    }

    #[test]
    fn test_monitoring_save_replaces_without_leftovers() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        let batch = FeatureMatrix::new(vec!["a".to_string()], vec![vec![0.1], vec![0.9]]).unwrap();

        let mut detector = DriftDetector::default();
        detector.set_reference(&batch).unwrap();
        detector.log(&batch, &[0.2, 0.8], None).unwrap();
        store.save_monitoring(detector.entries()).unwrap();
        detector.log(&batch, &[0.3, 0.7], None).unwrap();
        store.save_monitoring(detector.entries()).unwrap();

        assert_eq!(store.load_monitoring().unwrap().len(), 2);
        let names: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec![MONITORING_FILE.to_string()]);
    }

    #[test]
    fn test_missing_model_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        assert!(!store.has_model());
        assert!(matches!(store.load_normalizer(), Err(StoreError::NotFound(_))));
        assert!(matches!(store.load_trained::<RandomForest>(), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn test_matcher_and_normalizer_survive_a_restart() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path().join("models"));
        let (matcher, features) = trained_matcher();

        let mut normalizer = Normalizer::new();
        normalizer.fit(&features).unwrap();

        store.save_matcher(&matcher).unwrap();
        store.save_normalizer(&normalizer).unwrap();
        assert!(store.has_model());

        let mut restored = Matcher::default();
        store.load_matcher(&mut restored).unwrap();
        assert_eq!(
            restored.predict_proba(&features).unwrap(),
            matcher.predict_proba(&features).unwrap()
        );
        assert_eq!(restored.trained().unwrap().model_id, matcher.trained().unwrap().model_id);
        assert_eq!(store.load_normalizer().unwrap(), normalizer);
    }

    #[test]
    fn test_monitoring_log_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path());
        assert!(store.load_monitoring().unwrap().is_empty());

        let batch = FeatureMatrix::new(vec!["a".to_string()], vec![vec![0.1], vec![0.9]]).unwrap();
        let mut detector = DriftDetector::default();
        detector.set_reference(&batch).unwrap();
        detector.log(&batch, &[0.2, 0.8], None).unwrap();

        store.save_monitoring(detector.entries()).unwrap();
        assert_eq!(store.load_monitoring().unwrap(), detector.entries());
    }
}
