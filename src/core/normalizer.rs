use serde::{Deserialize, Serialize};

use crate::core::error::{MatchError, Result};
use crate::core::stats::{mean, std_dev};
use crate::models::FeatureMatrix;

/// Per-feature centering and scaling parameters from the last fit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FittedParams {
    pub columns: Vec<String>,
    pub means: Vec<f64>,
    pub scales: Vec<f64>,
}

/// Standardizes features to zero mean and unit variance
///
/// Parameters come only from the most recent [`Normalizer::fit`]; a second
/// fit replaces them entirely.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Normalizer {
    params: Option<FittedParams>,
}

impl Normalizer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_fitted(&self) -> bool {
        self.params.is_some()
    }

    pub fn params(&self) -> Option<&FittedParams> {
        self.params.as_ref()
    }

    /// Learn per-feature mean and standard deviation from `batch`
    pub fn fit(&mut self, batch: &FeatureMatrix) -> Result<()> {
        if batch.is_empty() {
            return Err(MatchError::validation("cannot fit normalizer on an empty batch"));
        }

        let width = batch.columns().len();
        let mut means = Vec::with_capacity(width);
        let mut scales = Vec::with_capacity(width);

        for i in 0..width {
            let column = batch.column(i);
            let std = std_dev(&column);
            let m = mean(&column);
            means.push(m);
            // Constant columns are only centered
            scales.push(if is_negligible(std, m) { 1.0 } else { std });
        }

        self.params = Some(FittedParams {
            columns: batch.columns().to_vec(),
            means,
            scales,
        });

        tracing::debug!(features = width, samples = batch.len(), "normalizer fitted");
        Ok(())
    }

    /// Apply the fitted transform to `batch`
    pub fn transform(&self, batch: &FeatureMatrix) -> Result<FeatureMatrix> {
        let params = self
            .params
            .as_ref()
            .ok_or_else(|| MatchError::state("normalizer must be fitted before transform"))?;

        let aligned = batch.select(&params.columns)?;
        let rows = aligned
            .rows()
            .iter()
            .map(|row| {
                row.iter()
                    .zip(params.means.iter().zip(&params.scales))
                    .map(|(v, (m, s))| (v - m) / s)
                    .collect()
            })
            .collect();

        FeatureMatrix::new(params.columns.clone(), rows)
    }

    pub fn fit_transform(&mut self, batch: &FeatureMatrix) -> Result<FeatureMatrix> {
        self.fit(batch)?;
        self.transform(batch)
    }
}

/// A std this small relative to the mean is rounding noise
fn is_negligible(std: f64, mean: f64) -> bool {
    std < 10.0 * f64::EPSILON * mean.abs().max(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn matrix(rows: Vec<Vec<f64>>) -> FeatureMatrix {
        FeatureMatrix::new(vec!["a".to_string(), "b".to_string()], rows).unwrap()
    }

    #[test]
    fn test_transform_before_fit_fails() {
        let normalizer = Normalizer::new();
        let err = normalizer.transform(&matrix(vec![vec![1.0, 2.0]])).unwrap_err();
        assert!(err.is_state());
    }

    #[test]
    fn test_fit_transform_standardizes() {
        let mut normalizer = Normalizer::new();
        let batch = matrix(vec![vec![1.0, 10.0], vec![2.0, 10.0], vec![3.0, 10.0], vec![6.0, 10.0]]);
        let out = normalizer.fit_transform(&batch).unwrap();

        let a = out.column(0);
        assert!(mean(&a).abs() < 1e-12);
        assert!((std_dev(&a) - 1.0).abs() < 1e-12);

        // Constant column is centered, not scaled to infinity
        assert!(out.column(1).iter().all(|v| *v == 0.0));
    }

    #[test]
    fn test_constant_inexact_column_keeps_unit_scale() {
        let mut normalizer = Normalizer::new();
        let rows = (0..10).map(|i| vec![0.3, i as f64]).collect();
        let out = normalizer.fit_transform(&matrix(rows)).unwrap();

        assert_eq!(normalizer.params().unwrap().scales[0], 1.0);
        assert!(out.column(0).iter().all(|v| v.abs() < 1e-12));

        let serving = normalizer.transform(&matrix(vec![vec![1.0, 4.5]])).unwrap();
        assert!((serving.rows()[0][0] - 0.7).abs() < 1e-12);
    }

    #[test]
    fn test_scale_ignores_rounding_noise() {
        assert!(is_negligible(5.551115123125783e-17, 0.3));
        assert!(is_negligible(1e-13, 1000.0));
        assert!(!is_negligible(1e-3, 0.3));
    }

    #[test]
    fn test_refit_replaces_parameters() {
        let mut normalizer = Normalizer::new();
        normalizer.fit(&matrix(vec![vec![0.0, 0.0], vec![2.0, 2.0]])).unwrap();
        normalizer.fit(&matrix(vec![vec![10.0, 10.0], vec![12.0, 12.0]])).unwrap();

        let params = normalizer.params().unwrap();
        assert_eq!(params.means, vec![11.0, 11.0]);
        assert_eq!(params.scales, vec![1.0, 1.0]);
    }

    #[test]
    fn test_fit_empty_batch_fails() {
        let mut normalizer = Normalizer::new();
        assert!(normalizer.fit(&matrix(vec![])).unwrap_err().is_validation());
        assert!(!normalizer.is_fitted());
    }

    #[test]
    fn test_transform_rejects_missing_columns() {
        let mut normalizer = Normalizer::new();
        normalizer.fit(&matrix(vec![vec![1.0, 2.0], vec![3.0, 4.0]])).unwrap();

        let other = FeatureMatrix::new(vec!["a".to_string()], vec![vec![1.0]]).unwrap();
        assert!(normalizer.transform(&other).unwrap_err().is_validation());
    }
}
