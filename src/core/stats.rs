use serde::{Deserialize, Serialize};

/// Arithmetic mean; 0.0 for an empty slice
#[inline]
pub fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation; 0.0 for an empty or constant slice
#[inline]
pub fn std_dev(values: &[f64]) -> f64 {
    let Some(first) = values.first() else {
        return 0.0;
    };
    // The rounded mean of repeated values is not the value itself
    if values.iter().all(|v| v == first) {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// Mean/std/min/max of one observed distribution
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DistributionSummary {
    pub mean: f64,
    pub std: f64,
    pub min: f64,
    pub max: f64,
}

impl DistributionSummary {
    /// `None` for an empty slice
    pub fn of(values: &[f64]) -> Option<Self> {
        if values.is_empty() {
            return None;
        }

        let (min, max) = values
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));

        Some(Self {
            mean: mean(values),
            std: std_dev(values),
            min,
            max,
        })
    }
}
