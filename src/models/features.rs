use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::core::error::{MatchError, Result};
use crate::models::domain::Label;

/// Number of model inputs per feature row
pub const FEATURE_COUNT: usize = 12;

/// Column order used for every feature matrix built from feature rows
pub const FEATURE_NAMES: [&str; FEATURE_COUNT] = [
    "skill_match",
    "experience_match",
    "salary_match",
    "location_match",
    "english_match",
    "spanish_match",
    "domain_match",
    "academic_match",
    "candidate_experience_years",
    "num_candidate_skills",
    "num_job_skills",
    "is_specialized_job",
];

/// Compatibility vector for one candidate-job pairing
///
/// The first eight fields are [0,1] scores, the last four are raw counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    pub candidate_id: String,
    pub job_id: String,
    pub skill_match: f64,
    pub experience_match: f64,
    pub salary_match: f64,
    pub location_match: f64,
    pub english_match: f64,
    pub spanish_match: f64,
    pub domain_match: f64,
    pub academic_match: f64,
    pub candidate_experience_years: f64,
    pub num_candidate_skills: f64,
    pub num_job_skills: f64,
    pub is_specialized_job: f64,
    pub status: String,
    pub label: Label,
}

impl FeatureRow {
    /// Values in [`FEATURE_NAMES`] order
    pub fn values(&self) -> [f64; FEATURE_COUNT] {
        [
            self.skill_match,
            self.experience_match,
            self.salary_match,
            self.location_match,
            self.english_match,
            self.spanish_match,
            self.domain_match,
            self.academic_match,
            self.candidate_experience_years,
            self.num_candidate_skills,
            self.num_job_skills,
            self.is_specialized_job,
        ]
    }

    pub fn scores(&self) -> [f64; 8] {
        let values = self.values();
        let mut scores = [0.0; 8];
        scores.copy_from_slice(&values[..8]);
        scores
    }
}

/// Named-column numeric batch handed to the normalizer, matcher and drift detector
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureMatrix {
    columns: Vec<String>,
    rows: Vec<Vec<f64>>,
}

impl FeatureMatrix {
    /// Build a matrix, rejecting ragged rows, non-finite values and duplicate columns
    pub fn new(columns: Vec<String>, rows: Vec<Vec<f64>>) -> Result<Self> {
        if columns.is_empty() {
            return Err(MatchError::validation("feature matrix has no columns"));
        }

        let mut seen = HashSet::new();
        for name in &columns {
            if !seen.insert(name.as_str()) {
                return Err(MatchError::validation(format!("duplicate feature column '{}'", name)));
            }
        }

        for (i, row) in rows.iter().enumerate() {
            if row.len() != columns.len() {
                return Err(MatchError::validation(format!(
                    "row {} has {} values, expected {}",
                    i,
                    row.len(),
                    columns.len()
                )));
            }
            if let Some(j) = row.iter().position(|v| !v.is_finite()) {
                return Err(MatchError::validation(format!(
                    "row {} has a non-finite value in column '{}'",
                    i, columns[j]
                )));
            }
        }

        Ok(Self { columns, rows })
    }

    pub fn from_feature_rows(rows: &[FeatureRow]) -> Self {
        Self {
            columns: FEATURE_NAMES.iter().map(|s| s.to_string()).collect(),
            rows: rows.iter().map(|r| r.values().to_vec()).collect(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Values of one column, top to bottom
    pub fn column(&self, index: usize) -> Vec<f64> {
        self.rows.iter().map(|row| row[index]).collect()
    }

    /// Subset of rows by position
    pub fn take_rows(&self, indices: &[usize]) -> Self {
        Self {
            columns: self.columns.clone(),
            rows: indices.iter().map(|&i| self.rows[i].clone()).collect(),
        }
    }

    /// Re-order columns to `names`
    ///
    /// Fails when a requested column is missing or when the matrix carries
    /// columns that were not requested.
    pub fn select(&self, names: &[String]) -> Result<Self> {
        if self.columns == names {
            return Ok(self.clone());
        }

        let missing: Vec<&str> = names
            .iter()
            .filter(|n| self.column_index(n).is_none())
            .map(String::as_str)
            .collect();
        let unexpected: Vec<&str> = self
            .columns
            .iter()
            .filter(|c| !names.contains(c))
            .map(String::as_str)
            .collect();

        if !missing.is_empty() || !unexpected.is_empty() {
            return Err(MatchError::validation(format!(
                "feature columns do not match: missing {:?}, unexpected {:?}",
                missing, unexpected
            )));
        }

        let order: Vec<usize> = names
            .iter()
            .filter_map(|n| self.column_index(n))
            .collect();
        let rows = self
            .rows
            .iter()
            .map(|row| order.iter().map(|&i| row[i]).collect())
            .collect();

        Ok(Self {
            columns: names.to_vec(),
            rows,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(cols: &[&str]) -> Vec<String> {
        cols.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_rejects_ragged_rows() {
        let err = FeatureMatrix::new(names(&["a", "b"]), vec![vec![1.0]]).unwrap_err();
        assert!(err.is_validation());
    }

    #[test]
    fn test_rejects_non_finite_and_duplicates() {
        assert!(FeatureMatrix::new(names(&["a"]), vec![vec![f64::NAN]]).is_err());
        assert!(FeatureMatrix::new(names(&["a", "a"]), vec![]).is_err());
        assert!(FeatureMatrix::new(vec![], vec![]).is_err());
    }

    #[test]
    fn test_select_reorders_columns() {
        let m = FeatureMatrix::new(names(&["a", "b"]), vec![vec![1.0, 2.0]]).unwrap();
        let selected = m.select(&names(&["b", "a"])).unwrap();
        assert_eq!(selected.rows()[0], vec![2.0, 1.0]);
        assert_eq!(selected.columns(), names(&["b", "a"]).as_slice());
    }

    #[test]
    fn test_select_reports_missing_columns() {
        let m = FeatureMatrix::new(names(&["a"]), vec![vec![1.0]]).unwrap();
        let err = m.select(&names(&["a", "b"])).unwrap_err();
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn test_take_rows_and_column() {
        let m = FeatureMatrix::new(names(&["a"]), vec![vec![1.0], vec![2.0], vec![3.0]]).unwrap();
        let sub = m.take_rows(&[2, 0]);
        assert_eq!(sub.column(0), vec![3.0, 1.0]);
        assert_eq!(m.len(), 3);
    }
}
