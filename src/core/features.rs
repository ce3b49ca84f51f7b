use std::collections::{BTreeMap, HashMap};
use tracing::{debug, info, warn};

use crate::core::error::{MatchError, Result};
use crate::core::normalizer::Normalizer;
use crate::core::scoring::{
    academic_match, domain_match, experience_match, language_match, location_match, salary_match, skill_match,
    DomainKeywords,
};
use crate::models::{ApplicationRecord, CandidateRecord, FeatureMatrix, FeatureRow, JobRecord, Label, Language};

/// Built-in outcome statuses, English and Portuguese
const DEFAULT_STATUSES: [(&str, f64); 14] = [
    ("contracted", 1.0),
    ("contratado", 1.0),
    ("approved", 1.0),
    ("aprovado", 1.0),
    ("in process", 0.5),
    ("em processo", 0.5),
    ("rejected", 0.0),
    ("rejeitado", 0.0),
    ("withdrew", 0.0),
    ("desistiu", 0.0),
    ("not approved", 0.0),
    ("não aprovado", 0.0),
    ("cancelled", 0.0),
    ("cancelado", 0.0),
];

/// Lower-case, trim and treat `-`/`_` as spaces
pub fn normalize_status(status: &str) -> String {
    status
        .trim()
        .to_lowercase()
        .replace(['-', '_'], " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Maps outcome statuses to a numeric value and a binary label
#[derive(Debug, Clone, PartialEq)]
pub struct StatusVocabulary {
    values: HashMap<String, f64>,
    unknown_value: f64,
    positive_threshold: f64,
}

impl Default for StatusVocabulary {
    fn default() -> Self {
        Self::new(0.0, 0.5)
    }
}

impl StatusVocabulary {
    pub fn new(unknown_value: f64, positive_threshold: f64) -> Self {
        Self {
            values: DEFAULT_STATUSES
                .iter()
                .map(|(status, value)| (status.to_string(), *value))
                .collect(),
            unknown_value,
            positive_threshold,
        }
    }

    /// Add or override statuses
    pub fn with_statuses<I, S>(mut self, extra: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: AsRef<str>,
    {
        for (status, value) in extra {
            self.values.insert(normalize_status(status.as_ref()), value);
        }
        self
    }

    /// Mapped value, `None` for statuses outside the vocabulary
    pub fn value(&self, status: &str) -> Option<f64> {
        self.values.get(&normalize_status(status)).copied()
    }

    pub fn label(&self, status: &str) -> Label {
        let value = self.value(status).unwrap_or(self.unknown_value);
        if value >= self.positive_threshold {
            Label::Positive
        } else {
            Label::Negative
        }
    }
}

/// Turns candidate, job and application records into model inputs
///
/// Owns the normalizer so the transform fitted at training time is the
/// one applied when serving.
#[derive(Debug, Clone, Default)]
pub struct FeatureEngineer {
    normalizer: Normalizer,
    vocabulary: StatusVocabulary,
    keywords: DomainKeywords,
}

impl FeatureEngineer {
    pub fn new(vocabulary: StatusVocabulary, keywords: DomainKeywords) -> Self {
        Self {
            normalizer: Normalizer::new(),
            vocabulary,
            keywords,
        }
    }

    pub fn normalizer(&self) -> &Normalizer {
        &self.normalizer
    }

    /// Replace the normalizer, e.g. with one restored from disk
    pub fn set_normalizer(&mut self, normalizer: Normalizer) {
        self.normalizer = normalizer;
    }

    pub fn vocabulary(&self) -> &StatusVocabulary {
        &self.vocabulary
    }

    /// Feature row for one pairing; `status` only feeds the label
    pub fn score_pair(&self, candidate: &CandidateRecord, job: &JobRecord, status: &str) -> FeatureRow {
        FeatureRow {
            candidate_id: candidate.candidate_id.clone(),
            job_id: job.job_id.clone(),
            skill_match: skill_match(&candidate.skills, &job.required_skills),
            experience_match: experience_match(candidate.experience_years, job.level),
            salary_match: salary_match(candidate.salary_expectation, job.salary_range),
            location_match: location_match(candidate.location.as_deref(), job.location.as_deref()),
            english_match: language_match(candidate.language(Language::English), job.language(Language::English)),
            spanish_match: language_match(candidate.language(Language::Spanish), job.language(Language::Spanish)),
            domain_match: domain_match(&candidate.skills, job.requires_specialization, &self.keywords),
            academic_match: academic_match(candidate.academic_level.as_deref()),
            candidate_experience_years: candidate.experience_years as f64,
            num_candidate_skills: candidate.skills.len() as f64,
            num_job_skills: job.required_skills.len() as f64,
            is_specialized_job: if job.requires_specialization { 1.0 } else { 0.0 },
            status: status.to_string(),
            label: self.vocabulary.label(status),
        }
    }

    /// One feature row per application whose candidate and job are both known
    pub fn create_features(
        &self,
        jobs: &[JobRecord],
        candidates: &[CandidateRecord],
        applications: &[ApplicationRecord],
    ) -> Vec<FeatureRow> {
        let jobs = index_by(jobs, |j| &j.job_id, "job");
        let candidates = index_by(candidates, |c| &c.candidate_id, "candidate");

        let mut rows = Vec::with_capacity(applications.len());
        for application in applications {
            let (Some(job), Some(candidate)) = (
                jobs.get(application.job_id.as_str()),
                candidates.get(application.candidate_id.as_str()),
            ) else {
                debug!(
                    candidate_id = %application.candidate_id,
                    job_id = %application.job_id,
                    "skipping application with unknown candidate or job"
                );
                continue;
            };

            rows.push(self.score_pair(candidate, job, &application.status));
        }

        debug!(applications = applications.len(), rows = rows.len(), "features created");
        rows
    }

    /// Labels re-derived from each row's status; unmapped statuses are logged
    pub fn create_target(&self, rows: &[FeatureRow]) -> Vec<Label> {
        let mut unmapped: BTreeMap<&str, usize> = BTreeMap::new();
        let labels = rows
            .iter()
            .map(|row| {
                if self.vocabulary.value(&row.status).is_none() {
                    *unmapped.entry(row.status.as_str()).or_default() += 1;
                }
                self.vocabulary.label(&row.status)
            })
            .collect();

        for (status, count) in unmapped {
            warn!(status, count, "unmapped application status; using the configured unknown value");
        }
        labels
    }

    /// Assemble, label and normalize a training batch
    ///
    /// Always refits the normalizer on the assembled rows.
    pub fn prepare_training_data(
        &mut self,
        jobs: &[JobRecord],
        candidates: &[CandidateRecord],
        applications: &[ApplicationRecord],
    ) -> Result<(FeatureMatrix, Vec<Label>)> {
        let rows = self.create_features(jobs, candidates, applications);
        if rows.is_empty() {
            return Err(MatchError::validation(
                "no application could be joined with a known candidate and job",
            ));
        }

        let labels = self.create_target(&rows);
        let matrix = self.normalizer.fit_transform(&FeatureMatrix::from_feature_rows(&rows))?;

        let positives = labels.iter().filter(|l| l.is_positive()).count();
        info!(
            samples = matrix.len(),
            positives,
            negatives = labels.len() - positives,
            "training data prepared"
        );
        Ok((matrix, labels))
    }

    /// Normalize serving-time rows with the fitted transform
    pub fn transform_rows(&self, rows: &[FeatureRow]) -> Result<FeatureMatrix> {
        self.normalizer.transform(&FeatureMatrix::from_feature_rows(rows))
    }
}

fn index_by<'a, T>(items: &'a [T], key: impl Fn(&T) -> &String, kind: &str) -> HashMap<&'a str, &'a T> {
    let mut index = HashMap::with_capacity(items.len());
    for item in items {
        let id = key(item).as_str();
        if index.contains_key(id) {
            debug!(id, kind, "duplicate identifier; keeping the first record");
            continue;
        }
        index.insert(id, item);
    }
    index
}
