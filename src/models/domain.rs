use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Candidate profile in canonical form
///
/// Produced by the boundary parsers in [`crate::models::raw`]; scoring
/// functions never see raw representations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateRecord {
    pub candidate_id: String,
    pub skills: Vec<String>,
    pub experience_years: u32,
    pub location: Option<String>,
    pub salary_expectation: Option<f64>,
    pub languages: BTreeMap<Language, ProficiencyLevel>,
    pub academic_level: Option<String>,
}

impl CandidateRecord {
    pub fn language(&self, language: Language) -> Option<ProficiencyLevel> {
        self.languages.get(&language).copied()
    }
}

/// Job posting in canonical form
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobRecord {
    pub job_id: String,
    pub title: Option<String>,
    pub required_skills: Vec<String>,
    /// `None` when the posting's level label is not recognized
    pub level: Option<ProfessionalLevel>,
    pub salary_range: Option<SalaryRange>,
    pub location: Option<String>,
    pub languages: BTreeMap<Language, ProficiencyLevel>,
    pub requires_specialization: bool,
}

impl JobRecord {
    pub fn language(&self, language: Language) -> Option<ProficiencyLevel> {
        self.languages.get(&language).copied()
    }
}

/// Links a candidate to a job with the recorded outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationRecord {
    pub candidate_id: String,
    pub job_id: String,
    pub status: String,
    #[serde(default)]
    pub comment: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    English,
    Spanish,
}

/// Language proficiency on an ordinal scale
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProficiencyLevel {
    None,
    Basic,
    Intermediate,
    Advanced,
    Fluent,
    Native,
    /// Requirement sentinel: the job does not ask for this language
    NotRequired,
}

impl ProficiencyLevel {
    /// Ordinal value; `None` for the not-required sentinel
    pub fn ordinal(self) -> Option<u8> {
        match self {
            Self::None => Some(0),
            Self::Basic => Some(1),
            Self::Intermediate => Some(2),
            Self::Advanced => Some(3),
            Self::Fluent => Some(4),
            Self::Native => Some(5),
            Self::NotRequired => None,
        }
    }

    /// Parse a free-text proficiency label (English or Portuguese)
    ///
    /// Returns `None` for blank labels. Non-blank labels that are not
    /// recognized map to [`ProficiencyLevel::None`].
    pub fn from_label(label: &str) -> Option<Self> {
        let clean = label.trim().to_lowercase();
        if clean.is_empty() {
            return None;
        }

        let level = match clean.as_str() {
            "none" | "não possui" | "nao possui" | "nenhum" => Self::None,
            "basic" | "básico" | "basico" => Self::Basic,
            "intermediate" | "intermediário" | "intermediario" => Self::Intermediate,
            "advanced" | "avançado" | "avancado" => Self::Advanced,
            "fluent" | "fluente" => Self::Fluent,
            "native" | "nativo" => Self::Native,
            "not required" | "not-required" | "não requerido" | "nao requerido" => {
                Self::NotRequired
            }
            _ => Self::None,
        };

        Some(level)
    }
}

/// Seniority of a posting, mapped to an expected experience range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProfessionalLevel {
    Junior,
    Mid,
    Senior,
    Lead,
    Specialist,
}

impl ProfessionalLevel {
    /// Inclusive range of experience years expected for this level
    pub fn experience_range(self) -> (u32, u32) {
        match self {
            Self::Junior => (0, 2),
            Self::Mid => (2, 5),
            Self::Senior => (5, 10),
            Self::Lead => (8, 15),
            Self::Specialist => (6, 12),
        }
    }

    pub fn from_label(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "junior" | "júnior" => Some(Self::Junior),
            "mid" | "mid-level" | "pleno" => Some(Self::Mid),
            "senior" | "sênior" => Some(Self::Senior),
            "lead" => Some(Self::Lead),
            "specialist" | "especialista" => Some(Self::Specialist),
            _ => None,
        }
    }
}

/// Offered salary band; a single advertised value has `min == max`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SalaryRange {
    pub min: f64,
    pub max: f64,
}

impl SalaryRange {
    /// Build a range, swapping reversed bounds
    ///
    /// Returns `None` for non-finite or non-positive bounds, which carry
    /// no usable information (e.g. the `"0-0"` placeholder).
    pub fn new(a: f64, b: f64) -> Option<Self> {
        if !a.is_finite() || !b.is_finite() || a <= 0.0 || b <= 0.0 {
            return None;
        }
        Some(Self {
            min: a.min(b),
            max: a.max(b),
        })
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

/// Binary training target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Label {
    Negative,
    Positive,
}

impl Label {
    pub fn index(self) -> usize {
        match self {
            Self::Negative => 0,
            Self::Positive => 1,
        }
    }

    pub fn from_index(index: usize) -> Self {
        if index == 0 {
            Self::Negative
        } else {
            Self::Positive
        }
    }

    pub fn as_f64(self) -> f64 {
        self.index() as f64
    }

    pub fn is_positive(self) -> bool {
        self == Self::Positive
    }
}
