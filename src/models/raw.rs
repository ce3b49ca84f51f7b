//! Boundary parsing from loosely typed records into canonical ones.
//!
//! Upstream exports carry skills either as a list or a comma separated
//! string, salaries as numbers or currency-formatted text, and field names
//! in Portuguese or English. Everything is normalized here so the scoring
//! engine only ever works with the types in [`crate::models::domain`].

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::error::{MatchError, Result};
use crate::models::domain::{
    ApplicationRecord, CandidateRecord, JobRecord, Language, ProficiencyLevel, ProfessionalLevel,
    SalaryRange,
};

/// A value that may arrive as a list or as delimited text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ListOrText {
    List(Vec<String>),
    Text(String),
}

/// A value that may arrive as a JSON number or as formatted text
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NumberOrText {
    Number(f64),
    Text(String),
}

/// Candidate as exported by the applicant tracking system
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawCandidate {
    #[serde(default, alias = "id", alias = "codigo_candidato")]
    pub candidate_id: Option<String>,
    #[serde(default, alias = "conhecimentos_tecnicos")]
    pub skills: Option<ListOrText>,
    #[serde(default, alias = "anos_experiencia")]
    pub experience_years: Option<NumberOrText>,
    #[serde(default, alias = "localizacao")]
    pub location: Option<String>,
    #[serde(default, alias = "pretensao_salarial")]
    pub salary_expectation: Option<NumberOrText>,
    #[serde(default, alias = "nivel_ingles")]
    pub english_level: Option<String>,
    #[serde(default, alias = "nivel_espanhol")]
    pub spanish_level: Option<String>,
    #[serde(default, alias = "nivel_academico")]
    pub academic_level: Option<String>,
}

/// Job posting as exported by the applicant tracking system
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawJob {
    #[serde(default, alias = "id", alias = "codigo_vaga")]
    pub job_id: Option<String>,
    #[serde(default, alias = "titulo")]
    pub title: Option<String>,
    #[serde(default, alias = "competencias_tecnicas")]
    pub required_skills: Option<ListOrText>,
    #[serde(default, alias = "nivel_profissional")]
    pub experience_level: Option<String>,
    #[serde(default, alias = "localizacao")]
    pub location: Option<String>,
    #[serde(default, alias = "salario_range")]
    pub salary_range: Option<NumberOrText>,
    #[serde(default, alias = "nivel_ingles")]
    pub english_requirement: Option<String>,
    #[serde(default, alias = "nivel_espanhol")]
    pub spanish_requirement: Option<String>,
    #[serde(default, alias = "is_sap")]
    pub requires_specialization: Option<bool>,
}

/// One prospect entry nested under a job in the prospects export
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawProspect {
    #[serde(default, alias = "codigo_candidato")]
    pub candidate_id: Option<String>,
    #[serde(default, alias = "situacao")]
    pub status: Option<String>,
    #[serde(default, alias = "comentario")]
    pub comment: Option<String>,
}

impl RawCandidate {
    /// Convert into a canonical record
    ///
    /// `id_override` (e.g. the key of a keyed export) takes precedence over
    /// the embedded identifier. A missing identifier is a validation error;
    /// every other field degrades to an empty or absent value.
    pub fn into_record(self, id_override: Option<&str>) -> Result<CandidateRecord> {
        let candidate_id = resolve_id(id_override, self.candidate_id.as_deref(), "candidate")?;

        let mut languages = BTreeMap::new();
        insert_level(&mut languages, Language::English, self.english_level.as_deref());
        insert_level(&mut languages, Language::Spanish, self.spanish_level.as_deref());

        Ok(CandidateRecord {
            candidate_id,
            skills: parse_skills(self.skills.as_ref()),
            experience_years: parse_years(self.experience_years.as_ref()),
            location: non_blank(self.location),
            salary_expectation: self
                .salary_expectation
                .as_ref()
                .and_then(parse_amount)
                .filter(|value| *value > 0.0),
            languages,
            academic_level: non_blank(self.academic_level),
        })
    }
}

impl RawJob {
    /// Convert into a canonical record
    ///
    /// A missing level label defaults to mid-level; an unrecognized one is
    /// kept as `None` so experience scoring falls back to neutral.
    pub fn into_record(self, id_override: Option<&str>) -> Result<JobRecord> {
        let job_id = resolve_id(id_override, self.job_id.as_deref(), "job")?;

        let level = match non_blank(self.experience_level) {
            Some(label) => ProfessionalLevel::from_label(&label),
            None => Some(ProfessionalLevel::Mid),
        };

        let mut languages = BTreeMap::new();
        insert_level(&mut languages, Language::English, self.english_requirement.as_deref());
        insert_level(&mut languages, Language::Spanish, self.spanish_requirement.as_deref());

        Ok(JobRecord {
            job_id,
            title: non_blank(self.title),
            required_skills: parse_skills(self.required_skills.as_ref()),
            level,
            salary_range: self.salary_range.as_ref().and_then(parse_salary_range),
            location: non_blank(self.location),
            languages,
            requires_specialization: self.requires_specialization.unwrap_or(false),
        })
    }
}

impl RawProspect {
    pub fn into_record(self, job_id: &str) -> Result<ApplicationRecord> {
        let candidate_id = resolve_id(None, self.candidate_id.as_deref(), "prospect candidate")?;
        Ok(ApplicationRecord {
            candidate_id,
            job_id: job_id.to_string(),
            status: self.status.unwrap_or_default(),
            comment: non_blank(self.comment),
        })
    }
}

fn resolve_id(id_override: Option<&str>, embedded: Option<&str>, kind: &str) -> Result<String> {
    id_override
        .or(embedded)
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .ok_or_else(|| MatchError::validation(format!("{} record is missing an identifier", kind)))
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn insert_level(
    languages: &mut BTreeMap<Language, ProficiencyLevel>,
    language: Language,
    label: Option<&str>,
) {
    if let Some(level) = label.and_then(ProficiencyLevel::from_label) {
        languages.insert(language, level);
    }
}

/// Split skills into trimmed, non-empty entries preserving order
pub fn parse_skills(value: Option<&ListOrText>) -> Vec<String> {
    let items: Vec<String> = match value {
        Some(ListOrText::List(items)) => items.clone(),
        Some(ListOrText::Text(text)) => text.split(',').map(str::to_string).collect(),
        None => Vec::new(),
    };

    items
        .into_iter()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Experience years; unparseable or negative values count as zero
pub fn parse_years(value: Option<&NumberOrText>) -> u32 {
    let years = match value {
        Some(NumberOrText::Number(n)) => *n,
        Some(NumberOrText::Text(text)) => text.trim().parse::<f64>().unwrap_or(0.0),
        None => 0.0,
    };

    if years.is_finite() && years > 0.0 {
        years.floor().min(u32::MAX as f64) as u32
    } else {
        0
    }
}

/// Parse a monetary amount, stripping currency symbols and thousands commas
pub fn parse_amount(value: &NumberOrText) -> Option<f64> {
    match value {
        NumberOrText::Number(n) if n.is_finite() => Some(*n),
        NumberOrText::Number(_) => None,
        NumberOrText::Text(text) => parse_amount_text(text),
    }
}

fn parse_amount_text(text: &str) -> Option<f64> {
    let cleaned: String = text
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.')
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Parse `"min-max"` or a single advertised value
pub fn parse_salary_range(value: &NumberOrText) -> Option<SalaryRange> {
    match value {
        NumberOrText::Number(n) => SalaryRange::new(*n, *n),
        NumberOrText::Text(text) => {
            let parts: Vec<&str> = text.split('-').collect();
            match parts.as_slice() {
                [single] => {
                    let v = parse_amount_text(single)?;
                    SalaryRange::new(v, v)
                }
                [low, high] => SalaryRange::new(parse_amount_text(low)?, parse_amount_text(high)?),
                _ => None,
            }
        }
    }
}
