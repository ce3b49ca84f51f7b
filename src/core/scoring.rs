use std::collections::HashSet;

use crate::models::{ProficiencyLevel, ProfessionalLevel, SalaryRange};

/// Score returned when an attribute cannot be compared meaningfully
pub const NEUTRAL_SCORE: f64 = 0.5;

/// Location score for different, non-disqualifying locations
pub const REMOTE_LOCATION_SCORE: f64 = 0.3;

/// Domain score when a specialized job meets a candidate without domain skills
pub const MISSING_DOMAIN_SCORE: f64 = 0.2;

/// Keywords identifying SAP/ERP expertise in a skill entry
pub const SAP_KEYWORDS: [&str; 10] = [
    "sap", "abap", "hana", "s/4hana", "ecc", "fico", "mm", "sd", "pp", "hr",
];

/// Metro areas whose aliases count as the same location
const METRO_ALIASES: [&[&str]; 2] = [
    &["são paulo", "sao paulo", "sp"],
    &["rio de janeiro", "rj"],
];

/// Keyword set used to detect a domain specialization in candidate skills
#[derive(Debug, Clone, PartialEq)]
pub struct DomainKeywords {
    keywords: Vec<String>,
}

impl DomainKeywords {
    pub fn new<I, S>(keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Self {
            keywords: keywords
                .into_iter()
                .map(|k| k.as_ref().trim().to_lowercase())
                .filter(|k| !k.is_empty())
                .collect(),
        }
    }

    /// True when any skill contains any keyword (case-insensitive substring)
    pub fn matches_any(&self, skills: &[String]) -> bool {
        skills.iter().any(|skill| {
            let skill = skill.to_lowercase();
            self.keywords.iter().any(|k| skill.contains(k.as_str()))
        })
    }
}

impl Default for DomainKeywords {
    fn default() -> Self {
        Self::new(SAP_KEYWORDS)
    }
}

fn skill_set(skills: &[String]) -> HashSet<String> {
    skills
        .iter()
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

/// Jaccard similarity of the two skill sets (0-1)
///
/// Skills are compared lower-cased and trimmed. Returns 0.0 when either
/// side is empty.
pub fn skill_match(candidate_skills: &[String], job_skills: &[String]) -> f64 {
    let candidate = skill_set(candidate_skills);
    let job = skill_set(job_skills);

    if candidate.is_empty() || job.is_empty() {
        return 0.0;
    }

    let intersection = candidate.intersection(&job).count() as f64;
    let union = candidate.union(&job).count() as f64;

    intersection / union
}

/// Linear decay outside `[min, max]`, normalized by the exceeded bound
#[inline]
fn range_score(value: f64, min: f64, max: f64) -> f64 {
    if value >= min && value <= max {
        return 1.0;
    }

    let score = if value < min {
        1.0 - (min - value) / min
    } else {
        1.0 - (value - max) / max
    };

    score.max(0.0)
}

/// Experience fit (0-1) against the range implied by the job level
///
/// 1.0 inside the range, decaying linearly with the distance to the
/// nearest bound. Unrecognized levels score neutral.
pub fn experience_match(years: u32, level: Option<ProfessionalLevel>) -> f64 {
    let Some(level) = level else {
        return NEUTRAL_SCORE;
    };

    let (min, max) = level.experience_range();
    range_score(years as f64, min as f64, max as f64)
}

/// Salary fit (0-1) of an expectation against the offered range
///
/// Neutral when either side is unknown.
pub fn salary_match(expectation: Option<f64>, range: Option<SalaryRange>) -> f64 {
    match (expectation, range) {
        (Some(expectation), Some(range)) => range_score(expectation, range.min, range.max),
        _ => NEUTRAL_SCORE,
    }
}

fn words(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_string)
        .collect()
}

fn contains_phrase(haystack: &[String], phrase: &str) -> bool {
    let needle = words(phrase);
    if needle.is_empty() || needle.len() > haystack.len() {
        return false;
    }
    haystack.windows(needle.len()).any(|w| w == needle.as_slice())
}

fn metro_area(location: &str) -> Option<usize> {
    let tokens = words(location);
    METRO_ALIASES
        .iter()
        .position(|aliases| aliases.iter().any(|alias| contains_phrase(&tokens, alias)))
}

/// Location compatibility (0-1)
///
/// Same place or same metro area scores 1.0; anything else 0.3 since
/// relocation or remote work keeps the pairing viable.
pub fn location_match(candidate: Option<&str>, job: Option<&str>) -> f64 {
    let candidate = candidate.map(str::trim).filter(|s| !s.is_empty());
    let job = job.map(str::trim).filter(|s| !s.is_empty());

    let (Some(candidate), Some(job)) = (candidate, job) else {
        return NEUTRAL_SCORE;
    };

    if candidate.to_lowercase() == job.to_lowercase() {
        return 1.0;
    }

    match (metro_area(candidate), metro_area(job)) {
        (Some(a), Some(b)) if a == b => 1.0,
        _ => REMOTE_LOCATION_SCORE,
    }
}

/// Language proficiency fit (0-1)
///
/// A "not required" requirement always scores 1.0. Otherwise a candidate
/// at or above the requirement scores 1.0, a candidate with no knowledge
/// scores 0.0 and anything between is the ratio of the two ordinals.
pub fn language_match(candidate: Option<ProficiencyLevel>, required: Option<ProficiencyLevel>) -> f64 {
    if required == Some(ProficiencyLevel::NotRequired) {
        return 1.0;
    }

    let (Some(candidate), Some(required)) = (candidate, required) else {
        return NEUTRAL_SCORE;
    };

    // A candidate cannot be "not required"; treat it as no knowledge.
    let have = candidate.ordinal().unwrap_or(0) as f64;
    let need = required.ordinal().unwrap_or(0) as f64;

    if have >= need {
        1.0
    } else if have == 0.0 {
        0.0
    } else {
        have / need
    }
}

/// Domain-specialization fit (0-1)
pub fn domain_match(candidate_skills: &[String], requires_specialization: bool, keywords: &DomainKeywords) -> f64 {
    if !requires_specialization {
        return 1.0;
    }

    if keywords.matches_any(candidate_skills) {
        1.0
    } else {
        MISSING_DOMAIN_SCORE
    }
}

/// Academic credential score: any recorded credential counts
pub fn academic_match(credential: Option<&str>) -> f64 {
    match credential.map(str::trim) {
        Some(c) if !c.is_empty() => 1.0,
        _ => NEUTRAL_SCORE,
    }
}
