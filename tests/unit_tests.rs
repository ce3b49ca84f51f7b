// Unit tests for Talent Match

use talent_match::core::scoring::{
    academic_match, domain_match, experience_match, language_match, location_match, salary_match, skill_match,
    DomainKeywords, MISSING_DOMAIN_SCORE, NEUTRAL_SCORE,
};
use talent_match::core::{MatchError, Normalizer, StatusVocabulary};
use talent_match::models::{
    FeatureMatrix, Label, Language, ProficiencyLevel, ProfessionalLevel, RawCandidate, RawJob, SalaryRange,
};

fn skills(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

#[test]
fn test_skill_match_is_case_insensitive_jaccard() {
    let candidate = skills(&["Python", "Django", "Flask", "PostgreSQL", "Docker", "Git"]);
    let job = skills(&["python", "django", "postgresql", "docker", "aws"]);
    // 4 shared out of 7 distinct
    assert!((skill_match(&candidate, &job) - 4.0 / 7.0).abs() < 1e-12);
}

#[test]
fn test_experience_bands_per_level() {
    assert_eq!(experience_match(1, Some(ProfessionalLevel::Junior)), 1.0);
    assert_eq!(experience_match(4, Some(ProfessionalLevel::Mid)), 1.0);
    assert_eq!(experience_match(12, Some(ProfessionalLevel::Lead)), 1.0);
    assert_eq!(experience_match(9, Some(ProfessionalLevel::Specialist)), 1.0);
    // Zero years against a junior floor of zero stays inside the band
    assert_eq!(experience_match(0, Some(ProfessionalLevel::Junior)), 1.0);
    assert!(experience_match(1, Some(ProfessionalLevel::Lead)) < 0.2);
}

#[test]
fn test_salary_single_value_range() {
    let range = SalaryRange::new(10000.0, 10000.0);
    assert_eq!(salary_match(Some(10000.0), range), 1.0);
    assert!((salary_match(Some(12000.0), range) - 0.8).abs() < 1e-12);
}

#[test]
fn test_neutral_defaults() {
    assert_eq!(experience_match(5, None), NEUTRAL_SCORE);
    assert_eq!(salary_match(None, None), NEUTRAL_SCORE);
    assert_eq!(location_match(None, None), NEUTRAL_SCORE);
    assert_eq!(language_match(None, None), NEUTRAL_SCORE);
    assert_eq!(academic_match(None), NEUTRAL_SCORE);
}

#[test]
fn test_language_labels_in_portuguese() {
    let candidate = ProficiencyLevel::from_label("Intermediário");
    let required = ProficiencyLevel::from_label("Avançado");
    assert!((language_match(candidate, required) - 2.0 / 3.0).abs() < 1e-12);

    let not_required = ProficiencyLevel::from_label("Não requerido");
    assert_eq!(language_match(ProficiencyLevel::from_label("Não possui"), not_required), 1.0);
}

#[test]
fn test_domain_keywords_substring_match() {
    let keywords = DomainKeywords::default();
    assert_eq!(domain_match(&skills(&["S/4HANA migration"]), true, &keywords), 1.0);
    assert_eq!(domain_match(&skills(&["React"]), true, &keywords), MISSING_DOMAIN_SCORE);
}

#[test]
fn test_raw_candidate_parses_loose_values() {
    let raw: RawCandidate = serde_json::from_str(
        r#"{
            "codigo_candidato": "41497",
            "conhecimentos_tecnicos": "SAP ABAP, SAP ECC,  , SQL Server",
            "anos_experiencia": "4",
            "pretensao_salarial": "R$ 10000",
            "nivel_ingles": "Avançado",
            "nivel_espanhol": "Não possui"
        }"#,
    )
    .unwrap();
    let record = raw.into_record(None).unwrap();

    assert_eq!(record.candidate_id, "41497");
    assert_eq!(record.skills, vec!["SAP ABAP", "SAP ECC", "SQL Server"]);
    assert_eq!(record.experience_years, 4);
    assert_eq!(record.language(Language::English), Some(ProficiencyLevel::Advanced));
    assert_eq!(record.language(Language::Spanish), Some(ProficiencyLevel::None));
}

#[test]
fn test_raw_job_defaults() {
    let raw: RawJob = serde_json::from_str(r#"{"codigo_vaga": "10976", "salario_range": "0-0"}"#).unwrap();
    let record = raw.into_record(None).unwrap();

    assert_eq!(record.level, Some(ProfessionalLevel::Mid));
    assert_eq!(record.salary_range, None);
    assert!(!record.requires_specialization);
}

#[test]
fn test_raw_record_without_id_is_rejected() {
    let err = RawJob::default().into_record(None).unwrap_err();
    assert!(matches!(err, MatchError::Validation(_)));
}

#[test]
fn test_status_labels() {
    let vocabulary = StatusVocabulary::default();
    assert_eq!(vocabulary.label("CONTRATADO"), Label::Positive);
    assert_eq!(vocabulary.label("Desistiu"), Label::Negative);
    assert_eq!(vocabulary.label("Cancelado"), Label::Negative);
}

#[test]
fn test_feature_matrix_validation() {
    let columns = vec!["a".to_string(), "b".to_string()];
    assert!(FeatureMatrix::new(columns.clone(), vec![vec![1.0]]).is_err());
    assert!(FeatureMatrix::new(columns.clone(), vec![vec![1.0, f64::NAN]]).is_err());
    assert!(FeatureMatrix::new(vec!["a".to_string(), "a".to_string()], vec![]).is_err());
    assert!(FeatureMatrix::new(columns, vec![vec![1.0, 2.0]]).is_ok());
}

#[test]
fn test_normalizer_reorders_columns() {
    let mut normalizer = Normalizer::new();
    let fit = FeatureMatrix::new(
        vec!["a".to_string(), "b".to_string()],
        vec![vec![0.0, 10.0], vec![2.0, 30.0]],
    )
    .unwrap();
    normalizer.fit(&fit).unwrap();

    let swapped = FeatureMatrix::new(vec!["b".to_string(), "a".to_string()], vec![vec![30.0, 2.0]]).unwrap();
    let out = normalizer.transform(&swapped).unwrap();

    assert_eq!(out.columns(), &["a".to_string(), "b".to_string()]);
    assert_eq!(out.rows()[0], vec![1.0, 1.0]);
}
