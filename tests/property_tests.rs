// Property tests for Talent Match

use proptest::prelude::*;
use talent_match::core::scoring::{
    academic_match, domain_match, experience_match, language_match, location_match, salary_match, skill_match,
    DomainKeywords,
};
use talent_match::core::stats::{mean, std_dev};
use talent_match::core::{Classifier, DriftDetector, ForestParams, Normalizer, RandomForest};
use talent_match::models::{FeatureMatrix, Label, ProficiencyLevel, ProfessionalLevel, SalaryRange};

fn unit(score: f64) -> bool {
    (0.0..=1.0).contains(&score)
}

fn level() -> impl Strategy<Value = Option<ProfessionalLevel>> {
    prop_oneof![
        Just(None),
        Just(Some(ProfessionalLevel::Junior)),
        Just(Some(ProfessionalLevel::Mid)),
        Just(Some(ProfessionalLevel::Senior)),
        Just(Some(ProfessionalLevel::Lead)),
        Just(Some(ProfessionalLevel::Specialist)),
    ]
}

fn proficiency() -> impl Strategy<Value = Option<ProficiencyLevel>> {
    prop_oneof![
        Just(None),
        Just(Some(ProficiencyLevel::None)),
        Just(Some(ProficiencyLevel::Basic)),
        Just(Some(ProficiencyLevel::Intermediate)),
        Just(Some(ProficiencyLevel::Advanced)),
        Just(Some(ProficiencyLevel::Fluent)),
        Just(Some(ProficiencyLevel::Native)),
        Just(Some(ProficiencyLevel::NotRequired)),
    ]
}

fn matrix(rows: Vec<Vec<f64>>) -> FeatureMatrix {
    let width = rows.first().map(Vec::len).unwrap_or(0);
    let columns = (0..width).map(|i| format!("f{}", i)).collect();
    FeatureMatrix::new(columns, rows).unwrap()
}

proptest! {
    #[test]
    fn skill_match_is_bounded_and_symmetric(
        a in prop::collection::vec("[a-zA-Z ]{0,8}", 0..8),
        b in prop::collection::vec("[a-zA-Z ]{0,8}", 0..8),
    ) {
        let ab = skill_match(&a, &b);
        prop_assert!(unit(ab));
        prop_assert_eq!(ab, skill_match(&b, &a));
    }

    #[test]
    fn skill_match_of_non_empty_set_with_itself_is_one(
        a in prop::collection::vec("[a-z]{1,8}", 1..8),
    ) {
        prop_assert_eq!(skill_match(&a, &a), 1.0);
    }

    #[test]
    fn every_score_is_in_unit_interval(
        years in 0u32..60,
        level in level(),
        expectation in prop::option::of(1.0f64..100_000.0),
        low in 1.0f64..50_000.0,
        high in 1.0f64..50_000.0,
        have in proficiency(),
        need in proficiency(),
        candidate_location in prop::option::of("[a-zA-Z ,-]{0,16}"),
        job_location in prop::option::of("[a-zA-Z ,-]{0,16}"),
        specialized in any::<bool>(),
        credential in prop::option::of("[a-zA-Z ]{0,12}"),
    ) {
        let keywords = DomainKeywords::default();
        let skills = vec!["python".to_string()];

        prop_assert!(unit(experience_match(years, level)));
        prop_assert!(unit(salary_match(expectation, SalaryRange::new(low, high))));
        prop_assert!(unit(language_match(have, need)));
        prop_assert!(unit(location_match(candidate_location.as_deref(), job_location.as_deref())));
        prop_assert!(unit(domain_match(&skills, specialized, &keywords)));
        prop_assert!(unit(academic_match(credential.as_deref())));
    }

    #[test]
    fn experience_inside_band_scores_one(level in level()) {
        if let Some(level) = level {
            let (min, max) = level.experience_range();
            for years in min..=max {
                prop_assert_eq!(experience_match(years, Some(level)), 1.0);
            }
        }
    }

    #[test]
    fn experience_decays_away_from_nearest_bound(level in level()) {
        if let Some(level) = level {
            let (min, max) = level.experience_range();
            let score = |years: u32| experience_match(years, Some(level));

            for years in 0..min {
                prop_assert!(score(years) < score(years + 1));
            }
            for years in max..2 * max {
                prop_assert!(score(years + 1) < score(years));
            }
            prop_assert_eq!(score(2 * max), 0.0);
            prop_assert_eq!(score(3 * max), 0.0);
        }
    }

    #[test]
    fn salary_match_never_rises_outside_range(
        low in 1.0f64..50_000.0,
        high in 1.0f64..50_000.0,
        near in 0.0f64..60_000.0,
        extra in 0.0f64..60_000.0,
    ) {
        let range = SalaryRange::new(low, high);
        let bounds = range.expect("positive bounds form a range");
        let far = near + extra;
        let score = |value: f64| salary_match(Some(value), range);

        prop_assert!(score(bounds.max + far) <= score(bounds.max + near));
        prop_assert!(score(bounds.min - far) <= score(bounds.min - near));
    }

    #[test]
    fn language_match_is_monotone_in_candidate_level(a in 0u8..6, b in 0u8..6, need in 1u8..6) {
        let levels = [
            ProficiencyLevel::None,
            ProficiencyLevel::Basic,
            ProficiencyLevel::Intermediate,
            ProficiencyLevel::Advanced,
            ProficiencyLevel::Fluent,
            ProficiencyLevel::Native,
        ];
        let (lo, hi) = (a.min(b) as usize, a.max(b) as usize);
        let required = Some(levels[need as usize]);
        prop_assert!(language_match(Some(levels[lo]), required) <= language_match(Some(levels[hi]), required));
    }

    #[test]
    fn normalized_columns_are_centered(
        rows in prop::collection::vec(prop::collection::vec(-1000.0f64..1000.0, 3), 2..40),
    ) {
        let batch = matrix(rows);
        let mut normalizer = Normalizer::new();
        let out = normalizer.fit_transform(&batch).unwrap();

        for i in 0..out.columns().len() {
            let column = out.column(i);
            prop_assert!(mean(&column).abs() < 1e-6);
            let std = std_dev(&column);
            prop_assert!(std < 1e-6 || (std - 1.0).abs() < 1e-6);
        }
    }

    #[test]
    fn constant_columns_center_to_zero(
        value in -1.0f64..1.0,
        others in prop::collection::vec(-10.0f64..10.0, 2..30),
    ) {
        let rows = others.iter().map(|x| vec![value, *x]).collect();
        let mut normalizer = Normalizer::new();
        let out = normalizer.fit_transform(&matrix(rows)).unwrap();

        prop_assert_eq!(normalizer.params().unwrap().scales[0], 1.0);
        prop_assert!(out.column(0).iter().all(|v| v.abs() < 1e-12));
    }

    #[test]
    fn identical_batch_has_zero_drift(
        rows in prop::collection::vec(prop::collection::vec(-10.0f64..10.0, 2), 1..30),
    ) {
        let batch = matrix(rows);
        let mut detector = DriftDetector::default();
        detector.set_reference(&batch).unwrap();
        prop_assert!(detector.feature_drift(&batch).values().all(|d| *d == 0.0));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn forest_outputs_are_probabilities_and_importance_sums_to_one(
        rows in prop::collection::vec(prop::collection::vec(-5.0f64..5.0, 4), 4..40),
        seed in any::<u64>(),
    ) {
        let labels: Vec<Label> = rows.iter().map(|r| if r[0] > 0.0 { Label::Positive } else { Label::Negative }).collect();
        let mut forest = RandomForest::new(ForestParams {
            n_estimators: 8,
            random_state: seed,
            ..Default::default()
        });
        forest.fit(&rows, &labels).unwrap();

        for p in forest.predict_proba(&rows).unwrap() {
            prop_assert!(unit(p[0]) && unit(p[1]));
            prop_assert!((p[0] + p[1] - 1.0).abs() < 1e-9);
        }

        let importance = forest.feature_importance().unwrap();
        prop_assert_eq!(importance.len(), 4);
        prop_assert!((importance.iter().sum::<f64>() - 1.0).abs() < 1e-9);
    }
}
