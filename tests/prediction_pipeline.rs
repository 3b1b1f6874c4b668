use admit_odds::model::ModelEstimate;
use admit_odds::{
    AcademicRecord, AdmissionPredictor, ApplicantProfile, Category, CollegeProfile, CollegeRecord,
    Factor, ModelUsage, PredictorConfig, RawApplicant, SelectivityTier,
};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::json;

fn predictor() -> AdmissionPredictor {
    AdmissionPredictor::new(PredictorConfig::default()).unwrap()
}

fn random_applicant(rng: &mut StdRng) -> ApplicantProfile {
    let mut applicant = ApplicantProfile::uniform(0.0);
    for factor in Factor::ALL {
        applicant = applicant.with_factor(factor, rng.gen_range(0.0..=10.0));
    }
    applicant
}

#[test]
fn top_applicant_at_elite_college_stays_a_reach() {
    let result = predictor().score(
        &ApplicantProfile::uniform(10.0),
        &CollegeProfile::with_rate("Ivy Example", Some(0.04)),
    );

    assert_eq!(result.tier, SelectivityTier::Elite);
    assert!(result.probability <= 0.12 + 1e-12);
    assert_eq!(result.category, Category::Reach);
    assert!(result.confidence_interval.high <= 0.12 + 1e-12);
}

#[test]
fn neutral_applicant_at_open_college_is_a_safety() {
    let result = predictor().score(
        &ApplicantProfile::uniform(5.0),
        &CollegeProfile::with_rate("Open State", Some(0.70)),
    );

    assert_eq!(result.tier, SelectivityTier::LessSelective);
    assert!(result.probability >= 0.5);
    assert_eq!(result.category, Category::Safety);
    assert_eq!(result.model_used, ModelUsage::FormulaOnly);
}

#[test]
fn missing_acceptance_rate_uses_unknown_tier() {
    let result = predictor().score(
        &ApplicantProfile::uniform(7.0),
        &CollegeProfile::with_rate("Mystery College", None),
    );

    assert_eq!(result.tier, SelectivityTier::Unknown);
    assert_eq!(result.acceptance_rate, None);
    assert!(result.probability > 0.0 && result.probability < 1.0);
}

#[test]
fn percent_rates_are_rescaled_by_the_catalog_only() {
    let predictor = predictor();
    let applicant = ApplicantProfile::uniform(6.0);

    let record: CollegeRecord =
        serde_json::from_value(json!({ "name": "Percent U", "acceptance_rate": "35%" })).unwrap();
    let from_catalog = predictor.score(&applicant, &CollegeProfile::from_record(&record));
    let fraction = predictor.score(&applicant, &CollegeProfile::with_rate("Percent U", Some(0.35)));
    assert_eq!(from_catalog.tier, SelectivityTier::Selective);
    assert!((from_catalog.probability - fraction.probability).abs() < 1e-12);

    let direct = predictor.score(&applicant, &CollegeProfile::with_rate("Percent U", Some(35.0)));
    assert_eq!(direct.tier, SelectivityTier::Unknown);
    assert_eq!(direct.acceptance_rate, None);
}

#[test]
fn scoring_is_deterministic() {
    let predictor = predictor();
    let applicant = ApplicantProfile::uniform(6.5)
        .with_factor(Factor::Essay, 9.0)
        .with_academics(AcademicRecord {
            unweighted_gpa: Some(3.7),
            sat_total: Some(1400.0),
            ..AcademicRecord::default()
        });
    let college = CollegeProfile::with_rate("River University", Some(0.22));

    let first = predictor.score(&applicant, &college);
    let second = predictor.score(&applicant, &college);
    assert_eq!(first, second);
}

#[test]
fn without_model_blended_equals_formula() {
    let result = predictor().score(
        &ApplicantProfile::uniform(8.0),
        &CollegeProfile::with_rate("Harbor College", Some(0.3)),
    );

    assert_eq!(result.model_used, ModelUsage::FormulaOnly);
    assert_eq!(result.blended_probability, result.formula_probability);
    assert_eq!(result.model_weight, 0.0);
    assert!(result.model_id.is_none());
}

#[test]
fn usable_estimate_moves_the_blend_toward_the_model() {
    let predictor = predictor();
    let applicant = ApplicantProfile::uniform(6.0);
    let college = CollegeProfile::with_rate("Harbor College", Some(0.5));
    let estimate = ModelEstimate {
        probability: 0.95,
        confidence: 0.6,
        model_id: "gbm-v3".to_string(),
        real_data: true,
    };

    let blended = predictor.score_with_estimate(&applicant, &college, Some(&estimate));

    assert_eq!(blended.model_used, ModelUsage::Blended);
    assert_eq!(blended.model_id.as_deref(), Some("gbm-v3"));
    assert!((blended.model_weight - 0.6).abs() < 1e-12);
    let expected = 0.6 * 0.95 + 0.4 * blended.formula_probability;
    assert!((blended.blended_probability - expected).abs() < 1e-12);
    assert!(blended.explanation.contains("gbm-v3"));
}

#[test]
fn zero_confidence_estimate_is_ignored() {
    let predictor = predictor();
    let applicant = ApplicantProfile::uniform(6.0);
    let college = CollegeProfile::with_rate("Harbor College", Some(0.5));
    let estimate = ModelEstimate {
        probability: 0.95,
        confidence: 0.0,
        model_id: "gbm-v3".to_string(),
        real_data: true,
    };

    let with_estimate = predictor.score_with_estimate(&applicant, &college, Some(&estimate));
    let without = predictor.score(&applicant, &college);
    assert_eq!(with_estimate, without);
}

#[test]
fn raising_any_factor_never_lowers_probability() {
    let predictor = predictor();
    let mut rng = StdRng::seed_from_u64(7);
    let rates = [0.03, 0.12, 0.3, 0.6, 0.9];

    for _ in 0..200 {
        let applicant = random_applicant(&mut rng);
        let factor = Factor::ALL[rng.gen_range(0..Factor::COUNT)];
        let bumped = applicant
            .clone()
            .with_factor(factor, applicant.factors.get(factor) + rng.gen_range(0.1..3.0));
        let rate = rates[rng.gen_range(0..rates.len())];
        let college = CollegeProfile::with_rate("Sweep College", Some(rate));

        let before = predictor.score(&applicant, &college);
        let after = predictor.score(&bumped, &college);
        assert!(
            after.probability + 1e-12 >= before.probability,
            "{} dropped from {} to {}",
            factor,
            before.probability,
            after.probability
        );
    }
}

#[test]
fn probabilities_respect_tier_ceilings_and_bounds() {
    let predictor = predictor();
    let calibrator = predictor.pipeline().calibrator();
    let mut rng = StdRng::seed_from_u64(42);

    for _ in 0..300 {
        let applicant = random_applicant(&mut rng);
        let rate = if rng.gen_bool(0.1) {
            None
        } else {
            Some(rng.gen_range(0.01..1.0))
        };
        let result = predictor.score(&applicant, &CollegeProfile::with_rate("Bound College", rate));

        assert!(result.probability >= 0.01 - 1e-12);
        assert!(result.probability <= 0.95 + 1e-12);
        assert!(result.probability <= calibrator.ceiling(result.tier) + 1e-12);
        assert!(result.confidence_interval.contains(result.probability));
        assert!((0.0..=1000.0).contains(&result.composite_score));
    }
}

#[test]
fn harder_colleges_never_score_higher() {
    let predictor = predictor();
    let mut rng = StdRng::seed_from_u64(1234);

    for _ in 0..40 {
        let applicant = random_applicant(&mut rng);
        let mut previous = 0.0;
        for step in 1..=49 {
            let rate = step as f64 / 50.0;
            let result = predictor.score(&applicant, &CollegeProfile::with_rate("Ladder", Some(rate)));
            assert!(
                result.probability + 1e-12 >= previous,
                "probability fell from {} to {} at acceptance rate {}",
                previous,
                result.probability,
                rate
            );
            previous = result.probability;
        }
    }
}

#[test]
fn probability_strictly_falls_with_acceptance_inside_each_tier() {
    let predictor = predictor();
    let applicant = ApplicantProfile::uniform(4.0);
    let bands = [
        (SelectivityTier::Elite, 1..=9),
        (SelectivityTier::HighlySelective, 10..=19),
        (SelectivityTier::Selective, 20..=39),
        (SelectivityTier::LessSelective, 40..=100),
    ];

    for (tier, percents) in bands {
        let mut previous: Option<f64> = None;
        for percent in percents {
            let rate = percent as f64 / 100.0;
            let result = predictor.score(&applicant, &CollegeProfile::with_rate("Band", Some(rate)));
            assert_eq!(result.tier, tier, "rate {}", rate);
            assert!(result.probability < predictor.pipeline().calibrator().ceiling(tier));
            if let Some(previous) = previous {
                assert!(
                    result.probability > previous,
                    "{:?}: {} not above {} at rate {}",
                    tier,
                    result.probability,
                    previous,
                    rate
                );
            }
            previous = Some(result.probability);
        }
    }
}

#[test]
fn raw_payload_with_bad_values_still_scores() {
    let raw: RawApplicant = serde_json::from_value(json!({
        "factors": {
            "grades": "9",
            "essay": "excellent",
            "rigor": 14,
            "charisma": 8
        },
        "unweighted_gpa": "3.9",
        "sat_total": "n/a",
        "intended_major": "  Physics "
    }))
    .unwrap();

    let applicant = ApplicantProfile::from_raw(&raw);
    assert_eq!(applicant.warnings.len(), 4);
    assert_eq!(applicant.intended_major.as_deref(), Some("Physics"));
    assert_eq!(applicant.factors.get(Factor::Essay), 5.0);
    assert_eq!(applicant.factors.get(Factor::Rigor), 10.0);
    assert_eq!(applicant.academics.unweighted_gpa, Some(3.9));
    assert_eq!(applicant.academics.sat_total, None);

    let result = predictor().score(&applicant, &CollegeProfile::with_rate("Any", Some(0.4)));
    assert!(result.probability.is_finite());
}

#[test]
fn breakdown_lists_every_factor_once() {
    let result = predictor().score(
        &ApplicantProfile::uniform(6.0).with_factor(Factor::Interview, 10.0),
        &CollegeProfile::with_rate("Grove College", Some(0.45)),
    );

    assert_eq!(result.factor_breakdown.len(), Factor::COUNT);
    let total: f64 = result.factor_breakdown.iter().map(|item| item.contribution).sum();
    assert!((total - result.composite_score).abs() < 1e-6);
    assert!(result.strengths.contains(&Factor::Interview));
    assert!(!result.config_version.is_empty());
}
