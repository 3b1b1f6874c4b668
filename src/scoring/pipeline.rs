use crate::calibration::{Categorizer, TierCalibrator};
use crate::config::PredictorConfig;
use crate::error::ConfigError;
use crate::model::ModelEstimate;
use crate::scoring::{
    strengths_and_weaknesses, ModelBlender, Normalizer, SelectivityAdjuster, WeightedScorer,
};
use crate::{
    format_percent, ApplicantProfile, Category, CollegeProfile, Factor, ModelUsage,
    PredictionResult, SelectivityTier,
};

#[derive(Debug, Clone)]
pub struct ScoringPipeline {
    normalizer: Normalizer,
    scorer: WeightedScorer,
    adjuster: SelectivityAdjuster,
    blender: ModelBlender,
    calibrator: TierCalibrator,
    categorizer: Categorizer,
    top_n: usize,
    config_version: String,
}

impl ScoringPipeline {
    pub fn new(
        normalizer: Normalizer,
        scorer: WeightedScorer,
        adjuster: SelectivityAdjuster,
        blender: ModelBlender,
        calibrator: TierCalibrator,
        categorizer: Categorizer,
    ) -> Self {
        Self {
            normalizer,
            scorer,
            adjuster,
            blender,
            calibrator,
            categorizer,
            top_n: 3,
            config_version: String::new(),
        }
    }

    pub fn from_config(config: &PredictorConfig) -> Result<Self, ConfigError> {
        let mut pipeline = Self::new(
            Normalizer::new(config.normalizer.clone()),
            WeightedScorer::new(config.weights.clone(), config.formula.clone()),
            SelectivityAdjuster::new(config.selectivity.clone(), config.tiers.clone()),
            ModelBlender::new(config.blend.clone()),
            TierCalibrator::new(config.tiers.clone(), &config.selectivity),
            Categorizer::new(config.categories.clone()),
        );
        pipeline.top_n = config.categories.top_n;
        pipeline.config_version = config.fingerprint()?;
        Ok(pipeline)
    }

    pub fn calibrator(&self) -> &TierCalibrator {
        &self.calibrator
    }

    pub fn run(
        &self,
        applicant: &ApplicantProfile,
        college: &CollegeProfile,
        major_fit: Option<f64>,
        estimate: Option<&ModelEstimate>,
    ) -> PredictionResult {
        let normalized = self.normalizer.normalize(applicant, major_fit);
        let composite = self.scorer.score(&normalized);
        let adjusted = self
            .adjuster
            .adjust(composite.formula_probability, college.acceptance_rate);
        let blend = self.blender.blend(adjusted.probability, estimate);
        let probability = self.calibrator.calibrate(blend.probability, adjusted.tier);
        let confidence_interval = self
            .calibrator
            .calibrate_interval(blend.interval, adjusted.tier);
        let open = self.adjuster.adjust(composite.formula_probability, Some(1.0));
        let attainable = self.calibrator.calibrate(open.probability, open.tier);
        let category = self
            .categorizer
            .categorize(probability, composite.strength(), attainable);
        let (strengths, weaknesses) = strengths_and_weaknesses(&composite.breakdown, self.top_n);

        tracing::debug!(
            college = %college.name,
            composite = composite.composite,
            formula = adjusted.probability,
            blended = blend.probability,
            probability,
            tier = adjusted.tier.label(),
            category = category.label(),
            "scored college"
        );

        let explanation = explain(
            &college.name,
            probability,
            adjusted.tier,
            category,
            blend.usage,
            blend.model_id.as_deref(),
            blend.model_weight,
            &strengths,
            &weaknesses,
        );

        PredictionResult {
            college: college.name.clone(),
            college_id: college.identity(),
            acceptance_rate: adjusted.acceptance_rate,
            tier: adjusted.tier,
            composite_score: composite.composite,
            raw_formula_probability: composite.formula_probability,
            formula_probability: adjusted.probability,
            ml_probability: blend.ml_probability,
            ml_confidence: blend.ml_confidence,
            model_weight: blend.model_weight,
            model_used: blend.usage,
            model_id: blend.model_id,
            blended_probability: blend.probability,
            probability,
            confidence_interval,
            category,
            factor_breakdown: composite.breakdown,
            strengths,
            weaknesses,
            explanation,
            config_version: self.config_version.clone(),
        }
    }
}

#[allow(clippy::too_many_arguments)]
fn explain(
    college: &str,
    probability: f64,
    tier: SelectivityTier,
    category: Category,
    usage: ModelUsage,
    model_id: Option<&str>,
    model_weight: f64,
    strengths: &[Factor],
    weaknesses: &[Factor],
) -> String {
    let model = match (usage, model_id) {
        (ModelUsage::Blended, Some(id)) => {
            format!("blended with model {} at {} weight", id, format_percent(model_weight))
        }
        _ => "formula only, no model estimate".to_string(),
    };

    let mut parts = vec![
        format!(
            "{} estimated chance at {} ({} tier, {})",
            format_percent(probability),
            college,
            tier.label(),
            category.label()
        ),
        model,
    ];
    if !strengths.is_empty() {
        parts.push(format!("strengths: {}", join_factors(strengths)));
    }
    if !weaknesses.is_empty() {
        parts.push(format!("weaknesses: {}", join_factors(weaknesses)));
    }
    parts.join("; ")
}

fn join_factors(factors: &[Factor]) -> String {
    factors
        .iter()
        .map(|factor| factor.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}
