use crate::config::BlendConfig;
use crate::model::ModelEstimate;
use crate::{clamp01, ConfidenceInterval, ModelUsage};

#[derive(Debug, Clone, PartialEq)]
pub struct Blend {
    pub probability: f64,
    pub ml_probability: f64,
    pub ml_confidence: f64,
    pub model_weight: f64,
    pub usage: ModelUsage,
    pub model_id: Option<String>,
    pub interval: ConfidenceInterval,
}

#[derive(Debug, Clone)]
pub struct ModelBlender {
    config: BlendConfig,
}

impl ModelBlender {
    pub fn new(config: BlendConfig) -> Self {
        Self { config }
    }

    pub fn model_weight(&self, estimate: &ModelEstimate) -> f64 {
        let mut weight = clamp01(estimate.confidence);
        if !estimate.real_data {
            weight *= self.config.synthetic_discount;
        }
        weight.min(self.config.max_model_weight)
    }

    pub fn blend(&self, formula_probability: f64, estimate: Option<&ModelEstimate>) -> Blend {
        let usable = estimate.filter(|estimate| estimate.is_usable());
        let Some(estimate) = usable else {
            return self.formula_only(formula_probability);
        };

        let ml_probability = clamp01(estimate.probability);
        let weight = self.model_weight(estimate);
        if weight <= 0.0 {
            return self.formula_only(formula_probability);
        }

        let probability = weight * ml_probability + (1.0 - weight) * formula_probability;
        let spread = (ml_probability - formula_probability).abs();
        let half_width = self.config.base_half_width + self.config.spread_factor * spread;

        Blend {
            probability,
            ml_probability,
            ml_confidence: clamp01(estimate.confidence),
            model_weight: weight,
            usage: ModelUsage::Blended,
            model_id: Some(estimate.model_id.clone()),
            interval: interval_around(probability, half_width),
        }
    }

    fn formula_only(&self, formula_probability: f64) -> Blend {
        Blend {
            probability: formula_probability,
            ml_probability: 0.0,
            ml_confidence: 0.0,
            model_weight: 0.0,
            usage: ModelUsage::FormulaOnly,
            model_id: None,
            interval: interval_around(formula_probability, self.config.formula_only_half_width),
        }
    }
}

fn interval_around(probability: f64, half_width: f64) -> ConfidenceInterval {
    ConfidenceInterval {
        low: clamp01(probability - half_width),
        high: clamp01(probability + half_width),
    }
}
