use crate::config::{SelectivityConfig, TierConfig};
use crate::SelectivityTier;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SelectivityAdjustment {
    pub acceptance_rate: Option<f64>,
    pub tier: SelectivityTier,
    pub selectivity: f64,
    pub factor: f64,
    pub probability: f64,
}

#[derive(Debug, Clone)]
pub struct SelectivityAdjuster {
    config: SelectivityConfig,
    tiers: TierConfig,
}

impl SelectivityAdjuster {
    pub fn new(config: SelectivityConfig, tiers: TierConfig) -> Self {
        Self { config, tiers }
    }

    pub fn tier(&self, acceptance_rate: Option<f64>) -> SelectivityTier {
        match valid_rate(acceptance_rate) {
            None => SelectivityTier::Unknown,
            Some(rate) if rate < self.tiers.elite_max_rate => SelectivityTier::Elite,
            Some(rate) if rate < self.tiers.highly_selective_max_rate => {
                SelectivityTier::HighlySelective
            }
            Some(rate) if rate < self.tiers.selective_max_rate => SelectivityTier::Selective,
            Some(_) => SelectivityTier::LessSelective,
        }
    }

    pub fn selectivity(&self, acceptance_rate: Option<f64>) -> f64 {
        let rate = valid_rate(acceptance_rate).unwrap_or(self.config.median_acceptance_rate);
        10.0 - rate * 10.0
    }

    pub fn adjust(&self, formula_probability: f64, acceptance_rate: Option<f64>) -> SelectivityAdjustment {
        let rate = valid_rate(acceptance_rate);
        if rate.is_none() {
            tracing::debug!(?acceptance_rate, "no usable acceptance rate, assuming median selectivity");
        }

        let selectivity = self.selectivity(rate);
        let factor = (1.0 - selectivity * self.config.k).max(0.0);
        let probability = self.bound(formula_probability * factor);

        SelectivityAdjustment {
            acceptance_rate: rate,
            tier: self.tier(rate),
            selectivity,
            factor,
            probability,
        }
    }

    pub fn bound(&self, probability: f64) -> f64 {
        if !probability.is_finite() {
            return self.config.min_probability;
        }
        probability.clamp(self.config.min_probability, self.config.max_probability)
    }
}

fn valid_rate(rate: Option<f64>) -> Option<f64> {
    rate.filter(|value| value.is_finite() && *value > 0.0 && *value <= 1.0)
}
