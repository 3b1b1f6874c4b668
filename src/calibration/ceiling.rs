use crate::config::{SelectivityConfig, TierCalibration, TierConfig};
use crate::{ConfidenceInterval, SelectivityTier};

#[derive(Debug, Clone)]
pub struct TierCalibrator {
    tiers: TierConfig,
    min_probability: f64,
    max_probability: f64,
}

impl TierCalibrator {
    pub fn new(tiers: TierConfig, bounds: &SelectivityConfig) -> Self {
        Self {
            tiers,
            min_probability: bounds.min_probability,
            max_probability: bounds.max_probability,
        }
    }

    pub fn settings(&self, tier: SelectivityTier) -> TierCalibration {
        match tier {
            SelectivityTier::Elite => self.tiers.elite,
            SelectivityTier::HighlySelective => self.tiers.highly_selective,
            SelectivityTier::Selective => self.tiers.selective,
            SelectivityTier::LessSelective => self.tiers.less_selective,
            SelectivityTier::Unknown => self.tiers.unknown,
        }
    }

    pub fn ceiling(&self, tier: SelectivityTier) -> f64 {
        self.settings(tier).ceiling
    }

    pub fn calibrate(&self, blended: f64, tier: SelectivityTier) -> f64 {
        let settings = self.settings(tier);
        let value = if blended.is_finite() { blended } else { 0.0 };
        (value * settings.scale)
            .min(settings.ceiling)
            .clamp(self.min_probability, self.max_probability)
    }

    // same monotone map as the point estimate, so the interval still brackets it
    pub fn calibrate_interval(
        &self,
        interval: ConfidenceInterval,
        tier: SelectivityTier,
    ) -> ConfidenceInterval {
        ConfidenceInterval {
            low: self.calibrate(interval.low, tier),
            high: self.calibrate(interval.high, tier),
        }
    }
}
