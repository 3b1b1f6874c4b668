use crate::config::CategoryConfig;
use crate::{clamp01, Category};

const MIN_SAFETY_CUT: f64 = 0.25;
const MAX_SAFETY_CUT: f64 = 0.75;
const MIN_REACH_CUT: f64 = 0.05;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub safety: f64,
    pub reach: f64,
}

#[derive(Debug, Clone)]
pub struct Categorizer {
    config: CategoryConfig,
}

impl Categorizer {
    pub fn new(config: CategoryConfig) -> Self {
        Self { config }
    }

    // `strength` is composite / 1000. `attainable` is the applicant's calibrated
    // probability at an open-admission college, the best they can reach anywhere.
    pub fn thresholds(&self, strength: f64, attainable: f64) -> Thresholds {
        let offset = clamp01(strength) - 0.5;
        let attainable = clamp01(attainable);

        let safety = (self.config.safety_base + self.config.safety_slope * offset)
            .clamp(MIN_SAFETY_CUT, MAX_SAFETY_CUT)
            .min(attainable * self.config.safety_share);
        let gap = self.config.min_gap.min(safety / 2.0);
        let reach = (self.config.reach_base + self.config.reach_slope * offset)
            .max(MIN_REACH_CUT)
            .min(attainable * self.config.reach_share)
            .min(safety - gap);

        Thresholds { safety, reach }
    }

    pub fn categorize(&self, probability: f64, strength: f64, attainable: f64) -> Category {
        let cuts = self.thresholds(strength, attainable);
        if probability >= cuts.safety {
            Category::Safety
        } else if probability >= cuts.reach {
            Category::Target
        } else {
            Category::Reach
        }
    }
}
