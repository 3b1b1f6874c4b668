use crate::config::NormalizerConfig;
use crate::{ApplicantProfile, Factor, FactorScores, MAX_SCORE, NEUTRAL_SCORE};

pub fn parse_number(value: &serde_json::Value) -> Option<f64> {
    let number = match value {
        serde_json::Value::Number(number) => number.as_f64(),
        serde_json::Value::String(text) => text.trim().trim_end_matches('%').parse::<f64>().ok(),
        _ => None,
    }?;
    number.is_finite().then_some(number)
}

#[derive(Debug, Clone)]
pub struct Normalizer {
    config: NormalizerConfig,
}

impl Normalizer {
    pub fn new(config: NormalizerConfig) -> Self {
        Self { config }
    }

    pub fn gpa(&self, gpa: f64, scale: f64) -> f64 {
        if !gpa.is_finite() || scale <= 0.0 {
            return NEUTRAL_SCORE;
        }
        (gpa / scale * MAX_SCORE).clamp(0.0, MAX_SCORE)
    }

    pub fn sat(&self, total: f64) -> f64 {
        linear_band(
            total,
            self.config.sat_min,
            self.config.sat_max,
            self.config.test_floor,
        )
    }

    pub fn act(&self, composite: f64) -> f64 {
        linear_band(
            composite,
            self.config.act_min,
            self.config.act_max,
            self.config.test_floor,
        )
    }

    pub fn grades(&self, profile: &ApplicantProfile) -> Option<f64> {
        let academics = &profile.academics;
        let unweighted = academics.unweighted_gpa.map(|gpa| {
            self.gpa(gpa, academics.gpa_scale.unwrap_or(self.config.gpa_scale))
        });
        let weighted = academics.weighted_gpa.map(|gpa| {
            self.gpa(
                gpa,
                academics
                    .weighted_gpa_scale
                    .unwrap_or(self.config.weighted_gpa_scale),
            )
        });

        match (unweighted, weighted) {
            (Some(u), Some(w)) => {
                let share = self.config.unweighted_share;
                Some(u * share + w * (1.0 - share))
            }
            (Some(u), None) => Some(u),
            (None, Some(w)) => Some(w),
            (None, None) => None,
        }
    }

    pub fn testing(&self, profile: &ApplicantProfile) -> Option<f64> {
        let sat = profile.academics.sat_total.map(|value| self.sat(value));
        let act = profile.academics.act_composite.map(|value| self.act(value));
        match (sat, act) {
            (Some(s), Some(a)) => Some(s.max(a)),
            (Some(s), None) => Some(s),
            (None, Some(a)) => Some(a),
            (None, None) => None,
        }
    }

    pub fn normalize(&self, profile: &ApplicantProfile, major_fit: Option<f64>) -> FactorScores {
        let mut scores = profile.factors;

        if let Some(grades) = self.grades(profile) {
            scores.set(Factor::Grades, grades);
        }
        if let Some(testing) = self.testing(profile) {
            scores.set(Factor::Testing, testing);
        }
        if let Some(fit) = major_fit.filter(|fit| fit.is_finite()) {
            scores.set(Factor::MajorFit, fit.clamp(0.0, 1.0) * MAX_SCORE);
        }

        scores
    }
}

fn linear_band(value: f64, min: f64, max: f64, floor: f64) -> f64 {
    if !value.is_finite() {
        return NEUTRAL_SCORE;
    }
    if value <= min {
        return floor;
    }
    if value >= max {
        return MAX_SCORE;
    }
    floor + (value - min) / (max - min) * (MAX_SCORE - floor)
}
