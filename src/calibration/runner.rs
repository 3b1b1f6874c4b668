use serde::{Deserialize, Serialize};

use crate::predictor::AdmissionPredictor;
use crate::{ApplicantProfile, CollegeProfile, CollegeRecord, RawApplicant, SelectivityTier};

const RELIABILITY_BINS: usize = 10;
const LOG_LOSS_EPSILON: f64 = 1e-6;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CalibrationSample {
    pub applicant: RawApplicant,
    pub college: CollegeRecord,
    pub admitted: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ReliabilityBin {
    pub lower: f64,
    pub upper: f64,
    pub count: usize,
    pub mean_predicted: f64,
    pub observed_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TierSummary {
    pub tier: SelectivityTier,
    pub count: usize,
    pub mean_predicted: f64,
    pub max_predicted: f64,
    pub mean_acceptance_rate: f64,
    pub observed_rate: f64,
    pub ceiling: f64,
    pub ceiling_violations: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct CalibrationMetrics {
    pub sample_count: usize,
    pub brier_score: f64,
    pub log_loss: f64,
    pub mean_predicted: f64,
    pub observed_rate: f64,
    pub reliability_bins: Vec<ReliabilityBin>,
    pub tiers: Vec<TierSummary>,
}

pub struct CalibrationRunner {
    pub samples: Vec<CalibrationSample>,
}

impl CalibrationRunner {
    pub fn new(samples: Vec<CalibrationSample>) -> Self {
        Self { samples }
    }

    pub fn from_json(data: &str) -> Result<Self, serde_json::Error> {
        Ok(Self::new(serde_json::from_str(data)?))
    }

    pub fn compute_metrics(&self, predictor: &AdmissionPredictor) -> CalibrationMetrics {
        if self.samples.is_empty() {
            return CalibrationMetrics::default();
        }

        let mut scored = Vec::with_capacity(self.samples.len());
        for sample in &self.samples {
            let applicant = ApplicantProfile::from_raw(&sample.applicant);
            let college = CollegeProfile::from_record(&sample.college);
            let result = predictor.score(&applicant, &college);
            scored.push((result, sample.admitted));
        }

        let outcomes: Vec<f64> = scored
            .iter()
            .map(|(_, admitted)| bool_to_f64(*admitted))
            .collect();
        let predictions: Vec<f64> = scored.iter().map(|(result, _)| result.probability).collect();

        let brier_errors: Vec<f64> = predictions
            .iter()
            .zip(&outcomes)
            .map(|(p, y)| (p - y).powi(2))
            .collect();
        let log_losses: Vec<f64> = predictions
            .iter()
            .zip(&outcomes)
            .map(|(p, y)| {
                let p = p.clamp(LOG_LOSS_EPSILON, 1.0 - LOG_LOSS_EPSILON);
                -(y * p.ln() + (1.0 - y) * (1.0 - p).ln())
            })
            .collect();

        let mut bins = Vec::with_capacity(RELIABILITY_BINS);
        for index in 0..RELIABILITY_BINS {
            let lower = index as f64 / RELIABILITY_BINS as f64;
            let upper = (index + 1) as f64 / RELIABILITY_BINS as f64;
            let members: Vec<(f64, f64)> = predictions
                .iter()
                .zip(&outcomes)
                .filter(|(p, _)| bin_index(**p) == index)
                .map(|(p, y)| (*p, *y))
                .collect();
            let (predicted, observed): (Vec<f64>, Vec<f64>) = members.iter().cloned().unzip();
            bins.push(ReliabilityBin {
                lower,
                upper,
                count: members.len(),
                mean_predicted: mean(&predicted),
                observed_rate: mean(&observed),
            });
        }

        let mut tiers = Vec::new();
        for tier in SelectivityTier::ALL {
            let members: Vec<&(crate::PredictionResult, bool)> =
                scored.iter().filter(|(result, _)| result.tier == tier).collect();
            if members.is_empty() {
                continue;
            }
            let ceiling = predictor.pipeline().calibrator().ceiling(tier);
            let predicted: Vec<f64> = members.iter().map(|(result, _)| result.probability).collect();
            let observed: Vec<f64> = members
                .iter()
                .map(|(_, admitted)| bool_to_f64(*admitted))
                .collect();
            let rates: Vec<f64> = members
                .iter()
                .filter_map(|(result, _)| result.acceptance_rate)
                .collect();
            tiers.push(TierSummary {
                tier,
                count: members.len(),
                mean_predicted: mean(&predicted),
                max_predicted: predicted.iter().cloned().fold(0.0, f64::max),
                mean_acceptance_rate: mean(&rates),
                observed_rate: mean(&observed),
                ceiling,
                ceiling_violations: predicted.iter().filter(|p| **p > ceiling + 1e-12).count(),
            });
        }

        CalibrationMetrics {
            sample_count: self.samples.len(),
            brier_score: mean(&brier_errors),
            log_loss: mean(&log_losses),
            mean_predicted: mean(&predictions),
            observed_rate: mean(&outcomes),
            reliability_bins: bins,
            tiers,
        }
    }
}

fn bin_index(probability: f64) -> usize {
    ((probability * RELIABILITY_BINS as f64).floor() as usize).min(RELIABILITY_BINS - 1)
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

fn bool_to_f64(value: bool) -> f64 {
    if value {
        1.0
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::PredictorConfig;
    use serde_json::json;

    fn sample(factor: f64, rate: f64, admitted: bool) -> CalibrationSample {
        serde_json::from_value(json!({
            "applicant": { "factors": { "grades": factor, "essay": factor } },
            "college": { "name": format!("College {}", rate), "acceptance_rate": rate },
            "admitted": admitted
        }))
        .unwrap()
    }

    fn predictor() -> AdmissionPredictor {
        AdmissionPredictor::new(PredictorConfig::default()).unwrap()
    }

    #[test]
    fn empty_runner_reports_defaults() {
        let metrics = CalibrationRunner::new(Vec::new()).compute_metrics(&predictor());
        assert_eq!(metrics, CalibrationMetrics::default());
    }

    #[test]
    fn metrics_cover_every_sample() {
        let runner = CalibrationRunner::new(vec![
            sample(9.0, 0.05, false),
            sample(9.0, 0.05, true),
            sample(6.0, 0.8, true),
            sample(3.0, 0.3, false),
        ]);
        let metrics = runner.compute_metrics(&predictor());

        assert_eq!(metrics.sample_count, 4);
        assert_eq!(metrics.reliability_bins.len(), RELIABILITY_BINS);
        let binned: usize = metrics.reliability_bins.iter().map(|bin| bin.count).sum();
        assert_eq!(binned, 4);
        assert!((metrics.observed_rate - 0.5).abs() < 1e-12);
        assert!(metrics.brier_score > 0.0 && metrics.brier_score < 1.0);
        assert!(metrics.log_loss > 0.0);
    }

    #[test]
    fn tier_summaries_never_exceed_ceiling() {
        let runner = CalibrationRunner::new(vec![
            sample(10.0, 0.04, true),
            sample(10.0, 0.06, false),
            sample(8.0, 0.5, true),
        ]);
        let metrics = runner.compute_metrics(&predictor());
        let elite = metrics
            .tiers
            .iter()
            .find(|summary| summary.tier == SelectivityTier::Elite)
            .unwrap();
        assert_eq!(elite.count, 2);
        assert_eq!(elite.ceiling_violations, 0);
        assert!(elite.max_predicted <= 0.12 + 1e-12);
        assert!((elite.mean_acceptance_rate - 0.05).abs() < 1e-12);
    }

    #[test]
    fn bins_clamp_certain_predictions() {
        assert_eq!(bin_index(0.0), 0);
        assert_eq!(bin_index(0.95), 9);
        assert_eq!(bin_index(1.0), 9);
    }
}
