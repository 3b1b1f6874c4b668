use std::cmp::Ordering;
use std::collections::HashMap;

use crate::config::{FormulaConfig, WeightTable};
use crate::{Factor, FactorCategory, FactorContribution, FactorScores, MAX_SCORE, NEUTRAL_SCORE};

pub const COMPOSITE_SCALE: f64 = 1000.0;

#[derive(Debug, Clone, PartialEq)]
pub struct CompositeScore {
    pub composite: f64,
    pub formula_probability: f64,
    // sorted by contribution, largest first
    pub breakdown: Vec<FactorContribution>,
}

impl CompositeScore {
    pub fn strength(&self) -> f64 {
        self.composite / COMPOSITE_SCALE
    }
}

#[derive(Debug, Clone)]
pub struct WeightedScorer {
    weights: WeightTable,
    formula: FormulaConfig,
}

impl WeightedScorer {
    pub fn new(weights: WeightTable, formula: FormulaConfig) -> Self {
        Self { weights, formula }
    }

    pub fn score(&self, scores: &FactorScores) -> CompositeScore {
        let mut breakdown: Vec<FactorContribution> = scores
            .iter()
            .map(|(factor, value)| {
                let entry = self.weights.get(factor);
                FactorContribution {
                    factor,
                    category: entry.category,
                    value,
                    weight: entry.weight,
                    contribution: value / MAX_SCORE * entry.weight * COMPOSITE_SCALE,
                }
            })
            .collect();

        let composite = breakdown
            .iter()
            .map(|item| item.contribution)
            .sum::<f64>()
            .clamp(0.0, COMPOSITE_SCALE);

        breakdown.sort_by(|a, b| {
            b.contribution
                .partial_cmp(&a.contribution)
                .unwrap_or(Ordering::Equal)
                .then_with(|| a.factor.cmp(&b.factor))
        });

        CompositeScore {
            composite,
            formula_probability: self.compress(composite / COMPOSITE_SCALE),
            breakdown,
        }
    }

    pub fn compress(&self, raw: f64) -> f64 {
        sigmoid(self.formula.steepness * (raw - self.formula.center))
    }
}

pub fn strengths_and_weaknesses(
    breakdown: &[FactorContribution],
    top_n: usize,
) -> (Vec<Factor>, Vec<Factor>) {
    let mut sums: HashMap<FactorCategory, (f64, usize)> = HashMap::new();
    for item in breakdown {
        let entry = sums.entry(item.category).or_insert((0.0, 0));
        entry.0 += item.value;
        entry.1 += 1;
    }

    let mut deviations: Vec<(Factor, f64)> = breakdown
        .iter()
        .filter(|item| item.weight > 0.0)
        .map(|item| {
            let (sum, count) = sums.get(&item.category).copied().unwrap_or((0.0, 0));
            let baseline = if count > 1 {
                sum / count as f64
            } else {
                NEUTRAL_SCORE
            };
            (item.factor, item.value - baseline)
        })
        .collect();

    deviations.sort_by(|a, b| {
        b.1.partial_cmp(&a.1)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.0.cmp(&b.0))
    });

    let strengths = deviations
        .iter()
        .filter(|(_, deviation)| *deviation > 0.0)
        .take(top_n)
        .map(|(factor, _)| *factor)
        .collect();
    let weaknesses = deviations
        .iter()
        .rev()
        .filter(|(_, deviation)| *deviation < 0.0)
        .take(top_n)
        .map(|(factor, _)| *factor)
        .collect();

    (strengths, weaknesses)
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scorer() -> WeightedScorer {
        WeightedScorer::new(WeightTable::default(), FormulaConfig::default())
    }

    #[test]
    fn uniform_profiles_hit_expected_composites() {
        let scorer = scorer();
        let neutral = scorer.score(&FactorScores::uniform(5.0));
        let perfect = scorer.score(&FactorScores::uniform(10.0));
        let empty = scorer.score(&FactorScores::uniform(0.0));

        assert!((neutral.composite - 500.0).abs() < 1e-6);
        assert!((perfect.composite - 1000.0).abs() < 1e-6);
        assert!(empty.composite.abs() < 1e-6);
    }

    #[test]
    fn formula_probability_never_reaches_extremes() {
        let scorer = scorer();
        let perfect = scorer.score(&FactorScores::uniform(10.0));
        let empty = scorer.score(&FactorScores::uniform(0.0));

        assert!(perfect.formula_probability < 1.0);
        assert!(perfect.formula_probability > 0.95);
        assert!(empty.formula_probability > 0.0);
        assert!(empty.formula_probability < 0.05);
    }

    #[test]
    fn breakdown_is_sorted_and_sums_to_composite() {
        let scorer = scorer();
        let mut scores = FactorScores::uniform(6.0);
        scores.set(Factor::Essay, 10.0);
        let result = scorer.score(&scores);

        let total: f64 = result.breakdown.iter().map(|item| item.contribution).sum();
        assert!((total - result.composite).abs() < 1e-6);
        assert_eq!(result.breakdown.len(), Factor::COUNT);
        assert_eq!(result.breakdown[0].factor, Factor::Grades);
        for pair in result.breakdown.windows(2) {
            assert!(pair[0].contribution >= pair[1].contribution);
        }
    }

    #[test]
    fn raising_a_factor_never_lowers_the_composite() {
        let scorer = scorer();
        for factor in Factor::ALL {
            let mut scores = FactorScores::uniform(5.0);
            let before = scorer.score(&scores).composite;
            scores.set(factor, 9.0);
            let after = scorer.score(&scores).composite;
            assert!(after >= before, "{} lowered composite", factor);
        }
    }

    #[test]
    fn strengths_and_weaknesses_use_category_average() {
        let scorer = scorer();
        let mut scores = FactorScores::uniform(5.0);
        scores.set(Factor::Essay, 9.0);
        scores.set(Factor::Recommendations, 5.0);
        scores.set(Factor::Legacy, 1.0);
        let result = scorer.score(&scores);

        let (strengths, weaknesses) = strengths_and_weaknesses(&result.breakdown, 3);
        assert_eq!(strengths.first(), Some(&Factor::Essay));
        assert!(weaknesses.contains(&Factor::Recommendations));
        assert!(weaknesses.contains(&Factor::Legacy));
        assert!(!strengths.contains(&Factor::Grades));
    }
}
