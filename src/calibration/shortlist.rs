use std::cmp::Ordering;
use std::collections::{HashSet, VecDeque};

use crate::{Category, PredictionResult};

const SEED_ORDER: [Category; 3] = [Category::Target, Category::Reach, Category::Safety];
const FILL_ORDER: [Category; 3] = [Category::Reach, Category::Target, Category::Safety];

pub fn dedupe(results: Vec<PredictionResult>) -> Vec<PredictionResult> {
    let mut seen = HashSet::new();
    results
        .into_iter()
        .filter(|result| seen.insert(result.college_id.clone()))
        .collect()
}

pub fn by_probability(a: &PredictionResult, b: &PredictionResult) -> Ordering {
    b.probability
        .partial_cmp(&a.probability)
        .unwrap_or(Ordering::Equal)
        .then_with(|| a.college.cmp(&b.college))
}

pub fn select_balanced(results: Vec<PredictionResult>, target_size: usize) -> Vec<PredictionResult> {
    if target_size == 0 {
        return Vec::new();
    }

    let mut buckets: [VecDeque<PredictionResult>; 3] = Default::default();
    let mut sorted = dedupe(results);
    sorted.sort_by(by_probability);
    for result in sorted {
        buckets[slot(result.category)].push_back(result);
    }

    let available: usize = buckets.iter().map(VecDeque::len).sum();
    let mut picked = Vec::with_capacity(target_size.min(available));
    for category in SEED_ORDER {
        if picked.len() >= target_size {
            break;
        }
        if let Some(result) = buckets[slot(category)].pop_front() {
            picked.push(result);
        }
    }

    while picked.len() < target_size {
        let mut progressed = false;
        for category in FILL_ORDER {
            if picked.len() >= target_size {
                break;
            }
            if let Some(result) = buckets[slot(category)].pop_front() {
                picked.push(result);
                progressed = true;
            }
        }
        if !progressed {
            break;
        }
    }

    picked.sort_by(by_probability);
    picked
}

fn slot(category: Category) -> usize {
    match category {
        Category::Safety => 0,
        Category::Target => 1,
        Category::Reach => 2,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PredictorConfig;
    use crate::scoring::ScoringPipeline;
    use crate::{ApplicantProfile, CollegeProfile};

    fn result(name: &str, probability: f64, category: Category) -> PredictionResult {
        let pipeline = ScoringPipeline::from_config(&PredictorConfig::default()).unwrap();
        let mut result = pipeline.run(
            &ApplicantProfile::default(),
            &CollegeProfile::with_rate(name, Some(0.5)),
            None,
            None,
        );
        result.probability = probability;
        result.category = category;
        result
    }

    #[test]
    fn dedupe_keeps_first_occurrence() {
        let results = vec![
            result("Oak College", 0.6, Category::Safety),
            result("oak  college", 0.1, Category::Reach),
            result("Elm College", 0.3, Category::Target),
        ];
        let unique = dedupe(results);
        assert_eq!(unique.len(), 2);
        assert_eq!(unique[0].probability, 0.6);
    }

    #[test]
    fn small_lists_still_cover_each_category() {
        let mut results = Vec::new();
        for i in 0..6 {
            results.push(result(&format!("Safe {}", i), 0.7 + i as f64 * 0.01, Category::Safety));
        }
        results.push(result("Mid", 0.3, Category::Target));
        results.push(result("Long Shot", 0.05, Category::Reach));

        let picked = select_balanced(results, 3);
        let categories: HashSet<Category> = picked.iter().map(|r| r.category).collect();
        assert_eq!(picked.len(), 3);
        assert_eq!(categories.len(), 3);
    }

    #[test]
    fn output_is_sorted_and_capped() {
        let results = (0..12)
            .map(|i| {
                let probability = i as f64 / 20.0;
                let category = if probability >= 0.5 {
                    Category::Safety
                } else if probability >= 0.2 {
                    Category::Target
                } else {
                    Category::Reach
                };
                result(&format!("College {:02}", i), probability, category)
            })
            .collect();

        let picked = select_balanced(results, 7);
        assert_eq!(picked.len(), 7);
        for pair in picked.windows(2) {
            assert!(pair[0].probability >= pair[1].probability);
        }
    }

    #[test]
    fn empty_buckets_are_skipped() {
        let results = vec![
            result("A", 0.7, Category::Safety),
            result("B", 0.6, Category::Safety),
        ];
        let picked = select_balanced(results, 5);
        assert_eq!(picked.len(), 2);
        assert!(select_balanced(Vec::new(), 5).is_empty());
        assert!(select_balanced(vec![result("C", 0.4, Category::Target)], 0).is_empty());
    }

    #[test]
    fn oversized_target_returns_everything() {
        let results = vec![
            result("A", 0.7, Category::Safety),
            result("B", 0.3, Category::Target),
            result("C", 0.05, Category::Reach),
        ];
        let picked = select_balanced(results, usize::MAX);
        assert_eq!(picked.len(), 3);
    }
}
