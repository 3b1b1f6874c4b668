use std::collections::HashSet;

use crate::CollegeProfile;

pub trait MajorRelevance: Send + Sync {
    fn fit(&self, major: &str, college: &CollegeProfile) -> Option<f64>;
}

#[derive(Debug, Clone)]
pub struct ProgramListRelevance {
    pub exact: f64,
    pub related: f64,
    pub unrelated: f64,
}

impl Default for ProgramListRelevance {
    fn default() -> Self {
        Self {
            exact: 1.0,
            related: 0.7,
            unrelated: 0.3,
        }
    }
}

impl MajorRelevance for ProgramListRelevance {
    fn fit(&self, major: &str, college: &CollegeProfile) -> Option<f64> {
        let major = major.trim().to_lowercase();
        if major.is_empty() || college.programs.is_empty() {
            return None;
        }

        let major_words = words(&major);
        let mut best = self.unrelated;
        for program in &college.programs {
            let program = program.to_lowercase();
            if program == major {
                return Some(self.exact);
            }
            if !major_words.is_disjoint(&words(&program)) {
                best = best.max(self.related);
            }
        }
        Some(best)
    }
}

const STOP_WORDS: [&str; 5] = ["and", "of", "the", "in", "studies"];

fn words(value: &str) -> HashSet<String> {
    value
        .split(|c: char| !c.is_alphanumeric())
        .filter(|word| word.len() > 1 && !STOP_WORDS.contains(word))
        .map(str::to_string)
        .collect()
}
