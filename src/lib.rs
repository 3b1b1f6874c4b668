pub mod calibration;
pub mod catalog;
pub mod config;
pub mod error;
pub mod major;
pub mod model;
pub mod predictor;
pub mod scoring;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

pub use catalog::{CollegeCatalog, CollegeProfile, CollegeRecord, InMemoryCatalog};
pub use config::PredictorConfig;
pub use predictor::AdmissionPredictor;

pub const NEUTRAL_SCORE: f64 = 5.0;
pub const MAX_SCORE: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Factor {
    Grades,
    Rigor,
    Testing,
    Essay,
    EcsLeadership,
    Recommendations,
    PlanTiming,
    AthleticRecruit,
    MajorFit,
    GeographyResidency,
    FirstgenDiversity,
    AbilityToPay,
    AwardsPublications,
    PortfolioAudition,
    PolicyKnob,
    DemonstratedInterest,
    Legacy,
    Interview,
    ConductRecord,
    HsReputation,
}

impl Factor {
    pub const COUNT: usize = 20;

    pub const ALL: [Factor; Factor::COUNT] = [
        Factor::Grades,
        Factor::Rigor,
        Factor::Testing,
        Factor::Essay,
        Factor::EcsLeadership,
        Factor::Recommendations,
        Factor::PlanTiming,
        Factor::AthleticRecruit,
        Factor::MajorFit,
        Factor::GeographyResidency,
        Factor::FirstgenDiversity,
        Factor::AbilityToPay,
        Factor::AwardsPublications,
        Factor::PortfolioAudition,
        Factor::PolicyKnob,
        Factor::DemonstratedInterest,
        Factor::Legacy,
        Factor::Interview,
        Factor::ConductRecord,
        Factor::HsReputation,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Factor::Grades => "grades",
            Factor::Rigor => "rigor",
            Factor::Testing => "testing",
            Factor::Essay => "essay",
            Factor::EcsLeadership => "ecs_leadership",
            Factor::Recommendations => "recommendations",
            Factor::PlanTiming => "plan_timing",
            Factor::AthleticRecruit => "athletic_recruit",
            Factor::MajorFit => "major_fit",
            Factor::GeographyResidency => "geography_residency",
            Factor::FirstgenDiversity => "firstgen_diversity",
            Factor::AbilityToPay => "ability_to_pay",
            Factor::AwardsPublications => "awards_publications",
            Factor::PortfolioAudition => "portfolio_audition",
            Factor::PolicyKnob => "policy_knob",
            Factor::DemonstratedInterest => "demonstrated_interest",
            Factor::Legacy => "legacy",
            Factor::Interview => "interview",
            Factor::ConductRecord => "conduct_record",
            Factor::HsReputation => "hs_reputation",
        }
    }
}

impl FromStr for Factor {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let key = value.trim().to_lowercase();
        Factor::ALL
            .iter()
            .copied()
            .find(|factor| factor.as_str() == key)
            .ok_or_else(|| format!("unknown factor: {}", value))
    }
}

impl fmt::Display for Factor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FactorCategory {
    Academic,
    Qualitative,
    CoCurricular,
    Strategic,
    Special,
    Demographic,
    Financial,
    Achievement,
    Institutional,
    Negative,
    Contextual,
    Policy,
}

impl FactorCategory {
    pub fn label(self) -> &'static str {
        match self {
            FactorCategory::Academic => "academic",
            FactorCategory::Qualitative => "qualitative",
            FactorCategory::CoCurricular => "co_curricular",
            FactorCategory::Strategic => "strategic",
            FactorCategory::Special => "special",
            FactorCategory::Demographic => "demographic",
            FactorCategory::Financial => "financial",
            FactorCategory::Achievement => "achievement",
            FactorCategory::Institutional => "institutional",
            FactorCategory::Negative => "negative",
            FactorCategory::Contextual => "contextual",
            FactorCategory::Policy => "policy",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FactorScores([f64; Factor::COUNT]);

impl Default for FactorScores {
    fn default() -> Self {
        Self::uniform(NEUTRAL_SCORE)
    }
}

impl FactorScores {
    pub fn uniform(value: f64) -> Self {
        Self([clamp_score(value); Factor::COUNT])
    }

    pub fn get(&self, factor: Factor) -> f64 {
        self.0[factor.index()]
    }

    pub fn set(&mut self, factor: Factor, value: f64) {
        self.0[factor.index()] = clamp_score(value);
    }

    pub fn iter(&self) -> impl Iterator<Item = (Factor, f64)> + '_ {
        Factor::ALL
            .into_iter()
            .map(move |factor| (factor, self.get(factor)))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AcademicRecord {
    pub unweighted_gpa: Option<f64>,
    pub weighted_gpa: Option<f64>,
    pub gpa_scale: Option<f64>,
    pub weighted_gpa_scale: Option<f64>,
    pub sat_total: Option<f64>,
    pub act_composite: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum InputWarning {
    UnknownFactor { key: String },
    UnparseableFactor { factor: Factor, raw: String },
    OutOfRange { factor: Factor, value: f64 },
    InvalidAcademic { field: String, raw: String },
}

impl fmt::Display for InputWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InputWarning::UnknownFactor { key } => write!(f, "ignored unknown factor '{}'", key),
            InputWarning::UnparseableFactor { factor, raw } => {
                write!(f, "{} value '{}' is not numeric, using neutral default", factor, raw)
            }
            InputWarning::OutOfRange { factor, value } => {
                write!(f, "{} value {} clamped to [0, 10]", factor, value)
            }
            InputWarning::InvalidAcademic { field, raw } => {
                write!(f, "{} value '{}' ignored", field, raw)
            }
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawApplicant {
    #[serde(default)]
    pub factors: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    pub unweighted_gpa: Option<serde_json::Value>,
    #[serde(default)]
    pub weighted_gpa: Option<serde_json::Value>,
    #[serde(default)]
    pub gpa_scale: Option<serde_json::Value>,
    #[serde(default)]
    pub weighted_gpa_scale: Option<serde_json::Value>,
    #[serde(default)]
    pub sat_total: Option<serde_json::Value>,
    #[serde(default)]
    pub act_composite: Option<serde_json::Value>,
    #[serde(default)]
    pub intended_major: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ApplicantProfile {
    pub factors: FactorScores,
    pub academics: AcademicRecord,
    pub intended_major: Option<String>,
    pub warnings: Vec<InputWarning>,
}

impl Default for ApplicantProfile {
    fn default() -> Self {
        Self::uniform(NEUTRAL_SCORE)
    }
}

impl ApplicantProfile {
    pub fn uniform(value: f64) -> Self {
        Self {
            factors: FactorScores::uniform(value),
            academics: AcademicRecord::default(),
            intended_major: None,
            warnings: Vec::new(),
        }
    }

    pub fn with_factor(mut self, factor: Factor, value: f64) -> Self {
        self.factors.set(factor, value);
        self
    }

    pub fn with_academics(mut self, academics: AcademicRecord) -> Self {
        self.academics = academics;
        self
    }

    pub fn with_major(mut self, major: impl Into<String>) -> Self {
        self.intended_major = Some(major.into());
        self
    }

    pub fn from_raw(raw: &RawApplicant) -> Self {
        let mut warnings = Vec::new();
        let mut factors = FactorScores::default();

        for (key, value) in &raw.factors {
            let factor = match key.parse::<Factor>() {
                Ok(factor) => factor,
                Err(_) => {
                    warnings.push(InputWarning::UnknownFactor { key: key.clone() });
                    continue;
                }
            };
            match scoring::normalizer::parse_number(value) {
                Some(number) => {
                    if !(0.0..=MAX_SCORE).contains(&number) {
                        warnings.push(InputWarning::OutOfRange { factor, value: number });
                    }
                    factors.set(factor, number);
                }
                None => {
                    if !value.is_null() {
                        warnings.push(InputWarning::UnparseableFactor {
                            factor,
                            raw: value.to_string(),
                        });
                    }
                    factors.set(factor, NEUTRAL_SCORE);
                }
            }
        }

        let mut academic = |field: &str, value: &Option<serde_json::Value>| -> Option<f64> {
            let value = value.as_ref()?;
            let parsed = scoring::normalizer::parse_number(value).filter(|number| *number > 0.0);
            if parsed.is_none() && !value.is_null() {
                warnings.push(InputWarning::InvalidAcademic {
                    field: field.to_string(),
                    raw: value.to_string(),
                });
            }
            parsed
        };

        let academics = AcademicRecord {
            unweighted_gpa: academic("unweighted_gpa", &raw.unweighted_gpa),
            weighted_gpa: academic("weighted_gpa", &raw.weighted_gpa),
            gpa_scale: academic("gpa_scale", &raw.gpa_scale),
            weighted_gpa_scale: academic("weighted_gpa_scale", &raw.weighted_gpa_scale),
            sat_total: academic("sat_total", &raw.sat_total),
            act_composite: academic("act_composite", &raw.act_composite),
        };

        for warning in &warnings {
            tracing::warn!(%warning, "applicant input substituted");
        }

        Self {
            factors,
            academics,
            intended_major: raw
                .intended_major
                .as_ref()
                .map(|major| major.trim().to_string())
                .filter(|major| !major.is_empty()),
            warnings,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectivityTier {
    Elite,
    HighlySelective,
    Selective,
    LessSelective,
    Unknown,
}

impl SelectivityTier {
    pub const ALL: [SelectivityTier; 5] = [
        SelectivityTier::Elite,
        SelectivityTier::HighlySelective,
        SelectivityTier::Selective,
        SelectivityTier::LessSelective,
        SelectivityTier::Unknown,
    ];

    pub fn label(self) -> &'static str {
        match self {
            SelectivityTier::Elite => "Elite",
            SelectivityTier::HighlySelective => "Highly Selective",
            SelectivityTier::Selective => "Selective",
            SelectivityTier::LessSelective => "Less Selective",
            SelectivityTier::Unknown => "Unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Safety,
    Target,
    Reach,
}

impl Category {
    pub const ALL: [Category; 3] = [Category::Safety, Category::Target, Category::Reach];

    pub fn label(self) -> &'static str {
        match self {
            Category::Safety => "safety",
            Category::Target => "target",
            Category::Reach => "reach",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelUsage {
    FormulaOnly,
    Blended,
}

impl ModelUsage {
    pub fn label(self) -> &'static str {
        match self {
            ModelUsage::FormulaOnly => "formula_only",
            ModelUsage::Blended => "blended",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ConfidenceInterval {
    pub low: f64,
    pub high: f64,
}

impl ConfidenceInterval {
    pub fn width(&self) -> f64 {
        self.high - self.low
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.low && value <= self.high
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FactorContribution {
    pub factor: Factor,
    pub category: FactorCategory,
    pub value: f64,
    pub weight: f64,
    pub contribution: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionResult {
    pub college: String,
    pub college_id: String,
    pub acceptance_rate: Option<f64>,
    pub tier: SelectivityTier,
    pub composite_score: f64,
    pub raw_formula_probability: f64,
    pub formula_probability: f64,
    pub ml_probability: f64,
    pub ml_confidence: f64,
    pub model_weight: f64,
    pub model_used: ModelUsage,
    pub model_id: Option<String>,
    pub blended_probability: f64,
    pub probability: f64,
    pub confidence_interval: ConfidenceInterval,
    pub category: Category,
    pub factor_breakdown: Vec<FactorContribution>,
    pub strengths: Vec<Factor>,
    pub weaknesses: Vec<Factor>,
    pub explanation: String,
    pub config_version: String,
}

pub fn clamp_score(value: f64) -> f64 {
    if value.is_finite() {
        value.clamp(0.0, MAX_SCORE)
    } else {
        NEUTRAL_SCORE
    }
}

pub fn clamp01(value: f64) -> f64 {
    if value < 0.0 {
        0.0
    } else if value > 1.0 {
        1.0
    } else {
        value
    }
}

pub fn format_percent(value: f64) -> String {
    format!("{:.1}%", value * 100.0)
}

pub fn format_float(value: f64, digits: usize) -> String {
    format!("{:.*}", digits, value)
}
