use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::{Factor, FactorCategory};

const WEIGHT_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeightEntry {
    pub category: FactorCategory,
    pub weight: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FactorWeight {
    pub category: FactorCategory,
    pub weight: f64,
}

// Only constructible through validation: covers every factor, sums to 1.0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    try_from = "BTreeMap<String, WeightEntry>",
    into = "BTreeMap<String, WeightEntry>"
)]
pub struct WeightTable {
    entries: [FactorWeight; Factor::COUNT],
}

impl WeightTable {
    pub fn from_entries(raw: BTreeMap<String, WeightEntry>) -> Result<Self, ConfigError> {
        let mut slots: [Option<FactorWeight>; Factor::COUNT] = [None; Factor::COUNT];

        for (key, entry) in raw {
            let factor = key
                .parse::<Factor>()
                .map_err(|_| ConfigError::UnknownFactor(key.clone()))?;
            if !entry.weight.is_finite() || entry.weight < 0.0 {
                return Err(ConfigError::NegativeWeight {
                    factor: key,
                    weight: entry.weight,
                });
            }
            slots[factor.index()] = Some(FactorWeight {
                category: entry.category,
                weight: entry.weight,
            });
        }

        let mut entries = [FactorWeight {
            category: FactorCategory::Academic,
            weight: 0.0,
        }; Factor::COUNT];
        for factor in Factor::ALL {
            entries[factor.index()] = slots[factor.index()]
                .ok_or_else(|| ConfigError::MissingFactor(factor.as_str().to_string()))?;
        }

        let sum: f64 = entries.iter().map(|entry| entry.weight).sum();
        if (sum - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(ConfigError::WeightSum(sum));
        }

        Ok(Self { entries })
    }

    pub fn get(&self, factor: Factor) -> FactorWeight {
        self.entries[factor.index()]
    }

    pub fn category_weight(&self, category: FactorCategory) -> f64 {
        self.entries
            .iter()
            .filter(|entry| entry.category == category)
            .map(|entry| entry.weight)
            .sum()
    }

    pub fn total(&self) -> f64 {
        self.entries.iter().map(|entry| entry.weight).sum()
    }
}

impl TryFrom<BTreeMap<String, WeightEntry>> for WeightTable {
    type Error = ConfigError;

    fn try_from(value: BTreeMap<String, WeightEntry>) -> Result<Self, Self::Error> {
        WeightTable::from_entries(value)
    }
}

impl From<WeightTable> for BTreeMap<String, WeightEntry> {
    fn from(table: WeightTable) -> Self {
        Factor::ALL
            .into_iter()
            .map(|factor| {
                let entry = table.get(factor);
                (
                    factor.as_str().to_string(),
                    WeightEntry {
                        category: entry.category,
                        weight: entry.weight,
                    },
                )
            })
            .collect()
    }
}

impl Default for WeightTable {
    fn default() -> Self {
        use FactorCategory::*;

        let table = [
            (Factor::Grades, Academic, 0.25),
            (Factor::Rigor, Academic, 0.12),
            (Factor::Testing, Academic, 0.08),
            (Factor::Essay, Qualitative, 0.08),
            (Factor::Recommendations, Qualitative, 0.05),
            (Factor::EcsLeadership, CoCurricular, 0.075),
            (Factor::PlanTiming, Strategic, 0.04),
            (Factor::MajorFit, Strategic, 0.035),
            (Factor::DemonstratedInterest, Strategic, 0.02),
            (Factor::AthleticRecruit, Special, 0.03),
            (Factor::PortfolioAudition, Special, 0.03),
            (Factor::GeographyResidency, Demographic, 0.03),
            (Factor::FirstgenDiversity, Demographic, 0.03),
            (Factor::AbilityToPay, Financial, 0.03),
            (Factor::AwardsPublications, Achievement, 0.02),
            (Factor::Legacy, Institutional, 0.02),
            (Factor::Interview, Institutional, 0.015),
            (Factor::ConductRecord, Negative, 0.005),
            (Factor::HsReputation, Contextual, 0.02),
            (Factor::PolicyKnob, Policy, 0.02),
        ];

        let mut entries = [FactorWeight {
            category: Academic,
            weight: 0.0,
        }; Factor::COUNT];
        for (factor, category, weight) in table {
            entries[factor.index()] = FactorWeight { category, weight };
        }
        Self { entries }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NormalizerConfig {
    pub gpa_scale: f64,
    pub weighted_gpa_scale: f64,
    pub unweighted_share: f64,
    pub sat_min: f64,
    pub sat_max: f64,
    pub act_min: f64,
    pub act_max: f64,
    pub test_floor: f64,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            gpa_scale: 4.0,
            weighted_gpa_scale: 5.0,
            unweighted_share: 0.6,
            sat_min: 1200.0,
            sat_max: 1600.0,
            act_min: 20.0,
            act_max: 36.0,
            test_floor: 5.0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FormulaConfig {
    pub steepness: f64,
    pub center: f64,
}

impl Default for FormulaConfig {
    fn default() -> Self {
        Self {
            steepness: 8.0,
            center: 0.4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectivityConfig {
    pub k: f64,
    pub min_probability: f64,
    pub max_probability: f64,
    pub median_acceptance_rate: f64,
}

impl Default for SelectivityConfig {
    fn default() -> Self {
        Self {
            k: 0.05,
            min_probability: 0.01,
            max_probability: 0.95,
            median_acceptance_rate: 0.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BlendConfig {
    pub synthetic_discount: f64,
    pub max_model_weight: f64,
    pub base_half_width: f64,
    pub spread_factor: f64,
    pub formula_only_half_width: f64,
}

impl Default for BlendConfig {
    fn default() -> Self {
        Self {
            synthetic_discount: 0.5,
            max_model_weight: 0.8,
            base_half_width: 0.03,
            spread_factor: 0.5,
            formula_only_half_width: 0.08,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TierCalibration {
    pub scale: f64,
    pub ceiling: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TierConfig {
    pub elite_max_rate: f64,
    pub highly_selective_max_rate: f64,
    pub selective_max_rate: f64,
    pub elite: TierCalibration,
    pub highly_selective: TierCalibration,
    pub selective: TierCalibration,
    pub less_selective: TierCalibration,
    pub unknown: TierCalibration,
}

impl Default for TierConfig {
    fn default() -> Self {
        Self {
            elite_max_rate: 0.10,
            highly_selective_max_rate: 0.20,
            selective_max_rate: 0.40,
            elite: TierCalibration {
                scale: 0.25,
                ceiling: 0.12,
            },
            highly_selective: TierCalibration {
                scale: 0.45,
                ceiling: 0.22,
            },
            selective: TierCalibration {
                scale: 0.75,
                ceiling: 0.35,
            },
            less_selective: TierCalibration {
                scale: 1.0,
                ceiling: 0.95,
            },
            unknown: TierCalibration {
                scale: 1.0,
                ceiling: 0.95,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CategoryConfig {
    pub safety_base: f64,
    pub safety_slope: f64,
    pub reach_base: f64,
    pub reach_slope: f64,
    pub min_gap: f64,
    pub safety_share: f64,
    pub reach_share: f64,
    pub top_n: usize,
}

impl Default for CategoryConfig {
    fn default() -> Self {
        Self {
            safety_base: 0.50,
            safety_slope: 0.30,
            reach_base: 0.20,
            reach_slope: 0.20,
            min_gap: 0.05,
            safety_share: 0.90,
            reach_share: 0.50,
            top_n: 3,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ShortlistConfig {
    pub default_size: usize,
}

impl Default for ShortlistConfig {
    fn default() -> Self {
        Self { default_size: 10 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ModelConfig {
    pub endpoint: Option<String>,
    pub timeout_ms: u64,
    pub max_concurrency: usize,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            timeout_ms: 2000,
            max_concurrency: 8,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PredictorConfig {
    pub weights: WeightTable,
    pub normalizer: NormalizerConfig,
    pub formula: FormulaConfig,
    pub selectivity: SelectivityConfig,
    pub blend: BlendConfig,
    pub tiers: TierConfig,
    pub categories: CategoryConfig,
    pub shortlist: ShortlistConfig,
    pub model: ModelConfig,
}

impl PredictorConfig {
    pub fn load(path: Option<PathBuf>) -> Result<(Self, Option<PathBuf>), ConfigError> {
        let config_path = path.or_else(default_config_path);
        let mut config = match config_path.as_ref() {
            Some(path) if path.exists() => {
                let contents =
                    std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
                        path: path.display().to_string(),
                        source,
                    })?;
                Self::from_toml(&contents)?
            }
            _ => PredictorConfig::default(),
        };

        config.apply_env_overrides();
        config.validate()?;
        Ok((config, config_path))
    }

    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        let config: PredictorConfig = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn write(&self, path: &Path) -> Result<(), ConfigError> {
        let write_err = |source| ConfigError::Write {
            path: path.display().to_string(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(write_err)?;
        }
        let payload = toml::to_string_pretty(self)?;
        std::fs::write(path, payload).map_err(write_err)?;
        Ok(())
    }

    pub fn fingerprint(&self) -> Result<String, ConfigError> {
        let payload = toml::to_string(self)?;
        let digest = Sha256::digest(payload.as_bytes());
        Ok(digest
            .iter()
            .take(6)
            .map(|byte| format!("{:02x}", byte))
            .collect())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let total = self.weights.total();
        if (total - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(ConfigError::WeightSum(total));
        }

        let mut errors: Vec<String> = self
            .numeric_fields()
            .into_iter()
            .filter(|(_, value)| !value.is_finite())
            .map(|(name, _)| format!("{}: must be a finite number", name))
            .collect();

        let norm = &self.normalizer;
        if norm.gpa_scale <= 0.0 || norm.weighted_gpa_scale <= 0.0 {
            errors.push("normalizer: gpa scales must be positive".to_string());
        }
        if !(0.0..=1.0).contains(&norm.unweighted_share) {
            errors.push("normalizer.unweighted_share: must be in [0, 1]".to_string());
        }
        if norm.sat_min >= norm.sat_max || norm.act_min >= norm.act_max {
            errors.push("normalizer: test ranges must have min < max".to_string());
        }
        if !(0.0..=10.0).contains(&norm.test_floor) {
            errors.push("normalizer.test_floor: must be in [0, 10]".to_string());
        }

        if self.formula.steepness <= 0.0 {
            errors.push("formula.steepness: must be positive".to_string());
        }
        if !(0.0..=1.0).contains(&self.formula.center) {
            errors.push("formula.center: must be in [0, 1]".to_string());
        }

        let sel = &self.selectivity;
        if !(0.0..0.1).contains(&sel.k) {
            errors.push("selectivity.k: must be in [0, 0.1)".to_string());
        }
        if !(sel.min_probability > 0.0
            && sel.min_probability < sel.max_probability
            && sel.max_probability < 1.0)
        {
            errors.push("selectivity: need 0 < min_probability < max_probability < 1".to_string());
        }
        if !(sel.median_acceptance_rate > 0.0 && sel.median_acceptance_rate <= 1.0) {
            errors.push("selectivity.median_acceptance_rate: must be in (0, 1]".to_string());
        }

        let blend = &self.blend;
        if !(0.0..=1.0).contains(&blend.synthetic_discount)
            || !(0.0..=1.0).contains(&blend.max_model_weight)
        {
            errors.push("blend: discount and max_model_weight must be in [0, 1]".to_string());
        }
        if blend.base_half_width < 0.0
            || blend.spread_factor < 0.0
            || blend.formula_only_half_width < 0.0
        {
            errors.push("blend: interval widths must be non-negative".to_string());
        }

        let tiers = &self.tiers;
        if !(0.0 < tiers.elite_max_rate
            && tiers.elite_max_rate < tiers.highly_selective_max_rate
            && tiers.highly_selective_max_rate < tiers.selective_max_rate
            && tiers.selective_max_rate <= 1.0)
        {
            errors.push("tiers: acceptance-rate cutoffs must be strictly increasing".to_string());
        }
        let ladder = [
            ("elite", tiers.elite),
            ("highly_selective", tiers.highly_selective),
            ("selective", tiers.selective),
            ("less_selective", tiers.less_selective),
        ];
        for (name, tier) in ladder.iter().chain(std::iter::once(&("unknown", tiers.unknown))) {
            if tier.scale <= 0.0 || tier.scale > 1.0 {
                errors.push(format!("tiers.{}.scale: must be in (0, 1]", name));
            }
            if tier.ceiling <= 0.0 || tier.ceiling > sel.max_probability {
                errors.push(format!(
                    "tiers.{}.ceiling: must be in (0, {}]",
                    name, sel.max_probability
                ));
            }
        }
        for pair in ladder.windows(2) {
            let (lower_name, lower) = pair[0];
            let (upper_name, upper) = pair[1];
            if lower.scale > upper.scale || lower.ceiling > upper.ceiling {
                errors.push(format!(
                    "tiers.{}: scale and ceiling must not exceed tiers.{}",
                    lower_name, upper_name
                ));
            }
        }

        let cat = &self.categories;
        if cat.reach_base + cat.min_gap > cat.safety_base {
            errors.push("categories: reach_base + min_gap must not exceed safety_base".to_string());
        }
        if cat.safety_slope < 0.0 || cat.reach_slope < 0.0 {
            errors.push("categories: slopes must be non-negative".to_string());
        }
        if cat.min_gap < 0.0 {
            errors.push("categories.min_gap: must be non-negative".to_string());
        }
        if !(cat.safety_share > 0.0 && cat.safety_share <= 1.0)
            || !(cat.reach_share > 0.0 && cat.reach_share <= cat.safety_share)
        {
            errors.push("categories: need 0 < reach_share <= safety_share <= 1".to_string());
        }

        if self.model.max_concurrency == 0 {
            errors.push("model.max_concurrency: must be at least 1".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Invalid(errors.join("; ")))
        }
    }

    fn numeric_fields(&self) -> Vec<(&'static str, f64)> {
        let norm = &self.normalizer;
        let sel = &self.selectivity;
        let blend = &self.blend;
        let tiers = &self.tiers;
        let cat = &self.categories;
        vec![
            ("normalizer.gpa_scale", norm.gpa_scale),
            ("normalizer.weighted_gpa_scale", norm.weighted_gpa_scale),
            ("normalizer.unweighted_share", norm.unweighted_share),
            ("normalizer.sat_min", norm.sat_min),
            ("normalizer.sat_max", norm.sat_max),
            ("normalizer.act_min", norm.act_min),
            ("normalizer.act_max", norm.act_max),
            ("normalizer.test_floor", norm.test_floor),
            ("formula.steepness", self.formula.steepness),
            ("formula.center", self.formula.center),
            ("selectivity.k", sel.k),
            ("selectivity.min_probability", sel.min_probability),
            ("selectivity.max_probability", sel.max_probability),
            ("selectivity.median_acceptance_rate", sel.median_acceptance_rate),
            ("blend.synthetic_discount", blend.synthetic_discount),
            ("blend.max_model_weight", blend.max_model_weight),
            ("blend.base_half_width", blend.base_half_width),
            ("blend.spread_factor", blend.spread_factor),
            ("blend.formula_only_half_width", blend.formula_only_half_width),
            ("tiers.elite_max_rate", tiers.elite_max_rate),
            ("tiers.highly_selective_max_rate", tiers.highly_selective_max_rate),
            ("tiers.selective_max_rate", tiers.selective_max_rate),
            ("tiers.elite.scale", tiers.elite.scale),
            ("tiers.elite.ceiling", tiers.elite.ceiling),
            ("tiers.highly_selective.scale", tiers.highly_selective.scale),
            ("tiers.highly_selective.ceiling", tiers.highly_selective.ceiling),
            ("tiers.selective.scale", tiers.selective.scale),
            ("tiers.selective.ceiling", tiers.selective.ceiling),
            ("tiers.less_selective.scale", tiers.less_selective.scale),
            ("tiers.less_selective.ceiling", tiers.less_selective.ceiling),
            ("tiers.unknown.scale", tiers.unknown.scale),
            ("tiers.unknown.ceiling", tiers.unknown.ceiling),
            ("categories.safety_base", cat.safety_base),
            ("categories.safety_slope", cat.safety_slope),
            ("categories.reach_base", cat.reach_base),
            ("categories.reach_slope", cat.reach_slope),
            ("categories.min_gap", cat.min_gap),
            ("categories.safety_share", cat.safety_share),
            ("categories.reach_share", cat.reach_share),
        ]
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(endpoint) = env::var("ADMIT_MODEL_ENDPOINT") {
            if !endpoint.trim().is_empty() {
                self.model.endpoint = Some(endpoint);
            }
        }
        if let Ok(timeout) = env::var("ADMIT_MODEL_TIMEOUT_MS") {
            if let Ok(value) = timeout.parse::<u64>() {
                self.model.timeout_ms = value;
            }
        }
        if let Ok(concurrency) = env::var("ADMIT_MAX_CONCURRENCY") {
            if let Ok(value) = concurrency.parse::<usize>() {
                self.model.max_concurrency = value;
            }
        }
        if let Ok(k) = env::var("ADMIT_SELECTIVITY_K") {
            if let Ok(value) = k.parse::<f64>() {
                self.selectivity.k = value;
            }
        }
    }
}

fn default_config_path() -> Option<PathBuf> {
    env::var("ADMIT_CONFIG_PATH")
        .ok()
        .filter(|value| !value.trim().is_empty())
        .map(PathBuf::from)
        .or_else(|| Some(PathBuf::from("config/admit.toml")))
}
