use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;

use crate::error::CatalogError;
use crate::scoring::normalizer::parse_number;

const UNKNOWN_COLLEGE: &str = "Unknown College";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TestPolicy {
    Required,
    TestOptional,
    NotConsidered,
}

impl TestPolicy {
    pub fn parse(value: &str) -> Option<Self> {
        let key: String = value
            .to_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphabetic())
            .collect();
        match key.as_str() {
            "required" | "testrequired" => Some(TestPolicy::Required),
            "testoptional" | "optional" | "testflexible" => Some(TestPolicy::TestOptional),
            "notconsidered" | "testblind" | "blind" => Some(TestPolicy::NotConsidered),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TestPolicy::Required => "Required",
            TestPolicy::TestOptional => "Test-optional",
            TestPolicy::NotConsidered => "Not considered",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AidPolicy {
    NeedBlind,
    NeedAware,
}

impl AidPolicy {
    pub fn parse(value: &str) -> Option<Self> {
        let key: String = value
            .to_lowercase()
            .chars()
            .filter(|c| c.is_ascii_alphabetic())
            .collect();
        match key.as_str() {
            "needblind" => Some(AidPolicy::NeedBlind),
            "needaware" | "needsensitive" => Some(AidPolicy::NeedAware),
            _ => None,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AidPolicy::NeedBlind => "Need-blind",
            AidPolicy::NeedAware => "Need-aware",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreBand {
    pub p25: f64,
    pub p75: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CollegeRecord {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub acceptance_rate: Option<serde_json::Value>,
    #[serde(default)]
    pub sat_25: Option<serde_json::Value>,
    #[serde(default)]
    pub sat_75: Option<serde_json::Value>,
    #[serde(default)]
    pub act_25: Option<serde_json::Value>,
    #[serde(default)]
    pub act_75: Option<serde_json::Value>,
    #[serde(default)]
    pub test_policy: Option<String>,
    #[serde(default)]
    pub aid_policy: Option<String>,
    #[serde(default)]
    pub average_gpa: Option<serde_json::Value>,
    #[serde(default)]
    pub programs: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CollegeProfile {
    pub name: String,
    pub acceptance_rate: Option<f64>,
    pub sat_range: Option<ScoreBand>,
    pub act_range: Option<ScoreBand>,
    pub test_policy: TestPolicy,
    pub aid_policy: AidPolicy,
    pub average_gpa: Option<f64>,
    pub programs: Vec<String>,
}

impl CollegeProfile {
    pub fn with_rate(name: impl Into<String>, acceptance_rate: Option<f64>) -> Self {
        Self {
            name: name.into(),
            acceptance_rate,
            sat_range: None,
            act_range: None,
            test_policy: TestPolicy::TestOptional,
            aid_policy: AidPolicy::NeedAware,
            average_gpa: None,
            programs: Vec::new(),
        }
    }

    pub fn from_record(record: &CollegeRecord) -> Self {
        let name = record
            .name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(UNKNOWN_COLLEGE)
            .to_string();

        let acceptance_rate = record
            .acceptance_rate
            .as_ref()
            .and_then(|value| read_acceptance_rate(&name, value));
        if record.acceptance_rate.is_none() {
            tracing::warn!(college = %name, "missing acceptance rate, tier will be Unknown");
        }

        let band = |low: &Option<serde_json::Value>, high: &Option<serde_json::Value>| {
            let low = low.as_ref().and_then(parse_number)?;
            let high = high.as_ref().and_then(parse_number)?;
            (low > 0.0 && low <= high).then_some(ScoreBand { p25: low, p75: high })
        };

        Self {
            sat_range: band(&record.sat_25, &record.sat_75),
            act_range: band(&record.act_25, &record.act_75),
            test_policy: record
                .test_policy
                .as_deref()
                .and_then(TestPolicy::parse)
                .unwrap_or(TestPolicy::TestOptional),
            aid_policy: record
                .aid_policy
                .as_deref()
                .and_then(AidPolicy::parse)
                .unwrap_or(AidPolicy::NeedAware),
            average_gpa: record
                .average_gpa
                .as_ref()
                .and_then(parse_number)
                .filter(|gpa| *gpa > 0.0),
            programs: record
                .programs
                .iter()
                .map(|program| program.trim().to_string())
                .filter(|program| !program.is_empty())
                .collect(),
            name,
            acceptance_rate,
        }
    }

    pub fn identity(&self) -> String {
        normalize_name(&self.name)
    }
}

fn read_acceptance_rate(name: &str, value: &serde_json::Value) -> Option<f64> {
    let Some(rate) = parse_number(value) else {
        tracing::warn!(college = %name, raw = %value, "unparseable acceptance rate");
        return None;
    };
    if rate > 0.0 && rate <= 1.0 {
        return Some(rate);
    }
    if rate > 1.0 && rate <= 100.0 {
        tracing::warn!(college = %name, rate, "acceptance rate looks like a percentage, rescaling");
        return Some(rate / 100.0);
    }
    tracing::warn!(college = %name, rate, "acceptance rate out of range, ignoring");
    None
}

pub fn normalize_name(value: &str) -> String {
    value
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

pub trait CollegeCatalog: Send + Sync {
    fn get_college(&self, name: &str) -> Option<CollegeProfile>;

    fn search(&self, query: &str) -> Vec<CollegeProfile>;

    fn lookup(&self, name: &str) -> Result<CollegeProfile, CatalogError> {
        self.get_college(name)
            .ok_or_else(|| CatalogError::NotFound(name.trim().to_string()))
    }
}

#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    colleges: Vec<CollegeProfile>,
}

impl InMemoryCatalog {
    pub fn new(colleges: Vec<CollegeProfile>) -> Self {
        let mut seen = HashSet::new();
        let mut unique: Vec<CollegeProfile> = colleges
            .into_iter()
            .filter(|college| seen.insert(college.identity()))
            .collect();
        unique.sort_by(|a, b| a.name.cmp(&b.name));
        Self { colleges: unique }
    }

    pub fn from_records(records: &[CollegeRecord]) -> Self {
        Self::new(records.iter().map(CollegeProfile::from_record).collect())
    }

    pub fn from_json(data: &str) -> Result<Self, CatalogError> {
        if data.trim().is_empty() {
            return Ok(Self::default());
        }
        let records: Vec<CollegeRecord> = serde_json::from_str(data)?;
        Ok(Self::from_records(&records))
    }

    pub fn load(path: &Path) -> Result<Self, CatalogError> {
        let data = std::fs::read_to_string(path).map_err(|source| CatalogError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&data)
    }

    pub fn colleges(&self) -> &[CollegeProfile] {
        &self.colleges
    }

    pub fn len(&self) -> usize {
        self.colleges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colleges.is_empty()
    }
}

impl CollegeCatalog for InMemoryCatalog {
    fn get_college(&self, name: &str) -> Option<CollegeProfile> {
        let key = normalize_name(name);
        self.colleges
            .iter()
            .find(|college| college.identity() == key)
            .cloned()
    }

    fn search(&self, query: &str) -> Vec<CollegeProfile> {
        let key = normalize_name(query);
        self.colleges
            .iter()
            .filter(|college| key.is_empty() || college.identity().contains(&key))
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn record_conversion_is_permissive() {
        let record: CollegeRecord = serde_json::from_value(json!({
            "name": "  Example   University ",
            "acceptance_rate": "7%",
            "sat_25": 1480,
            "sat_75": "1560",
            "test_policy": "Test-Optional",
            "aid_policy": "need blind",
            "average_gpa": "3.9",
            "programs": ["Physics", " "]
        }))
        .unwrap();

        let college = CollegeProfile::from_record(&record);
        assert_eq!(college.acceptance_rate, Some(0.07));
        assert_eq!(college.sat_range, Some(ScoreBand { p25: 1480.0, p75: 1560.0 }));
        assert_eq!(college.act_range, None);
        assert_eq!(college.test_policy, TestPolicy::TestOptional);
        assert_eq!(college.aid_policy, AidPolicy::NeedBlind);
        assert_eq!(college.average_gpa, Some(3.9));
        assert_eq!(college.programs, vec!["Physics".to_string()]);
        assert_eq!(college.identity(), "example university");
    }

    #[test]
    fn bad_acceptance_rate_is_dropped() {
        for raw in [json!("n/a"), json!(-0.2), json!(250), json!(0)] {
            let record = CollegeRecord {
                name: Some("Broken".to_string()),
                acceptance_rate: Some(raw),
                ..CollegeRecord::default()
            };
            assert_eq!(CollegeProfile::from_record(&record).acceptance_rate, None);
        }
    }

    #[test]
    fn missing_name_gets_placeholder() {
        let college = CollegeProfile::from_record(&CollegeRecord::default());
        assert_eq!(college.name, UNKNOWN_COLLEGE);
        assert_eq!(college.acceptance_rate, None);
    }

    #[test]
    fn catalog_lookup_ignores_case_and_spacing() {
        let catalog = InMemoryCatalog::new(vec![
            CollegeProfile::with_rate("North State", Some(0.6)),
            CollegeProfile::with_rate("north  state", Some(0.1)),
            CollegeProfile::with_rate("South Tech", Some(0.2)),
        ]);
        assert_eq!(catalog.len(), 2);
        let found = catalog.get_college("NORTH STATE").unwrap();
        assert_eq!(found.acceptance_rate, Some(0.6));
        assert!(catalog.get_college("East College").is_none());
    }

    #[test]
    fn lookup_reports_missing_college() {
        let catalog = InMemoryCatalog::new(vec![CollegeProfile::with_rate("South Tech", Some(0.2))]);
        assert_eq!(catalog.lookup(" south tech ").unwrap().name, "South Tech");
        let err = catalog.lookup(" East College ").unwrap_err();
        assert!(matches!(&err, CatalogError::NotFound(name) if name == "East College"));
        assert_eq!(err.to_string(), "college not found: East College");
    }

    #[test]
    fn search_matches_substrings_sorted_by_name() {
        let catalog = InMemoryCatalog::new(vec![
            CollegeProfile::with_rate("West Tech", Some(0.3)),
            CollegeProfile::with_rate("Coast Tech", Some(0.5)),
            CollegeProfile::with_rate("Hill College", Some(0.7)),
        ]);
        let names: Vec<String> = catalog
            .search("tech")
            .into_iter()
            .map(|college| college.name)
            .collect();
        assert_eq!(names, vec!["Coast Tech".to_string(), "West Tech".to_string()]);
        assert_eq!(catalog.search("").len(), 3);
    }

    #[test]
    fn from_json_accepts_empty_input() {
        assert!(InMemoryCatalog::from_json("  ").unwrap().is_empty());
        assert!(InMemoryCatalog::from_json("{not json").is_err());
    }
}
