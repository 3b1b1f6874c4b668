use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::config::PredictorConfig;
use crate::error::ModelError;
use crate::{ApplicantProfile, CollegeProfile};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelEstimate {
    pub probability: f64,
    pub confidence: f64,
    pub model_id: String,
    // false when fit on synthetic outcomes only
    #[serde(default = "default_real_data")]
    pub real_data: bool,
}

impl ModelEstimate {
    pub fn is_usable(&self) -> bool {
        self.probability.is_finite() && self.confidence.is_finite() && self.confidence > 0.0
    }
}

fn default_real_data() -> bool {
    true
}

#[async_trait]
pub trait ModelPredictor: Send + Sync {
    async fn predict(
        &self,
        applicant: &ApplicantProfile,
        college: &CollegeProfile,
    ) -> Result<ModelEstimate, ModelError>;

    fn identifier(&self) -> &str;
}

#[derive(Debug, Clone, Serialize)]
pub struct PredictRequest {
    pub factors: BTreeMap<String, f64>,
    pub unweighted_gpa: Option<f64>,
    pub weighted_gpa: Option<f64>,
    pub sat_total: Option<f64>,
    pub act_composite: Option<f64>,
    pub intended_major: Option<String>,
    pub college: String,
    pub acceptance_rate: Option<f64>,
    pub sat_25: Option<f64>,
    pub sat_75: Option<f64>,
    pub act_25: Option<f64>,
    pub act_75: Option<f64>,
    pub average_gpa: Option<f64>,
    pub test_policy: String,
    pub aid_policy: String,
}

impl PredictRequest {
    pub fn new(applicant: &ApplicantProfile, college: &CollegeProfile) -> Self {
        Self {
            factors: applicant
                .factors
                .iter()
                .map(|(factor, value)| (factor.as_str().to_string(), value))
                .collect(),
            unweighted_gpa: applicant.academics.unweighted_gpa,
            weighted_gpa: applicant.academics.weighted_gpa,
            sat_total: applicant.academics.sat_total,
            act_composite: applicant.academics.act_composite,
            intended_major: applicant.intended_major.clone(),
            college: college.name.clone(),
            acceptance_rate: college.acceptance_rate,
            sat_25: college.sat_range.map(|band| band.p25),
            sat_75: college.sat_range.map(|band| band.p75),
            act_25: college.act_range.map(|band| band.p25),
            act_75: college.act_range.map(|band| band.p75),
            average_gpa: college.average_gpa,
            test_policy: college.test_policy.label().to_string(),
            aid_policy: college.aid_policy.label().to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct PredictResponse {
    pub probability: f64,
    pub confidence: f64,
    #[serde(default)]
    pub model_id: Option<String>,
    #[serde(default = "default_real_data")]
    pub real_data: bool,
}

#[derive(Clone)]
pub struct HttpModelPredictor {
    endpoint: String,
    client: reqwest::Client,
}

impl HttpModelPredictor {
    pub fn from_config(config: &PredictorConfig) -> Result<Option<Self>, ModelError> {
        let Some(endpoint) = config.model.endpoint.clone() else {
            return Ok(None);
        };
        let timeout = Duration::from_millis(config.model.timeout_ms);
        HttpModelPredictor::new(endpoint, timeout).map(Some)
    }

    pub fn new(endpoint: String, timeout: Duration) -> Result<Self, ModelError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { endpoint, client })
    }
}

#[async_trait]
impl ModelPredictor for HttpModelPredictor {
    async fn predict(
        &self,
        applicant: &ApplicantProfile,
        college: &CollegeProfile,
    ) -> Result<ModelEstimate, ModelError> {
        let url = format!("{}/predict", self.endpoint.trim_end_matches('/'));
        let response = self
            .client
            .post(url)
            .json(&PredictRequest::new(applicant, college))
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::Status { status, body });
        }

        let body = response.json::<PredictResponse>().await?;
        if !body.probability.is_finite() || !(0.0..=1.0).contains(&body.probability) {
            return Err(ModelError::InvalidResponse(format!(
                "probability out of range: {}",
                body.probability
            )));
        }

        Ok(ModelEstimate {
            probability: body.probability,
            confidence: body.confidence,
            model_id: body.model_id.unwrap_or_else(|| self.endpoint.clone()),
            real_data: body.real_data,
        })
    }

    fn identifier(&self) -> &str {
        &self.endpoint
    }
}
