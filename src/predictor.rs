use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;

use crate::calibration::shortlist::{dedupe, select_balanced};
use crate::config::PredictorConfig;
use crate::error::{ConfigError, ModelError};
use crate::major::MajorRelevance;
use crate::model::{ModelEstimate, ModelPredictor};
use crate::scoring::ScoringPipeline;
use crate::{ApplicantProfile, Category, CollegeProfile, PredictionResult};

#[derive(Clone)]
pub struct AdmissionPredictor {
    config: Arc<PredictorConfig>,
    pipeline: Arc<ScoringPipeline>,
    model: Option<Arc<dyn ModelPredictor>>,
    relevance: Option<Arc<dyn MajorRelevance>>,
}

impl AdmissionPredictor {
    pub fn new(config: PredictorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let pipeline = ScoringPipeline::from_config(&config)?;
        Ok(Self {
            config: Arc::new(config),
            pipeline: Arc::new(pipeline),
            model: None,
            relevance: None,
        })
    }

    pub fn with_model(mut self, model: Arc<dyn ModelPredictor>) -> Self {
        self.model = Some(model);
        self
    }

    pub fn with_major_relevance(mut self, relevance: Arc<dyn MajorRelevance>) -> Self {
        self.relevance = Some(relevance);
        self
    }

    pub fn config(&self) -> &PredictorConfig {
        &self.config
    }

    pub fn pipeline(&self) -> &ScoringPipeline {
        &self.pipeline
    }

    pub fn score(&self, applicant: &ApplicantProfile, college: &CollegeProfile) -> PredictionResult {
        self.score_with_estimate(applicant, college, None)
    }

    pub fn score_with_estimate(
        &self,
        applicant: &ApplicantProfile,
        college: &CollegeProfile,
        estimate: Option<&ModelEstimate>,
    ) -> PredictionResult {
        let major_fit = self.major_fit(applicant, college);
        self.pipeline.run(applicant, college, major_fit, estimate)
    }

    pub async fn predict(
        &self,
        applicant: &ApplicantProfile,
        college: &CollegeProfile,
    ) -> PredictionResult {
        let estimate = self.model_estimate(applicant, college).await;
        self.score_with_estimate(applicant, college, estimate.as_ref())
    }

    pub async fn rank_shortlist(
        &self,
        applicant: &ApplicantProfile,
        candidates: &[CollegeProfile],
        target_size: usize,
    ) -> Vec<PredictionResult> {
        let mut seen = std::collections::HashSet::new();
        let unique: Vec<CollegeProfile> = candidates
            .iter()
            .filter(|college| seen.insert(college.identity()))
            .cloned()
            .collect();

        let semaphore = Arc::new(Semaphore::new(self.config.model.max_concurrency.max(1)));
        let applicant = Arc::new(applicant.clone());
        let mut handles = Vec::with_capacity(unique.len());

        for college in &unique {
            let sem = Arc::clone(&semaphore);
            let predictor = self.clone();
            let applicant = Arc::clone(&applicant);
            let college = college.clone();

            handles.push(tokio::spawn(async move {
                let _permit = sem.acquire_owned().await.ok();
                predictor.predict(&applicant, &college).await
            }));
        }

        let mut results = Vec::with_capacity(unique.len());
        for (handle, college) in handles.into_iter().zip(&unique) {
            match handle.await {
                Ok(result) => results.push(result),
                Err(err) => {
                    tracing::warn!(college = %college.name, error = %err, "scoring task failed, using formula only");
                    results.push(self.score(&applicant, college));
                }
            }
        }

        let results = dedupe(results);
        let shortlist = select_balanced(results, target_size);

        let count = |category: Category| shortlist.iter().filter(|r| r.category == category).count();
        tracing::info!(
            candidates = candidates.len(),
            unique = unique.len(),
            selected = shortlist.len(),
            safety = count(Category::Safety),
            target = count(Category::Target),
            reach = count(Category::Reach),
            "shortlist ranked"
        );

        shortlist
    }

    fn major_fit(&self, applicant: &ApplicantProfile, college: &CollegeProfile) -> Option<f64> {
        let relevance = self.relevance.as_ref()?;
        let major = applicant.intended_major.as_deref()?;
        relevance.fit(major, college)
    }

    async fn model_estimate(
        &self,
        applicant: &ApplicantProfile,
        college: &CollegeProfile,
    ) -> Option<ModelEstimate> {
        let model = self.model.as_ref()?;
        let timeout_ms = self.config.model.timeout_ms;
        let call = model.predict(applicant, college);

        let outcome = match tokio::time::timeout(Duration::from_millis(timeout_ms), call).await {
            Ok(result) => result,
            Err(_) => Err(ModelError::Timeout(timeout_ms)),
        };

        match outcome {
            Ok(estimate) if estimate.is_usable() => Some(estimate),
            Ok(estimate) => {
                tracing::warn!(
                    college = %college.name,
                    model = model.identifier(),
                    confidence = estimate.confidence,
                    "model estimate unusable, using formula only"
                );
                None
            }
            Err(err) => {
                tracing::warn!(
                    college = %college.name,
                    model = model.identifier(),
                    error = %err,
                    "model unavailable, using formula only"
                );
                None
            }
        }
    }
}
