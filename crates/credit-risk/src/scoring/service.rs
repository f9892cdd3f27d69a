use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use tracing::{debug, info, warn};

use super::artifacts::ScoringArtifacts;
use super::cleaning::Cleaner;
use super::decision::DecisionThresholds;
use super::domain::{Decision, PredictionResult, RawApplication};
use super::features::FeatureEngineer;
use super::metrics::{MetricsAggregator, MetricsSnapshot, RequestKind};
use super::model::{InferenceError, ModelMetadata, RiskModel};
use super::schema::FeatureSchema;
use super::validation::{SchemaValidator, ValidationError};

/// Largest batch accepted by [`CreditScoringService::score_batch`].
pub const MAX_BATCH_SIZE: usize = 500;

/// Per-record scoring failure.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScoringError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Inference(#[from] InferenceError),
}

/// Batch rejected as a whole before any record is processed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BatchError {
    #[error("batch is empty")]
    Empty,
    #[error("batch size {actual} exceeds maximum limit of {max} records")]
    TooLarge { max: usize, actual: usize },
}

/// Service composing the request-to-decision pipeline with the shared model
/// and metrics aggregator.
pub struct CreditScoringService<M> {
    validator: SchemaValidator,
    cleaner: Cleaner,
    engineer: FeatureEngineer,
    schema: Arc<FeatureSchema>,
    thresholds: Arc<DecisionThresholds>,
    model: Arc<M>,
    metrics: Arc<MetricsAggregator>,
}

impl<M> CreditScoringService<M>
where
    M: RiskModel + 'static,
{
    pub fn new(artifacts: &ScoringArtifacts, model: Arc<M>) -> Self {
        Self::with_metrics(artifacts, model, Arc::new(MetricsAggregator::new()))
    }

    pub fn with_metrics(
        artifacts: &ScoringArtifacts,
        model: Arc<M>,
        metrics: Arc<MetricsAggregator>,
    ) -> Self {
        Self {
            validator: SchemaValidator::new(Arc::clone(&artifacts.catalog)),
            cleaner: Cleaner::new(Arc::clone(&artifacts.plan)),
            engineer: FeatureEngineer::new(Arc::clone(&artifacts.plan)),
            schema: Arc::clone(&artifacts.schema),
            thresholds: Arc::clone(&artifacts.thresholds),
            model,
            metrics,
        }
    }

    pub fn model_metadata(&self) -> &ModelMetadata {
        self.model.metadata()
    }

    /// Score one application and record the call as a single request.
    pub fn score_one(&self, raw: &RawApplication) -> Result<PredictionResult, ScoringError> {
        self.observe_one(|| self.run_pipeline(raw))
    }

    /// Score an untyped JSON body. Anything other than an object fails
    /// validation on the `record` field.
    pub fn score_json(&self, record: &Value) -> Result<PredictionResult, ScoringError> {
        self.observe_one(|| self.run_json_pipeline(record))
    }

    /// Score a batch. Results are positionally aligned with `raws`; one failing
    /// record never affects its siblings.
    pub fn score_batch(
        &self,
        raws: &[RawApplication],
    ) -> Result<Vec<Result<PredictionResult, ScoringError>>, BatchError> {
        self.observe_batch(raws, |raw| self.run_pipeline(raw))
    }

    /// Batch variant of [`Self::score_json`]; non-object items become
    /// positional errors.
    pub fn score_json_batch(
        &self,
        records: &[Value],
    ) -> Result<Vec<Result<PredictionResult, ScoringError>>, BatchError> {
        self.observe_batch(records, |record| self.run_json_pipeline(record))
    }

    pub fn metrics_snapshot(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }

    fn observe_one(
        &self,
        score: impl FnOnce() -> Result<PredictionResult, ScoringError>,
    ) -> Result<PredictionResult, ScoringError> {
        let started = Instant::now();
        let result = score();
        let latency_ms = elapsed_ms(started);

        match &result {
            Ok(prediction) => {
                self.metrics
                    .record(RequestKind::Single, &[prediction.decision], 0, latency_ms);
                info!(
                    probability = prediction.probability_of_default,
                    prediction = prediction.prediction,
                    decision = prediction.decision.label(),
                    model = %prediction.model_name,
                    version = %prediction.model_version,
                    "application scored"
                );
            }
            Err(err) => {
                self.metrics.record(RequestKind::Single, &[], 1, latency_ms);
                log_failure(err);
            }
        }

        result
    }

    fn observe_batch<T>(
        &self,
        records: &[T],
        score: impl Fn(&T) -> Result<PredictionResult, ScoringError>,
    ) -> Result<Vec<Result<PredictionResult, ScoringError>>, BatchError> {
        if records.is_empty() {
            return Err(BatchError::Empty);
        }
        if records.len() > MAX_BATCH_SIZE {
            return Err(BatchError::TooLarge {
                max: MAX_BATCH_SIZE,
                actual: records.len(),
            });
        }

        let started = Instant::now();
        let results: Vec<_> = records.iter().map(score).collect();
        let latency_ms = elapsed_ms(started);

        let decisions: Vec<Decision> = results
            .iter()
            .filter_map(|result| result.as_ref().ok().map(|prediction| prediction.decision))
            .collect();
        let rejected = results.len() - decisions.len();

        self.metrics
            .record(RequestKind::Batch, &decisions, rejected, latency_ms);

        for err in results.iter().filter_map(|result| result.as_ref().err()) {
            log_failure(err);
        }
        info!(
            batch_size = results.len(),
            scored = decisions.len(),
            rejected,
            model = %self.model.metadata().model_name,
            version = %self.model.metadata().model_version,
            "batch scored"
        );

        Ok(results)
    }

    fn run_json_pipeline(&self, record: &Value) -> Result<PredictionResult, ScoringError> {
        let raw = RawApplication::try_from(record)?;
        self.run_pipeline(&raw)
    }

    fn run_pipeline(&self, raw: &RawApplication) -> Result<PredictionResult, ScoringError> {
        let validated = self.validator.validate(raw)?;
        let cleaned = self.cleaner.clean(&validated);
        let features = self.engineer.engineer(&cleaned);
        let ordered = self.schema.enforce(&features);

        let probability = self.model.score(&ordered)?;
        if !(0.0..=1.0).contains(&probability) {
            return Err(InferenceError::InvalidProbability(probability).into());
        }

        let metadata = self.model.metadata();
        let result = PredictionResult {
            probability_of_default: probability,
            prediction: self.thresholds.predicted_class(probability),
            decision: self.thresholds.decide(probability),
            model_name: metadata.model_name.clone(),
            model_version: metadata.model_version.clone(),
        };
        debug!(
            probability,
            decision = result.decision.label(),
            "pipeline completed"
        );

        Ok(result)
    }
}

fn elapsed_ms(started: Instant) -> f64 {
    started.elapsed().as_secs_f64() * 1000.0
}

fn log_failure(err: &ScoringError) {
    match err {
        ScoringError::Validation(err) => {
            debug!(field = %err.field, reason = err.reason.label(), "application rejected")
        }
        ScoringError::Inference(err) => warn!(error = %err, "inference failed"),
    }
}
