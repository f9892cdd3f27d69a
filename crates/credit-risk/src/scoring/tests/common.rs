use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};

use axum::response::Response;
use serde_json::Value;

use crate::scoring::decision::{DecisionThresholds, ThresholdBand};
use crate::scoring::domain::{Decision, FieldCatalog, RawApplication};
use crate::scoring::model::{InferenceError, ModelMetadata, RiskModel};
use crate::scoring::preprocessing::{
    FeaturePlan, NumericPolicy, PreprocessingConfig, RatioFeature,
};
use crate::scoring::schema::{FeatureSchema, OrderedFeatureVector};
use crate::scoring::{CreditScoringService, ScoringArtifacts};

pub(super) fn scenario_application() -> RawApplication {
    RawApplication::new()
        .with("person_age", 32)
        .with("person_income", 60000)
        .with("person_home_ownership", "RENT")
        .with("person_emp_length", 4)
        .with("loan_intent", "PERSONAL")
        .with("loan_grade", "B")
        .with("loan_amnt", 12000)
        .with("loan_int_rate", 13.5)
        .with("loan_percent_income", 0.25)
        .with("cb_person_default_on_file", "N")
        .with("cb_person_cred_hist_length", 6)
}

fn policy(min: f64, max: f64, default: Option<f64>) -> NumericPolicy {
    NumericPolicy { min, max, default }
}

pub(super) fn preprocessing_config() -> PreprocessingConfig {
    let mut numeric = BTreeMap::new();
    numeric.insert("person_age".to_string(), policy(18.0, 100.0, None));
    numeric.insert("person_income".to_string(), policy(4000.0, 2_000_000.0, None));
    numeric.insert("person_emp_length".to_string(), policy(0.0, 50.0, Some(4.0)));
    numeric.insert("loan_amnt".to_string(), policy(500.0, 40000.0, None));
    numeric.insert("loan_int_rate".to_string(), policy(5.0, 25.0, Some(11.0)));
    numeric.insert("loan_percent_income".to_string(), policy(0.0, 1.0, None));
    numeric.insert(
        "cb_person_cred_hist_length".to_string(),
        policy(0.0, 40.0, None),
    );

    PreprocessingConfig {
        numeric,
        derived_ratios: vec![
            RatioFeature {
                name: "loan_to_income_ratio".to_string(),
                numerator: "loan_amnt".to_string(),
                denominator: "person_income".to_string(),
            },
            RatioFeature {
                name: "credit_history_to_age_ratio".to_string(),
                numerator: "cb_person_cred_hist_length".to_string(),
                denominator: "person_age".to_string(),
            },
        ],
    }
}

pub(super) fn feature_plan() -> Arc<FeaturePlan> {
    let plan = FeaturePlan::resolve(&FieldCatalog::credit_risk(), &preprocessing_config())
        .expect("plan resolves");
    Arc::new(plan)
}

pub(super) fn thresholds() -> DecisionThresholds {
    DecisionThresholds::new(
        vec![
            ThresholdBand {
                upper_bound: 0.3,
                decision: Decision::Approve,
            },
            ThresholdBand {
                upper_bound: 0.6,
                decision: Decision::ConditionalApproval,
            },
            ThresholdBand {
                upper_bound: 1.0,
                decision: Decision::Reject,
            },
        ],
        0.5,
    )
    .expect("valid thresholds")
}

pub(super) fn artifacts() -> ScoringArtifacts {
    let plan = feature_plan();
    let schema = FeatureSchema::new(plan.output_features()).expect("valid schema");
    ScoringArtifacts::new(
        FieldCatalog::credit_risk(),
        &preprocessing_config(),
        schema,
        thresholds(),
    )
    .expect("artifacts build")
}

fn metadata() -> ModelMetadata {
    ModelMetadata {
        model_name: "stub".to_string(),
        model_version: "0.0.1".to_string(),
    }
}

/// Model returning the same probability for every input and remembering the
/// last vector it was handed.
pub(super) struct FixedModel {
    metadata: ModelMetadata,
    probability: f64,
    last_input: Mutex<Option<OrderedFeatureVector>>,
}

impl FixedModel {
    pub(super) fn new(probability: f64) -> Self {
        Self {
            metadata: metadata(),
            probability,
            last_input: Mutex::new(None),
        }
    }

    pub(super) fn last_input(&self) -> Option<OrderedFeatureVector> {
        self.last_input.lock().expect("model mutex poisoned").clone()
    }
}

impl RiskModel for FixedModel {
    fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }

    fn score(&self, features: &OrderedFeatureVector) -> Result<f64, InferenceError> {
        *self.last_input.lock().expect("model mutex poisoned") = Some(features.clone());
        Ok(self.probability)
    }
}

/// Model scoring by the value of a single feature, so batches can mix outcomes.
pub(super) struct FeatureEchoModel {
    metadata: ModelMetadata,
    feature: &'static str,
    scale: f64,
}

impl FeatureEchoModel {
    pub(super) fn new(feature: &'static str, scale: f64) -> Self {
        Self {
            metadata: metadata(),
            feature,
            scale,
        }
    }
}

impl RiskModel for FeatureEchoModel {
    fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }

    fn score(&self, features: &OrderedFeatureVector) -> Result<f64, InferenceError> {
        Ok(features.get(self.feature).unwrap_or(0.0) * self.scale)
    }
}

pub(super) struct UnavailableModel {
    metadata: ModelMetadata,
}

impl Default for UnavailableModel {
    fn default() -> Self {
        Self {
            metadata: metadata(),
        }
    }
}

impl RiskModel for UnavailableModel {
    fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }

    fn score(&self, _features: &OrderedFeatureVector) -> Result<f64, InferenceError> {
        Err(InferenceError::Unavailable("model session closed".to_string()))
    }
}

pub(super) fn build_service<M: RiskModel + 'static>(model: M) -> CreditScoringService<M> {
    CreditScoringService::new(&artifacts(), Arc::new(model))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 1 << 20)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
