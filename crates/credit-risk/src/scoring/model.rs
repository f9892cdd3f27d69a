use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::artifacts::ArtifactError;
use super::schema::{FeatureSchema, OrderedFeatureVector};

/// Name and version reported alongside every prediction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub model_name: String,
    pub model_version: String,
}

/// Failure of the trained classifier for a single request.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InferenceError {
    #[error("model expected {expected} features, received {actual}")]
    ShapeMismatch { expected: usize, actual: usize },
    #[error("model produced an invalid probability ({0})")]
    InvalidProbability(f64),
    #[error("model unavailable: {0}")]
    Unavailable(String),
}

/// Trained classifier boundary. Implementations must be safe to share across
/// request handlers and must not mutate after loading.
pub trait RiskModel: Send + Sync {
    fn metadata(&self) -> &ModelMetadata;

    /// Probability of default for one schema-aligned feature vector.
    fn score(&self, features: &OrderedFeatureVector) -> Result<f64, InferenceError>;
}

/// On-disk shape of `model.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticModelArtifact {
    pub model_name: String,
    pub model_version: String,
    pub intercept: f64,
    pub coefficients: BTreeMap<String, f64>,
}

/// Logistic regression with weights laid out in schema order.
#[derive(Debug, Clone, PartialEq)]
pub struct LogisticModel {
    metadata: ModelMetadata,
    intercept: f64,
    weights: Vec<f64>,
}

impl LogisticModel {
    /// Bind coefficients to schema positions; every schema column needs a
    /// weight and no weight may name a column the schema lacks.
    pub fn aligned(
        artifact: LogisticModelArtifact,
        schema: &FeatureSchema,
    ) -> Result<Self, ArtifactError> {
        let invalid = |detail: String| ArtifactError::invalid("model", detail);

        if !artifact.intercept.is_finite() {
            return Err(invalid("intercept must be finite".to_string()));
        }

        if let Some(unknown) = artifact
            .coefficients
            .keys()
            .find(|name| schema.position(name).is_none())
        {
            return Err(invalid(format!(
                "coefficient '{unknown}' is not part of the feature schema"
            )));
        }

        let mut weights = Vec::with_capacity(schema.len());
        for column in schema.columns() {
            match artifact.coefficients.get(column) {
                Some(weight) if weight.is_finite() => weights.push(*weight),
                Some(_) => return Err(invalid(format!("coefficient '{column}' is not finite"))),
                None => return Err(invalid(format!("no coefficient for '{column}'"))),
            }
        }

        Ok(Self {
            metadata: ModelMetadata {
                model_name: artifact.model_name,
                model_version: artifact.model_version,
            },
            intercept: artifact.intercept,
            weights,
        })
    }
}

impl RiskModel for LogisticModel {
    fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }

    fn score(&self, features: &OrderedFeatureVector) -> Result<f64, InferenceError> {
        if features.len() != self.weights.len() {
            return Err(InferenceError::ShapeMismatch {
                expected: self.weights.len(),
                actual: features.len(),
            });
        }

        let logit = self.intercept
            + self
                .weights
                .iter()
                .zip(features.values())
                .map(|(weight, value)| weight * value)
                .sum::<f64>();

        let probability = 1.0 / (1.0 + (-logit).exp());
        if probability.is_finite() {
            Ok(probability)
        } else {
            Err(InferenceError::InvalidProbability(probability))
        }
    }
}
