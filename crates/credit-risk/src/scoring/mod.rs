//! Loan application scoring: validation, cleaning, feature engineering,
//! schema enforcement, inference, and policy decisions.

pub mod artifacts;
pub mod cleaning;
pub mod decision;
pub mod domain;
pub mod features;
pub mod import;
pub mod metrics;
pub mod model;
pub mod preprocessing;
pub mod router;
pub mod schema;
pub mod service;
pub mod validation;

#[cfg(test)]
mod tests;

pub use artifacts::{ArtifactError, ScoringArtifacts};
pub use cleaning::Cleaner;
pub use decision::{DecisionThresholds, ThresholdBand};
pub use domain::{
    CleanedRecord, Decision, FieldCatalog, FieldValue, PredictionResult, RawApplication,
    ValidatedApplication,
};
pub use features::{FeatureEngineer, FeatureVector};
pub use import::{ApplicationCsvImporter, ImportError};
pub use metrics::{MetricsAggregator, MetricsSnapshot, RequestKind};
pub use model::{InferenceError, LogisticModel, ModelMetadata, RiskModel};
pub use preprocessing::{FeaturePlan, PreprocessingConfig};
pub use router::scoring_router;
pub use schema::{FeatureSchema, OrderedFeatureVector};
pub use service::{BatchError, CreditScoringService, ScoringError, MAX_BATCH_SIZE};
pub use validation::{SchemaValidator, ValidationError, ValidationReason};
