use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::de::DeserializeOwned;
use tracing::info;

use super::decision::{DecisionThresholds, ThresholdArtifact};
use super::domain::FieldCatalog;
use super::model::{LogisticModel, LogisticModelArtifact};
use super::preprocessing::{FeaturePlan, PreprocessingConfig};
use super::schema::{FeatureSchema, FeatureSchemaArtifact};

pub const FEATURE_SCHEMA_FILE: &str = "feature_schema.json";
pub const THRESHOLDS_FILE: &str = "decision_thresholds.json";
pub const PREPROCESSING_FILE: &str = "preprocessing.json";
pub const MODEL_FILE: &str = "model.json";

/// Missing or malformed model artifact. Always fatal at startup.
#[derive(Debug, thiserror::Error)]
pub enum ArtifactError {
    #[error("failed to read artifact {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("artifact {path} is not valid JSON: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("invalid {artifact} artifact: {detail}")]
    Invalid {
        artifact: &'static str,
        detail: String,
    },
}

impl ArtifactError {
    pub fn invalid(artifact: &'static str, detail: impl Into<String>) -> Self {
        Self::Invalid {
            artifact,
            detail: detail.into(),
        }
    }
}

/// Immutable policy and schema artifacts shared by every request.
#[derive(Debug, Clone)]
pub struct ScoringArtifacts {
    pub catalog: Arc<FieldCatalog>,
    pub plan: Arc<FeaturePlan>,
    pub schema: Arc<FeatureSchema>,
    pub thresholds: Arc<DecisionThresholds>,
}

impl ScoringArtifacts {
    pub fn new(
        catalog: FieldCatalog,
        preprocessing: &PreprocessingConfig,
        schema: FeatureSchema,
        thresholds: DecisionThresholds,
    ) -> Result<Self, ArtifactError> {
        let plan = FeaturePlan::resolve(&catalog, preprocessing)?;

        Ok(Self {
            catalog: Arc::new(catalog),
            plan: Arc::new(plan),
            schema: Arc::new(schema),
            thresholds: Arc::new(thresholds),
        })
    }

    /// Load schema, thresholds, and preprocessing policy from `dir`.
    pub fn load(dir: impl AsRef<Path>) -> Result<Self, ArtifactError> {
        let dir = dir.as_ref();

        let schema = FeatureSchema::from_artifact(read_json::<FeatureSchemaArtifact>(
            &dir.join(FEATURE_SCHEMA_FILE),
        )?)?;
        let thresholds = DecisionThresholds::from_artifact(read_json::<ThresholdArtifact>(
            &dir.join(THRESHOLDS_FILE),
        )?)?;
        let preprocessing = read_json::<PreprocessingConfig>(&dir.join(PREPROCESSING_FILE))?;

        let artifacts = Self::new(FieldCatalog::credit_risk(), &preprocessing, schema, thresholds)?;

        let emitted = artifacts.plan.output_features();
        let unseen = artifacts
            .schema
            .columns()
            .iter()
            .filter(|column| !emitted.contains(column))
            .count();
        info!(
            dir = %dir.display(),
            features = artifacts.schema.len(),
            bands = artifacts.thresholds.bands().len(),
            unseen,
            "scoring artifacts loaded"
        );

        Ok(artifacts)
    }

    /// Load `model.json` and bind it to the loaded schema.
    pub fn load_logistic_model(
        &self,
        dir: impl AsRef<Path>,
    ) -> Result<LogisticModel, ArtifactError> {
        let artifact = read_json::<LogisticModelArtifact>(&dir.as_ref().join(MODEL_FILE))?;
        LogisticModel::aligned(artifact, &self.schema)
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ArtifactError> {
    let raw = fs::read_to_string(path).map_err(|source| ArtifactError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| ArtifactError::Parse {
        path: path.to_path_buf(),
        source,
    })
}
