use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::artifacts::ArtifactError;
use super::features::FeatureVector;

/// On-disk shape of `feature_schema.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureSchemaArtifact {
    pub feature_names: Vec<String>,
    #[serde(default)]
    pub num_features: Option<usize>,
}

/// Canonical training-time column list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeatureSchema {
    columns: Arc<[String]>,
}

impl FeatureSchema {
    pub fn new(columns: Vec<String>) -> Result<Self, ArtifactError> {
        if columns.is_empty() {
            return Err(ArtifactError::invalid(
                "feature_schema",
                "feature list is empty",
            ));
        }

        let mut seen = HashSet::with_capacity(columns.len());
        for column in &columns {
            if column.trim().is_empty() {
                return Err(ArtifactError::invalid(
                    "feature_schema",
                    "feature names must not be blank",
                ));
            }
            if !seen.insert(column.as_str()) {
                return Err(ArtifactError::invalid(
                    "feature_schema",
                    format!("duplicate feature '{column}'"),
                ));
            }
        }

        Ok(Self {
            columns: columns.into(),
        })
    }

    pub fn from_artifact(artifact: FeatureSchemaArtifact) -> Result<Self, ArtifactError> {
        if let Some(expected) = artifact.num_features {
            if expected != artifact.feature_names.len() {
                return Err(ArtifactError::invalid(
                    "feature_schema",
                    format!(
                        "num_features is {expected} but {} names are listed",
                        artifact.feature_names.len()
                    ),
                ));
            }
        }
        Self::new(artifact.feature_names)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column == name)
    }

    /// Align engineered features to the schema: missing columns become 0.0 and
    /// columns the model never saw are dropped.
    pub fn enforce(&self, features: &FeatureVector) -> OrderedFeatureVector {
        let mut missing = 0usize;
        let values: Vec<f64> = self
            .columns
            .iter()
            .map(|column| {
                features.get(column).unwrap_or_else(|| {
                    missing += 1;
                    0.0
                })
            })
            .collect();

        let dropped: Vec<&str> = features
            .names()
            .filter(|name| self.position(name).is_none())
            .collect();

        if missing > 0 || !dropped.is_empty() {
            debug!(
                missing,
                dropped = ?dropped,
                "engineered features drifted from the model schema"
            );
        }

        OrderedFeatureVector {
            columns: Arc::clone(&self.columns),
            values,
        }
    }
}

/// Feature values laid out exactly as the model was trained.
#[derive(Debug, Clone, PartialEq)]
pub struct OrderedFeatureVector {
    columns: Arc<[String]>,
    values: Vec<f64>,
}

impl OrderedFeatureVector {
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.columns
            .iter()
            .position(|column| column == name)
            .map(|index| self.values[index])
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.columns
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().copied())
    }
}
