use serde::{Deserialize, Serialize};

use super::artifacts::ArtifactError;
use super::domain::Decision;

/// One probability band: scores up to and including `upper_bound` map to `decision`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ThresholdBand {
    pub upper_bound: f64,
    pub decision: Decision,
}

/// On-disk shape of `decision_thresholds.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThresholdArtifact {
    pub bands: Vec<ThresholdBand>,
    pub class_threshold: f64,
}

/// Policy bands covering [0, 1] plus the independent class cutoff.
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionThresholds {
    bands: Vec<ThresholdBand>,
    ceiling: Decision,
    class_threshold: f64,
}

impl DecisionThresholds {
    pub fn new(bands: Vec<ThresholdBand>, class_threshold: f64) -> Result<Self, ArtifactError> {
        let invalid = |detail: String| ArtifactError::invalid("decision_thresholds", detail);

        let ceiling = match bands.last() {
            Some(last) if last.upper_bound == 1.0 => last.decision,
            Some(last) => {
                return Err(invalid(format!(
                    "last band must end at 1.0, found {}",
                    last.upper_bound
                )))
            }
            None => return Err(invalid("at least one band is required".to_string())),
        };

        let mut previous = 0.0;
        for band in &bands {
            if !band.upper_bound.is_finite() || band.upper_bound <= 0.0 || band.upper_bound > 1.0 {
                return Err(invalid(format!(
                    "band bound {} must lie in (0, 1]",
                    band.upper_bound
                )));
            }
            if band.upper_bound <= previous {
                return Err(invalid(format!(
                    "band bounds must be strictly ascending ({} after {previous})",
                    band.upper_bound
                )));
            }
            previous = band.upper_bound;
        }

        if !(0.0..=1.0).contains(&class_threshold) {
            return Err(invalid(format!(
                "class threshold {class_threshold} must lie in [0, 1]"
            )));
        }

        Ok(Self {
            bands,
            ceiling,
            class_threshold,
        })
    }

    pub fn from_artifact(artifact: ThresholdArtifact) -> Result<Self, ArtifactError> {
        Self::new(artifact.bands, artifact.class_threshold)
    }

    pub fn bands(&self) -> &[ThresholdBand] {
        &self.bands
    }

    pub fn class_threshold(&self) -> f64 {
        self.class_threshold
    }

    /// First band whose upper bound is at or above `probability`.
    pub fn decide(&self, probability: f64) -> Decision {
        self.bands
            .iter()
            .find(|band| probability <= band.upper_bound)
            .map(|band| band.decision)
            .unwrap_or(self.ceiling)
    }

    /// 1 means the model predicts default.
    pub fn predicted_class(&self, probability: f64) -> u8 {
        u8::from(probability >= self.class_threshold)
    }
}
