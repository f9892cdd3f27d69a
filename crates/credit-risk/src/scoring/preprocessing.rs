use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::artifacts::ArtifactError;
use super::domain::{FieldCatalog, FieldKind};

/// Cleaning and feature policy loaded from `preprocessing.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreprocessingConfig {
    pub numeric: BTreeMap<String, NumericPolicy>,
    #[serde(default)]
    pub derived_ratios: Vec<RatioFeature>,
}

/// Clip range and fill value for one numeric field.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NumericPolicy {
    pub min: f64,
    pub max: f64,
    #[serde(default)]
    pub default: Option<f64>,
}

/// Feature computed as `numerator / denominator` over cleaned values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RatioFeature {
    pub name: String,
    pub numerator: String,
    pub denominator: String,
}

impl RatioFeature {
    /// Zero denominators yield 0.0 so the feature stays finite.
    pub fn compute(&self, numerator: f64, denominator: f64) -> f64 {
        if denominator == 0.0 {
            0.0
        } else {
            numerator / denominator
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClipBounds {
    pub min: f64,
    pub max: f64,
}

impl ClipBounds {
    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NumericRule {
    pub bounds: ClipBounds,
    pub integer: bool,
    pub default: Option<f64>,
}

impl NumericRule {
    /// Truncate integer fields toward zero, then clamp. Clamping last keeps the
    /// transform idempotent.
    pub fn apply(&self, value: f64) -> f64 {
        let value = if self.integer { value.trunc() } else { value };
        self.bounds.clamp(value)
    }
}

/// How one catalog field is encoded, resolved once at startup.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FeatureEncoding {
    Nominal(&'static [&'static str]),
    Ordinal(&'static [(&'static str, u8)]),
    Numeric(NumericRule),
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldEncoding {
    pub field: &'static str,
    pub required: bool,
    pub encoding: FeatureEncoding,
}

/// Resolved per-field encodings plus derived ratios, shared by the cleaner and
/// the feature engineer.
#[derive(Debug, Clone, PartialEq)]
pub struct FeaturePlan {
    fields: Vec<FieldEncoding>,
    ratios: Vec<RatioFeature>,
}

impl FeaturePlan {
    pub fn resolve(
        catalog: &FieldCatalog,
        config: &PreprocessingConfig,
    ) -> Result<Self, ArtifactError> {
        for name in config.numeric.keys() {
            match catalog.get(name).map(|spec| spec.kind) {
                Some(FieldKind::Numeric { .. }) => {}
                _ => {
                    return Err(ArtifactError::invalid(
                        "preprocessing",
                        format!("'{name}' is not a numeric application field"),
                    ))
                }
            }
        }

        let mut fields = Vec::with_capacity(catalog.fields().len());
        for spec in catalog.fields() {
            let encoding = match spec.kind {
                FieldKind::Nominal { categories } => FeatureEncoding::Nominal(categories),
                FieldKind::Ordinal { ranks } => FeatureEncoding::Ordinal(ranks),
                FieldKind::Numeric { integer, .. } => {
                    let policy = config.numeric.get(spec.name).ok_or_else(|| {
                        ArtifactError::invalid(
                            "preprocessing",
                            format!("missing clip bounds for '{}'", spec.name),
                        )
                    })?;
                    let rule = numeric_rule(spec.name, integer, spec.required, policy)?;
                    FeatureEncoding::Numeric(rule)
                }
            };
            fields.push(FieldEncoding {
                field: spec.name,
                required: spec.required,
                encoding,
            });
        }

        let mut names: BTreeSet<String> = feature_names(&fields).into_iter().collect();
        for ratio in &config.derived_ratios {
            for operand in [&ratio.numerator, &ratio.denominator] {
                if !matches!(
                    catalog.get(operand).map(|spec| spec.kind),
                    Some(FieldKind::Numeric { .. })
                ) {
                    return Err(ArtifactError::invalid(
                        "preprocessing",
                        format!(
                            "ratio '{}' references non-numeric field '{operand}'",
                            ratio.name
                        ),
                    ));
                }
            }
            if !names.insert(ratio.name.clone()) {
                return Err(ArtifactError::invalid(
                    "preprocessing",
                    format!("duplicate feature name '{}'", ratio.name),
                ));
            }
        }

        Ok(Self {
            fields,
            ratios: config.derived_ratios.clone(),
        })
    }

    pub fn fields(&self) -> &[FieldEncoding] {
        &self.fields
    }

    pub fn ratios(&self) -> &[RatioFeature] {
        &self.ratios
    }

    /// Every feature name the engineer can emit, in emission order.
    pub fn output_features(&self) -> Vec<String> {
        let mut names = feature_names(&self.fields);
        names.extend(self.ratios.iter().map(|ratio| ratio.name.clone()));
        names
    }
}

pub(crate) fn one_hot_column(field: &str, category: &str) -> String {
    format!("{field}_{category}")
}

fn feature_names(fields: &[FieldEncoding]) -> Vec<String> {
    let mut names = Vec::new();
    for encoding in fields {
        match encoding.encoding {
            FeatureEncoding::Nominal(categories) => names.extend(
                categories
                    .iter()
                    .map(|category| one_hot_column(encoding.field, category)),
            ),
            FeatureEncoding::Ordinal(_) | FeatureEncoding::Numeric(_) => {
                names.push(encoding.field.to_string())
            }
        }
    }
    names
}

fn numeric_rule(
    field: &str,
    integer: bool,
    required: bool,
    policy: &NumericPolicy,
) -> Result<NumericRule, ArtifactError> {
    let invalid = |detail: String| ArtifactError::invalid("preprocessing", detail);

    if !policy.min.is_finite() || !policy.max.is_finite() || policy.min > policy.max {
        return Err(invalid(format!(
            "clip bounds for '{field}' must be finite with min <= max"
        )));
    }
    if integer && (policy.min.fract() != 0.0 || policy.max.fract() != 0.0) {
        return Err(invalid(format!(
            "clip bounds for integer field '{field}' must be whole numbers"
        )));
    }

    let bounds = ClipBounds {
        min: policy.min,
        max: policy.max,
    };

    match policy.default {
        Some(default) if !bounds.contains(default) => {
            return Err(invalid(format!(
                "default for '{field}' lies outside its clip bounds"
            )));
        }
        Some(default) if integer && default.fract() != 0.0 => {
            return Err(invalid(format!(
                "default for integer field '{field}' must be a whole number"
            )));
        }
        None if !required => {
            return Err(invalid(format!(
                "optional field '{field}' needs a default fill value"
            )));
        }
        _ => {}
    }

    Ok(NumericRule {
        bounds,
        integer,
        default: policy.default,
    })
}
