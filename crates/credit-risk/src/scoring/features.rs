use std::collections::BTreeMap;
use std::sync::Arc;

use serde::Serialize;

use super::domain::CleanedRecord;
use super::preprocessing::{one_hot_column, FeatureEncoding, FeaturePlan};

/// Named engineered features prior to schema enforcement.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FeatureVector(BTreeMap<String, f64>);

impl FeatureVector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: f64) {
        self.0.insert(name.into(), value);
    }

    pub fn remove(&mut self, name: &str) -> Option<f64> {
        self.0.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.0.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl FromIterator<(String, f64)> for FeatureVector {
    fn from_iter<T: IntoIterator<Item = (String, f64)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Expands cleaned records into one-hot, ordinal, numeric, and ratio features.
#[derive(Debug, Clone)]
pub struct FeatureEngineer {
    plan: Arc<FeaturePlan>,
}

impl FeatureEngineer {
    pub fn new(plan: Arc<FeaturePlan>) -> Self {
        Self { plan }
    }

    pub fn engineer(&self, cleaned: &CleanedRecord) -> FeatureVector {
        let mut features = FeatureVector::new();

        for field in self.plan.fields() {
            match field.encoding {
                FeatureEncoding::Nominal(categories) => {
                    let selected = cleaned.category(field.field);
                    for category in categories {
                        let hot = selected == Some(*category);
                        features.insert(
                            one_hot_column(field.field, category),
                            if hot { 1.0 } else { 0.0 },
                        );
                    }
                }
                FeatureEncoding::Ordinal(ranks) => {
                    let rank = cleaned.category(field.field).and_then(|label| {
                        ranks
                            .iter()
                            .find(|(candidate, _)| *candidate == label)
                            .map(|(_, rank)| f64::from(*rank))
                    });
                    if let Some(rank) = rank {
                        features.insert(field.field, rank);
                    }
                }
                FeatureEncoding::Numeric(_) => {
                    if let Some(value) = cleaned.number(field.field) {
                        features.insert(field.field, value);
                    }
                }
            }
        }

        for ratio in self.plan.ratios() {
            let numerator = cleaned.number(&ratio.numerator);
            let denominator = cleaned.number(&ratio.denominator);
            if let (Some(numerator), Some(denominator)) = (numerator, denominator) {
                features.insert(ratio.name.clone(), ratio.compute(numerator, denominator));
            }
        }

        features
    }
}
