use std::sync::Arc;

use super::domain::{CleanedRecord, FieldValue, ValidatedApplication};
use super::preprocessing::{FeatureEncoding, FeaturePlan};

/// Deterministic coercion, clipping, and default filling.
#[derive(Debug, Clone)]
pub struct Cleaner {
    plan: Arc<FeaturePlan>,
}

impl Cleaner {
    pub fn new(plan: Arc<FeaturePlan>) -> Self {
        Self { plan }
    }

    pub fn clean(&self, validated: &ValidatedApplication) -> CleanedRecord {
        let mut cleaned = CleanedRecord::default();

        for field in self.plan.fields() {
            let present = validated.get(field.field);
            let value = match field.encoding {
                FeatureEncoding::Numeric(rule) => present
                    .and_then(FieldValue::as_number)
                    .or(rule.default)
                    .map(|number| FieldValue::Number(rule.apply(number))),
                FeatureEncoding::Nominal(_) | FeatureEncoding::Ordinal(_) => present.cloned(),
            };

            if let Some(value) = value {
                cleaned.values.insert(field.field, value);
            }
        }

        cleaned
    }
}
