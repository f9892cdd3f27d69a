use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::domain::{
    FieldCatalog, FieldKind, FieldSpec, FieldValue, RawApplication, ValidatedApplication,
};

/// Why a field was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationReason {
    MissingField,
    TypeMismatch,
    UnknownCategory,
    OutOfDomain,
}

impl ValidationReason {
    pub const fn label(self) -> &'static str {
        match self {
            Self::MissingField => "missing_field",
            Self::TypeMismatch => "type_mismatch",
            Self::UnknownCategory => "unknown_category",
            Self::OutOfDomain => "out_of_domain",
        }
    }
}

impl fmt::Display for ValidationReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Client-input fault naming the first offending field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[error("invalid field '{field}': {reason}")]
pub struct ValidationError {
    pub field: String,
    pub reason: ValidationReason,
}

impl ValidationError {
    pub fn new(field: &str, reason: ValidationReason) -> Self {
        Self {
            field: field.to_string(),
            reason,
        }
    }
}

/// Fail-fast validator: fields are checked in catalog order and the first
/// violation is returned.
#[derive(Debug, Clone)]
pub struct SchemaValidator {
    catalog: Arc<FieldCatalog>,
}

impl SchemaValidator {
    pub fn new(catalog: Arc<FieldCatalog>) -> Self {
        Self { catalog }
    }

    pub fn validate(&self, raw: &RawApplication) -> Result<ValidatedApplication, ValidationError> {
        let mut validated = ValidatedApplication::default();

        for spec in self.catalog.fields() {
            let value = match raw.get(spec.name) {
                None | Some(Value::Null) if spec.required => {
                    return Err(ValidationError::new(
                        spec.name,
                        ValidationReason::MissingField,
                    ));
                }
                None | Some(Value::Null) => continue,
                Some(value) => value,
            };

            let typed = check_field(spec, value)?;
            validated.values.insert(spec.name, typed);
        }

        Ok(validated)
    }
}

/// Field reported when a submitted record is not a JSON object at all.
pub const RECORD_FIELD: &str = "record";

impl TryFrom<&Value> for RawApplication {
    type Error = ValidationError;

    fn try_from(value: &Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(fields) => Ok(fields
                .iter()
                .map(|(name, value)| (name.clone(), value.clone()))
                .collect::<BTreeMap<_, _>>()
                .into()),
            _ => Err(ValidationError::new(
                RECORD_FIELD,
                ValidationReason::TypeMismatch,
            )),
        }
    }
}

fn check_field(spec: &FieldSpec, value: &Value) -> Result<FieldValue, ValidationError> {
    let reject = |reason| ValidationError::new(spec.name, reason);

    match spec.kind {
        FieldKind::Numeric { domain, .. } => {
            let number = value
                .as_f64()
                .ok_or_else(|| reject(ValidationReason::TypeMismatch))?;
            if !domain.contains(number) {
                return Err(reject(ValidationReason::OutOfDomain));
            }
            Ok(FieldValue::Number(number))
        }
        FieldKind::Nominal { categories } => {
            let category = value
                .as_str()
                .ok_or_else(|| reject(ValidationReason::TypeMismatch))?;
            if !categories.contains(&category) {
                return Err(reject(ValidationReason::UnknownCategory));
            }
            Ok(FieldValue::Category(category.to_string()))
        }
        FieldKind::Ordinal { ranks } => {
            let category = value
                .as_str()
                .ok_or_else(|| reject(ValidationReason::TypeMismatch))?;
            if !ranks.iter().any(|(label, _)| *label == category) {
                return Err(reject(ValidationReason::UnknownCategory));
            }
            Ok(FieldValue::Category(category.to_string()))
        }
    }
}
