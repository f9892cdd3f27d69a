use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Inbound application as received from a caller, before any type checks.
///
/// Values stay as raw JSON so the validator can report type mismatches instead
/// of the deserializer rejecting the whole payload.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RawApplication(BTreeMap<String, Value>);

impl RawApplication {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.0.insert(field.to_string(), value.into());
        self
    }

    pub fn insert(&mut self, field: &str, value: impl Into<Value>) {
        self.0.insert(field.to_string(), value.into());
    }

    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.0.remove(field)
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

impl From<BTreeMap<String, Value>> for RawApplication {
    fn from(values: BTreeMap<String, Value>) -> Self {
        Self(values)
    }
}

/// Typed value of a single application field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Number(f64),
    Category(String),
}

impl FieldValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            FieldValue::Number(value) => Some(*value),
            FieldValue::Category(_) => None,
        }
    }

    pub fn as_category(&self) -> Option<&str> {
        match self {
            FieldValue::Category(value) => Some(value),
            FieldValue::Number(_) => None,
        }
    }
}

/// Closed numeric interval used for absolute sanity checks.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Domain {
    pub min: f64,
    pub max: f64,
}

impl Domain {
    pub const fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub const fn non_negative() -> Self {
        Self::new(0.0, f64::INFINITY)
    }

    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldKind {
    Numeric { integer: bool, domain: Domain },
    Nominal { categories: &'static [&'static str] },
    Ordinal { ranks: &'static [(&'static str, u8)] },
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    pub required: bool,
}

impl FieldSpec {
    const fn numeric(name: &'static str, integer: bool, domain: Domain, required: bool) -> Self {
        Self {
            name,
            kind: FieldKind::Numeric { integer, domain },
            required,
        }
    }

    const fn nominal(name: &'static str, categories: &'static [&'static str]) -> Self {
        Self {
            name,
            kind: FieldKind::Nominal { categories },
            required: true,
        }
    }

    const fn ordinal(name: &'static str, ranks: &'static [(&'static str, u8)]) -> Self {
        Self {
            name,
            kind: FieldKind::Ordinal { ranks },
            required: true,
        }
    }
}

pub const HOME_OWNERSHIP: &[&str] = &["RENT", "OWN", "MORTGAGE", "OTHER"];

pub const LOAN_INTENT: &[&str] = &[
    "DEBTCONSOLIDATION",
    "EDUCATION",
    "HOMEIMPROVEMENT",
    "MEDICAL",
    "PERSONAL",
    "VENTURE",
];

pub const LOAN_GRADE: &[(&str, u8)] = &[
    ("A", 1),
    ("B", 2),
    ("C", 3),
    ("D", 4),
    ("E", 5),
    ("F", 6),
    ("G", 7),
];

pub const DEFAULT_ON_FILE: &[(&str, u8)] = &[("N", 0), ("Y", 1)];

/// Ordered set of application fields the model was trained on.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldCatalog {
    fields: Vec<FieldSpec>,
}

impl FieldCatalog {
    pub fn new(fields: Vec<FieldSpec>) -> Self {
        Self { fields }
    }

    /// Field layout of the credit risk dataset.
    pub fn credit_risk() -> Self {
        Self::new(vec![
            FieldSpec::numeric("person_age", true, Domain::new(0.0, 150.0), true),
            FieldSpec::numeric("person_income", false, Domain::non_negative(), true),
            FieldSpec::nominal("person_home_ownership", HOME_OWNERSHIP),
            FieldSpec::numeric("person_emp_length", true, Domain::new(0.0, 100.0), false),
            FieldSpec::nominal("loan_intent", LOAN_INTENT),
            FieldSpec::ordinal("loan_grade", LOAN_GRADE),
            FieldSpec::numeric("loan_amnt", false, Domain::non_negative(), true),
            FieldSpec::numeric("loan_int_rate", false, Domain::new(0.0, 100.0), false),
            FieldSpec::numeric("loan_percent_income", false, Domain::new(0.0, 100.0), true),
            FieldSpec::ordinal("cb_person_default_on_file", DEFAULT_ON_FILE),
            FieldSpec::numeric(
                "cb_person_cred_hist_length",
                true,
                Domain::new(0.0, 100.0),
                true,
            ),
        ])
    }

    pub fn fields(&self) -> &[FieldSpec] {
        &self.fields
    }

    pub fn get(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|field| field.name == name)
    }
}

impl Default for FieldCatalog {
    fn default() -> Self {
        Self::credit_risk()
    }
}

/// Application whose present fields passed type, category, and domain checks.
///
/// Optional fields may still be absent; the cleaner fills them.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ValidatedApplication {
    pub(crate) values: BTreeMap<&'static str, FieldValue>,
}

impl ValidatedApplication {
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.values.get(field)
    }
}

/// Application with every catalog field present and numerics within policy bounds.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CleanedRecord {
    pub(crate) values: BTreeMap<&'static str, FieldValue>,
}

impl CleanedRecord {
    pub fn get(&self, field: &str) -> Option<&FieldValue> {
        self.values.get(field)
    }

    pub fn number(&self, field: &str) -> Option<f64> {
        self.get(field).and_then(FieldValue::as_number)
    }

    pub fn category(&self, field: &str) -> Option<&str> {
        self.get(field).and_then(FieldValue::as_category)
    }

    /// View the record as a validated application, used to re-clean output.
    pub fn as_validated(&self) -> ValidatedApplication {
        ValidatedApplication {
            values: self.values.clone(),
        }
    }
}

/// Operational outcome for a scored application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Decision {
    Approve,
    ConditionalApproval,
    Reject,
}

impl Decision {
    pub const fn ordered() -> [Self; 3] {
        [Self::Approve, Self::ConditionalApproval, Self::Reject]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Approve => "APPROVE",
            Self::ConditionalApproval => "CONDITIONAL_APPROVAL",
            Self::Reject => "REJECT",
        }
    }
}

/// Scoring output handed back to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub probability_of_default: f64,
    pub prediction: u8,
    pub decision: Decision,
    pub model_name: String,
    pub model_version: String,
}
