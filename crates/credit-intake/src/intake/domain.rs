use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub const INCOME: &str = "income";
pub const EXPENSES: &str = "expenses";
pub const DEPENDENTS: &str = "dependents";
pub const TXN_COUNT: &str = "txn_count";
pub const TXN_TOTAL: &str = "txn_total";
pub const TXN_AVG: &str = "txn_avg";
pub const TXN_STD: &str = "txn_std";

/// Identifier wrapper for audit records, generated locally as a UUID v4 string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AuditId(pub String);

impl AuditId {
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AuditId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Flat numeric feature mapping sent to the scoring model.
///
/// Values are always finite: anything else is stored as `0`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureSet(BTreeMap<String, f64>);

impl FeatureSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: f64) {
        let value = if value.is_finite() { value } else { 0.0 };
        self.0.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.0.get(name).copied()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.0.contains_key(name)
    }

    /// Union with a fragment whose keys are disjoint from this set.
    pub fn merge(&mut self, fragment: FeatureSet) {
        for (name, value) in fragment.0 {
            self.insert(name, value);
        }
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(name, value)| (name.as_str(), *value))
    }
}

impl FromIterator<(String, f64)> for FeatureSet {
    fn from_iter<T: IntoIterator<Item = (String, f64)>>(iter: T) -> Self {
        let mut features = FeatureSet::new();
        for (name, value) in iter {
            features.insert(name, value);
        }
        features
    }
}

/// Raw applicant fields as they arrive from a form or JSON body.
///
/// Numeric fields are kept as text; JSON numbers and booleans are captured as their
/// textual rendering so coercion behaves identically for both transports.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicantForm {
    #[serde(default, deserialize_with = "lenient_text")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub phone: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub email: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub income: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub expenses: Option<String>,
    #[serde(default, deserialize_with = "lenient_text")]
    pub dependents: Option<String>,
}

impl ApplicantForm {
    /// Assigns a named form field; unknown names are ignored.
    pub fn set_field(&mut self, name: &str, value: String) -> bool {
        let slot = match name {
            "name" => &mut self.name,
            "phone" => &mut self.phone,
            "email" => &mut self.email,
            "income" => &mut self.income,
            "expenses" => &mut self.expenses,
            "dependents" => &mut self.dependents,
            _ => return false,
        };
        *slot = Some(value);
        true
    }
}

fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(Value::Null) => None,
        Some(Value::String(text)) => Some(text),
        Some(Value::Number(number)) => Some(number.to_string()),
        Some(Value::Bool(flag)) => Some(flag.to_string()),
        Some(other) => Some(other.to_string()),
    })
}

/// Free-form identity fields passed through without format validation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplicantIdentity {
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
}

/// A single intake request: applicant fields plus the optional transaction upload.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IntakeSubmission {
    pub form: ApplicantForm,
    pub transactions: Option<Vec<u8>>,
}

/// Scoring model output, passed through without shape validation.
///
/// Every field keeps whatever JSON the model sent; absent fields are `null`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DecisionResult {
    #[serde(default)]
    pub score: Value,
    #[serde(default)]
    pub decision: Value,
    #[serde(default)]
    pub explanation: Value,
    #[serde(default)]
    pub model_version: Value,
}

/// Immutable audit entry persisted once per successful scoring call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditRecord {
    pub audit_id: AuditId,
    pub name: Option<String>,
    pub phone: Option<String>,
    pub email: Option<String>,
    pub features: FeatureSet,
    pub score: Value,
    pub decision: Value,
    pub explanation: Value,
    pub model_version: Value,
    pub raw_transaction_text: String,
    pub created_at: DateTime<Utc>,
}

impl AuditRecord {
    pub fn decision_result(&self) -> DecisionResult {
        DecisionResult {
            score: self.score.clone(),
            decision: self.decision.clone(),
            explanation: self.explanation.clone(),
            model_version: self.model_version.clone(),
        }
    }
}
