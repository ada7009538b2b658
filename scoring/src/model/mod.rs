use serde::{Deserialize, Deserializer, Serialize};
use std::error::Error;
use strum_macros::Display as EnumDisplay;

pub type GenericError = Box<dyn Error + Send + Sync>;

/// A single incoming transaction, as supplied by external callers.
///
/// Every field is optional on the wire; absent or unparseable values fall
/// back to neutral defaults so that a sloppy record can still be scored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionRecord {
    #[serde(default, deserialize_with = "de_amount")]
    pub amount: f64,
    #[serde(default, deserialize_with = "de_text")]
    pub merchant: String,
    #[serde(default, deserialize_with = "de_text")]
    pub location: String,
    #[serde(default, deserialize_with = "de_opt_text")]
    pub time: Option<String>,
    #[serde(default, deserialize_with = "de_opt_text")]
    pub card_type: Option<String>,
}

impl TransactionRecord {
    /// Decode a raw JSON value into a record. Only a non-object value is
    /// rejected; field-level anomalies are absorbed by the lenient
    /// deserializers.
    pub fn from_value(value: &serde_json::Value) -> Result<Self, GenericError> {
        if !value.is_object() {
            return Err(format!("transaction must be a JSON object, got {}", json_type_name(value)).into());
        }
        Ok(serde_json::from_value(value.clone())?)
    }
}

fn json_type_name(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "a boolean",
        serde_json::Value::Number(_) => "a number",
        serde_json::Value::String(_) => "a string",
        serde_json::Value::Array(_) => "an array",
        serde_json::Value::Object(_) => "an object",
    }
}

/// Coerce a raw JSON value to an amount. Numbers pass through, numeric
/// strings are parsed, everything else becomes 0.0.
pub fn coerce_amount(value: &serde_json::Value) -> f64 {
    match value {
        serde_json::Value::Number(n) => n.as_f64().unwrap_or(0.0),
        serde_json::Value::String(s) => s.trim().parse().unwrap_or(0.0),
        _ => 0.0,
    }
}

fn de_amount<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(coerce_amount(&value))
}

fn scalar_to_text(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn de_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(scalar_to_text(&value).unwrap_or_default())
}

fn de_opt_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = serde_json::Value::deserialize(deserializer)?;
    Ok(scalar_to_text(&value))
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum FeatureValue {
    Int(i64),
    Double(f64),
    Text(String),
    Bool(bool),
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Feature {
    pub name: String,
    pub value: FeatureValue,
}

/// The features derived from one transaction, in extraction order.
///
/// Serialized as a flat `name -> value` JSON object to match the wire
/// format callers expect.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureSet {
    features: Vec<Feature>,
}

impl FeatureSet {
    pub fn push(&mut self, name: impl Into<String>, value: FeatureValue) {
        self.features.push(Feature {
            name: name.into(),
            value,
        });
    }

    pub fn get(&self, name: &str) -> Option<&FeatureValue> {
        self.features
            .iter()
            .find(|f| f.name == name)
            .map(|f| &f.value)
    }

    /// True when the named feature exists and is a boolean `true`.
    pub fn flag(&self, name: &str) -> bool {
        matches!(self.get(name), Some(FeatureValue::Bool(true)))
    }

    pub fn number(&self, name: &str) -> Option<f64> {
        match self.get(name) {
            Some(FeatureValue::Double(v)) => Some(*v),
            Some(FeatureValue::Int(v)) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        match self.get(name) {
            Some(FeatureValue::Text(v)) => Some(v.as_str()),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Feature> {
        self.features.iter()
    }
}

impl Serialize for FeatureSet {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeMap;
        let mut map = serializer.serialize_map(Some(self.features.len()))?;
        for feature in &self.features {
            map.serialize_entry(&feature.name, &feature.value)?;
        }
        map.end()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, EnumDisplay)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Prediction {
    Fraud,
    Legitimate,
}

#[derive(Debug, Clone, Serialize)]
pub struct PredictionResult {
    pub prediction: Prediction,
    pub confidence: f64,
    pub risk_score: f64,
    pub features: FeatureSet,
    pub risk_factors: Vec<String>,
    pub threshold_used: f64,
}

/// One entry of a batch scoring response, tagged with the zero-based index
/// of the input record it belongs to.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum BatchEntry {
    Scored {
        transaction_id: usize,
        #[serde(flatten)]
        result: PredictionResult,
    },
    Failed {
        transaction_id: usize,
        error: String,
    },
}

impl BatchEntry {
    pub fn transaction_id(&self) -> usize {
        match self {
            BatchEntry::Scored { transaction_id, .. } => *transaction_id,
            BatchEntry::Failed { transaction_id, .. } => *transaction_id,
        }
    }

    pub fn prediction(&self) -> Option<Prediction> {
        match self {
            BatchEntry::Scored { result, .. } => Some(result.prediction),
            BatchEntry::Failed { .. } => None,
        }
    }

    pub fn is_scored(&self) -> bool {
        matches!(self, BatchEntry::Scored { .. })
    }
}

/// Static metadata describing the deployed scoring model.
#[derive(Debug, Clone, Serialize)]
pub struct ModelInfo {
    pub model_type: String,
    pub version: String,
    pub features: Vec<String>,
    pub risk_factors: serde_json::Value,
}
