use async_trait::async_trait;
use serde_json::json;

use crate::{
    model::{
        FeatureSet, FeatureValue, GenericError, ModelInfo, Prediction, PredictionResult,
        TransactionRecord,
    },
    scorers::Scorer,
};

/// Hour substituted when the time field is absent or malformed.
const DEFAULT_HOUR: u32 = 12;

/// The boolean risk flags the weight table is keyed by.
pub const RISK_FLAGS: [&str; 6] = [
    "high_amount",
    "very_high_amount",
    "suspicious_merchant",
    "unusual_time",
    "high_risk_location",
    "high_risk_card",
];

/// Per-factor weights. All non-negative; the summed score is clamped to 1.0.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RuleWeights {
    pub high_amount: f64,
    pub very_high_amount: f64,
    pub suspicious_merchant: f64,
    pub unusual_time: f64,
    pub high_risk_location: f64,
    pub high_risk_card: f64,
    pub unusual_time_high_amount_combo: f64,
    pub suspicious_merchant_very_high_amount_combo: f64,
}

impl Default for RuleWeights {
    fn default() -> Self {
        Self {
            high_amount: 0.25,
            very_high_amount: 0.15,
            suspicious_merchant: 0.35,
            unusual_time: 0.2,
            high_risk_location: 0.3,
            high_risk_card: 0.15,
            unusual_time_high_amount_combo: 0.1,
            suspicious_merchant_very_high_amount_combo: 0.15,
        }
    }
}

/// Immutable rule configuration: thresholds, keyword lists, weights and
/// confidence multipliers. Built once at startup and never mutated.
#[derive(Debug, Clone)]
pub struct RuleProfile {
    pub high_amount_threshold: f64,
    pub very_high_amount_threshold: f64,
    pub suspicious_merchants: Vec<String>,
    pub high_risk_locations: Vec<String>,
    pub high_risk_cards: Vec<String>,
    pub weights: RuleWeights,
    pub decision_threshold: f64,
    pub fraud_confidence_boost: f64,
    pub legitimate_confidence_boost: f64,
}

impl Default for RuleProfile {
    fn default() -> Self {
        Self {
            high_amount_threshold: 1000.0,
            very_high_amount_threshold: 5000.0,
            suspicious_merchants: to_owned(&[
                "unknown",
                "cash advance",
                "cash_advance",
                "atm",
                "gambling",
                "adult entertainment",
                "crypto",
            ]),
            high_risk_locations: to_owned(&[
                "nigeria",
                "russia",
                "china",
                "unknown location",
                "foreign",
                "offshore",
            ]),
            high_risk_cards: to_owned(&["prepaid", "gift", "unknown"]),
            weights: RuleWeights::default(),
            decision_threshold: 0.5,
            fraud_confidence_boost: 1.2,
            legitimate_confidence_boost: 1.1,
        }
    }
}

fn to_owned(terms: &[&str]) -> Vec<String> {
    terms.iter().map(|t| t.to_string()).collect()
}

/// Scores transactions against a fixed weighted rule table.
///
/// Stateless apart from the immutable profile, so a single instance can be
/// shared freely between concurrent callers.
pub struct RuleBasedScorer {
    profile: RuleProfile,
}

impl RuleBasedScorer {
    pub fn new(profile: RuleProfile) -> Self {
        Self { profile }
    }

    pub fn profile(&self) -> &RuleProfile {
        &self.profile
    }

    pub fn extract_features(&self, record: &TransactionRecord) -> FeatureSet {
        let mut features = FeatureSet::default();

        let amount = record.amount;
        features.push("amount", FeatureValue::Double(amount));
        features.push(
            "high_amount",
            FeatureValue::Bool(amount > self.profile.high_amount_threshold),
        );
        features.push(
            "very_high_amount",
            FeatureValue::Bool(amount > self.profile.very_high_amount_threshold),
        );
        features.push(
            "amount_category",
            FeatureValue::Text(categorize_amount(amount).to_string()),
        );

        let merchant = record.merchant.to_lowercase();
        features.push(
            "suspicious_merchant",
            FeatureValue::Bool(contains_any(&merchant, &self.profile.suspicious_merchants)),
        );
        features.push(
            "merchant_category",
            FeatureValue::Text(categorize_merchant(&merchant).to_string()),
        );
        features.push("merchant", FeatureValue::Text(merchant));

        let hour = parse_hour(record.time.as_deref());
        features.push("hour", FeatureValue::Int(hour as i64));
        features.push("unusual_time", FeatureValue::Bool(hour < 6 || hour > 22));
        features.push(
            "time_category",
            FeatureValue::Text(categorize_hour(hour).to_string()),
        );

        let location = record.location.to_lowercase();
        features.push(
            "high_risk_location",
            FeatureValue::Bool(contains_any(&location, &self.profile.high_risk_locations)),
        );
        features.push(
            "location_category",
            FeatureValue::Text(categorize_location(&location).to_string()),
        );
        features.push("location", FeatureValue::Text(location));

        let card_type = record
            .card_type
            .as_deref()
            .unwrap_or("unknown")
            .to_lowercase();
        features.push(
            "high_risk_card",
            FeatureValue::Bool(self.profile.high_risk_cards.iter().any(|c| *c == card_type)),
        );
        features.push("card_type", FeatureValue::Text(card_type));

        features
    }

    /// Sum the weights of every triggered flag, apply combination bonuses,
    /// clamp to 1.0. Returns the score and the triggered factor labels.
    pub fn calculate_risk_score(&self, features: &FeatureSet) -> (f64, Vec<String>) {
        let w = &self.profile.weights;
        let mut score = 0.0;
        let mut triggered = Vec::new();

        if features.flag("high_amount") {
            score += w.high_amount;
            triggered.push("High amount".to_string());
        }
        if features.flag("very_high_amount") {
            score += w.very_high_amount;
            triggered.push("Very high amount".to_string());
        }
        if features.flag("suspicious_merchant") {
            score += w.suspicious_merchant;
            triggered.push("Suspicious merchant".to_string());
        }
        if features.flag("unusual_time") {
            score += w.unusual_time;
            triggered.push("Unusual time".to_string());
        }
        if features.flag("high_risk_location") {
            score += w.high_risk_location;
            triggered.push("High-risk location".to_string());
        }
        if features.flag("high_risk_card") {
            score += w.high_risk_card;
            triggered.push("High-risk card type".to_string());
        }

        if features.flag("unusual_time") && features.flag("high_amount") {
            score += w.unusual_time_high_amount_combo;
        }
        if features.flag("suspicious_merchant") && features.flag("very_high_amount") {
            score += w.suspicious_merchant_very_high_amount_combo;
        }

        (score.min(1.0), triggered)
    }
}

#[async_trait]
impl Scorer for RuleBasedScorer {
    async fn predict(&self, record: &TransactionRecord) -> Result<PredictionResult, GenericError> {
        let features = self.extract_features(record);
        let (risk_score, risk_factors) = self.calculate_risk_score(&features);

        let prediction = if risk_score > self.profile.decision_threshold {
            Prediction::Fraud
        } else {
            Prediction::Legitimate
        };
        let confidence = match prediction {
            Prediction::Fraud => (risk_score * self.profile.fraud_confidence_boost).min(1.0),
            Prediction::Legitimate => {
                ((1.0 - risk_score) * self.profile.legitimate_confidence_boost).min(1.0)
            }
        };

        Ok(PredictionResult {
            prediction,
            confidence,
            risk_score,
            features,
            risk_factors,
            threshold_used: self.profile.decision_threshold,
        })
    }

    fn model_info(&self) -> ModelInfo {
        let w = &self.profile.weights;
        ModelInfo {
            model_type: "Rule-based Fraud Detection".to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            features: RISK_FLAGS.iter().map(|f| f.to_string()).collect(),
            risk_factors: json!({
                "high_amount": w.high_amount,
                "very_high_amount": w.very_high_amount,
                "suspicious_merchant": w.suspicious_merchant,
                "unusual_time": w.unusual_time,
                "high_risk_location": w.high_risk_location,
                "high_risk_card": w.high_risk_card,
            }),
        }
    }
}

fn contains_any(haystack: &str, terms: &[String]) -> bool {
    // Substring containment, not tokenization: "atm" matching
    // "atmosphere cafe" is an accepted tradeoff of this rule set.
    terms.iter().any(|term| haystack.contains(term.as_str()))
}

/// Extract the hour from an "HH:MM" string. Anything that does not yield an
/// hour in 0..=23 falls back to the neutral midday default.
fn parse_hour(time: Option<&str>) -> u32 {
    let Some(time) = time else {
        return DEFAULT_HOUR;
    };
    match time.split_once(':') {
        Some((hour, _)) => hour
            .trim()
            .parse()
            .ok()
            .filter(|h| *h < 24)
            .unwrap_or(DEFAULT_HOUR),
        None => DEFAULT_HOUR,
    }
}

fn categorize_amount(amount: f64) -> &'static str {
    if amount < 50.0 {
        "micro"
    } else if amount < 200.0 {
        "small"
    } else if amount < 1000.0 {
        "medium"
    } else if amount < 5000.0 {
        "large"
    } else {
        "very_large"
    }
}

fn categorize_merchant(merchant: &str) -> &'static str {
    if ["grocery", "supermarket", "food"].iter().any(|w| merchant.contains(w)) {
        "grocery"
    } else if ["gas", "fuel", "station"].iter().any(|w| merchant.contains(w)) {
        "gas_station"
    } else if ["restaurant", "cafe", "dining"].iter().any(|w| merchant.contains(w)) {
        "restaurant"
    } else if ["online", "web", "internet"].iter().any(|w| merchant.contains(w)) {
        "online"
    } else if ["atm", "cash"].iter().any(|w| merchant.contains(w)) {
        "cash_service"
    } else {
        "other"
    }
}

fn categorize_hour(hour: u32) -> &'static str {
    match hour {
        6..=11 => "morning",
        12..=17 => "afternoon",
        18..=22 => "evening",
        _ => "night",
    }
}

fn categorize_location(location: &str) -> &'static str {
    if ["online", "internet", "web"].iter().any(|w| location.contains(w)) {
        "online"
    } else if ["foreign", "international", "overseas"].iter().any(|w| location.contains(w)) {
        "international"
    } else if location.contains("atm") {
        "atm"
    } else {
        "domestic"
    }
}
