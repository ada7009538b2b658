use scoring::scorers::{RuleBasedScorer, RuleProfile};

/// The rule profile this deployment scores with. Thresholds, keyword lists
/// and weights all come from the library defaults; tune them here when a
/// deployment needs different rules.
pub fn default_scorer() -> RuleBasedScorer {
    RuleBasedScorer::new(RuleProfile::default())
}
